#![forbid(unsafe_code)]

//! The orchestrating engine.
//!
//! [`Engine`] owns the authoritative item cache and the component state
//! machines, consumes semantic host events (one method per event), and
//! emits [`HostCommand`] values into a queue the host drains and applies to
//! the viewer DOM. All methods run to completion without preemption; time
//! only advances when the host calls [`Engine::tick`].
//!
//! Flow: readiness polling signals ready, the engine runs the injection
//! pass (assets, every cached item, overlay-ready marker), and from then on
//! gestures, menu creation, and dialog edits mutate state and emit
//! persistence calls that the host resolves asynchronously.

use std::collections::VecDeque;

use fieldkit_core::{
    DocumentContext, DocumentInfo, FieldDefinition, FieldItem, FieldTypeId, ItemId, ItemPatch,
    PageBox, PercentRect, PointerPhase, RawPointer, Role, menu_anchor_percent,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dialog::{DialogController, DialogSaveError, EditForm};
use crate::interaction::{InteractionController, ResizeAnchors};
use crate::menu::{ContextMenu, MenuController};
use crate::persist::{
    PersistenceCall, PersistenceOutcome, PersistenceRequest, RequestId, SignOutcome,
};
use crate::readiness::{
    POLL_INTERVAL, ReadinessConfig, ReadinessEffect, ReadinessMonitor, ReadinessState,
    ViewerAdapter,
};
use crate::reconcile::{OverlayReconciler, ReconcileOp};

/// Which handle of an overlay node a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "handle", rename_all = "snake_case")]
pub enum HandleKind {
    Drag,
    Resize { anchors: ResizeAnchors },
}

/// One instruction for the host to apply to the viewer or the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    /// Inject the overlay stylesheet/script resources into the viewer
    /// document.
    InjectAssets,
    /// Create (re-create) the overlay node under its page container.
    MountNode { item: FieldItem },
    RemoveNode { item_id: ItemId },
    /// Visual geometry update for one node; no persistence implied.
    SetNodeRect { item_id: ItemId, rect: PercentRect },
    /// Append the overlay-ready marker the drift check looks for.
    MarkOverlayReady,
    ShowMenu {
        menu: ContextMenu,
        entries: Vec<FieldDefinition>,
    },
    DismissMenu,
    CapturePointer { item_id: ItemId },
    ReleasePointer { item_id: ItemId },
    OpenDialog {
        item: FieldItem,
        form: EditForm,
        field_definitions: Vec<FieldDefinition>,
        roles: Vec<Role>,
    },
    CloseDialog,
    /// Blocking, non-retryable alert (unrenderable document).
    ShowAlert { message: String },
    /// Ask the host to call [`Engine::tick`] again after `after_ms`.
    SchedulePoll { after_ms: u64 },
    /// Execute one backend call and report back through
    /// [`Engine::persistence_resolved`].
    Persist { call: PersistenceCall },
    /// Full reload of the hosting view (delete path).
    ReloadView,
    Redirect { url: String },
}

/// What an in-flight persistence call was for.
#[derive(Debug, Clone, PartialEq)]
enum PendingOp {
    Info,
    Create,
    GestureUpdate { item_id: ItemId },
    MetadataUpdate { item_id: ItemId, patch: ItemPatch },
    Delete { item_id: ItemId },
    Sign,
}

/// The placement and interaction engine for one document session.
#[derive(Debug)]
pub struct Engine {
    context: DocumentContext,
    items: FxHashMap<ItemId, FieldItem>,
    field_definitions: Vec<FieldDefinition>,
    roles: Vec<Role>,
    readiness: ReadinessMonitor,
    reconciler: OverlayReconciler,
    interaction: InteractionController,
    menu: MenuController,
    dialog: DialogController,
    pending: FxHashMap<RequestId, PendingOp>,
    next_request: u64,
    commands: VecDeque<HostCommand>,
}

impl Engine {
    #[must_use]
    pub fn new(context: DocumentContext) -> Self {
        Self::with_readiness(context, ReadinessConfig::default())
    }

    #[must_use]
    pub fn with_readiness(context: DocumentContext, config: ReadinessConfig) -> Self {
        Self {
            context,
            items: FxHashMap::default(),
            field_definitions: Vec::new(),
            roles: Vec::new(),
            readiness: ReadinessMonitor::new(config),
            reconciler: OverlayReconciler::new(),
            interaction: InteractionController::new(),
            menu: MenuController::new(),
            dialog: DialogController::new(),
            pending: FxHashMap::default(),
            next_request: 1,
            commands: VecDeque::new(),
        }
    }

    /// Kick off the session: fetch the document info and begin readiness
    /// polling immediately.
    pub fn start(&mut self) {
        self.persist(PersistenceRequest::FetchInfo, PendingOp::Info);
        self.commands
            .push_back(HostCommand::SchedulePoll { after_ms: 0 });
    }

    /// Run one readiness/drift poll against the viewer.
    pub fn tick(&mut self, viewer: &dyn ViewerAdapter) {
        match self.readiness.tick(viewer) {
            ReadinessEffect::ScheduleNext | ReadinessEffect::OverlayIntact => {
                self.schedule_poll();
            }
            ReadinessEffect::BecameReady | ReadinessEffect::DriftDetected => {
                self.inject_fields();
                self.schedule_poll();
            }
            ReadinessEffect::Failed { message } => {
                self.commands.push_back(HostCommand::ShowAlert { message });
            }
            ReadinessEffect::Halted => {}
        }
    }

    /// Pointer-down over an item's drag or resize handle.
    pub fn handle_pointer_down(
        &mut self,
        item_id: ItemId,
        handle: HandleKind,
        raw: &RawPointer,
        page_box: PageBox,
    ) {
        if raw.normalize(PointerPhase::Down).is_none() {
            return;
        }
        let Some(item) = self.items.get(&item_id) else {
            tracing::warn!(%item_id, "pointer-down on unknown item ignored");
            return;
        };
        let begun = match handle {
            HandleKind::Drag => self.interaction.begin_drag(item, page_box),
            HandleKind::Resize { anchors } => {
                self.interaction.begin_resize(item, page_box, anchors)
            }
        };
        match begun {
            Ok(()) => self
                .commands
                .push_back(HostCommand::CapturePointer { item_id }),
            Err(err) => tracing::debug!(%item_id, %err, "pointer-down ignored"),
        }
    }

    /// Pointer move while a gesture may be active. Updates visual geometry
    /// only; never calls the backend.
    pub fn pointer_moved(&mut self, raw: &RawPointer) {
        let Some(input) = raw.normalize(PointerPhase::Move) else {
            return;
        };
        if let Some(frame) = self.interaction.pointer_moved(input) {
            self.reconciler.set_gesture_rect(frame.item_id, frame.rect);
            self.commands.push_back(HostCommand::SetNodeRect {
                item_id: frame.item_id,
                rect: frame.rect,
            });
        }
    }

    /// Pointer-up/end: commit the gesture with exactly one persistence
    /// update, then detach.
    pub fn pointer_released(&mut self, raw: &RawPointer) {
        let Some(input) = raw.normalize(PointerPhase::Up) else {
            return;
        };
        let Ok(commit) = self.interaction.pointer_released(input) else {
            return;
        };
        if let Some(item) = self.items.get_mut(&commit.item_id) {
            commit.patch.apply_to(item);
            item.clamp_position();
        }
        self.reconciler.set_gesture_rect(commit.item_id, commit.rect);
        self.commands.push_back(HostCommand::SetNodeRect {
            item_id: commit.item_id,
            rect: commit.rect,
        });
        self.persist(
            PersistenceRequest::UpdateItem {
                item_id: commit.item_id,
                patch: commit.patch,
            },
            PendingOp::GestureUpdate {
                item_id: commit.item_id,
            },
        );
        self.commands.push_back(HostCommand::ReleasePointer {
            item_id: commit.item_id,
        });
    }

    /// Abort the active gesture (pointer cancel, focus loss).
    pub fn pointer_canceled(&mut self) {
        if let Some(frame) = self.interaction.cancel() {
            self.reconciler.set_gesture_rect(frame.item_id, frame.rect);
            self.commands.push_back(HostCommand::SetNodeRect {
                item_id: frame.item_id,
                rect: frame.rect,
            });
            self.commands.push_back(HostCommand::ReleasePointer {
                item_id: frame.item_id,
            });
        }
    }

    /// Right-click on a page surface: open the creation menu at the pointer.
    pub fn page_context_menu(&mut self, page: u32, raw: &RawPointer, page_box: PageBox) {
        let Some(input) = raw.normalize(PointerPhase::Down) else {
            return;
        };
        let anchor = menu_anchor_percent(input.point(), &page_box);
        let opened = self.menu.open(page, anchor);
        if opened.replaced {
            self.commands.push_back(HostCommand::DismissMenu);
        }
        self.commands.push_back(HostCommand::ShowMenu {
            menu: opened.menu,
            entries: self.field_definitions.clone(),
        });
    }

    /// Click on a menu entry: create a field of the default size at the
    /// menu anchor, guarded by the single-flight creation flag.
    pub fn menu_entry_clicked(&mut self, field_type: FieldTypeId) {
        if let Some(draft) = self.menu.entry_clicked(field_type) {
            self.persist(PersistenceRequest::AddItem { draft }, PendingOp::Create);
        }
    }

    /// Click outside an open menu dismisses it (unless a creation is in
    /// flight).
    pub fn outside_click(&mut self) {
        if self.menu.outside_click() {
            self.commands.push_back(HostCommand::DismissMenu);
        }
    }

    /// Click on an item body (not a handle): open the metadata editor.
    pub fn item_clicked(&mut self, item_id: ItemId) {
        let Some(item) = self.items.get(&item_id) else {
            tracing::warn!(%item_id, "click on unknown item ignored");
            return;
        };
        let item = item.clone();
        let form = self.dialog.open(&item);
        self.commands.push_back(HostCommand::OpenDialog {
            item,
            form,
            field_definitions: self.field_definitions.clone(),
            roles: self.roles.clone(),
        });
    }

    /// Save the edit dialog. A validation failure is returned to the caller
    /// and blocks submission; nothing is persisted.
    pub fn dialog_save(&mut self, form: EditForm) -> Result<(), DialogSaveError> {
        let (item_id, patch) = self.dialog.save(form)?;
        self.persist(
            PersistenceRequest::UpdateItem {
                item_id,
                patch: patch.clone(),
            },
            PendingOp::MetadataUpdate { item_id, patch },
        );
        Ok(())
    }

    /// Delete the item the dialog is editing.
    pub fn dialog_delete(&mut self) {
        match self.dialog.delete() {
            Ok(item_id) => {
                self.persist(
                    PersistenceRequest::DeleteItem { item_id },
                    PendingOp::Delete { item_id },
                );
            }
            Err(err) => tracing::debug!(%err, "dialog delete ignored"),
        }
    }

    /// Close the dialog without persisting.
    pub fn dialog_cancel(&mut self) {
        if self.dialog.cancel() {
            self.commands.push_back(HostCommand::CloseDialog);
        }
    }

    /// Finalize a consumption-mode session with the current items.
    pub fn sign_requested(&mut self) {
        if !self.context.can_sign() {
            tracing::warn!("sign requested outside a signer session; ignored");
            return;
        }
        let mut items: Vec<FieldItem> = self.items.values().cloned().collect();
        items.sort_unstable_by_key(|item| item.id);
        self.persist(PersistenceRequest::Sign { items }, PendingOp::Sign);
    }

    /// Resolve one in-flight persistence call.
    ///
    /// Failures are not retried and optimistic local geometry is not rolled
    /// back; the effect of a lost update is silent drift between UI and
    /// backend until the next full fetch. This mirrors the source behavior
    /// and is deliberately not hidden.
    pub fn persistence_resolved(&mut self, request_id: RequestId, outcome: PersistenceOutcome) {
        let Some(op) = self.pending.remove(&request_id) else {
            tracing::warn!(%request_id, "resolution for unknown request dropped");
            return;
        };
        match (op, outcome) {
            (PendingOp::Info, PersistenceOutcome::InfoLoaded { info }) => {
                self.load_info(info);
            }
            (PendingOp::Create, PersistenceOutcome::Created { item }) => {
                self.menu.creation_resolved(true);
                self.items.insert(item.id, item.clone());
                let ops = self.reconciler.refresh(&item);
                self.push_reconcile_ops(ops);
                self.commands.push_back(HostCommand::DismissMenu);
            }
            (PendingOp::GestureUpdate { item_id }, PersistenceOutcome::Updated) => {
                tracing::debug!(%item_id, "gesture geometry persisted");
            }
            (PendingOp::MetadataUpdate { item_id, patch }, PersistenceOutcome::Updated) => {
                self.dialog.operation_resolved(true);
                if let Some(item) = self.items.get_mut(&item_id) {
                    patch.apply_to(item);
                    if let Some(field_type) = patch.field_type
                        && let Some(def) = self
                            .field_definitions
                            .iter()
                            .find(|def| def.id == field_type)
                    {
                        item.name.clone_from(&def.name);
                    }
                    let item = item.clone();
                    let ops = self.reconciler.refresh(&item);
                    self.push_reconcile_ops(ops);
                }
                self.commands.push_back(HostCommand::CloseDialog);
            }
            (PendingOp::Delete { item_id }, PersistenceOutcome::Deleted) => {
                self.dialog.operation_resolved(true);
                self.items.remove(&item_id);
                if self.reconciler.remove(item_id) {
                    self.commands.push_back(HostCommand::RemoveNode { item_id });
                }
                self.commands.push_back(HostCommand::CloseDialog);
                self.commands.push_back(HostCommand::ReloadView);
            }
            (PendingOp::Sign, PersistenceOutcome::Signed { result }) => match result {
                SignOutcome::Redirect { url } => {
                    self.commands.push_back(HostCommand::Redirect { url });
                }
                SignOutcome::Reload => self.commands.push_back(HostCommand::ReloadView),
            },
            (op, PersistenceOutcome::Failed { error }) => {
                match op {
                    PendingOp::Create => self.menu.creation_resolved(false),
                    PendingOp::MetadataUpdate { .. } | PendingOp::Delete { .. } => {
                        self.dialog.operation_resolved(false);
                    }
                    PendingOp::GestureUpdate { item_id } => {
                        tracing::warn!(
                            %item_id,
                            "gesture persistence failed; local geometry kept (no rollback)"
                        );
                    }
                    PendingOp::Info | PendingOp::Sign => {}
                }
                tracing::warn!(%request_id, %error, "persistence call failed");
            }
            (op, outcome) => {
                tracing::warn!(%request_id, ?op, ?outcome, "mismatched persistence resolution");
            }
        }
    }

    /// Drain all queued host commands.
    pub fn drain_commands(&mut self) -> Vec<HostCommand> {
        self.commands.drain(..).collect()
    }

    /// Pop the next queued host command, if any.
    pub fn pop_command(&mut self) -> Option<HostCommand> {
        self.commands.pop_front()
    }

    #[must_use]
    pub const fn context(&self) -> &DocumentContext {
        &self.context
    }

    #[must_use]
    pub const fn readiness_state(&self) -> ReadinessState {
        self.readiness.state()
    }

    #[must_use]
    pub fn item(&self, item_id: ItemId) -> Option<&FieldItem> {
        self.items.get(&item_id)
    }

    /// Cached item ids in sorted order.
    #[must_use]
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub const fn overlay(&self) -> &OverlayReconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn field_definitions(&self) -> &[FieldDefinition] {
        &self.field_definitions
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    fn load_info(&mut self, info: DocumentInfo) {
        self.items.clear();
        for item in info.items {
            match item.validate() {
                Ok(()) => {
                    self.items.insert(item.id, item);
                }
                Err(err) => tracing::warn!(%err, "invalid item from backend skipped"),
            }
        }
        self.field_definitions = info.field_definitions;
        self.roles = info.roles;
        tracing::debug!(items = self.items.len(), "document info loaded");
        // If the viewer got ready before the info arrived, materialize now.
        if self.readiness.is_ready() {
            let ops = self.reconciler.reconcile(&self.items);
            self.push_reconcile_ops(ops);
        }
    }

    /// Full injection pass: assets, every cached item, then the ready
    /// marker. Also the re-injection path when the drift check finds the
    /// overlay wiped.
    fn inject_fields(&mut self) {
        self.commands.push_back(HostCommand::InjectAssets);
        self.reconciler.invalidate();
        let ops = self.reconciler.reconcile(&self.items);
        self.push_reconcile_ops(ops);
        self.commands.push_back(HostCommand::MarkOverlayReady);
    }

    fn push_reconcile_ops(&mut self, ops: Vec<ReconcileOp>) {
        for op in ops {
            self.commands.push_back(match op {
                ReconcileOp::Mount { item } => HostCommand::MountNode { item },
                ReconcileOp::Remove { item_id } => HostCommand::RemoveNode { item_id },
            });
        }
    }

    fn schedule_poll(&mut self) {
        self.commands.push_back(HostCommand::SchedulePoll {
            after_ms: POLL_INTERVAL.as_millis() as u64,
        });
    }

    fn persist(&mut self, request: PersistenceRequest, op: PendingOp) {
        let request_id = RequestId(self.next_request);
        self.next_request += 1;
        self.pending.insert(request_id, op);
        self.commands.push_back(HostCommand::Persist {
            call: PersistenceCall {
                request_id,
                request,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        Engine::new(DocumentContext::Resource {
            model: "sign.template".to_owned(),
            resource_id: 7,
        })
    }

    #[test]
    fn start_fetches_info_and_schedules_polling() {
        let mut engine = engine();
        engine.start();
        let commands = engine.drain_commands();
        assert!(matches!(
            &commands[0],
            HostCommand::Persist {
                call: PersistenceCall {
                    request: PersistenceRequest::FetchInfo,
                    ..
                }
            }
        ));
        assert_eq!(commands[1], HostCommand::SchedulePoll { after_ms: 0 });
    }

    #[test]
    fn unknown_resolution_is_dropped_quietly() {
        let mut engine = engine();
        engine.persistence_resolved(RequestId(99), PersistenceOutcome::Updated);
        assert_eq!(engine.drain_commands(), Vec::new());
    }

    #[test]
    fn sign_outside_signer_context_is_ignored() {
        let mut engine = engine();
        engine.sign_requested();
        assert_eq!(engine.drain_commands(), Vec::new());
    }
}
