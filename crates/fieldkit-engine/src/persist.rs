#![forbid(unsafe_code)]

//! Persistence boundary contract.
//!
//! The engine never performs network I/O. It emits [`PersistenceCall`]
//! values in its command stream; the host executes them against the backend
//! and reports back through
//! [`crate::engine::Engine::persistence_resolved`]. Calls are
//! fire-and-forget: unordered relative to each other, not cancellable, not
//! retried.
//!
//! In consumption mode the host resolves calls against the token-scoped
//! endpoints instead of the resource ones; the contract is otherwise
//! identical, plus the finalizing [`PersistenceRequest::Sign`].

use fieldkit_core::{DocumentInfo, FieldItem, ItemDraft, ItemId, ItemPatch};
use serde::{Deserialize, Serialize};

/// Correlates one in-flight persistence call with its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// One backend operation, as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PersistenceRequest {
    /// Fetch the authoritative item list, field definitions, and roles.
    FetchInfo,
    /// Create a new item; the backend returns the canonical [`FieldItem`].
    AddItem { draft: ItemDraft },
    /// Partially update an existing item.
    UpdateItem { item_id: ItemId, patch: ItemPatch },
    /// Delete an existing item.
    DeleteItem { item_id: ItemId },
    /// Finalize a consumption-mode session with the filled items.
    Sign { items: Vec<FieldItem> },
}

/// A request paired with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceCall {
    pub request_id: RequestId,
    pub request: PersistenceRequest,
}

/// Backend failure on one call. Not retried; the optimistic local state is
/// not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistenceError {
    /// The call never reached the backend.
    Transport { message: String },
    /// The backend refused the operation.
    Backend { message: String },
}

impl core::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "transport failure: {message}"),
            Self::Backend { message } => write!(f, "backend failure: {message}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Result of the finalizing sign call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignOutcome {
    /// Navigate to the returned URL.
    Redirect { url: String },
    /// No follow-up URL; reload the hosting view.
    Reload,
}

/// Host-reported resolution of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    InfoLoaded { info: DocumentInfo },
    Created { item: FieldItem },
    Updated,
    Deleted,
    Signed { result: SignOutcome },
    Failed { error: PersistenceError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_core::{FieldTypeId, PercentPoint};
    use pretty_assertions::assert_eq;

    #[test]
    fn requests_serialize_with_tagged_ops() {
        let call = PersistenceCall {
            request_id: RequestId(3),
            request: PersistenceRequest::AddItem {
                draft: ItemDraft::at(FieldTypeId(1), 2, PercentPoint { x: 5.0, y: 6.0 }),
            },
        };
        let json = serde_json::to_value(&call).expect("serializable call");
        assert_eq!(json["request_id"], 3);
        assert_eq!(json["request"]["op"], "add_item");
        assert_eq!(json["request"]["draft"]["page"], 2);
    }

    #[test]
    fn outcomes_round_trip() {
        let outcome = PersistenceOutcome::Failed {
            error: PersistenceError::Transport {
                message: "offline".to_owned(),
            },
        };
        let json = serde_json::to_string(&outcome).expect("serializable outcome");
        let parsed: PersistenceOutcome = serde_json::from_str(&json).expect("parsable outcome");
        assert_eq!(parsed, outcome);
    }
}
