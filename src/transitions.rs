//! Static transition table for the approval chain
//!
//! State flow:
//! Draft → [submit] → PendingL2 → [approve] → PendingL3 → [approve] →
//! PendingL4 → [approve] → PendingL5 → [approve] → Approved
//!
//! At any pending stage: [reject] → Rejected or [return] → OnRevision.
//! OnRevision → [submit] → PendingL2 (starts a new approval chain).
//! Approved and Rejected are terminal.

use crate::document::{Action, Document, Status};

/// Role level of the Managing Director tier, the top of the chain.
pub const FINAL_APPROVAL_LEVEL: u8 = 5;

/// Destination for `action` taken at `status`. `None` means the action is
/// illegal at that status and must be rejected without mutating anything.
pub fn next_status(status: Status, action: Action) -> Option<Status> {
    use Action::*;
    use Status::*;

    match (status, action) {
        (Draft, Submit) => Some(PendingL2),
        (PendingL2, Approve) => Some(PendingL3),
        (PendingL3, Approve) => Some(PendingL4),
        (PendingL4, Approve) => Some(PendingL5),
        (PendingL5, Approve) => Some(Approved),
        (PendingL2 | PendingL3 | PendingL4 | PendingL5, Reject) => Some(Rejected),
        (PendingL2 | PendingL3 | PendingL4 | PendingL5, Return) => Some(OnRevision),
        (OnRevision, Submit) => Some(PendingL2),
        _ => None,
    }
}

/// Policy for the final (Managing Director) stage. The business rule changed
/// over the life of the original system, so the branch stays selectable;
/// exactly one policy is active per service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingPolicy {
    /// Every document passes through the Managing Director stage.
    #[default]
    AlwaysThroughFinal,
    /// A General Manager approval completes the chain unless the document
    /// was flagged as requiring elevated approval.
    SkipFinalUnlessFlagged,
}

impl RoutingPolicy {
    /// Applies the policy to the table destination. Only the
    /// General-Manager-approve edge (destination `PendingL5`) is affected.
    pub fn resolve(self, next: Status, document: &Document) -> Status {
        match self {
            RoutingPolicy::AlwaysThroughFinal => next,
            RoutingPolicy::SkipFinalUnlessFlagged => {
                if next == Status::PendingL5 && !document.requires_elevated_approval {
                    Status::Approved
                } else {
                    next
                }
            }
        }
    }
}
