//! Deterministic approver selection
use crate::actor::{Actor, decode_actor};
use crate::document::Status;
use crate::error::WorkflowError;
use crate::utils::ACTOR_PREFIX;
use std::sync::Arc;

/// Looks up the actor responsible for a document at a given status.
///
/// Selection contract: among eligible actors at the required level, the one
/// registered earliest wins (id as tiebreak). The ordering is explicit, not
/// an accident of store iteration, so re-running the same lookup against the
/// same actor set always yields the same assignment. The reconciliation job
/// relies on this when it backfills orphaned documents.
pub struct ApproverDirectory {
    db: Arc<sled::Db>,
}

impl ApproverDirectory {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    /// First eligible actor for the role level required by `status`, or
    /// `None` when the status has no pending reviewer or no eligible actor
    /// exists (the document stays orphaned until reconciliation).
    pub fn get_next_approver(&self, status: Status) -> Result<Option<Actor>, WorkflowError> {
        Ok(Self::first_eligible_in(&self.snapshot()?, status).cloned())
    }

    /// All registered actors in registration order. Used to pick approvers
    /// inside a transaction, where the store cannot be scanned.
    pub(crate) fn snapshot(&self) -> Result<Vec<Actor>, WorkflowError> {
        let mut roster = Vec::new();
        for item in self.db.scan_prefix(ACTOR_PREFIX) {
            let (_, raw) = item?;
            roster.push(decode_actor(raw.as_ref())?);
        }
        roster.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(roster)
    }

    /// Selection rule applied to a roster snapshot: the first eligible actor
    /// holding exactly the required level. The roster must be in
    /// registration order.
    pub(crate) fn first_eligible_in(roster: &[Actor], status: Status) -> Option<&Actor> {
        let level = status.required_level()?;
        roster
            .iter()
            .find(|actor| actor.has_role_level(level) && actor.is_eligible_approver())
    }
}
