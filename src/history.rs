//! Append-only audit trail of workflow transitions
//!
//! Each document owns one log record holding its entries in action order.
//! Entries are never updated in place; the single sanctioned mutation is the
//! purge of `Approve` entries when a document is returned for revision,
//! modeled as delete-and-recreate of the log record.

use crate::actor::Actor;
use crate::document::{Action, TimeStamp};
use crate::error::WorkflowError;
use crate::utils::history_key;
use chrono::Utc;
use sled::transaction::{ConflictableTransactionError, TransactionResult};
use std::sync::Arc;

/// Copy of an approver's signature artifact taken at approval time. Later
/// changes to the actor's signature never alter recorded history.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct SignatureSnapshot {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub bytes: Vec<u8>,
    #[n(1)]
    pub digest: String, // sha256 of `bytes` at capture time
}

impl SignatureSnapshot {
    pub fn capture(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            digest: sha256::digest(bytes),
        }
    }
    /// True while the stored bytes still match the digest taken at capture.
    pub fn verify(&self) -> bool {
        sha256::digest(self.bytes.as_slice()) == self.digest
    }
}

/// Immutable record of one transition.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct AuditHistoryEntry {
    #[n(0)]
    pub document_id: String,
    #[n(1)]
    pub action: Action,
    #[n(2)]
    pub actor_id: String,
    #[n(3)]
    pub actor_role_level: u8, // snapshotted at action time, 0 = no role
    #[n(4)]
    pub timestamp: TimeStamp<Utc>,
    #[n(5)]
    pub comments: String,
    #[n(6)]
    pub signature: Option<SignatureSnapshot>,
}

impl AuditHistoryEntry {
    pub fn new(
        document_id: String,
        action: Action,
        actor: &Actor,
        comments: &str,
        signature: Option<SignatureSnapshot>,
    ) -> Self {
        Self {
            document_id,
            action,
            actor_id: actor.id.clone(),
            actor_role_level: actor.role_level.unwrap_or(0),
            timestamp: TimeStamp::new(),
            comments: comments.to_string(),
            signature,
        }
    }
}

/// Append-only persistence for audit entries, keyed by document.
pub struct HistoryStore {
    db: Arc<sled::Db>,
}

impl HistoryStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    /// All entries for a document, ordered by timestamp.
    pub fn list_for(&self, document_id: &str) -> Result<Vec<AuditHistoryEntry>, WorkflowError> {
        let raw = self.db.get(history_key(document_id))?;
        let mut entries = decode_log(raw.as_deref())?;
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    /// Entries for a document restricted to one action.
    pub fn filter(
        &self,
        document_id: &str,
        action: Action,
    ) -> Result<Vec<AuditHistoryEntry>, WorkflowError> {
        let mut entries = self.list_for(document_id)?;
        entries.retain(|e| e.action == action);
        Ok(entries)
    }

    pub fn append(&self, entry: AuditHistoryEntry) -> Result<(), WorkflowError> {
        let key = history_key(&entry.document_id);
        let result: TransactionResult<(), WorkflowError> = self.db.transaction(|tx| {
            let mut entries = decode_log(tx.get(key.as_bytes())?.as_deref())
                .map_err(ConflictableTransactionError::Abort)?;
            entries.push(entry.clone());
            tx.insert(
                key.as_bytes(),
                encode_log(&entries).map_err(ConflictableTransactionError::Abort)?,
            )?;
            Ok(())
        });
        Ok(result?)
    }

    /// Removes every entry with the given action for a document and returns
    /// how many were purged. Used only by the return-for-revision transition.
    pub fn delete_where(
        &self,
        document_id: &str,
        action: Action,
    ) -> Result<usize, WorkflowError> {
        let key = history_key(document_id);
        let result: TransactionResult<usize, WorkflowError> = self.db.transaction(|tx| {
            let mut entries = decode_log(tx.get(key.as_bytes())?.as_deref())
                .map_err(ConflictableTransactionError::Abort)?;
            let before = entries.len();
            entries.retain(|e| e.action != action);
            let removed = before - entries.len();
            tx.insert(
                key.as_bytes(),
                encode_log(&entries).map_err(ConflictableTransactionError::Abort)?,
            )?;
            Ok(removed)
        });
        Ok(result?)
    }
}

pub(crate) fn decode_log(raw: Option<&[u8]>) -> Result<Vec<AuditHistoryEntry>, WorkflowError> {
    match raw {
        Some(raw) => minicbor::decode(raw).map_err(|e| WorkflowError::Codec(e.to_string())),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn encode_log(entries: &[AuditHistoryEntry]) -> Result<Vec<u8>, WorkflowError> {
    minicbor::to_vec(entries).map_err(|e| WorkflowError::Codec(e.to_string()))
}
