//! Service layer executing approval workflow transitions
use crate::actor::{Actor, decode_actor, encode_actor};
use crate::directory::ApproverDirectory;
use crate::document::{
    Action, Document, DocumentKind, PaymentDate, Status, TimeStamp, decode_document,
    encode_document,
};
use crate::error::WorkflowError;
use crate::history::{AuditHistoryEntry, HistoryStore, SignatureSnapshot};
use crate::notify::{NotificationDispatcher, NotificationEvent, Notifier};
use crate::sequence::{self, SequenceGenerator};
use crate::transitions::{FINAL_APPROVAL_LEVEL, RoutingPolicy, next_status};
use crate::utils::{DOCUMENT_PREFIX, actor_key, document_key, history_key, new_uuid_to_bech32};
use sled::transaction::{ConflictableTransactionError, TransactionResult};
use std::sync::Arc;

/// Approval constraints for one service instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowConfig {
    pub routing_policy: RoutingPolicy,
}

/// Outcome of one reconciliation pass over orphaned documents.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReassignReport {
    pub reassigned: usize,
    pub still_orphaned: usize,
}

/// The approval state machine over a shared store.
///
/// Every transition runs as one store transaction spanning validation,
/// duplicate-approval checks, number minting, status and approver mutation,
/// and the audit append. Concurrent transitions against the same document
/// serialize on its key: the loser re-reads the post-transition state and
/// fails validation instead of double-applying.
pub struct WorkflowService {
    db: Arc<sled::Db>,
    directory: ApproverDirectory,
    sequences: SequenceGenerator,
    history: HistoryStore,
    dispatcher: NotificationDispatcher,
    config: WorkflowConfig,
}

impl WorkflowService {
    pub fn new(db: Arc<sled::Db>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(db, notifier, WorkflowConfig::default())
    }

    pub fn with_config(
        db: Arc<sled::Db>,
        notifier: Arc<dyn Notifier>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            directory: ApproverDirectory::new(db.clone()),
            sequences: SequenceGenerator::new(db.clone()),
            history: HistoryStore::new(db.clone()),
            dispatcher: NotificationDispatcher::new(notifier),
            config,
            db,
        }
    }

    pub fn directory(&self) -> &ApproverDirectory {
        &self.directory
    }

    pub fn sequences(&self) -> &SequenceGenerator {
        &self.sequences
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Persist a new actor record.
    pub fn register_actor(&self, actor: &Actor) -> Result<(), WorkflowError> {
        self.db
            .insert(actor_key(&actor.id).as_bytes(), encode_actor(actor)?)?;
        Ok(())
    }

    /// Overwrite an existing actor record (role changes, new signature).
    pub fn update_actor(&self, actor: &Actor) -> Result<(), WorkflowError> {
        let key = actor_key(&actor.id);
        if self.db.get(key.as_bytes())?.is_none() {
            return Err(WorkflowError::ActorNotFound(actor.id.clone()));
        }
        self.db.insert(key.as_bytes(), encode_actor(actor)?)?;
        Ok(())
    }

    pub fn actor(&self, id: &str) -> Result<Actor, WorkflowError> {
        let raw = self
            .db
            .get(actor_key(id).as_bytes())?
            .ok_or_else(|| WorkflowError::ActorNotFound(id.to_string()))?;
        decode_actor(raw.as_ref())
    }

    /// Create a document in `Draft`. Numbers are minted on first submission,
    /// never here, so drafts stay unnumbered.
    pub fn create_document(
        &self,
        kind: DocumentKind,
        payee_name: &str,
        amount: u64,
        payment_date: PaymentDate,
        created_by: &str,
    ) -> Result<Document, WorkflowError> {
        let creator = self.actor(created_by)?;
        let document = Document {
            id: new_uuid_to_bech32("doc_").map_err(|e| WorkflowError::Identifier(e.to_string()))?,
            kind,
            number: None,
            status: Status::Draft,
            payee_name: payee_name.to_string(),
            amount,
            payment_date,
            created_by: creator.id,
            current_approver: None,
            requires_elevated_approval: false,
            created_at: TimeStamp::new(),
            submitted_at: None,
        };
        self.db
            .insert(document_key(&document.id).as_bytes(), encode_document(&document)?)?;
        Ok(document)
    }

    pub fn document(&self, id: &str) -> Result<Document, WorkflowError> {
        let raw = self
            .db
            .get(document_key(id).as_bytes())?
            .ok_or_else(|| WorkflowError::DocumentNotFound(id.to_string()))?;
        decode_document(raw.as_ref())
    }

    /// Read-only precheck whether `actor` may perform `action` on `document`.
    /// Used by callers to decide which actions to offer before attempting a
    /// transition; `transition` re-validates inside its transaction.
    pub fn can_transition(
        &self,
        document: &Document,
        action: Action,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        if next_status(document.status, action).is_none() {
            return Err(WorkflowError::IllegalTransition {
                status: document.status,
                action,
            });
        }

        match action {
            Action::Submit => {
                if actor.id != document.created_by {
                    return Err(WorkflowError::UnauthorizedActor(
                        "only the creator can submit this document".to_string(),
                    ));
                }
            }
            Action::Approve | Action::Reject | Action::Return => {
                let assigned = document.current_approver.as_deref() == Some(actor.id.as_str());
                // shared inbox at the top tier: any Managing-Director-level
                // actor may act at the final pending stage
                let final_tier = document.status == Status::PendingL5
                    && actor.has_role_level(FINAL_APPROVAL_LEVEL);
                if !assigned && !final_tier {
                    return Err(WorkflowError::UnauthorizedActor(
                        "you are not the assigned approver for this document".to_string(),
                    ));
                }

                if let Some(expected) = document.status.required_level() {
                    if !actor.has_role_level(expected) {
                        let held = actor
                            .role_level
                            .map(|l| l.to_string())
                            .unwrap_or_else(|| "none".to_string());
                        return Err(WorkflowError::UnauthorizedActor(format!(
                            "your role level ({held}) does not match required level ({expected})"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Execute a state transition and return the updated document.
    ///
    /// Runs as a single transaction: either every side effect commits
    /// (status, approver, number, audit entry) or none do. The notification
    /// hook fires after commit, once per successful transition, and its
    /// failures never propagate back.
    pub fn transition(
        &self,
        document_id: &str,
        action: Action,
        actor_id: &str,
        comments: &str,
    ) -> Result<Document, WorkflowError> {
        let actor = self.actor(actor_id)?;
        // roster snapshot for approver selection; the scan cannot run inside
        // the transaction, and selection only depends on registered actors
        let roster = self.directory.snapshot()?;

        let doc_key = document_key(document_id);
        let hist_key = history_key(document_id);

        let result: TransactionResult<Document, WorkflowError> = self.db.transaction(|tx| {
            use ConflictableTransactionError::Abort;

            let raw = tx.get(doc_key.as_bytes())?.ok_or_else(|| {
                Abort(WorkflowError::DocumentNotFound(document_id.to_string()))
            })?;
            let mut document = decode_document(raw.as_ref()).map_err(Abort)?;

            self.can_transition(&document, action, &actor).map_err(Abort)?;

            let mut entries =
                crate::history::decode_log(tx.get(hist_key.as_bytes())?.as_deref())
                    .map_err(Abort)?;

            // a second approval by the same person is a hard error, not a no-op
            if action == Action::Approve
                && entries
                    .iter()
                    .any(|e| e.action == Action::Approve && e.actor_id == actor.id)
            {
                return Err(Abort(WorkflowError::DuplicateApproval {
                    actor: actor.name.clone(),
                }));
            }

            let next = match next_status(document.status, action) {
                Some(next) => self.config.routing_policy.resolve(next, &document),
                None => {
                    return Err(Abort(WorkflowError::IllegalTransition {
                        status: document.status,
                        action,
                    }));
                }
            };

            if action == Action::Return {
                // the revision cycle invalidates earlier sign-offs; every
                // stage re-approves from scratch after rework
                entries.retain(|e| e.action != Action::Approve);
            }

            if action == Action::Submit {
                if document.number.is_none() {
                    let number = sequence::mint_in_txn(tx, document.kind, document.payment_date)?;
                    document.number = Some(number);
                }
                document.submitted_at = Some(TimeStamp::new());
            }

            document.status = next;
            document.current_approver =
                ApproverDirectory::first_eligible_in(&roster, next).map(|a| a.id.clone());

            let signature = match action {
                Action::Approve => actor.signature.as_deref().map(SignatureSnapshot::capture),
                _ => None,
            };
            entries.push(AuditHistoryEntry::new(
                document.id.clone(),
                action,
                &actor,
                comments,
                signature,
            ));

            tx.insert(doc_key.as_bytes(), encode_document(&document).map_err(Abort)?)?;
            tx.insert(
                hist_key.as_bytes(),
                crate::history::encode_log(&entries).map_err(Abort)?,
            )?;

            Ok(document)
        });

        let document = match result {
            Ok(document) => document,
            Err(err) => {
                let err = WorkflowError::from(err);
                if matches!(err, WorkflowError::UnauthorizedActor(_)) {
                    log::warn!(
                        "actor {} denied '{action}' on document {document_id}: {err}",
                        actor.id
                    );
                }
                return Err(err);
            }
        };

        log::info!(
            "{} {} {action} by {} -> '{}'",
            document.kind,
            document.number.as_deref().unwrap_or(&document.id),
            actor.name,
            document.status,
        );

        if document.status.is_pending() && document.current_approver.is_none() {
            log::warn!(
                "document {} is orphaned: no eligible level-{} approver",
                document.id,
                document.status.required_level().unwrap_or(0),
            );
        }

        self.dispatcher.dispatch(NotificationEvent {
            document: document.clone(),
            action,
            actor_id: actor.id,
            comments: comments.to_string(),
        });

        Ok(document)
    }

    /// Record the General Manager's decision on whether the document must
    /// route through the Managing Director. Only the assigned level-4
    /// approver may set the flag, and only while the document awaits them.
    pub fn set_elevated_approval(
        &self,
        document_id: &str,
        actor_id: &str,
        required: bool,
    ) -> Result<Document, WorkflowError> {
        let actor = self.actor(actor_id)?;
        let doc_key = document_key(document_id);

        let result: TransactionResult<Document, WorkflowError> = self.db.transaction(|tx| {
            use ConflictableTransactionError::Abort;

            let raw = tx.get(doc_key.as_bytes())?.ok_or_else(|| {
                Abort(WorkflowError::DocumentNotFound(document_id.to_string()))
            })?;
            let mut document = decode_document(raw.as_ref()).map_err(Abort)?;

            if document.status != Status::PendingL4 {
                return Err(Abort(WorkflowError::InvalidState(format!(
                    "elevated-approval routing can only be decided at '{}', document is '{}'",
                    Status::PendingL4,
                    document.status,
                ))));
            }
            if document.current_approver.as_deref() != Some(actor.id.as_str()) {
                return Err(Abort(WorkflowError::UnauthorizedActor(
                    "you are not the assigned approver for this document".to_string(),
                )));
            }

            document.requires_elevated_approval = required;
            tx.insert(doc_key.as_bytes(), encode_document(&document).map_err(Abort)?)?;
            Ok(document)
        });

        Ok(result?)
    }

    /// Documents stuck in a pending status with nobody assigned.
    pub fn orphaned_documents(&self) -> Result<Vec<Document>, WorkflowError> {
        let mut orphans = Vec::new();
        for item in self.db.scan_prefix(DOCUMENT_PREFIX) {
            let (_, raw) = item?;
            let document = decode_document(raw.as_ref())?;
            if document.status.is_pending() && document.current_approver.is_none() {
                orphans.push(document);
            }
        }
        Ok(orphans)
    }

    /// Reconciliation pass for an external scheduled job: backfill approvers
    /// on orphaned documents once eligible actors exist.
    pub fn reassign_orphans(&self) -> Result<ReassignReport, WorkflowError> {
        let mut report = ReassignReport::default();

        for document in self.orphaned_documents()? {
            let Some(approver) = self.directory.get_next_approver(document.status)? else {
                report.still_orphaned += 1;
                log::warn!(
                    "document {} still orphaned: no eligible level-{} approver",
                    document.id,
                    document.status.required_level().unwrap_or(0),
                );
                continue;
            };

            let doc_key = document_key(&document.id);
            let expected_status = document.status;
            let result: TransactionResult<bool, WorkflowError> = self.db.transaction(|tx| {
                use ConflictableTransactionError::Abort;

                let Some(raw) = tx.get(doc_key.as_bytes())? else {
                    return Ok(false);
                };
                let mut current = decode_document(raw.as_ref()).map_err(Abort)?;
                // another writer may have moved the document since the scan
                if current.status != expected_status || current.current_approver.is_some() {
                    return Ok(false);
                }
                current.current_approver = Some(approver.id.clone());
                tx.insert(doc_key.as_bytes(), encode_document(&current).map_err(Abort)?)?;
                Ok(true)
            });

            if result? {
                report.reassigned += 1;
                log::info!(
                    "document {} reassigned to {} at '{}'",
                    document.id,
                    approver.name,
                    document.status,
                );
            }
        }

        Ok(report)
    }
}
