//! Sequential document numbering scoped by kind and calendar month
//!
//! Numbers take the form `YYMM-NNNN`. The prefix comes from the payment
//! date, so a document dated for a past or future month draws from that
//! month's sequence, not the current one. Each (kind, month) pair owns an
//! independent counter, which means a voucher and a form may legitimately
//! carry the same numeric suffix in the same month.

use crate::document::{DocumentKind, PaymentDate};
use crate::error::WorkflowError;
use crate::utils::SEQUENCE_PREFIX;
use sled::IVec;
use sled::transaction::{TransactionalTree, UnabortableTransactionError};
use std::sync::Arc;

// CAS attempts before a mint is reported as contended
const MAX_MINT_RETRIES: usize = 8;

pub struct SequenceGenerator {
    db: Arc<sled::Db>,
}

impl SequenceGenerator {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    /// Mint the next number for a (kind, month) pair, e.g. `2601-0001`.
    ///
    /// The counter is advanced with compare-and-swap so two simultaneous
    /// mints never observe the same value; a lost race re-reads and retries.
    /// Retry exhaustion surfaces as [`WorkflowError::SequenceContention`].
    pub fn generate_number(
        &self,
        kind: DocumentKind,
        reference_date: PaymentDate,
    ) -> Result<String, WorkflowError> {
        let prefix = reference_date.month_code();
        let key = sequence_key(kind, &prefix);

        for _ in 0..MAX_MINT_RETRIES {
            let current = self.db.get(key.as_bytes())?;
            let next = decode_counter(current.as_ref()) + 1;
            let swapped = self.db.compare_and_swap(
                key.as_bytes(),
                current.as_ref().map(|v| v.as_ref()),
                Some(&next.to_be_bytes()[..]),
            )?;
            if swapped.is_ok() {
                return Ok(format_number(&prefix, next));
            }
        }
        Err(WorkflowError::SequenceContention { key })
    }
}

/// Counter bump inside a store transaction: the number only exists if the
/// surrounding transaction commits, so a failed transition cannot burn a
/// number and leave a gap in the month's sequence.
pub(crate) fn mint_in_txn(
    tx: &TransactionalTree,
    kind: DocumentKind,
    reference_date: PaymentDate,
) -> Result<String, UnabortableTransactionError> {
    let prefix = reference_date.month_code();
    let key = sequence_key(kind, &prefix);

    let next = decode_counter(tx.get(key.as_bytes())?.as_ref()) + 1;
    tx.insert(key.as_bytes(), &next.to_be_bytes()[..])?;

    Ok(format_number(&prefix, next))
}

fn sequence_key(kind: DocumentKind, prefix: &str) -> String {
    format!("{SEQUENCE_PREFIX}{}/{prefix}", kind.key_tag())
}

fn format_number(prefix: &str, suffix: u32) -> String {
    format!("{prefix}-{suffix:04}")
}

fn decode_counter(raw: Option<&IVec>) -> u32 {
    raw.and_then(|v| <[u8; 4]>::try_from(v.as_ref()).ok())
        .map(u32::from_be_bytes)
        .unwrap_or(0)
}
