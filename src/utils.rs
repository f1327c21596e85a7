//! Utility functions for identifier minting and the key layout of the store

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub(crate) const DOCUMENT_PREFIX: &str = "doc/";
pub(crate) const ACTOR_PREFIX: &str = "actor/";
pub(crate) const HISTORY_PREFIX: &str = "hist/";
pub(crate) const SEQUENCE_PREFIX: &str = "seq/";

pub(crate) fn document_key(id: &str) -> String {
    format!("{DOCUMENT_PREFIX}{id}")
}

pub(crate) fn actor_key(id: &str) -> String {
    format!("{ACTOR_PREFIX}{id}")
}

pub(crate) fn history_key(document_id: &str) -> String {
    format!("{HISTORY_PREFIX}{document_id}")
}
