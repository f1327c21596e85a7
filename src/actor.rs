//! Actors: creators and approvers with role levels and signature artifacts
use crate::document::TimeStamp;
use crate::error::WorkflowError;
use crate::utils::new_uuid_to_bech32;
use chrono::Utc;

/// A user who creates documents or acts on them. Role levels 2-5 map onto
/// the approval chain; level 1 is the originating officer tier.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    #[n(0)]
    pub id: String, // bech32-encoded uuid7
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub role_level: Option<u8>,
    #[n(3)]
    pub is_active: bool,
    #[n(4)]
    pub contact_verified: bool,
    #[n(5)]
    pub is_approved: bool,
    #[cbor(n(6), with = "minicbor::bytes")]
    pub signature: Option<Vec<u8>>,
    #[n(7)]
    pub created_at: TimeStamp<Utc>, // registration order drives approver selection
}

impl Actor {
    /// Construct a new actor with a fresh id. Contact verification and
    /// administrative approval start out false.
    pub fn new(name: &str) -> anyhow::Result<Self> {
        Ok(Self {
            id: new_uuid_to_bech32("user_")?,
            name: name.to_string(),
            role_level: None,
            is_active: true,
            contact_verified: false,
            is_approved: false,
            signature: None,
            created_at: TimeStamp::new(),
        })
    }
    pub fn with_role_level(mut self, level: u8) -> Self {
        self.role_level = Some(level);
        self
    }
    pub fn verified(mut self) -> Self {
        self.contact_verified = true;
        self
    }
    pub fn approved(mut self) -> Self {
        self.is_approved = true;
        self
    }
    pub fn with_signature(mut self, bytes: Vec<u8>) -> Self {
        self.signature = Some(bytes);
        self
    }
    pub fn has_role_level(&self, level: u8) -> bool {
        self.role_level == Some(level)
    }
    /// An actor may be assigned documents only when active, contact-verified
    /// and approved by an administrator.
    pub fn is_eligible_approver(&self) -> bool {
        self.is_active && self.contact_verified && self.is_approved && self.role_level.is_some()
    }
}

pub(crate) fn encode_actor(actor: &Actor) -> Result<Vec<u8>, WorkflowError> {
    minicbor::to_vec(actor).map_err(|e| WorkflowError::Codec(e.to_string()))
}

pub(crate) fn decode_actor(raw: &[u8]) -> Result<Actor, WorkflowError> {
    minicbor::decode(raw).map_err(|e| WorkflowError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_encoding() {
        let original = Actor::new("Sokha Chan")
            .unwrap()
            .with_role_level(3)
            .verified()
            .approved()
            .with_signature(b"sig-bytes".to_vec());

        let encoding = encode_actor(&original).unwrap();
        let decode = decode_actor(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn eligibility_requires_all_flags() {
        let base = Actor::new("Dara Kim").unwrap().with_role_level(2);
        assert!(!base.is_eligible_approver());
        assert!(!base.clone().verified().is_eligible_approver());
        assert!(base.verified().approved().is_eligible_approver());
    }

    #[test]
    fn eligibility_requires_a_role() {
        let actor = Actor::new("Visal Seng").unwrap().verified().approved();
        assert!(!actor.is_eligible_approver());
        assert!(!actor.has_role_level(2));
    }
}
