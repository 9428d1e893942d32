//! Deterministic one-way anonymization of actor identifiers.
//!
//! The same raw input always maps to the same pseudonym, so anonymized
//! events still group by user for the detector's historical queries, but
//! the original value cannot be recovered.

use sha2::{Digest, Sha256};

use crate::event::ActorContext;

/// Domain-separation context. Changing this invalidates all existing
/// pseudonyms, so treat it as part of the stored-data format.
const CONTEXT: &str = "audit-sentinel/anonymize/v1";

/// Hex characters of digest kept in the pseudonym.
const DIGEST_CHARS: usize = 16;

/// Map a raw identifier to its stable pseudonym, e.g. `anon-1f8a...`.
pub fn anonymize(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CONTEXT.as_bytes());
    hasher.update([0u8]);
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(5 + DIGEST_CHARS);
    out.push_str("anon-");
    for byte in digest.iter().take(DIGEST_CHARS / 2) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Anonymize the identifying fields of an actor context in place. Applied
/// to the enrichment copy only; callers' originals are never touched.
pub fn anonymize_actor(actor: &mut ActorContext) {
    if let Some(user_id) = actor.user_id.take() {
        actor.user_id = Some(anonymize(&user_id));
    }
    if let Some(ip) = actor.ip_address.take() {
        actor.ip_address = Some(anonymize(&ip));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymization_is_deterministic() {
        assert_eq!(anonymize("alice"), anonymize("alice"));
        assert_eq!(anonymize("10.0.0.1"), anonymize("10.0.0.1"));
    }

    #[test]
    fn pseudonym_never_equals_raw_value() {
        for raw in ["alice", "10.0.0.1", "", "anon-"] {
            assert_ne!(anonymize(raw), raw);
        }
    }

    #[test]
    fn distinct_inputs_yield_distinct_pseudonyms() {
        assert_ne!(anonymize("alice"), anonymize("bob"));
        assert_ne!(anonymize("10.0.0.1"), anonymize("10.0.0.2"));
    }

    #[test]
    fn actor_fields_replaced_in_place() {
        let mut actor = ActorContext {
            user_id: Some("alice".to_string()),
            session_id: Some("sess-1".to_string()),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8".to_string()),
        };
        anonymize_actor(&mut actor);

        assert_eq!(actor.user_id.as_deref(), Some(anonymize("alice").as_str()));
        assert_eq!(
            actor.ip_address.as_deref(),
            Some(anonymize("10.0.0.1").as_str())
        );
        // Non-identifying fields pass through.
        assert_eq!(actor.session_id.as_deref(), Some("sess-1"));
        assert_eq!(actor.user_agent.as_deref(), Some("curl/8"));
    }
}
