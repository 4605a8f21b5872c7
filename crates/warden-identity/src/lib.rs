//! # warden-identity
//!
//! Agent identities for the Warden runtime. Each registered agent owns an
//! Ed25519 key pair and a trust score in `0..=100`. Trust starts at 100,
//! moves with the agent's track record, and an identity whose trust reaches
//! zero is revoked for good.
//!
//! The registry is the only holder of private keys. Callers see
//! [`PublicIdentity`](warden_contracts::identity::PublicIdentity) views and
//! hex-encoded signatures.

pub mod keys;
pub mod registry;

mod identity;
mod store;

pub use keys::KeyPair;
pub use registry::{IdentityRegistry, REASON_TRUST_ZERO, REVOKE_ACTION, VERIFY_ACTION};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use serde_json::json;
    use tempfile::tempdir;

    use warden_contracts::{
        audit::{EntryType, PendingEntry},
        error::{GovernanceError, GovernanceResult},
        identity::{Credentials, IdentityMetadata, IdentityStatus, VerificationMethod, VerificationReason},
    };
    use warden_core::{config::IdentityConfig, traits::AuditSink};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct CapturingAudit {
        entries: Mutex<Vec<PendingEntry>>,
    }

    impl CapturingAudit {
        fn actions(&self) -> Vec<String> {
            self.entries.lock().unwrap().iter().map(|e| e.action.clone()).collect()
        }
    }

    impl AuditSink for CapturingAudit {
        fn record(&self, entry: PendingEntry) -> GovernanceResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    fn meta(name: &str) -> IdentityMetadata {
        IdentityMetadata::new(name, "support", "ops-team")
    }

    fn registry() -> (IdentityRegistry, Arc<CapturingAudit>) {
        let audit = Arc::new(CapturingAudit::default());
        (IdentityRegistry::new(audit.clone()), audit)
    }

    fn signed(registry: &IdentityRegistry, agent: &str, message: &str) -> Credentials {
        Credentials {
            message: message.to_string(),
            signature: registry.sign_message(agent, message).unwrap(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    #[test]
    fn test_create_identity_starts_active_with_full_trust() {
        let (reg, audit) = registry();
        let id = reg.create_identity("agent-1", meta("Agent One").with_tags(["tier-1"])).unwrap();

        assert_eq!(id.status, IdentityStatus::Active);
        assert_eq!(id.trust_score, 100);
        assert_eq!(id.public_key.len(), 64);
        assert_eq!(id.metadata.tags, vec!["tier-1".to_string()]);
        assert!(audit.entries.lock().unwrap().is_empty(), "creation is not audited");
    }

    #[test]
    fn test_create_twice_is_identity_exists() {
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        match reg.create_identity("agent-1", meta("B")) {
            Err(GovernanceError::IdentityExists { agent_id }) => assert_eq!(agent_id, "agent-1"),
            other => panic!("expected IdentityExists, got {:?}", other),
        }
        assert_eq!(reg.public_identity("agent-1").unwrap().metadata.name, "A");
    }

    #[test]
    fn test_ensure_identity_is_idempotent() {
        let (reg, _) = registry();
        let first = reg.ensure_identity("agent-1", meta("A"));
        reg.decrement_trust_score("agent-1", 20, "test").unwrap();
        let second = reg.ensure_identity("agent-1", meta("other"));

        assert_eq!(first.public_key, second.public_key);
        assert_eq!(second.trust_score, 80);
        assert_eq!(second.metadata.name, "A");
    }

    #[test]
    fn test_list_identities_sorted() {
        let (reg, _) = registry();
        reg.create_identity("zeta", meta("Z")).unwrap();
        reg.create_identity("alpha", meta("A")).unwrap();
        let ids: Vec<String> = reg.list_identities().into_iter().map(|i| i.agent_id).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    // ── Verification ──────────────────────────────────────────────────────────

    #[test]
    fn test_verify_unknown_agent() {
        let (reg, audit) = registry();
        let check = reg.verify("ghost", None).unwrap();
        assert!(!check.verified);
        assert_eq!(check.reason, VerificationReason::NotFound);
        assert_eq!(check.trust_score, 0);

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, EntryType::IdentityVerification);
        assert_eq!(entries[0].decision["reason"], json!("not found"));
    }

    #[test]
    fn test_verify_active_identity() {
        let (reg, audit) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        let check = reg.verify("agent-1", None).unwrap();

        assert!(check.verified);
        assert_eq!(check.trust_score, 100);
        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries[0].action, VERIFY_ACTION);
        assert_eq!(entries[0].decision["verified"], json!(true));
        assert_eq!(entries[0].decision["method"], json!("registry"));
        assert_eq!(entries[0].decision["trustScore"], json!(100));
    }

    #[test]
    fn test_verify_trust_too_low() {
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.decrement_trust_score("agent-1", 51, "test").unwrap();

        let check = reg.verify("agent-1", None).unwrap();
        assert!(!check.verified);
        assert_eq!(check.reason, VerificationReason::TrustTooLow);
        assert_eq!(check.trust_score, 49);

        reg.increment_trust_score("agent-1", 1, "test").unwrap();
        assert!(reg.verify("agent-1", None).unwrap().verified, "50 meets the gate");
    }

    #[test]
    fn test_verify_revoked_reports_zero_trust() {
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.revoke_identity("agent-1", "compromised").unwrap();

        let check = reg.verify("agent-1", None).unwrap();
        assert!(!check.verified);
        assert_eq!(check.reason, VerificationReason::Revoked);
        assert_eq!(check.trust_score, 0);
    }

    #[test]
    fn test_valid_signature_verifies() {
        let (reg, audit) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        let creds = signed(&reg, "agent-1", "nonce-42");

        let check = reg.verify("agent-1", Some(&creds)).unwrap();
        assert!(check.verified);
        assert_eq!(reg.trust_score("agent-1"), Some(100));
        assert_eq!(audit.entries.lock().unwrap()[0].decision["method"], json!("signature"));
    }

    /// A bad signature costs the configured penalty and is recorded in history.
    #[test]
    fn test_invalid_signature_costs_trust() {
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        let mut creds = signed(&reg, "agent-1", "nonce-42");
        creds.message = "nonce-43".into();

        let check = reg.verify("agent-1", Some(&creds)).unwrap();
        assert!(!check.verified);
        assert_eq!(check.reason, VerificationReason::InvalidSignature);
        assert_eq!(check.trust_score, 90);
        assert_eq!(reg.trust_score("agent-1"), Some(90));

        let history = reg.verification_history("agent-1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].method, VerificationMethod::Signature);
        assert!(!history[0].success);
    }

    #[test]
    fn test_signature_from_another_agent_is_rejected() {
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.create_identity("agent-2", meta("B")).unwrap();
        let creds = signed(&reg, "agent-2", "hello");

        let check = reg.verify("agent-1", Some(&creds)).unwrap();
        assert_eq!(check.reason, VerificationReason::InvalidSignature);
        assert!(reg.verify_signature("agent-2", "hello", &creds.signature).unwrap());
        assert!(!reg.verify_signature("agent-1", "hello", &creds.signature).unwrap());
    }

    /// Repeated bad signatures drive trust to zero and revoke the identity.
    #[test]
    fn test_signature_failures_end_in_revocation() {
        let (reg, audit) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        let bad = Credentials { message: "m".into(), signature: "00".repeat(64) };

        for _ in 0..10 {
            reg.verify("agent-1", Some(&bad)).unwrap();
        }
        assert_eq!(reg.status("agent-1"), Some(IdentityStatus::Revoked));
        assert_eq!(reg.trust_score("agent-1"), Some(0));

        let actions = audit.actions();
        assert_eq!(actions.len(), 11, "ten verify entries plus one revocation");
        assert_eq!(actions.last().map(String::as_str), Some(REVOKE_ACTION));
    }

    #[test]
    fn test_exactly_one_verify_entry_per_call() {
        let (reg, audit) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.verify("agent-1", None).unwrap();
        reg.verify("ghost", None).unwrap();
        reg.verify("agent-1", Some(&signed(&reg, "agent-1", "x"))).unwrap();
        assert_eq!(audit.actions(), vec![VERIFY_ACTION; 3]);
    }

    #[test]
    fn test_history_is_capped() {
        let audit = Arc::new(CapturingAudit::default());
        let config = IdentityConfig { history_limit: 4, ..IdentityConfig::default() };
        let reg = IdentityRegistry::with_config(audit, config);
        reg.create_identity("agent-1", meta("A")).unwrap();

        for _ in 0..10 {
            reg.verify("agent-1", None).unwrap();
        }
        assert_eq!(reg.verification_history("agent-1").unwrap().len(), 4);
    }

    // ── Trust ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_trust_is_clamped() {
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        assert_eq!(reg.increment_trust_score("agent-1", 10, "bonus").unwrap(), 100);
        assert_eq!(reg.decrement_trust_score("agent-1", 30, "failure").unwrap(), 70);
        assert_eq!(reg.increment_trust_score("agent-1", 5, "success").unwrap(), 75);
    }

    #[test]
    fn test_trust_on_unknown_agent_is_not_found() {
        let (reg, _) = registry();
        assert!(matches!(
            reg.increment_trust_score("ghost", 1, "x"),
            Err(GovernanceError::IdentityNotFound { .. })
        ));
        assert!(matches!(
            reg.decrement_trust_score("ghost", 1, "x"),
            Err(GovernanceError::IdentityNotFound { .. })
        ));
    }

    /// Reaching zero revokes, emits one revocation entry, and is terminal.
    #[test]
    fn test_decrement_to_zero_revokes() {
        let (reg, audit) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        assert_eq!(reg.decrement_trust_score("agent-1", 200, "disaster").unwrap(), 0);
        assert_eq!(reg.status("agent-1"), Some(IdentityStatus::Revoked));

        {
            let entries = audit.entries.lock().unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].action, REVOKE_ACTION);
            assert_eq!(entries[0].decision["status"], json!("revoked"));
            assert_eq!(entries[0].decision["reason"], json!(format!("revoked: {REASON_TRUST_ZERO}")));
        }

        reg.decrement_trust_score("agent-1", 5, "again").unwrap();
        reg.increment_trust_score("agent-1", 100, "redemption").unwrap();
        assert_eq!(reg.status("agent-1"), Some(IdentityStatus::Revoked));
        assert_eq!(audit.entries.lock().unwrap().len(), 1, "no second revocation entry");
    }

    #[test]
    fn test_manual_revoke_is_audited_once() {
        let (reg, audit) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.revoke_identity("agent-1", "key leaked").unwrap();
        reg.revoke_identity("agent-1", "key leaked").unwrap();

        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision["reason"], json!("revoked: key leaked"));
        assert_eq!(entries[0].decision["trustScore"], json!(100));
    }

    #[test]
    fn test_revoke_unknown_agent_is_not_found() {
        let (reg, _) = registry();
        match reg.revoke_identity("ghost", "x") {
            Err(GovernanceError::IdentityNotFound { agent_id }) => assert_eq!(agent_id, "ghost"),
            other => panic!("expected IdentityNotFound, got {:?}", other),
        }
    }

    /// Concurrent adjustments never lose an update.
    #[test]
    fn test_concurrent_decrements_are_exact() {
        let (reg, _) = registry();
        let reg = Arc::new(reg);
        reg.create_identity("agent-1", meta("A")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for _ in 0..5 {
                        reg.decrement_trust_score("agent-1", 1, "load").unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.trust_score("agent-1"), Some(60));
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_rotate_keypair_archives_old_key() {
        let (reg, _) = registry();
        let before = reg.create_identity("agent-1", meta("A")).unwrap();
        reg.decrement_trust_score("agent-1", 10, "x").unwrap();
        let old_sig = reg.sign_message("agent-1", "msg").unwrap();

        let after = reg.rotate_keypair("agent-1").unwrap();
        assert_ne!(after.public_key, before.public_key);
        assert_eq!(after.trust_score, 90);

        let archived = reg.archived_keys("agent-1").unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].public_key, before.public_key);

        assert!(!reg.verify_signature("agent-1", "msg", &old_sig).unwrap());
        let new_sig = reg.sign_message("agent-1", "msg").unwrap();
        assert!(reg.verify_signature("agent-1", "msg", &new_sig).unwrap());
    }

    #[test]
    fn test_sign_unknown_agent_is_not_found() {
        let (reg, _) = registry();
        assert!(matches!(reg.sign_message("ghost", "m"), Err(GovernanceError::IdentityNotFound { .. })));
        assert!(matches!(
            reg.verify_signature("ghost", "m", "00"),
            Err(GovernanceError::IdentityNotFound { .. })
        ));
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    #[test]
    fn test_store_round_trip() {
        let dir = tempdir().unwrap();
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.create_identity("agent-2", meta("B")).unwrap();
        reg.decrement_trust_score("agent-1", 15, "x").unwrap();
        reg.verify("agent-1", None).unwrap();
        reg.rotate_keypair("agent-2").unwrap();
        reg.revoke_identity("agent-2", "retired").unwrap();
        let sig = reg.sign_message("agent-1", "persisted").unwrap();
        reg.save_to_dir(dir.path()).unwrap();

        let restored = IdentityRegistry::load_from_dir(
            dir.path(),
            Arc::new(CapturingAudit::default()),
            IdentityConfig::default(),
        )
        .unwrap();

        assert_eq!(restored.list_identities(), reg.list_identities());
        assert_eq!(restored.trust_score("agent-1"), Some(85));
        assert_eq!(restored.status("agent-2"), Some(IdentityStatus::Revoked));
        assert_eq!(restored.verification_history("agent-1").unwrap().len(), 1);
        assert_eq!(restored.archived_keys("agent-2").unwrap().len(), 1);
        assert!(restored.verify_signature("agent-1", "persisted", &sig).unwrap());
    }

    #[test]
    fn test_from_config_without_store_starts_empty() {
        let dir = tempdir().unwrap();
        let config = IdentityConfig {
            store_directory: Some(dir.path().join("not-yet")),
            ..IdentityConfig::default()
        };
        let reg = IdentityRegistry::from_config(&config, Arc::new(CapturingAudit::default())).unwrap();
        assert!(reg.list_identities().is_empty());

        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.persist().unwrap();
        let reloaded = IdentityRegistry::from_config(&config, Arc::new(CapturingAudit::default())).unwrap();
        assert_eq!(reloaded.list_identities().len(), 1);
    }

    #[test]
    fn test_load_caps_history_at_configured_limit() {
        let dir = tempdir().unwrap();
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        for _ in 0..6 {
            reg.verify("agent-1", None).unwrap();
        }
        reg.save_to_dir(dir.path()).unwrap();
        let saved = reg.verification_history("agent-1").unwrap();
        assert_eq!(saved.len(), 6);

        let config = IdentityConfig { history_limit: 4, ..IdentityConfig::default() };
        let restored =
            IdentityRegistry::load_from_dir(dir.path(), Arc::new(CapturingAudit::default()), config).unwrap();

        let history = restored.verification_history("agent-1").unwrap();
        assert_eq!(history.len(), 4);
        let newest: Vec<_> = saved[2..].iter().map(|r| r.timestamp).collect();
        assert_eq!(history.iter().map(|r| r.timestamp).collect::<Vec<_>>(), newest);

        restored.verify("agent-1", None).unwrap();
        assert_eq!(restored.verification_history("agent-1").unwrap().len(), 4);
    }

    #[test]
    fn test_tampered_public_key_is_crypto_error() {
        let dir = tempdir().unwrap();
        let (reg, _) = registry();
        reg.create_identity("agent-1", meta("A")).unwrap();
        reg.save_to_dir(dir.path()).unwrap();

        let path = dir.path().join("agent-1.identity.json");
        let mut record: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        record["publicKey"] = json!(KeyPair::generate().public_key_hex());
        fs::write(&path, record.to_string()).unwrap();

        let result = IdentityRegistry::load_from_dir(
            dir.path(),
            Arc::new(CapturingAudit::default()),
            IdentityConfig::default(),
        );
        assert!(matches!(result, Err(GovernanceError::CryptoError { .. })));
    }

    #[test]
    fn test_malformed_record_is_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.identity.json"), "{ not json").unwrap();
        let result = IdentityRegistry::load_from_dir(
            dir.path(),
            Arc::new(CapturingAudit::default()),
            IdentityConfig::default(),
        );
        assert!(matches!(result, Err(GovernanceError::ConfigError { .. })));
    }
}
