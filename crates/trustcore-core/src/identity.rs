// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Identity store (C2): Linked Context Tokens.
//!
//! ```text
//!   create ──► active ──revoke──► revoked (terminal)
//!               │   ▲
//!               │   └── witness(multiple)   (no state change)
//!               └── (if delegated) parent-revoke ─► revoked (cascade)
//! ```
//!
//! A delegated LCT's expiry never exceeds its parent's; hardware binding is
//! append-only; revoking a parent cascades to every descendant before the
//! call returns.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::crypto::{self, CryptoError, Keypair};
use crate::storage::{IdentityStorage, StorageError};
use crate::types::{
    ChainResult, DelegationInfo, HardwareBinding, HardwareBindingKind, Lct, LctFilter, LctType,
    RevocationState, VerifyResult, WitnessRecord,
};

/// Failure taxonomy for identity store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Referenced LCT id does not exist.
    NotFound,
    /// A hardware binding already exists; bindings are append-only.
    AlreadyBound,
    /// The LCT is already revoked; revocation is not idempotent as an
    /// operation (though the resulting state is), so a second call errors.
    AlreadyRevoked,
    /// Signature does not verify against the stored public key.
    InvalidSignature,
    /// The LCT's `expires_at_ms` has passed.
    Expired,
    /// An ancestor in the delegation chain failed to verify.
    ParentInvalid,
    /// Requested delegation scope exceeds the parent's authorized scope.
    ScopeExceeded,
    /// Caller-supplied argument was empty, malformed, or out of range.
    InvalidInput,
    /// A crypto primitive failed.
    Crypto(CryptoError),
    /// The storage backend failed to read or write.
    Storage(StorageError),
}

impl core::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IdentityError::NotFound => write!(f, "lct not found"),
            IdentityError::AlreadyBound => write!(f, "hardware binding already set"),
            IdentityError::AlreadyRevoked => write!(f, "lct already revoked"),
            IdentityError::InvalidSignature => write!(f, "signature does not verify"),
            IdentityError::Expired => write!(f, "lct expired"),
            IdentityError::ParentInvalid => write!(f, "delegation ancestor invalid"),
            IdentityError::ScopeExceeded => write!(f, "delegation scope exceeds parent scope"),
            IdentityError::InvalidInput => write!(f, "invalid input"),
            IdentityError::Crypto(inner) => write!(f, "crypto error: {}", inner),
            IdentityError::Storage(inner) => write!(f, "{}", inner),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for IdentityError {}

impl From<StorageError> for IdentityError {
    fn from(error: StorageError) -> Self {
        IdentityError::Storage(error)
    }
}

/// Fold a storage read error into an empty/default result rather than
/// aborting a best-effort query or report. Genuine storage failures on
/// these paths surface the same way a missing record would: the caller
/// sees "nothing here," not a panic.
fn degrade<T: Default>(result: Result<T, StorageError>) -> T {
    result.unwrap_or_default()
}

/// A payload-only view of an [`Lct`], used as the byte string signed by the
/// issuer and re-verified on every [`IdentityStore::verify`] call. Kept
/// separate from [`Lct`] itself so the signature field is never accidentally
/// folded into the bytes it covers.
#[derive(serde::Serialize)]
struct LctPayload<'a> {
    uri: &'a str,
    lct_type: LctType,
    subject: &'a str,
    issuer: &'a str,
    public_key: [u8; 32],
    issued_at_ms: u64,
    expires_at_ms: Option<u64>,
    delegation: &'a Option<DelegationInfo>,
}

fn payload_bytes(lct: &Lct) -> Result<Vec<u8>, IdentityError> {
    let payload = LctPayload {
        uri: &lct.uri,
        lct_type: lct.lct_type,
        subject: &lct.subject,
        issuer: &lct.issuer,
        public_key: lct.public_key,
        issued_at_ms: lct.issued_at_ms,
        expires_at_ms: lct.expires_at_ms,
        delegation: &lct.delegation,
    };
    crypto::canonical_encode(&payload).map_err(IdentityError::Crypto)
}

/// Manager for Linked Context Tokens, generic over any [`IdentityStorage`]
/// backend.
pub struct IdentityStore<S: IdentityStorage> {
    storage: S,
}

impl<S: IdentityStorage> IdentityStore<S> {
    /// Construct a new [`IdentityStore`] over `storage`.
    pub fn new(storage: S) -> Self {
        IdentityStore { storage }
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mint a new LCT.
    ///
    /// Generates a keypair, assembles the payload, signs it with the new
    /// key (self-issued for roots; for delegated tokens the caller should
    /// prefer [`IdentityStore::delegate`], which signs with the parent's
    /// key), and stores it.
    pub fn create(
        &mut self,
        lct_type: LctType,
        subject: &str,
        issuer: &str,
        expires_in_ms: Option<u64>,
        now_ms: u64,
    ) -> Result<(Lct, [u8; 32]), IdentityError> {
        if subject.is_empty() {
            return Err(IdentityError::InvalidInput);
        }
        if let Some(duration) = expires_in_ms {
            if duration == 0 {
                return Err(IdentityError::InvalidInput);
            }
        }

        let Keypair { public, private } = crypto::generate_keypair();
        let id = crypto::hex_encode(&crypto::content_hash(
            format!("{}{}{}{}", subject, issuer, now_ms, public.len()).as_bytes(),
        ));
        let uri = format!("lct://core:{}:{}@trustcore", id, subject);

        let mut lct = Lct {
            id: id.clone(),
            uri,
            lct_type,
            subject: subject.into(),
            issuer: issuer.into(),
            public_key: public,
            issued_at_ms: now_ms,
            expires_at_ms: expires_in_ms.map(|d| now_ms + d),
            delegation: None,
            hardware_binding: None,
            revocation: RevocationState::default(),
            signature: [0u8; 64],
        };

        let bytes = payload_bytes(&lct)?;
        lct.signature = crypto::sign(&bytes, &private).map_err(IdentityError::Crypto)?;

        self.storage.set_lct(&id, lct.clone())?;
        Ok((lct, private))
    }

    /// Verify an LCT: existence, non-revocation, non-expiry, signature, and
    /// (if delegated) recursive parent validity. Cost is `O(depth)`.
    ///
    /// A storage failure degrades to the same `not_found` error an absent
    /// record would produce; this method has no `Result` in its signature
    /// so a read hiccup cannot abort a verification chain partway through.
    pub fn verify(&self, lct_id: &str, now_ms: u64) -> VerifyResult {
        #[cfg(feature = "std")]
        let span = tracing::info_span!("lct_verify", lct_id = %lct_id, latency_ms = tracing::field::Empty);
        #[cfg(feature = "std")]
        let _guard = span.enter();
        #[cfg(feature = "std")]
        let start = std::time::Instant::now();

        let result = self.verify_inner(lct_id, now_ms);

        #[cfg(feature = "std")]
        {
            let elapsed = start.elapsed().as_millis() as u64;
            span.record("latency_ms", elapsed);
            if result.valid {
                tracing::debug!("lct verified");
            } else {
                tracing::debug!(errors = ?result.errors, "lct verification failed");
            }
        }

        result
    }

    fn verify_inner(&self, lct_id: &str, now_ms: u64) -> VerifyResult {
        let mut errors = Vec::new();

        let lct = match self.storage.get_lct(lct_id) {
            Ok(Some(lct)) => lct,
            Ok(None) | Err(_) => {
                errors.push("not_found".to_string());
                return VerifyResult { valid: false, errors };
            }
        };

        if lct.revocation.revoked {
            errors.push("revoked".to_string());
        }
        if let Some(expires_at) = lct.expires_at_ms {
            if now_ms >= expires_at {
                errors.push("expired".to_string());
            }
        }
        match payload_bytes(&lct) {
            Ok(bytes) => {
                if crypto::verify(&bytes, &lct.signature, &lct.public_key).is_err() {
                    errors.push("invalid_signature".to_string());
                }
            }
            Err(_) => errors.push("invalid_signature".to_string()),
        }
        if let Some(ref delegation) = lct.delegation {
            let parent_result = self.verify(&delegation.parent_id, now_ms);
            if !parent_result.valid {
                errors.push("parent_invalid".to_string());
            }
        }

        VerifyResult { valid: errors.is_empty(), errors }
    }

    /// Bind a hardware attestation to `lct_id`. Fails with `AlreadyBound`
    /// if a binding already exists. Does not re-sign the LCT body — the
    /// binding is a side-band attestation, not part of the signed payload.
    pub fn bind(
        &mut self,
        lct_id: &str,
        kind: HardwareBindingKind,
        device_id: &str,
        attestation: Option<Vec<u8>>,
        now_ms: u64,
    ) -> Result<(), IdentityError> {
        let mut lct = self.storage.get_lct(lct_id)?.ok_or(IdentityError::NotFound)?;
        if lct.hardware_binding.is_some() {
            return Err(IdentityError::AlreadyBound);
        }
        lct.hardware_binding = Some(HardwareBinding {
            kind,
            device_id: device_id.into(),
            attestation,
            bound_at_ms: now_ms,
        });
        self.storage.set_lct(lct_id, lct)?;
        Ok(())
    }

    /// Revoke `lct_id`, cascading to every delegation descendant before
    /// returning. Idempotent at the state level; a second call on an
    /// already-revoked LCT errors with `AlreadyRevoked`.
    pub fn revoke(&mut self, lct_id: &str, reason: Option<&str>, now_ms: u64) -> Result<(), IdentityError> {
        let mut lct = self.storage.get_lct(lct_id)?.ok_or(IdentityError::NotFound)?;
        if lct.revocation.revoked {
            return Err(IdentityError::AlreadyRevoked);
        }
        lct.revocation = RevocationState {
            revoked: true,
            revoked_at_ms: Some(now_ms),
            reason: reason.map(|r| r.into()),
        };
        self.storage.set_lct(lct_id, lct)?;
        self.cascade_revoke(lct_id, now_ms)?;
        Ok(())
    }

    fn cascade_revoke(&mut self, parent_id: &str, now_ms: u64) -> Result<(), IdentityError> {
        let children = self.storage.children_of(parent_id)?;
        for child_id in children {
            if let Some(mut child) = self.storage.get_lct(&child_id)? {
                if !child.revocation.revoked {
                    child.revocation = RevocationState {
                        revoked: true,
                        revoked_at_ms: Some(now_ms),
                        reason: Some("Parent revoked".to_string()),
                    };
                    self.storage.set_lct(&child_id, child)?;
                    self.cascade_revoke(&child_id, now_ms)?;
                }
            }
        }
        Ok(())
    }

    /// Mint a new delegated LCT from `parent_id`.
    ///
    /// Preconditions: the parent verifies; `scope` is a subset of the
    /// parent's scope when the parent itself declares one (roots and
    /// non-delegated types declare no scope, so any scope is accepted from
    /// them); a requested expiry beyond the parent's is clamped.
    pub fn delegate(
        &mut self,
        parent_id: &str,
        subject: &str,
        scope: Vec<String>,
        constraints: Vec<(String, String)>,
        expires_in_ms: Option<u64>,
        now_ms: u64,
    ) -> Result<(Lct, [u8; 32]), IdentityError> {
        let parent = self.storage.get_lct(parent_id)?.ok_or(IdentityError::NotFound)?;
        let parent_verify = self.verify(parent_id, now_ms);
        if !parent_verify.valid {
            return Err(IdentityError::ParentInvalid);
        }
        if let Some(ref parent_delegation) = parent.delegation {
            if !scope.iter().all(|s| parent_delegation.scope.contains(s)) {
                return Err(IdentityError::ScopeExceeded);
            }
        }

        let requested_expiry = expires_in_ms.map(|d| now_ms + d);
        let clamped_expiry = match (requested_expiry, parent.expires_at_ms) {
            (Some(requested), Some(parent_expiry)) => Some(requested.min(parent_expiry)),
            (Some(requested), None) => Some(requested),
            (None, parent_expiry) => parent_expiry,
        };

        let Keypair { public, private } = crypto::generate_keypair();
        let id = crypto::hex_encode(&crypto::content_hash(
            format!("{}{}{}", parent_id, subject, now_ms).as_bytes(),
        ));
        let uri = format!("lct://core:{}:{}@trustcore", id, subject);

        let mut child = Lct {
            id: id.clone(),
            uri,
            lct_type: LctType::Delegated,
            subject: subject.into(),
            issuer: parent_id.into(),
            public_key: public,
            issued_at_ms: now_ms,
            expires_at_ms: clamped_expiry,
            delegation: Some(DelegationInfo {
                parent_id: parent_id.into(),
                scope,
                constraints,
                delegated_at_ms: now_ms,
            }),
            hardware_binding: None,
            revocation: RevocationState::default(),
            signature: [0u8; 64],
        };

        let bytes = payload_bytes(&child)?;
        child.signature = crypto::sign(&bytes, &private).map_err(IdentityError::Crypto)?;

        self.storage.set_lct(&id, child.clone())?;
        Ok((child, private))
    }

    /// Record a witness attestation: `witness_id` signs a statement about
    /// `subject_id`'s `action`. Both LCTs must verify first.
    pub fn witness(
        &mut self,
        subject_id: &str,
        witness_id: &str,
        action: &str,
        metadata: Vec<(String, String)>,
        witness_private_key: &[u8; 32],
        now_ms: u64,
    ) -> Result<WitnessRecord, IdentityError> {
        if !self.verify(subject_id, now_ms).valid {
            return Err(IdentityError::ParentInvalid);
        }
        if !self.verify(witness_id, now_ms).valid {
            return Err(IdentityError::ParentInvalid);
        }

        let witness_lct = self.storage.get_lct(witness_id)?.ok_or(IdentityError::NotFound)?;
        let id = crypto::hex_encode(&crypto::content_hash(
            format!("{}{}{}{}", subject_id, witness_id, action, now_ms).as_bytes(),
        ));

        #[derive(serde::Serialize)]
        struct WitnessPayload<'a> {
            subject_lct: &'a str,
            witness_lct: &'a str,
            action: &'a str,
            timestamp_ms: u64,
            metadata: &'a [(String, String)],
        }
        let payload = WitnessPayload {
            subject_lct: subject_id,
            witness_lct: witness_id,
            action,
            timestamp_ms: now_ms,
            metadata: &metadata,
        };
        let bytes = crypto::canonical_encode(&payload).map_err(IdentityError::Crypto)?;
        let signature = crypto::sign(&bytes, witness_private_key).map_err(IdentityError::Crypto)?;

        // witness_lct's public key is not cross-checked against the caller's
        // private key here — that is the caller's responsibility, mirroring
        // the rest of this store's "caller holds the private key" contract.
        let _ = &witness_lct;

        let record = WitnessRecord {
            id,
            subject_lct: subject_id.into(),
            witness_lct: witness_id.into(),
            action: action.into(),
            timestamp_ms: now_ms,
            metadata,
            signature,
        };
        self.storage.append_witness(subject_id, record.clone())?;
        Ok(record)
    }

    /// Return the witness sequence and delegation ancestry for `lct_id`.
    /// The delegation chain walks parents until a root is reached; a cycle
    /// mid-walk is broken defensively even though `delegate` refuses to
    /// create one. A storage failure degrades to an empty witness sequence
    /// or a chain truncated at the point of the failed read.
    pub fn chain(&self, lct_id: &str, limit: Option<usize>) -> ChainResult {
        let mut witnesses = degrade(self.storage.witnesses_of(lct_id));
        if let Some(limit) = limit {
            witnesses.truncate(limit);
        }

        let mut delegation_chain = Vec::new();
        let mut seen = hashbrown::HashSet::new();
        let mut current = self.storage.get_lct(lct_id).ok().flatten().and_then(|lct| lct.delegation.map(|d| d.parent_id));
        while let Some(parent_id) = current {
            if !seen.insert(parent_id.clone()) {
                break;
            }
            delegation_chain.push(parent_id.clone());
            current = self.storage.get_lct(&parent_id).ok().flatten().and_then(|lct| lct.delegation.map(|d| d.parent_id));
        }

        ChainResult { witnesses, delegation_chain }
    }

    /// Return LCTs matching `filter`. A storage failure on any individual
    /// id is skipped rather than aborting the whole scan.
    pub fn query(&self, filter: &LctFilter) -> Vec<Lct> {
        degrade(self.storage.all_lct_ids())
            .into_iter()
            .filter_map(|id| self.storage.get_lct(&id).ok().flatten())
            .filter(|lct| {
                if let Some(ref substring) = filter.subject_contains {
                    if !lct.subject.contains(substring.as_str()) {
                        return false;
                    }
                }
                if let Some(lct_type) = filter.lct_type {
                    if lct.lct_type != lct_type {
                        return false;
                    }
                }
                if let Some(revoked) = filter.revoked {
                    if lct.revocation.revoked != revoked {
                        return false;
                    }
                }
                true
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn store() -> IdentityStore<InMemoryStorage> {
        IdentityStore::new(InMemoryStorage::new())
    }

    #[test]
    fn create_then_verify_succeeds() {
        let mut store = store();
        let (root, _priv) = store.create(LctType::Root, "alice", "alice", Some(30 * 86_400_000), 0).unwrap();
        assert!(store.verify(&root.id, 1_000).valid);
    }

    #[test]
    fn expired_lct_fails_verification() {
        let mut store = store();
        let (root, _priv) = store.create(LctType::Root, "alice", "alice", Some(1_000), 0).unwrap();
        let result = store.verify(&root.id, 2_000);
        assert!(!result.valid);
        assert!(result.errors.contains(&"expired".to_string()));
    }

    #[test]
    fn revoke_cascades_to_descendants() {
        let mut store = store();
        let (root, _) = store.create(LctType::Root, "alice", "alice", Some(30 * 86_400_000), 0).unwrap();
        let (d1, _) = store
            .delegate(&root.id, "alice-agent", alloc::vec!["read:code".to_string()], Vec::new(), None, 10)
            .unwrap();
        let (d2, _) = store
            .delegate(&d1.id, "alice-subagent", alloc::vec!["read:code".to_string()], Vec::new(), None, 20)
            .unwrap();

        store.revoke(&root.id, Some("compromise"), 30).unwrap();

        assert!(!store.verify(&root.id, 40).valid);
        assert!(!store.verify(&d1.id, 40).valid);
        assert!(!store.verify(&d2.id, 40).valid);
    }

    #[test]
    fn second_revoke_is_an_error() {
        let mut store = store();
        let (root, _) = store.create(LctType::Root, "alice", "alice", None, 0).unwrap();
        store.revoke(&root.id, None, 10).unwrap();
        assert_eq!(store.revoke(&root.id, None, 20), Err(IdentityError::AlreadyRevoked));
    }

    #[test]
    fn rebind_is_rejected() {
        let mut store = store();
        let (root, _) = store.create(LctType::Root, "alice", "alice", None, 0).unwrap();
        store.bind(&root.id, HardwareBindingKind::Tpm, "device-1", None, 10).unwrap();
        assert_eq!(
            store.bind(&root.id, HardwareBindingKind::Tpm, "device-2", None, 20),
            Err(IdentityError::AlreadyBound)
        );
    }

    #[test]
    fn delegated_expiry_clamps_to_parent() {
        let mut store = store();
        let (root, _) = store.create(LctType::Root, "alice", "alice", Some(1_000), 0).unwrap();
        let (child, _) = store
            .delegate(&root.id, "alice-agent", Vec::new(), Vec::new(), Some(10_000), 0)
            .unwrap();
        assert_eq!(child.expires_at_ms, Some(1_000));
    }
}
