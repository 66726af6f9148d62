//! One-shot cipher generation migration, run at store construction.
//!
//! Ordering is what makes this safe to interrupt at any point:
//!
//! 1. Probe the legacy key slot. Absent means migration already committed
//!    (or never applied); load or create the current key and stop.
//! 2. Obtain the target key: adopt the channel's key if an earlier
//!    interrupted run already committed one, else generate a fresh key and
//!    persist it before touching any entry.
//! 3. Re-encrypt every legacy entry under the namespace in place. Entries
//!    already at the current generation are skipped by marker. Entries that
//!    fail to decode or decrypt are recorded and left as they are.
//! 4. Erase the legacy key slot. Only this commits the migration; a crash
//!    anywhere before re-runs the whole sequence, which converges because
//!    every step is a no-op on already-migrated state.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroize;

use lockbox_crypto::{cipher, Generation, KeyMaterial};

use crate::blob::BlobStore;
use crate::error::StoreError;
use crate::key_store::KeyMaterialStore;

/// A per-entry migration failure: collected and reported, never fatal to
/// the run. The stored bytes are left untouched for offline inspection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("entry {key} failed migration: {reason}")]
pub struct MigrationError {
    /// Namespaced blob store key.
    pub key: String,
    pub reason: String,
}

/// What a migration run did, retained by the store for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    /// Entries re-encrypted from the legacy generation.
    pub migrated: usize,
    /// Entries found already at the current generation.
    pub already_current: usize,
    pub failures: Vec<MigrationError>,
}

/// Ensure key material and entries are at the current generation.
///
/// Returns the active key and, when a migration actually ran, its outcome.
/// Blob store failures abort; per-entry decode and crypto failures do not.
pub(crate) fn run(
    keys: &KeyMaterialStore,
    blobs: &dyn BlobStore,
    prefix: &str,
) -> Result<(KeyMaterial, Option<MigrationOutcome>), StoreError> {
    let Some(legacy_key) = keys.load_legacy_if_present()? else {
        return Ok((keys.load_or_create()?, None));
    };

    // The target key must be durable before any entry is rewritten, and a
    // re-run must adopt it rather than mint another.
    let target_key = match keys.load_current()? {
        Some(existing) => existing,
        None => {
            let fresh = KeyMaterial::generate(Generation::Current)?;
            keys.replace(&fresh)?;
            fresh
        }
    };

    let entry_prefix = format!("{}_", prefix);
    let mut outcome = MigrationOutcome::default();
    for (slot, stored) in keys_under_prefix(blobs, &entry_prefix)? {
        match reencrypt_entry(&legacy_key, &target_key, &stored) {
            Ok(Some(upgraded)) => {
                blobs.put(&slot, &upgraded)?;
                outcome.migrated += 1;
            }
            Ok(None) => outcome.already_current += 1,
            Err(e) => {
                warn!(key = %slot, error = %e, "leaving entry that failed migration");
                outcome.failures.push(MigrationError {
                    key: slot,
                    reason: e.to_string(),
                });
            }
        }
    }

    keys.remove_legacy()?;
    debug!(
        migrated = outcome.migrated,
        already_current = outcome.already_current,
        failed = outcome.failures.len(),
        "cipher generation migration committed"
    );
    Ok((target_key, Some(outcome)))
}

fn keys_under_prefix(
    blobs: &dyn BlobStore,
    entry_prefix: &str,
) -> Result<Vec<(String, String)>, StoreError> {
    let mut entries: Vec<(String, String)> = blobs
        .get_all()?
        .into_iter()
        .filter(|(slot, _)| slot.starts_with(entry_prefix))
        .collect();
    entries.sort();
    Ok(entries)
}

/// Upgrade one stored value. `Ok(None)` means it is already current.
/// Performs no I/O, so every error out of here is per-entry tolerable.
fn reencrypt_entry(
    legacy_key: &KeyMaterial,
    target_key: &KeyMaterial,
    stored: &str,
) -> Result<Option<String>, StoreError> {
    let blob = STANDARD.decode(stored.as_bytes())?;
    match Generation::classify(&blob)? {
        Generation::Current => Ok(None),
        Generation::Legacy => {
            let mut plaintext = cipher::decrypt(legacy_key, &blob)?;
            let upgraded = cipher::encrypt(target_key, &plaintext);
            plaintext.zeroize();
            Ok(Some(STANDARD.encode(&upgraded?)))
        }
    }
}
