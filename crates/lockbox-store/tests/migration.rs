//! End-to-end cipher generation migration through `SecureStore::open`.
//!
//! Fixtures reproduce an old installation by hand: legacy key material
//! base64-coded into its reserved blob store slot, entries encrypted with
//! the legacy scheme, nothing in the protected channel.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use lockbox_crypto::{cipher, Generation, KeyMaterial};
use lockbox_store::{
    BlobStore, BlobStoreChannel, MemoryBlobStore, MemoryKeyChannel, ProtectedKeyChannel,
    SecureStore, StoreConfig, DEFAULT_LEGACY_KEY_SLOT, DEFAULT_PREFIX,
};

// ============================================================================
// Fixtures
// ============================================================================

fn legacy_key() -> KeyMaterial {
    KeyMaterial::generate(Generation::Legacy).expect("generate legacy key")
}

/// Plant legacy key material in its blob store slot, as old installs did.
fn seed_legacy_key(blobs: &dyn BlobStore, key: &KeyMaterial) {
    blobs
        .put(DEFAULT_LEGACY_KEY_SLOT, &STANDARD.encode(&*key.encode()))
        .expect("seed legacy key");
}

/// Plant one legacy-encrypted entry under the default namespace.
fn seed_legacy_entry(blobs: &dyn BlobStore, key: &KeyMaterial, name: &str, value: &str) {
    let blob = cipher::encrypt(key, value.as_bytes()).expect("legacy encrypt");
    blobs
        .put(
            &format!("{DEFAULT_PREFIX}_{name}"),
            &STANDARD.encode(&blob),
        )
        .expect("seed entry");
}

fn stored_generation(blobs: &dyn BlobStore, name: &str) -> Generation {
    let stored = blobs
        .get(&format!("{DEFAULT_PREFIX}_{name}"))
        .expect("blob get")
        .expect("entry present");
    Generation::classify(&STANDARD.decode(stored.as_bytes()).expect("base64"))
        .expect("classify entry")
}

// ============================================================================
// Migration correctness
// ============================================================================

#[test]
fn migrates_all_legacy_entries_on_open() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let key = legacy_key();
    seed_legacy_key(&*blobs, &key);
    for (name, value) in [("user", "ada"), ("token", "abc123"), ("pin", "0000")] {
        seed_legacy_entry(&*blobs, &key, name, value);
    }

    let store =
        SecureStore::open(Arc::clone(&blobs), Arc::new(MemoryKeyChannel::new())).expect("open");

    // Everything readable, everything re-tagged, legacy slot gone
    for (name, value) in [("user", "ada"), ("token", "abc123"), ("pin", "0000")] {
        assert_eq!(store.get(name).expect("get").as_deref(), Some(value));
        assert_eq!(stored_generation(&*blobs, name), Generation::Current);
    }
    assert!(blobs
        .get(DEFAULT_LEGACY_KEY_SLOT)
        .expect("blob get")
        .is_none());

    let outcome = store.migration_outcome().expect("migration ran");
    assert_eq!(outcome.migrated, 3);
    assert_eq!(outcome.already_current, 0);
    assert!(outcome.failures.is_empty());
}

#[test]
fn deterministic_legacy_fixture_migrates() {
    // A fixed key, so the fixture bytes themselves are reproducible
    let raw = hex::decode("202122232425262728292a2b2c2d2e2f303132333435363738393a3b3c3d3e3f")
        .expect("hex");
    let key = KeyMaterial::from_bytes(Generation::Legacy, &raw).expect("key from bytes");

    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    seed_legacy_key(&*blobs, &key);
    seed_legacy_entry(&*blobs, &key, "k", "fixture value");

    let store =
        SecureStore::open(Arc::clone(&blobs), Arc::new(MemoryKeyChannel::new())).expect("open");
    assert_eq!(store.get("k").expect("get").as_deref(), Some("fixture value"));
}

#[test]
fn migration_with_no_entries_still_commits() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    seed_legacy_key(&*blobs, &legacy_key());

    let store =
        SecureStore::open(Arc::clone(&blobs), Arc::new(MemoryKeyChannel::new())).expect("open");

    let outcome = store.migration_outcome().expect("migration ran");
    assert_eq!(outcome.migrated, 0);
    assert_eq!(outcome.already_current, 0);
    assert!(outcome.failures.is_empty());
    assert!(blobs
        .get(DEFAULT_LEGACY_KEY_SLOT)
        .expect("blob get")
        .is_none());
}

#[test]
fn data_outside_namespace_is_untouched() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    seed_legacy_key(&*blobs, &legacy_key());
    blobs.put("foreign", "left alone").expect("blob put");

    SecureStore::open(Arc::clone(&blobs), Arc::new(MemoryKeyChannel::new())).expect("open");

    assert_eq!(
        blobs.get("foreign").expect("blob get").as_deref(),
        Some("left alone")
    );
}

// ============================================================================
// Partial failure tolerance
// ============================================================================

#[test]
fn corrupt_entry_does_not_block_the_rest() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let key = legacy_key();
    seed_legacy_key(&*blobs, &key);
    seed_legacy_entry(&*blobs, &key, "a", "1");
    seed_legacy_entry(&*blobs, &key, "b", "2");
    blobs
        .put(&format!("{DEFAULT_PREFIX}_broken"), "### rot ###")
        .expect("blob put");

    let store =
        SecureStore::open(Arc::clone(&blobs), Arc::new(MemoryKeyChannel::new())).expect("open");

    let outcome = store.migration_outcome().expect("migration ran");
    assert_eq!(outcome.migrated, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].key, format!("{DEFAULT_PREFIX}_broken"));

    // Migration committed regardless; the survivors read fine
    assert!(blobs
        .get(DEFAULT_LEGACY_KEY_SLOT)
        .expect("blob get")
        .is_none());
    let all = store.get_all().expect("get_all");
    assert_eq!(all.len(), 2);
    assert_eq!(all["a"], "1");
    assert_eq!(all["b"], "2");
    assert!(!all.contains_key("broken"));
}

#[test]
fn entry_under_unknown_key_is_left_in_place() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    seed_legacy_key(&*blobs, &legacy_key());
    let foreign = legacy_key();
    seed_legacy_entry(&*blobs, &foreign, "hostage", "cannot decrypt");
    let before = blobs
        .get(&format!("{DEFAULT_PREFIX}_hostage"))
        .expect("blob get");

    let store =
        SecureStore::open(Arc::clone(&blobs), Arc::new(MemoryKeyChannel::new())).expect("open");

    let outcome = store.migration_outcome().expect("migration ran");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(
        blobs
            .get(&format!("{DEFAULT_PREFIX}_hostage"))
            .expect("blob get"),
        before
    );
}

// ============================================================================
// Interruption and idempotence
// ============================================================================

#[test]
fn resumes_after_interrupted_migration() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let channel: Arc<dyn ProtectedKeyChannel> = Arc::new(MemoryKeyChannel::new());
    let old = legacy_key();
    seed_legacy_key(&*blobs, &old);

    // Interrupted predecessor: target key already in the channel, one entry
    // already rewritten, one still legacy, slot not yet erased.
    let target = KeyMaterial::generate(Generation::Current).expect("generate");
    channel.store(&target.encode()).expect("channel store");
    seed_legacy_entry(&*blobs, &old, "pending", "old format");
    let rewritten = cipher::encrypt(&target, b"new format").expect("encrypt");
    blobs
        .put(
            &format!("{DEFAULT_PREFIX}_done"),
            &STANDARD.encode(&rewritten),
        )
        .expect("blob put");

    let store = SecureStore::open(Arc::clone(&blobs), channel).expect("open");

    let outcome = store.migration_outcome().expect("migration ran");
    assert_eq!(outcome.migrated, 1);
    assert_eq!(outcome.already_current, 1);
    assert!(outcome.failures.is_empty());

    assert_eq!(store.get("pending").expect("get").as_deref(), Some("old format"));
    assert_eq!(store.get("done").expect("get").as_deref(), Some("new format"));
    assert_eq!(stored_generation(&*blobs, "pending"), Generation::Current);
}

#[test]
fn second_open_does_not_migrate_again() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let channel: Arc<dyn ProtectedKeyChannel> = Arc::new(MemoryKeyChannel::new());
    let key = legacy_key();
    seed_legacy_key(&*blobs, &key);
    seed_legacy_entry(&*blobs, &key, "k", "v");

    let first = SecureStore::open(Arc::clone(&blobs), Arc::clone(&channel)).expect("first open");
    assert!(first.migration_outcome().is_some());
    let snapshot = blobs.get_all().expect("get_all");
    drop(first);

    let second = SecureStore::open(Arc::clone(&blobs), channel).expect("second open");
    assert!(second.migration_outcome().is_none());
    assert_eq!(blobs.get_all().expect("get_all"), snapshot);
    assert_eq!(second.get("k").expect("get").as_deref(), Some("v"));
}

// ============================================================================
// Blob-store-backed key channel (explicit fallback)
// ============================================================================

#[test]
fn migration_works_over_blob_store_channel() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let key = legacy_key();
    seed_legacy_key(&*blobs, &key);
    seed_legacy_entry(&*blobs, &key, "k", "v");

    let channel: Arc<dyn ProtectedKeyChannel> =
        Arc::new(BlobStoreChannel::new(Arc::clone(&blobs), "lockbox.key"));
    let store = SecureStore::open_with(
        Arc::clone(&blobs),
        Arc::clone(&channel),
        StoreConfig::default(),
    )
    .expect("open");

    assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));
    assert!(blobs
        .get(DEFAULT_LEGACY_KEY_SLOT)
        .expect("blob get")
        .is_none());
    // The fallback channel keeps the current key in its own slot
    assert!(blobs.get("lockbox.key").expect("blob get").is_some());

    // And a reopen over the same file-of-record still reads everything
    drop(store);
    let reopened = SecureStore::open(Arc::clone(&blobs), channel).expect("reopen");
    assert!(reopened.migration_outcome().is_none());
    assert_eq!(reopened.get("k").expect("get").as_deref(), Some("v"));
}
