use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vblob_store::{ObjectMetadata, ObjectStore};
use vblob_types::{BaseIdentifier, Locator, VersionIdentifier, VersionStamp, VersionToken};

use crate::clock::{Clock, VersionClock};
use crate::config::BlobStoreConfig;
use crate::error::{BlobError, BlobResult};
use crate::handle::StoredObjectHandle;
use crate::verify::ChecksumVerifier;

/// Versioned blob storage over a flat [`ObjectStore`].
///
/// Holds only immutable configuration plus the version clock, so one
/// instance can serve many logical objects from many threads. There is no
/// lock across the read-then-act window of any operation: concurrent writers
/// to one base can at worst produce adjacent versions, and the newest key
/// always wins resolution.
pub struct VersionedBlobStore {
    backend: Arc<dyn ObjectStore>,
    locator: Locator,
    verifier: Option<Arc<dyn ChecksumVerifier>>,
    clock: VersionClock,
}

impl VersionedBlobStore {
    pub fn new(backend: Arc<dyn ObjectStore>, config: &BlobStoreConfig) -> Self {
        Self {
            backend,
            locator: config.locator(),
            verifier: None,
            clock: VersionClock::default(),
        }
    }

    /// Check every upload with `verifier`.
    pub fn with_verifier(mut self, verifier: Arc<dyn ChecksumVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Take version stamps from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = VersionClock::new(clock);
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    // ---- Writes ----

    /// Store the first version of a new object owned by `owner_id`.
    ///
    /// The base is `"<owner_id>/<uuid>"`. The returned handle has not read
    /// anything back from the backend.
    pub fn upload(
        &self,
        content: impl Into<Bytes>,
        filename: Option<&str>,
        owner_id: &str,
    ) -> BlobResult<StoredObjectHandle> {
        let base = BaseIdentifier::new(format!("{owner_id}/{}", Uuid::now_v7()))?;
        let id = VersionIdentifier::unversioned(base).new_version(Some(self.clock.next()));
        self.write_version(&id, content.into(), filename)
    }

    /// Append a new version under the base of `id`.
    ///
    /// A legacy object at the bare base key is migrated first, so afterwards
    /// all live content of the base sits under versioned keys.
    pub fn upload_version(
        &self,
        id: &VersionIdentifier,
        content: impl Into<Bytes>,
    ) -> BlobResult<StoredObjectHandle> {
        let base = id.base_identifier();
        if let Some(migrated) = self.migrate_legacy_object(base)? {
            debug!(id = %migrated, "legacy object migrated before upload");
        }
        let next = id.to_unversioned().new_version(Some(self.clock.next()));
        self.write_version(&next, content.into(), None)
    }

    fn write_version(
        &self,
        id: &VersionIdentifier,
        content: Bytes,
        filename: Option<&str>,
    ) -> BlobResult<StoredObjectHandle> {
        let key = id.key();
        let metadata = self.backend.put(&key, content.clone())?;
        if let Some(verifier) = &self.verifier {
            if !verifier.verify(&content, &metadata) {
                // The object stays written; remediation is the caller's call.
                warn!(key = %key, etag = %metadata.etag, "checksum verification failed");
                return Err(BlobError::Integrity { id: key });
            }
        }
        info!(key = %key, size = metadata.size, "stored version");
        Ok(self.handle(id.clone(), metadata, filename))
    }

    // ---- Reads ----

    /// Look up one object.
    ///
    /// - a timestamp version resolves to exactly that key, unless a tombstone
    ///   for it exists;
    /// - a tombstone never resolves;
    /// - a bare base or `current` reference resolves to the newest live
    ///   version. A bare base without versions falls back to a legacy object
    ///   stored at the bare key.
    pub fn find_by(&self, id: &VersionIdentifier) -> BlobResult<StoredObjectHandle> {
        match id.version() {
            Some(VersionToken::Timestamp(_)) => {
                if self.is_tombstoned(id)? {
                    return Err(BlobError::not_found(id));
                }
                self.head_handle(id)
            }
            Some(VersionToken::Tombstone(_)) => Err(BlobError::not_found(id)),
            Some(VersionToken::Current) => {
                let current = self.resolve_current(id.base_identifier())?;
                self.head_handle(&current)
            }
            None => match self.resolve_current(id.base_identifier()) {
                Ok(current) => self.head_handle(&current),
                Err(BlobError::NotFound { .. }) => self.head_handle(id),
                Err(e) => Err(e),
            },
        }
    }

    /// The newest live version of `base`.
    pub fn resolve_current(&self, base: &BaseIdentifier) -> BlobResult<VersionIdentifier> {
        self.live_versions(base)?
            .into_iter()
            .next()
            .ok_or_else(|| BlobError::not_found(base))
    }

    /// Every live version of `base`, newest first.
    pub fn find_versions(&self, base: &BaseIdentifier) -> BlobResult<Vec<StoredObjectHandle>> {
        let mut handles = Vec::new();
        for id in self.live_versions(base)? {
            match self.backend.head(&id.key())? {
                Some(metadata) => handles.push(self.handle(id, metadata, None)),
                None => debug!(id = %id, "version vanished between list and head"),
            }
        }
        Ok(handles)
    }

    /// Every version of `base` including tombstones, newest first.
    pub fn version_files(&self, base: &BaseIdentifier) -> BlobResult<Vec<VersionIdentifier>> {
        let keys = self.backend.list_by_prefix(&base.version_prefix())?;
        let mut ids: Vec<VersionIdentifier> = keys
            .iter()
            .filter_map(|key| match VersionIdentifier::parse(key) {
                Ok(id) if id.base_identifier() == base && id.is_concrete() => Some(id),
                Ok(_) => None,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unparseable key");
                    None
                }
            })
            .collect();
        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    // A live version counts only while no tombstone with its stamp exists;
    // tombstones are written before the live key is removed.
    fn live_versions(&self, base: &BaseIdentifier) -> BlobResult<Vec<VersionIdentifier>> {
        let all = self.version_files(base)?;
        let tombstoned: HashSet<VersionStamp> = all
            .iter()
            .filter(|id| id.is_tombstone())
            .filter_map(VersionIdentifier::stamp)
            .collect();
        Ok(all
            .into_iter()
            .filter(|id| {
                id.is_live_version() && id.stamp().is_some_and(|s| !tombstoned.contains(&s))
            })
            .collect())
    }

    // ---- Deletes ----

    /// Delete by version or by base and return the tombstones written.
    ///
    /// - a timestamp version is tombstoned; if it already is, `[]` is
    ///   returned and only a leftover live key is removed;
    /// - a tombstone identifier is already deleted: `[]`;
    /// - `current` tombstones the newest live version;
    /// - a bare base tombstones every live version, migrating a legacy
    ///   object first.
    ///
    /// Fails with `NotFound` when nothing live matches.
    pub fn delete(&self, id: &VersionIdentifier) -> BlobResult<Vec<VersionIdentifier>> {
        match id.version() {
            Some(VersionToken::Tombstone(_)) => {
                debug!(id = %id, "already a tombstone");
                Ok(Vec::new())
            }
            Some(VersionToken::Timestamp(_)) => self.delete_version(id),
            Some(VersionToken::Current) => {
                let current = self.resolve_current(id.base_identifier())?;
                self.delete_version(&current)
            }
            None => self.delete_all(id.base_identifier()),
        }
    }

    fn delete_version(&self, id: &VersionIdentifier) -> BlobResult<Vec<VersionIdentifier>> {
        let tombstone = id.tombstone().ok_or_else(|| BlobError::not_found(id))?;
        if self.backend.head(&tombstone.key())?.is_some() {
            // An interrupted delete can leave the live key behind.
            if self.backend.head(&id.key())?.is_some() {
                self.backend.delete(&id.key())?;
                info!(id = %id, "removed live key left behind by an earlier delete");
            } else {
                debug!(id = %id, "version already tombstoned");
            }
            return Ok(Vec::new());
        }
        if self.backend.head(&id.key())?.is_none() {
            return Err(BlobError::not_found(id));
        }
        self.backend.put(&tombstone.key(), Bytes::new())?;
        self.backend.delete(&id.key())?;
        info!(id = %id, tombstone = %tombstone, "version deleted");
        Ok(vec![tombstone])
    }

    fn delete_all(&self, base: &BaseIdentifier) -> BlobResult<Vec<VersionIdentifier>> {
        self.migrate_legacy_object(base)?;
        let live = self.live_versions(base)?;
        if live.is_empty() {
            return Err(BlobError::not_found(base));
        }

        let mut tombstones = Vec::with_capacity(live.len());
        for id in &live {
            let tombstone = id.tombstone().ok_or_else(|| BlobError::not_found(id))?;
            self.backend.put(&tombstone.key(), Bytes::new())?;
            tombstones.push(tombstone);
        }

        let keys: Vec<String> = live.iter().map(VersionIdentifier::key).collect();
        let deleted = self.backend.delete_many(&keys)?;
        if deleted.len() != keys.len() {
            warn!(
                base = %base,
                expected = keys.len(),
                deleted = deleted.len(),
                "some versions disappeared before deletion"
            );
        }
        info!(base = %base, count = tombstones.len(), "all versions deleted");
        Ok(tombstones)
    }

    // ---- Migration ----

    /// Move a legacy object stored at the bare base key into the versioned
    /// scheme, stamped with its stored modification time.
    ///
    /// Uses a backend copy followed by a delete so the content is never
    /// re-uploaded. Returns the new version, or `None` when there is no
    /// legacy object (including when a concurrent caller migrated it first).
    pub fn migrate_legacy_object(
        &self,
        base: &BaseIdentifier,
    ) -> BlobResult<Option<VersionIdentifier>> {
        let legacy_key = base.as_str();
        let Some(metadata) = self.backend.head(legacy_key)? else {
            return Ok(None);
        };

        let stamp = self.free_stamp(base, legacy_stamp(&metadata))?;
        let target = VersionIdentifier::unversioned(base.clone()).new_version(Some(stamp));
        match self.backend.copy(legacy_key, &target.key()) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!(base = %base, "legacy object already migrated");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
        self.backend.delete(legacy_key)?;
        self.clock.observe(stamp);
        info!(from = %legacy_key, to = %target, "migrated legacy object");
        Ok(Some(target))
    }

    // The first stamp at or after `wanted` not already used by a version or
    // tombstone of `base`.
    fn free_stamp(&self, base: &BaseIdentifier, wanted: VersionStamp) -> BlobResult<VersionStamp> {
        let taken: BTreeSet<VersionStamp> = self
            .version_files(base)?
            .iter()
            .filter_map(VersionIdentifier::stamp)
            .collect();
        let mut stamp = wanted;
        while taken.contains(&stamp) {
            stamp = stamp.successor();
        }
        if stamp != wanted {
            warn!(
                base = %base,
                wanted = %wanted,
                used = %stamp,
                "legacy stamp collided with an existing version"
            );
        }
        Ok(stamp)
    }

    // ---- Helpers ----

    fn is_tombstoned(&self, id: &VersionIdentifier) -> BlobResult<bool> {
        match id.tombstone() {
            Some(tombstone) => Ok(self.backend.head(&tombstone.key())?.is_some()),
            None => Ok(false),
        }
    }

    fn head_handle(&self, id: &VersionIdentifier) -> BlobResult<StoredObjectHandle> {
        let metadata = self
            .backend
            .head(&id.key())?
            .ok_or_else(|| BlobError::not_found(id))?;
        Ok(self.handle(id.clone(), metadata, None))
    }

    fn handle(
        &self,
        id: VersionIdentifier,
        metadata: ObjectMetadata,
        filename: Option<&str>,
    ) -> StoredObjectHandle {
        let locator = self.locator.format(&id);
        StoredObjectHandle::new(
            id,
            locator,
            filename.map(str::to_string),
            metadata,
            Arc::clone(&self.backend),
        )
    }
}

fn legacy_stamp(metadata: &ObjectMetadata) -> VersionStamp {
    VersionStamp::from_millis(metadata.last_modified.timestamp_millis().max(0) as u64)
}

impl std::fmt::Debug for VersionedBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedBlobStore")
            .field("locator", &self.locator.lead())
            .field("verifier", &self.verifier.is_some())
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::verify::DigestVerifier;
    use chrono::{TimeZone, Utc};
    use vblob_store::{InMemoryObjectStore, StoreError, StoreResult};

    struct Fixture {
        backend: Arc<InMemoryObjectStore>,
        clock: Arc<ManualClock>,
        store: VersionedBlobStore,
    }

    fn fixture(start_ms: u64) -> Fixture {
        let backend = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(ManualClock::new(start_ms));
        let store = VersionedBlobStore::new(backend.clone(), &BlobStoreConfig::default())
            .with_clock(clock.clone());
        Fixture {
            backend,
            clock,
            store,
        }
    }

    fn base(s: &str) -> BaseIdentifier {
        BaseIdentifier::new(s).unwrap()
    }

    fn id(s: &str) -> VersionIdentifier {
        VersionIdentifier::parse(s).unwrap()
    }

    fn keys(ids: &[VersionIdentifier]) -> Vec<String> {
        ids.iter().map(|id| id.key()).collect()
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    #[test]
    fn upload_roundtrip() {
        let fx = fixture(1000);
        let handle = fx.store.upload("hello", Some("hello.txt"), "r1").unwrap();
        let found = fx.store.find_by(&handle.id().to_unversioned()).unwrap();
        assert_eq!(found.read().unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(found.id(), handle.id());
    }

    #[test]
    fn upload_derives_base_from_owner() {
        let fx = fixture(1000);
        let handle = fx.store.upload("x", None, "r1").unwrap();
        let base = handle.id().base_identifier().as_str();
        let uuid = base.strip_prefix("r1/").expect("base starts with owner id");
        assert!(Uuid::parse_str(uuid).is_ok());
        assert_eq!(handle.id().stamp(), Some(VersionStamp::from_millis(1000)));
        assert!(handle.locator().starts_with("vblob://r1/"));
    }

    #[test]
    fn upload_keeps_filename_out_of_key() {
        let fx = fixture(1000);
        let handle = fx.store.upload("x", Some("report.pdf"), "r1").unwrap();
        assert_eq!(handle.filename(), Some("report.pdf"));
        assert!(!handle.id().key().contains("report"));
    }

    #[test]
    fn upload_gives_distinct_bases() {
        let fx = fixture(1000);
        let a = fx.store.upload("a", None, "r1").unwrap();
        let b = fx.store.upload("b", None, "r1").unwrap();
        assert_ne!(a.id().base_identifier(), b.id().base_identifier());
    }

    #[test]
    fn upload_rejects_owner_with_delimiter() {
        let fx = fixture(1000);
        let err = fx.store.upload("x", None, "bad_v-owner").unwrap_err();
        assert!(matches!(err, BlobError::InvalidIdentifier(_)));
        assert!(fx.backend.is_empty());
    }

    #[test]
    fn upload_does_not_fetch_content() {
        let fx = fixture(1000);
        let handle = fx.store.upload("lazy", None, "r1").unwrap();
        assert_eq!(fx.backend.stats().gets, 0);
        assert!(!handle.is_loaded());

        assert_eq!(handle.read().unwrap(), Bytes::from_static(b"lazy"));
        assert_eq!(fx.backend.stats().gets, 1);
    }

    #[test]
    fn find_by_does_not_fetch_content() {
        let fx = fixture(1000);
        let handle = fx.store.upload("lazy", None, "r1").unwrap();
        let found = fx.store.find_by(handle.id()).unwrap();
        let versions = fx.store.find_versions(handle.id().base_identifier()).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(fx.backend.stats().gets, 0);
        assert_eq!(found.size(), 4);
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    #[test]
    fn verified_upload_succeeds() {
        let fx = fixture(1000);
        let store = fx.store.with_verifier(Arc::new(DigestVerifier));
        let handle = store.upload("checked", None, "r1").unwrap();
        assert_eq!(handle.read().unwrap(), Bytes::from_static(b"checked"));
    }

    #[test]
    fn failed_verification_leaves_object_in_place() {
        let fx = fixture(1000);
        let reject = |_: &[u8], _: &ObjectMetadata| false;
        let store = fx.store.with_verifier(Arc::new(reject));
        let err = store.upload("corrupt", None, "r1").unwrap_err();
        let BlobError::Integrity { id: key } = &err else {
            panic!("expected integrity error, got {err:?}");
        };
        assert!(fx.backend.get(key).unwrap().is_some());
    }

    #[test]
    fn upload_version_is_verified_too() {
        let fx = fixture(1000);
        let reject = |_: &[u8], _: &ObjectMetadata| false;
        let store = fx.store.with_verifier(Arc::new(reject));
        let err = store.upload_version(&id("r1/u1"), "x").unwrap_err();
        assert!(matches!(err, BlobError::Integrity { .. }));
    }

    // -----------------------------------------------------------------------
    // Versions and resolution
    // -----------------------------------------------------------------------

    #[test]
    fn versions_are_newest_first() {
        let fx = fixture(1000);
        let b = base("r1/u1");
        for (t, content) in [(1000, "one"), (2000, "two"), (3000, "three")] {
            fx.clock.set(t);
            fx.store.upload_version(&b.clone().into(), content).unwrap();
        }

        let versions = fx.store.find_versions(&b).unwrap();
        let stamps: Vec<u64> = versions
            .iter()
            .map(|h| h.id().stamp().unwrap().as_millis())
            .collect();
        assert_eq!(stamps, vec![3000, 2000, 1000]);

        let current = fx.store.find_by(&b.clone().into()).unwrap();
        assert_eq!(current.id().stamp(), Some(VersionStamp::from_millis(3000)));
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"three"));
    }

    #[test]
    fn current_reference_resolves_to_newest() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "old").unwrap();
        fx.clock.set(2000);
        fx.store.upload_version(&id("r1/u1"), "new").unwrap();
        let current = fx.store.find_by(&id("r1/u1_v-current")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"new"));
    }

    #[test]
    fn upload_version_accepts_any_id_of_the_base() {
        let fx = fixture(1000);
        let first = fx.store.upload("a", None, "r1").unwrap();
        fx.clock.set(2000);
        let second = fx.store.upload_version(first.id(), "b").unwrap();
        assert_eq!(second.id().base_identifier(), first.id().base_identifier());
        assert_eq!(second.id().stamp(), Some(VersionStamp::from_millis(2000)));
    }

    #[test]
    fn same_millisecond_uploads_get_distinct_keys() {
        let fx = fixture(1000);
        let a = fx.store.upload_version(&id("r1/u1"), "a").unwrap();
        let b = fx.store.upload_version(&id("r1/u1"), "b").unwrap();
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
        let current = fx.store.find_by(&id("r1/u1")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"b"));
    }

    #[test]
    fn find_by_concrete_version_reads_that_version() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "old").unwrap();
        fx.clock.set(2000);
        fx.store.upload_version(&id("r1/u1"), "new").unwrap();
        let old = fx.store.find_by(&id("r1/u1_v-0000000001000")).unwrap();
        assert_eq!(old.read().unwrap(), Bytes::from_static(b"old"));
    }

    #[test]
    fn find_by_unknown_base_is_not_found() {
        let fx = fixture(1000);
        assert!(fx.store.find_by(&id("r9/none")).unwrap_err().is_not_found());
        assert!(fx.store.find_by(&id("r9/none_v-current")).unwrap_err().is_not_found());
        assert!(fx.store.find_by(&id("r9/none_v-0000000001000")).unwrap_err().is_not_found());
    }

    #[test]
    fn find_by_tombstone_is_not_found() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "x").unwrap();
        fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap();
        let err = fx.store.find_by(&id("r1/u1_v-0000000001000-deletionmarker")).unwrap_err();
        assert!(err.is_not_found());
        assert!(fx.store.find_by(&id("r1/u1_v-0000000001000")).unwrap_err().is_not_found());
    }

    #[test]
    fn resolution_ignores_other_bases_sharing_a_prefix() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "mine").unwrap();
        fx.clock.set(5000);
        fx.store.upload_version(&id("r1/u10"), "theirs").unwrap();
        let current = fx.store.find_by(&id("r1/u1")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"mine"));
        assert_eq!(fx.store.version_files(&base("r1/u1")).unwrap().len(), 1);
    }

    #[test]
    fn resolution_skips_live_key_with_tombstone() {
        // Tombstone written but the live delete never happened.
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "old").unwrap();
        fx.clock.set(2000);
        fx.store.upload_version(&id("r1/u1"), "half-deleted").unwrap();
        fx.backend
            .put("r1/u1_v-0000000002000-deletionmarker", Bytes::new())
            .unwrap();
        let current = fx.store.find_by(&id("r1/u1")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"old"));
        assert_eq!(fx.store.find_versions(&base("r1/u1")).unwrap().len(), 1);

        let concrete = id("r1/u1_v-0000000002000");
        assert!(fx.store.find_by(&concrete).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_finishes_interrupted_delete() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "x").unwrap();
        fx.backend
            .put("r1/u1_v-0000000001000-deletionmarker", Bytes::new())
            .unwrap();

        let deleted = fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap();
        assert!(deleted.is_empty());
        assert_eq!(
            fx.backend.keys(),
            vec!["r1/u1_v-0000000001000-deletionmarker".to_string()]
        );
    }

    #[test]
    fn unparseable_keys_are_skipped() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "ok").unwrap();
        fx.backend.put("r1/u1_v-garbage", Bytes::from_static(b"?")).unwrap();
        let files = fx.store.version_files(&base("r1/u1")).unwrap();
        assert_eq!(keys(&files), vec!["r1/u1_v-0000000001000"]);
    }

    #[test]
    fn unpadded_stamp_keys_are_never_claimed() {
        let fx = fixture(1000);
        fx.backend.put("r1/u1_v-999", Bytes::from_static(b"short")).unwrap();

        assert!(fx.store.version_files(&base("r1/u1")).unwrap().is_empty());
        assert!(fx.store.find_versions(&base("r1/u1")).unwrap().is_empty());
        assert!(fx.store.find_by(&id("r1/u1")).unwrap_err().is_not_found());
        assert!(fx.store.delete(&id("r1/u1")).unwrap_err().is_not_found());
        assert_eq!(fx.backend.keys(), vec!["r1/u1_v-999".to_string()]);
    }

    #[test]
    fn listed_keys_read_and_delete_by_their_own_text() {
        let fx = fixture(1000);
        fx.backend.put("r1/u1_v-0000000000999", Bytes::from_static(b"early")).unwrap();
        fx.store.upload_version(&id("r1/u1"), "later").unwrap();

        let versions = fx.store.find_versions(&base("r1/u1")).unwrap();
        let found: Vec<&str> = versions.iter().map(|h| h.metadata().key.as_str()).collect();
        assert_eq!(found, vec!["r1/u1_v-0000000001000", "r1/u1_v-0000000000999"]);

        fx.store.delete(&id("r1/u1")).unwrap();
        assert_eq!(
            fx.backend.keys(),
            vec![
                "r1/u1_v-0000000000999-deletionmarker".to_string(),
                "r1/u1_v-0000000001000-deletionmarker".to_string(),
            ]
        );
    }

    #[test]
    fn legacy_object_is_readable_before_migration() {
        let fx = fixture(1000);
        fx.backend
            .put_with_timestamp("r1/legacy", "old bytes", Utc.timestamp_millis_opt(500).unwrap())
            .unwrap();
        let handle = fx.store.find_by(&id("r1/legacy")).unwrap();
        assert!(!handle.id().is_versioned());
        assert_eq!(handle.read().unwrap(), Bytes::from_static(b"old bytes"));
        assert!(fx.store.find_versions(&base("r1/legacy")).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_version_writes_tombstone() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "x").unwrap();
        let deleted = fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap();
        assert_eq!(keys(&deleted), vec!["r1/u1_v-0000000001000-deletionmarker"]);
        assert_eq!(
            fx.backend.keys(),
            vec!["r1/u1_v-0000000001000-deletionmarker".to_string()]
        );
        let tombstone = fx.backend.head("r1/u1_v-0000000001000-deletionmarker").unwrap().unwrap();
        assert_eq!(tombstone.size, 0);
    }

    #[test]
    fn delete_is_idempotent_without_mutation() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "x").unwrap();
        fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap();

        let before = fx.backend.stats().mutations();
        assert!(fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap().is_empty());
        assert!(fx
            .store
            .delete(&id("r1/u1_v-0000000001000-deletionmarker"))
            .unwrap()
            .is_empty());
        assert_eq!(fx.backend.stats().mutations(), before);
    }

    #[test]
    fn delete_missing_version_is_not_found() {
        let fx = fixture(1000);
        let err = fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap_err();
        assert!(err.is_not_found());
        assert!(fx.backend.is_empty());
    }

    #[test]
    fn delete_current_removes_only_newest() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "old").unwrap();
        fx.clock.set(2000);
        fx.store.upload_version(&id("r1/u1"), "new").unwrap();
        let deleted = fx.store.delete(&id("r1/u1_v-current")).unwrap();
        assert_eq!(keys(&deleted), vec!["r1/u1_v-0000000002000-deletionmarker"]);
        let current = fx.store.find_by(&id("r1/u1")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"old"));
    }

    #[test]
    fn delete_base_tombstones_every_live_version() {
        let fx = fixture(1000);
        let b = base("r1/u1");
        for t in [1000, 2000, 3000] {
            fx.clock.set(t);
            fx.store.upload_version(&b.clone().into(), "v").unwrap();
        }
        fx.store.delete(&id("r1/u1_v-0000000002000")).unwrap();

        let deleted = fx.store.delete(&b.clone().into()).unwrap();
        assert_eq!(
            keys(&deleted),
            vec![
                "r1/u1_v-0000000003000-deletionmarker",
                "r1/u1_v-0000000001000-deletionmarker",
            ]
        );
        assert!(fx.store.find_versions(&b).unwrap().is_empty());
        assert!(fx.store.find_by(&b.clone().into()).unwrap_err().is_not_found());

        let files = fx.store.version_files(&b).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(VersionIdentifier::is_tombstone));
        assert_eq!(fx.backend.stats().batch_deletes, 1);
    }

    #[test]
    fn delete_base_without_live_versions_is_not_found() {
        let fx = fixture(1000);
        assert!(fx.store.delete(&id("r1/u1")).unwrap_err().is_not_found());

        fx.store.upload_version(&id("r1/u1"), "x").unwrap();
        fx.store.delete(&id("r1/u1")).unwrap();
        assert!(fx.store.delete(&id("r1/u1")).unwrap_err().is_not_found());
        assert!(fx.store.delete(&id("r1/u1_v-current")).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_base_migrates_and_tombstones_legacy_object() {
        let fx = fixture(9000);
        fx.backend
            .put_with_timestamp("r1/legacy", "old", Utc.timestamp_millis_opt(1500).unwrap())
            .unwrap();
        let deleted = fx.store.delete(&id("r1/legacy")).unwrap();
        assert_eq!(keys(&deleted), vec!["r1/legacy_v-0000000001500-deletionmarker"]);
        assert!(fx.backend.head("r1/legacy").unwrap().is_none());
        assert!(fx.store.find_by(&id("r1/legacy")).unwrap_err().is_not_found());
    }

    #[test]
    fn upload_after_delete_becomes_current() {
        let fx = fixture(1000);
        fx.store.upload_version(&id("r1/u1"), "first").unwrap();
        fx.store.delete(&id("r1/u1")).unwrap();
        fx.clock.set(2000);
        fx.store.upload_version(&id("r1/u1"), "revived").unwrap();
        let current = fx.store.find_by(&id("r1/u1")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"revived"));
        assert_eq!(fx.store.version_files(&base("r1/u1")).unwrap().len(), 2);
    }

    // -----------------------------------------------------------------------
    // Legacy migration
    // -----------------------------------------------------------------------

    #[test]
    fn upload_version_migrates_legacy_object() {
        let fx = fixture(5000);
        let modified = Utc.timestamp_millis_opt(1500).unwrap();
        fx.backend
            .put_with_timestamp("r1/legacy", "original", modified)
            .unwrap();

        fx.store.upload_version(&id("r1/legacy"), "replacement").unwrap();

        // (a) the bare key no longer holds content
        assert!(fx.backend.head("r1/legacy").unwrap().is_none());
        // (b) original content at the old modification time
        let migrated = fx.store.find_by(&id("r1/legacy_v-0000000001500")).unwrap();
        assert_eq!(migrated.read().unwrap(), Bytes::from_static(b"original"));
        // (c) new content at "now"
        let current = fx.store.find_by(&id("r1/legacy")).unwrap();
        assert_eq!(current.id().stamp(), Some(VersionStamp::from_millis(5000)));
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"replacement"));
        // (d) exactly two versions
        assert_eq!(fx.store.find_versions(&base("r1/legacy")).unwrap().len(), 2);
    }

    #[test]
    fn migration_copies_instead_of_rewriting() {
        let fx = fixture(5000);
        fx.backend
            .put_with_timestamp("r1/legacy", "big", Utc.timestamp_millis_opt(1500).unwrap())
            .unwrap();
        let migrated = fx.store.migrate_legacy_object(&base("r1/legacy")).unwrap();
        assert_eq!(migrated, Some(id("r1/legacy_v-0000000001500")));
        let stats = fx.backend.stats();
        assert_eq!(stats.copies, 1);
        assert_eq!(stats.puts, 0);
        assert_eq!(stats.gets, 0);
    }

    #[test]
    fn migration_without_legacy_object_is_noop() {
        let fx = fixture(5000);
        fx.store.upload_version(&id("r1/u1"), "x").unwrap();
        let before = fx.backend.stats().mutations();
        assert_eq!(fx.store.migrate_legacy_object(&base("r1/u1")).unwrap(), None);
        assert_eq!(fx.backend.stats().mutations(), before);
    }

    #[test]
    fn migrated_stamp_newer_than_clock_still_precedes_new_version() {
        // Legacy object modified "in the future" relative to the clock.
        let fx = fixture(1000);
        fx.backend
            .put_with_timestamp("r1/legacy", "old", Utc.timestamp_millis_opt(8000).unwrap())
            .unwrap();
        let handle = fx.store.upload_version(&id("r1/legacy"), "new").unwrap();
        assert_eq!(handle.id().stamp(), Some(VersionStamp::from_millis(8001)));
        let current = fx.store.find_by(&id("r1/legacy")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"new"));
    }

    #[test]
    fn migration_avoids_existing_stamp() {
        let fx = fixture(1500);
        fx.store.upload_version(&id("r1/legacy"), "versioned").unwrap();
        fx.backend
            .put_with_timestamp("r1/legacy", "legacy", Utc.timestamp_millis_opt(1500).unwrap())
            .unwrap();
        let migrated = fx.store.migrate_legacy_object(&base("r1/legacy")).unwrap().unwrap();
        assert_eq!(migrated.stamp(), Some(VersionStamp::from_millis(1501)));
        let at_1500 = fx.store.find_by(&id("r1/legacy_v-0000000001500")).unwrap();
        assert_eq!(at_1500.read().unwrap(), Bytes::from_static(b"versioned"));
    }

    // -----------------------------------------------------------------------
    // Concrete walkthrough
    // -----------------------------------------------------------------------

    // Stamps are written zero-padded to 13 digits, so t=1000 appears as
    // `0000000001000` in every key below.
    #[test]
    fn hello_world_scenario() {
        let fx = fixture(1000);
        let b = base("r1/u1");

        let first = fx.store.upload_version(&b.clone().into(), "hello").unwrap();
        assert_eq!(first.id().key(), "r1/u1_v-0000000001000");

        fx.clock.set(2000);
        let second = fx.store.upload_version(&b.clone().into(), "world").unwrap();
        assert_eq!(second.id().key(), "r1/u1_v-0000000002000");

        let current = fx.store.find_by(&b.clone().into()).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"world"));

        let deleted = fx.store.delete(&id("r1/u1_v-0000000001000")).unwrap();
        assert_eq!(keys(&deleted), vec!["r1/u1_v-0000000001000-deletionmarker"]);

        let versions = fx.store.find_versions(&b).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].id().key(), "r1/u1_v-0000000002000");
    }

    // -----------------------------------------------------------------------
    // Backend failures
    // -----------------------------------------------------------------------

    struct BrokenStore {
        error: fn() -> StoreError,
    }

    impl ObjectStore for BrokenStore {
        fn put(&self, _: &str, _: Bytes) -> StoreResult<ObjectMetadata> {
            Err((self.error)())
        }
        fn get(&self, _: &str) -> StoreResult<Option<Bytes>> {
            Err((self.error)())
        }
        fn head(&self, _: &str) -> StoreResult<Option<ObjectMetadata>> {
            Err((self.error)())
        }
        fn delete(&self, _: &str) -> StoreResult<bool> {
            Err((self.error)())
        }
        fn list_by_prefix(&self, _: &str) -> StoreResult<Vec<String>> {
            Err((self.error)())
        }
        fn copy(&self, _: &str, _: &str) -> StoreResult<ObjectMetadata> {
            Err((self.error)())
        }
    }

    fn broken(error: fn() -> StoreError) -> VersionedBlobStore {
        VersionedBlobStore::new(Arc::new(BrokenStore { error }), &BlobStoreConfig::default())
    }

    #[test]
    fn missing_bucket_reads_as_not_found() {
        let store = broken(|| StoreError::BucketMissing {
            bucket: "gone".into(),
        });
        assert!(store.find_by(&id("r1/u1")).unwrap_err().is_not_found());
        assert!(store.delete(&id("r1/u1_v-0000000001000")).unwrap_err().is_not_found());
    }

    #[test]
    fn transport_errors_propagate() {
        let store = broken(|| StoreError::Transport("connection reset".into()));
        let err = store.find_by(&id("r1/u1")).unwrap_err();
        assert!(matches!(err, BlobError::Backend(StoreError::Transport(_))));
        let err = store.upload("x", None, "r1").unwrap_err();
        assert!(matches!(err, BlobError::Backend(_)));
    }

    #[test]
    fn works_over_prefixed_backend() {
        let backend = Arc::new(InMemoryObjectStore::new());
        let scoped = vblob_store::PrefixedObjectStore::new(backend.clone(), "app");
        let store = VersionedBlobStore::new(Arc::new(scoped), &BlobStoreConfig::default())
            .with_clock(Arc::new(ManualClock::new(1000)));
        store.upload_version(&id("r1/u1"), "scoped").unwrap();
        assert_eq!(backend.keys(), vec!["app/r1/u1_v-0000000001000".to_string()]);
        let current = store.find_by(&id("r1/u1")).unwrap();
        assert_eq!(current.read().unwrap(), Bytes::from_static(b"scoped"));
    }

    #[test]
    fn store_is_shareable_across_threads() {
        use std::thread;

        let fx = fixture(1000);
        let store = Arc::new(fx.store);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = VersionIdentifier::parse("r1/u1").unwrap();
                    store.upload_version(&id, format!("v{i}")).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        let files = store.version_files(&base("r1/u1")).unwrap();
        assert_eq!(files.len(), 4);
    }
}
