//! Local handles for fetched asset bytes.
//!
//! A [`BlobStore`] hands out `blob:` handles for downloaded bytes and keeps
//! them alive until they are revoked. [`HandleRegistry`] owns the handles a
//! view displays, keyed by media id and rendition, so that replacing or
//! dropping one always revokes the previous handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    id: u64,
}

impl BlobHandle {
    pub fn url(&self) -> String {
        format!("blob:albumz/{}", self.id)
    }
}

#[derive(Debug)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Default)]
struct Blobs {
    next_id: u64,
    live: HashMap<u64, Arc<Blob>>,
    allocated: u64,
    revoked: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<Mutex<Blobs>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Blobs> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, bytes: Vec<u8>, content_type: Option<String>) -> BlobHandle {
        let mut blobs = self.lock();
        blobs.next_id += 1;
        blobs.allocated += 1;
        let id = blobs.next_id;
        blobs.live.insert(id, Arc::new(Blob { bytes, content_type }));
        BlobHandle { id }
    }

    pub fn get(&self, handle: &BlobHandle) -> Option<Arc<Blob>> {
        self.lock().live.get(&handle.id).cloned()
    }

    /// Release `handle`. Returns false when it was already revoked.
    pub fn revoke(&self, handle: &BlobHandle) -> bool {
        let mut blobs = self.lock();
        if blobs.live.remove(&handle.id).is_some() {
            blobs.revoked += 1;
            true
        } else {
            false
        }
    }

    pub fn is_live(&self, handle: &BlobHandle) -> bool {
        self.lock().live.contains_key(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn allocated_count(&self) -> u64 {
        self.lock().allocated
    }

    pub fn revoked_count(&self) -> u64 {
        self.lock().revoked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Thumbnail shown in the album grid.
    Preview,
    /// Full-resolution image or video in the viewer.
    Full,
}

/// Owns at most one handle per (media id, kind).
#[derive(Debug)]
pub struct HandleRegistry {
    blobs: BlobStore,
    slots: HashMap<(i64, HandleKind), BlobHandle>,
}

impl HandleRegistry {
    pub fn new(blobs: BlobStore) -> Self {
        HandleRegistry {
            blobs,
            slots: HashMap::new(),
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn get(&self, id: i64, kind: HandleKind) -> Option<&BlobHandle> {
        self.slots.get(&(id, kind))
    }

    /// Revoke whatever is held for `(id, kind)` and hold `handle` instead.
    pub fn supersede(&mut self, id: i64, kind: HandleKind, handle: BlobHandle) {
        if let Some(previous) = self.slots.insert((id, kind), handle.clone()) {
            if previous != handle {
                self.blobs.revoke(&previous);
            }
        }
    }

    pub fn release(&mut self, id: i64, kind: HandleKind) -> bool {
        match self.slots.remove(&(id, kind)) {
            Some(handle) => self.blobs.revoke(&handle),
            None => false,
        }
    }

    /// Release every handle of `kind` whose id fails `keep`.
    pub fn retain(&mut self, kind: HandleKind, keep: impl Fn(i64) -> bool) -> usize {
        let doomed: Vec<(i64, HandleKind)> = self
            .slots
            .keys()
            .filter(|(id, k)| *k == kind && !keep(*id))
            .copied()
            .collect();
        for key in &doomed {
            if let Some(handle) = self.slots.remove(key) {
                self.blobs.revoke(&handle);
            }
        }
        doomed.len()
    }

    /// Revoke a handle the registry never took ownership of.
    pub fn discard(&self, handle: &BlobHandle) {
        self.blobs.revoke(handle);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn release_all(&mut self) {
        for (_, handle) in self.slots.drain() {
            self.blobs.revoke(&handle);
        }
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
