//! Resource handle lifecycle
//!
//! Decoded payloads are staged with a host as dereferenceable resources
//! that a rendering engine can open. The manager enforces the panel's
//! lifecycle discipline: at most one live handle, the old one revoked
//! before a replacement is created, everything revoked on teardown.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, warn};
use thiserror::Error;

use crate::decode::{ContentCategory, RawPayload};

/// Identity of a staged resource, unique within one manager
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live staged resource
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceHandle {
    pub id: HandleId,
    /// Host URI the engine dereferences. For the file host this is a path.
    pub uri: String,
    pub category: ContentCategory,
    /// Decoded payload size in bytes
    pub len: usize,
}

/// Resource could not be materialized by the host
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource host i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("{detail}")]
    Host { detail: String },
}

/// Backing store for staged resources.
///
/// `revoke` must tolerate ids it has never seen or has already revoked;
/// the manager relies on that for idempotent release.
pub trait ResourceHost {
    /// Materialize the payload and return a URI the engine can open
    fn create(
        &mut self,
        id: HandleId,
        payload: &RawPayload,
        category: ContentCategory,
    ) -> Result<String, ResourceError>;

    /// Tear down a staged resource
    fn revoke(&mut self, id: HandleId);
}

/// Owns the live handle and the host behind it
#[derive(Debug)]
pub struct ResourceManager<H: ResourceHost> {
    host: H,
    live: Option<ResourceHandle>,
    next_id: u64,
}

impl<H: ResourceHost> ResourceManager<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            live: None,
            next_id: 1,
        }
    }

    /// Stage a payload with the host, consuming it.
    ///
    /// Any prior live handle is revoked first, so two handles never
    /// coexist. On host failure nothing stays live.
    pub fn publish(
        &mut self,
        payload: RawPayload,
        category: ContentCategory,
    ) -> Result<ResourceHandle, ResourceError> {
        self.release_all();
        let id = HandleId(self.next_id);
        self.next_id += 1;
        let uri = self.host.create(id, &payload, category)?;
        let handle = ResourceHandle {
            id,
            uri,
            category,
            len: payload.len(),
        };
        debug!("published resource {} ({} bytes)", handle.id, handle.len);
        self.live = Some(handle.clone());
        Ok(handle)
    }

    /// Release a handle by id. Safe to call twice; unknown ids are ignored.
    pub fn release(&mut self, id: HandleId) {
        if self.live.as_ref().is_some_and(|h| h.id == id) {
            self.host.revoke(id);
            self.live = None;
            debug!("released resource {id}");
        }
    }

    /// Release whatever is live. Used on replacement and teardown.
    pub fn release_all(&mut self) {
        if let Some(handle) = self.live.take() {
            self.host.revoke(handle.id);
            debug!("released resource {}", handle.id);
        }
    }

    pub fn live(&self) -> Option<&ResourceHandle> {
        self.live.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: ResourceHost> Drop for ResourceManager<H> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Host that stages payloads as files in a private temp directory.
///
/// The directory and any leftover files go away when the host is dropped.
#[derive(Debug)]
pub struct FileResourceHost {
    dir: tempfile::TempDir,
    files: HashMap<HandleId, PathBuf>,
}

impl FileResourceHost {
    pub fn new() -> Result<Self, ResourceError> {
        let dir = tempfile::Builder::new().prefix("docpane-").tempdir()?;
        Ok(Self {
            dir,
            files: HashMap::new(),
        })
    }
}

impl ResourceHost for FileResourceHost {
    fn create(
        &mut self,
        id: HandleId,
        payload: &RawPayload,
        category: ContentCategory,
    ) -> Result<String, ResourceError> {
        let path = self
            .dir
            .path()
            .join(format!("doc-{}.{}", id.0, category.extension()));
        fs::write(&path, payload.as_slice())?;
        self.files.insert(id, path.clone());
        Ok(path.display().to_string())
    }

    fn revoke(&mut self, id: HandleId) {
        if let Some(path) = self.files.remove(&id) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("could not remove staged file {}: {e}", path.display());
            }
        }
    }
}
