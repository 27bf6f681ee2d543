//! Test doubles and payload fixtures
//!
//! Recording implementations of the collaborator seams, so the panel can
//! be exercised without a real engine or host. Integration tests emit
//! engine events themselves on the channel handed back by
//! `recording_viewer`, playing the engine's role.

use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::config::ViewerConfig;
use crate::decode::{ContentCategory, RawPayload};
use crate::engine::{EngineEvent, Generation, RenderEngine, engine_channel};
use crate::resource::{HandleId, ResourceError, ResourceHost};
use crate::viewer::DocViewer;

/// One observed host call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    Created(HandleId),
    Revoked(HandleId),
}

#[derive(Default)]
struct JournalInner {
    events: Vec<HostEvent>,
    live: Vec<HandleId>,
    fail_next_create: bool,
}

/// Shared view into what a `RecordingHost` saw
#[derive(Clone, Default)]
pub struct HostJournal(Arc<Mutex<JournalInner>>);

impl HostJournal {
    /// Every create/revoke in call order
    pub fn events(&self) -> Vec<HostEvent> {
        self.0.lock().map(|j| j.events.clone()).unwrap_or_default()
    }

    /// Handles created and not yet revoked
    pub fn live_count(&self) -> usize {
        self.0.lock().map(|j| j.live.len()).unwrap_or(0)
    }

    /// How many times the given handle was revoked
    pub fn revocations_of(&self, id: HandleId) -> usize {
        self.0
            .lock()
            .map(|j| {
                j.events
                    .iter()
                    .filter(|e| **e == HostEvent::Revoked(id))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Make the next create call fail
    pub fn fail_next_create(&self) {
        if let Ok(mut journal) = self.0.lock() {
            journal.fail_next_create = true;
        }
    }
}

/// Host that stages nothing and records everything
pub struct RecordingHost {
    journal: HostJournal,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> (Self, HostJournal) {
        let journal = HostJournal::default();
        (
            Self {
                journal: journal.clone(),
            },
            journal,
        )
    }
}

impl ResourceHost for RecordingHost {
    fn create(
        &mut self,
        id: HandleId,
        _payload: &RawPayload,
        _category: ContentCategory,
    ) -> Result<String, ResourceError> {
        if let Ok(mut journal) = self.journal.0.lock() {
            if journal.fail_next_create {
                journal.fail_next_create = false;
                return Err(ResourceError::Host {
                    detail: "injected create failure".into(),
                });
            }
            journal.events.push(HostEvent::Created(id));
            journal.live.push(id);
        }
        Ok(format!("mem://{}", id.0))
    }

    fn revoke(&mut self, id: HandleId) {
        if let Ok(mut journal) = self.journal.0.lock() {
            journal.events.push(HostEvent::Revoked(id));
            journal.live.retain(|live| *live != id);
        }
    }
}

#[derive(Default)]
struct EngineLogInner {
    opens: Vec<(Generation, HandleId)>,
    cancels: usize,
}

/// Shared view into what a `RecordingEngine` was asked to do
#[derive(Clone, Default)]
pub struct EngineLog(Arc<Mutex<EngineLogInner>>);

impl EngineLog {
    /// Every open request as (generation, handle id), in call order
    pub fn opens(&self) -> Vec<(Generation, HandleId)> {
        self.0.lock().map(|l| l.opens.clone()).unwrap_or_default()
    }

    pub fn cancel_count(&self) -> usize {
        self.0.lock().map(|l| l.cancels).unwrap_or(0)
    }
}

/// Engine that records requests and answers nothing on its own
pub struct RecordingEngine {
    log: EngineLog,
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> (Self, EngineLog) {
        let log = EngineLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl RenderEngine for RecordingEngine {
    fn open(&mut self, generation: Generation, handle: &crate::resource::ResourceHandle) {
        if let Ok(mut log) = self.log.0.lock() {
            log.opens.push((generation, handle.id));
        }
    }

    fn cancel(&mut self) {
        if let Ok(mut log) = self.log.0.lock() {
            log.cancels += 1;
        }
    }
}

/// Viewer wired over recording doubles. The returned sender plays the
/// engine's part: tests push `EngineEvent`s and then `poll_engine`.
#[must_use]
pub fn recording_viewer(
    config: ViewerConfig,
) -> (
    DocViewer<RecordingHost>,
    HostJournal,
    EngineLog,
    flume::Sender<EngineEvent>,
) {
    let (tx, rx) = engine_channel();
    let (host, journal) = RecordingHost::new();
    let (engine, log) = RecordingEngine::new();
    let viewer = DocViewer::new(config, host, Box::new(engine), rx);
    (viewer, journal, log, tx)
}

/// Base64 of a minimal PDF-shaped payload
pub fn pdf_base64() -> String {
    STANDARD.encode(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< >>\n%%EOF\n")
}

/// Base64 of a JPEG header. Classifies as JPEG; too short to probe.
pub fn jpeg_base64() -> String {
    STANDARD.encode(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00])
}

/// Base64 of a PNG whose IHDR declares the given dimensions
pub fn png_base64_with_size(width: u32, height: u32) -> String {
    let mut bytes = Vec::with_capacity(33);
    bytes.extend_from_slice(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    // bit depth, color type, compression, filter, interlace
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    // CRC is not checked by the size probe
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    STANDARD.encode(&bytes)
}

/// Text that is not valid base64
pub fn malformed_base64() -> String {
    "this is !!! not base64 at all".to_string()
}
