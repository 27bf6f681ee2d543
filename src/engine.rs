//! Rendering engine contract
//!
//! The engine is an external collaborator: the panel hands it a staged
//! resource and the engine answers asynchronously with events on a flume
//! channel. Every event carries the load generation it belongs to, so the
//! panel can discard answers that arrive after the document they describe
//! has been replaced.

use thiserror::Error;

use crate::resource::ResourceHandle;

/// Monotonic document load counter. Bumped by the viewer on every source
/// change; events tagged with an older value are stale.
pub type Generation = u64;

/// Engine rejected or could not service a document
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RenderLoadError {
    #[error("unsupported or corrupt document: {detail}")]
    Unsupported { detail: String },
    #[error("no render engine available")]
    Unavailable,
}

/// Outcome of an engine load, delivered on the event channel
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Document opened successfully
    Opened {
        generation: Generation,
        page_count: usize,
    },
    /// Natural size of the first page, in points. Arrives after `Opened`.
    PageSized {
        generation: Generation,
        width: f32,
        height: f32,
    },
    /// Load failed
    Failed {
        generation: Generation,
        error: RenderLoadError,
    },
}

impl EngineEvent {
    /// Generation of the load this event answers
    pub fn generation(&self) -> Generation {
        match self {
            Self::Opened { generation, .. }
            | Self::PageSized { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// A document rendering backend.
///
/// `open` must not block the caller; outcomes are reported as events, at
/// most one `Opened` or `Failed` per load. `cancel` is an optimization
/// hook only, stale events are filtered by generation regardless.
pub trait RenderEngine {
    fn open(&mut self, generation: Generation, handle: &ResourceHandle);

    fn cancel(&mut self) {}
}

/// Channel the engine reports on and the viewer drains from
pub fn engine_channel() -> (flume::Sender<EngineEvent>, flume::Receiver<EngineEvent>) {
    flume::unbounded()
}

/// Stand-in engine for builds without a rendering backend.
///
/// Fails every paginated load immediately so the panel reports a clear
/// error instead of loading forever.
pub struct NoEngine {
    events: flume::Sender<EngineEvent>,
}

impl NoEngine {
    #[must_use]
    pub fn new(events: flume::Sender<EngineEvent>) -> Self {
        Self { events }
    }
}

impl RenderEngine for NoEngine {
    fn open(&mut self, generation: Generation, _handle: &ResourceHandle) {
        let _ = self.events.send(EngineEvent::Failed {
            generation,
            error: RenderLoadError::Unavailable,
        });
    }
}

/// MuPDF-backed engine. Opens the staged file on a worker thread and
/// reports page count plus first-page bounds.
#[cfg(feature = "mupdf")]
pub struct MupdfEngine {
    events: flume::Sender<EngineEvent>,
}

#[cfg(feature = "mupdf")]
impl MupdfEngine {
    #[must_use]
    pub fn new(events: flume::Sender<EngineEvent>) -> Self {
        Self { events }
    }

    fn probe(path: &str) -> Result<(usize, f32, f32), mupdf::error::Error> {
        let doc = mupdf::Document::open(path)?;
        let count = doc.page_count()?.max(0) as usize;
        let page = doc.load_page(0)?;
        let bounds = page.bounds()?;
        Ok((count, bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }
}

#[cfg(feature = "mupdf")]
impl RenderEngine for MupdfEngine {
    fn open(&mut self, generation: Generation, handle: &ResourceHandle) {
        let events = self.events.clone();
        let path = handle.uri.clone();
        std::thread::spawn(move || {
            match MupdfEngine::probe(&path) {
                Ok((page_count, width, height)) => {
                    let _ = events.send(EngineEvent::Opened {
                        generation,
                        page_count,
                    });
                    let _ = events.send(EngineEvent::PageSized {
                        generation,
                        width,
                        height,
                    });
                }
                Err(e) => {
                    log::error!("mupdf could not open {path}: {e}");
                    let _ = events.send(EngineEvent::Failed {
                        generation,
                        error: RenderLoadError::Unsupported {
                            detail: e.to_string(),
                        },
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ContentCategory;
    use crate::resource::HandleId;

    fn handle() -> ResourceHandle {
        ResourceHandle {
            id: HandleId(1),
            uri: "mem://1".into(),
            category: ContentCategory::Pdf,
            len: 4,
        }
    }

    #[test]
    fn event_generation_accessor_covers_all_variants() {
        let opened = EngineEvent::Opened {
            generation: 3,
            page_count: 5,
        };
        let sized = EngineEvent::PageSized {
            generation: 4,
            width: 612.0,
            height: 792.0,
        };
        let failed = EngineEvent::Failed {
            generation: 5,
            error: RenderLoadError::Unavailable,
        };
        assert_eq!(opened.generation(), 3);
        assert_eq!(sized.generation(), 4);
        assert_eq!(failed.generation(), 5);
    }

    #[test]
    fn no_engine_fails_the_load_it_was_given() {
        let (tx, rx) = engine_channel();
        let mut engine = NoEngine::new(tx);
        engine.open(7, &handle());
        match rx.try_recv().unwrap() {
            EngineEvent::Failed { generation, error } => {
                assert_eq!(generation, 7);
                assert_eq!(error, RenderLoadError::Unavailable);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
