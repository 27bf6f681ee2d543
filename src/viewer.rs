//! Viewer panel core
//!
//! `DocViewer` ties the pieces together: it takes sources from the host
//! bridge, decodes and stages them, asks the engine to open paginated
//! documents, and answers host commands. It is single threaded; engine
//! outcomes arrive on a channel and are drained with `poll_engine`.

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::ViewerConfig;
use crate::decode;
use crate::decode::ContentCategory;
use crate::engine::{EngineEvent, Generation, RenderEngine, RenderLoadError};
use crate::export::DownloadRequest;
use crate::pagination::{
    Command as PageCommand, Effect as PageEffect, PageVisibility, PaginationState,
};
use crate::resource::{ResourceHandle, ResourceHost, ResourceManager};
use crate::scale::{self, ViewportGeometry, Zoom};
use crate::session;

/// Document pushed in by the host bridge
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSource {
    /// Base64 text of the payload
    pub base64: String,
    /// Name the document is known by, used for the footer and downloads
    pub filename: String,
}

/// Failure surfaced in `DocumentState::Error`
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ViewerError {
    #[error("could not decode document payload: {detail}")]
    Decode { detail: String },
    #[error("could not stage document for display: {detail}")]
    Resource { detail: String },
    #[error(transparent)]
    Render(#[from] RenderLoadError),
}

/// Host-facing snapshot of the panel
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentState {
    /// No source supplied. Not an error.
    Empty,
    /// Paginated document handed to the engine, answer pending
    Loading {
        category: ContentCategory,
        filename: String,
    },
    /// Document on screen. Page fields are meaningful only for the
    /// paginated category; images load with `page_count` 0.
    Loaded {
        category: ContentCategory,
        filename: String,
        page_count: usize,
        current_page: usize,
    },
    /// Load failed; `reason` is ready for display
    Error { reason: String },
}

/// Commands from the host surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerCommand {
    GoToPage(usize),
    PrevPage,
    NextPage,
    ZoomIn,
    ZoomOut,
    ResetZoom,
}

/// Side requests the presentation layer executes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerEffect {
    /// Scroll so the page is centered in the viewport
    ScrollToPage(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Empty,
    Loading,
    Ready,
    Failed,
}

/// The viewer panel
pub struct DocViewer<H: ResourceHost> {
    config: ViewerConfig,
    resources: ResourceManager<H>,
    engine: Box<dyn RenderEngine>,
    engine_events: flume::Receiver<EngineEvent>,
    generation: Generation,
    phase: Phase,
    error: Option<ViewerError>,
    category: Option<ContentCategory>,
    filename: Option<String>,
    pagination: PaginationState,
    zoom: Zoom,
    viewport: ViewportGeometry,
}

impl<H: ResourceHost> DocViewer<H> {
    /// Wire up a panel over a resource host and a rendering engine.
    ///
    /// When the config allows it, the zoom factor recorded earlier in the
    /// session is restored; the panel starts at the configured initial
    /// factor otherwise.
    #[must_use]
    pub fn new(
        config: ViewerConfig,
        host: H,
        engine: Box<dyn RenderEngine>,
        engine_events: flume::Receiver<EngineEvent>,
    ) -> Self {
        let policy = config.zoom_policy();
        let zoom = if config.remember_zoom {
            match session::recall_zoom() {
                Some(factor) => Zoom::with_factor(policy, factor),
                None => Zoom::new(policy),
            }
        } else {
            Zoom::new(policy)
        };
        Self {
            config,
            resources: ResourceManager::new(host),
            engine,
            engine_events,
            generation: 0,
            phase: Phase::Empty,
            error: None,
            category: None,
            filename: None,
            pagination: PaginationState::default(),
            zoom,
            viewport: ViewportGeometry::default(),
        }
    }

    /// Host bridge entry point. Every call is a fresh load: the previous
    /// document's resources are released, pagination is cleared, and
    /// in-flight engine answers become stale. `None` or an empty payload
    /// puts the panel in the Empty state.
    pub fn set_source(&mut self, source: Option<DocumentSource>) {
        self.generation += 1;
        self.engine.cancel();
        self.pagination.apply(PageCommand::Clear);
        self.error = None;
        self.viewport.page_width = 0.0;
        self.viewport.page_height = 0.0;

        let Some(source) = source.filter(|s| !s.base64.is_empty()) else {
            self.resources.release_all();
            self.category = None;
            self.filename = None;
            self.phase = Phase::Empty;
            debug!("source cleared, panel empty");
            return;
        };

        match decode::decode(&source.base64) {
            Err(e) => {
                // Old resources go first so nothing outlives its payload.
                self.resources.release_all();
                self.category = None;
                self.filename = Some(source.filename);
                self.error = Some(ViewerError::Decode {
                    detail: e.to_string(),
                });
                self.phase = Phase::Failed;
            }
            Ok((payload, category)) => {
                self.category = Some(category);
                self.filename = Some(source.filename);
                let image_size = if category.is_paginated() {
                    None
                } else {
                    imagesize::blob_size(payload.as_slice()).ok()
                };
                match self.resources.publish(payload, category) {
                    Err(e) => {
                        self.error = Some(ViewerError::Resource {
                            detail: e.to_string(),
                        });
                        self.phase = Phase::Failed;
                    }
                    Ok(handle) => self.start_display(category, image_size, &handle),
                }
            }
        }
    }

    fn start_display(
        &mut self,
        category: ContentCategory,
        image_size: Option<imagesize::ImageSize>,
        handle: &ResourceHandle,
    ) {
        if category.is_paginated() {
            info!(
                "opening {} ({} bytes) with the render engine",
                handle.uri, handle.len
            );
            self.phase = Phase::Loading;
            self.engine.open(self.generation, handle);
        } else {
            match image_size {
                Some(size) => {
                    self.viewport.page_width = size.width as f32;
                    self.viewport.page_height = size.height as f32;
                }
                None => warn!("could not probe image dimensions for {}", handle.uri),
            }
            self.phase = Phase::Ready;
        }
    }

    /// Drain pending engine events. Returns true when visible state
    /// changed and the host should redraw.
    ///
    /// Events from a superseded load are dropped here; this is the whole
    /// staleness story, engines never need to cancel for correctness.
    pub fn poll_engine(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.engine_events.try_recv() {
            if event.generation() != self.generation {
                debug!(
                    "dropping stale engine event for generation {}",
                    event.generation()
                );
                continue;
            }
            match event {
                EngineEvent::Opened { page_count, .. } => {
                    if self.phase != Phase::Loading {
                        continue;
                    }
                    if page_count == 0 {
                        // A paginated document with no pages cannot be
                        // displayed; recast as an engine failure.
                        self.fail_render(RenderLoadError::Unsupported {
                            detail: "document has no pages".into(),
                        });
                    } else {
                        self.pagination
                            .apply(PageCommand::DocumentLoaded { page_count });
                        self.phase = Phase::Ready;
                        info!("document opened with {page_count} pages");
                    }
                    changed = true;
                }
                EngineEvent::PageSized { width, height, .. } => {
                    // First report wins; its dimensions stand in for
                    // every page of the document.
                    if !self.viewport.has_page() && width > 0.0 && height > 0.0 {
                        self.viewport.page_width = width;
                        self.viewport.page_height = height;
                        changed = true;
                    }
                }
                EngineEvent::Failed { error, .. } => {
                    if self.phase == Phase::Loading {
                        self.fail_render(error);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// The live handle stays staged: the payload may still be intact and
    /// downloadable even when the engine cannot display it.
    fn fail_render(&mut self, error: RenderLoadError) {
        self.pagination.apply(PageCommand::DocumentLoadFailed {
            error: error.clone(),
        });
        self.error = Some(ViewerError::Render(error));
        self.phase = Phase::Failed;
    }

    /// Apply a host command, returning effects for the shell
    pub fn apply(&mut self, command: ViewerCommand) -> Vec<ViewerEffect> {
        match command {
            ViewerCommand::GoToPage(page) => self.page_effects(PageCommand::GoTo(page)),
            ViewerCommand::PrevPage => self.page_effects(PageCommand::Prev),
            ViewerCommand::NextPage => self.page_effects(PageCommand::Next),
            ViewerCommand::ZoomIn => {
                if self.zoom.step_in() {
                    self.record_zoom();
                }
                vec![]
            }
            ViewerCommand::ZoomOut => {
                if self.zoom.step_out() {
                    self.record_zoom();
                }
                vec![]
            }
            ViewerCommand::ResetZoom => {
                if self.zoom.reset() {
                    self.record_zoom();
                }
                vec![]
            }
        }
    }

    fn page_effects(&mut self, command: PageCommand) -> Vec<ViewerEffect> {
        self.pagination
            .apply(command)
            .into_iter()
            .map(|effect| match effect {
                PageEffect::ScrollToPage(page) => ViewerEffect::ScrollToPage(page),
            })
            .collect()
    }

    fn record_zoom(&self) {
        if self.config.remember_zoom {
            session::remember_zoom(self.zoom.factor());
        }
    }

    /// Feed fresh visibility ratios from the presentation layer. Returns
    /// whether the current page changed. Adoption never scrolls.
    pub fn on_visibility_report(&mut self, samples: &[PageVisibility]) -> bool {
        let before = self.pagination.current_page;
        let effects = self
            .pagination
            .apply(PageCommand::VisibilityChanged(samples.to_vec()));
        debug_assert!(effects.is_empty());
        before != self.pagination.current_page
    }

    /// Container width from the resize observer, in layout px
    pub fn set_container_width(&mut self, width: f32) {
        self.viewport.container_width = width;
    }

    /// Effective on-screen scale for the current zoom and geometry
    pub fn display_scale(&self) -> f32 {
        scale::display_scale(&self.zoom, self.viewport)
    }

    /// True when the scaled page overflows the container horizontally
    pub fn horizontal_overflow(&self) -> bool {
        scale::horizontal_overflow(self.display_scale(), self.viewport)
    }

    /// Download descriptor for the live resource. `None` while nothing is
    /// staged; hosts disable the action then.
    pub fn download(&self) -> Option<DownloadRequest> {
        let handle = self.resources.live()?;
        let filename = self
            .filename
            .clone()
            .unwrap_or_else(|| "document".to_string());
        Some(DownloadRequest {
            filename,
            uri: handle.uri.clone(),
            category: handle.category,
        })
    }

    /// Host-facing snapshot
    pub fn state(&self) -> DocumentState {
        match (self.phase, self.category) {
            (Phase::Empty, _) => DocumentState::Empty,
            (Phase::Failed, _) => DocumentState::Error {
                reason: self
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
            (Phase::Loading, Some(category)) => DocumentState::Loading {
                category,
                filename: self.filename.clone().unwrap_or_default(),
            },
            (Phase::Ready, Some(category)) => DocumentState::Loaded {
                category,
                filename: self.filename.clone().unwrap_or_default(),
                page_count: self.pagination.page_count,
                current_page: self.pagination.current_page,
            },
            // Category is always set outside Empty/Failed.
            (Phase::Loading | Phase::Ready, None) => DocumentState::Empty,
        }
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn viewport(&self) -> ViewportGeometry {
        self.viewport
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn category(&self) -> Option<ContentCategory> {
        self.category
    }

    pub fn last_error(&self) -> Option<&ViewerError> {
        self.error.as_ref()
    }

    /// Current load generation; answers tagged lower than this are stale
    pub fn generation(&self) -> Generation {
        self.generation
    }
}
