//! Pagination tracking
//!
//! Command/effect state machine for the current-page bookkeeping of a
//! paginated document. Commands come from the host surface (navigation
//! buttons), the engine (load outcomes) and the presentation layer
//! (visibility reports); effects are side requests the shell executes.

use log::debug;

use crate::engine::RenderLoadError;

/// Visibility sample for one page, as observed by the presentation layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageVisibility {
    /// 1-based page number
    pub page: usize,
    /// Fraction of the page inside the scroll window, 0.0..=1.0
    pub ratio: f32,
}

/// State transitions of the tracker
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Engine opened the document
    DocumentLoaded { page_count: usize },
    /// Engine rejected the document
    DocumentLoadFailed { error: RenderLoadError },
    /// Explicit navigation to a page
    GoTo(usize),
    /// Explicit navigation one page back
    Prev,
    /// Explicit navigation one page forward
    Next,
    /// Fresh visibility ratios from the presentation layer
    VisibilityChanged(Vec<PageVisibility>),
    /// Forget the document
    Clear,
}

/// Side requests produced by `apply`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Scroll so the page is centered in the viewport
    ScrollToPage(usize),
}

/// Current-page bookkeeping for one document
#[derive(Clone, Debug, PartialEq)]
pub struct PaginationState {
    /// 1-based current page; meaningful only while `page_count > 0`
    pub current_page: usize,

    /// Total pages; 0 means no paginated document is loaded
    pub page_count: usize,

    /// Last load failure, cleared by the next successful load
    pub error: Option<RenderLoadError>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_count: 0,
            error: None,
        }
    }
}

impl PaginationState {
    /// Returns true once a document has reported its page count
    pub fn is_loaded(&self) -> bool {
        self.page_count > 0
    }

    /// Returns true when backward navigation would be a no-op
    pub fn at_first(&self) -> bool {
        self.current_page <= 1
    }

    /// Returns true when forward navigation would be a no-op
    pub fn at_last(&self) -> bool {
        self.page_count > 0 && self.current_page >= self.page_count
    }

    /// Apply a command, returning the effects the shell should execute
    pub fn apply(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::DocumentLoaded { page_count } => {
                self.page_count = page_count;
                self.current_page = 1;
                self.error = None;
                vec![]
            }
            Command::DocumentLoadFailed { error } => {
                debug!("document load failed: {error}");
                self.page_count = 0;
                self.current_page = 1;
                self.error = Some(error);
                vec![]
            }
            Command::GoTo(page) => self.go_to(page),
            Command::Prev => self.go_to(self.current_page.saturating_sub(1)),
            Command::Next => self.go_to(self.current_page + 1),
            Command::VisibilityChanged(samples) => {
                self.adopt_dominant(&samples);
                vec![]
            }
            Command::Clear => {
                *self = Self::default();
                vec![]
            }
        }
    }

    /// Clamped navigation. Emits a scroll request only when the current
    /// page actually changes, which keeps prev/next at the edges silent.
    fn go_to(&mut self, page: usize) -> Vec<Effect> {
        if self.page_count == 0 {
            return vec![];
        }
        let target = page.clamp(1, self.page_count);
        if target == self.current_page {
            return vec![];
        }
        self.current_page = target;
        vec![Effect::ScrollToPage(target)]
    }

    /// Adopt the dominant visible page without scrolling.
    ///
    /// The tracker follows where the user already is; emitting a scroll
    /// here would fight their own scrolling. Ties keep the
    /// first-encountered sample, and out-of-range pages are ignored.
    fn adopt_dominant(&mut self, samples: &[PageVisibility]) {
        if self.page_count == 0 {
            return;
        }
        let mut dominant: Option<PageVisibility> = None;
        for sample in samples {
            if sample.page == 0 || sample.page > self.page_count {
                continue;
            }
            if !sample.ratio.is_finite() || sample.ratio <= 0.0 {
                continue;
            }
            match dominant {
                Some(best) if sample.ratio <= best.ratio => {}
                _ => dominant = Some(*sample),
            }
        }
        if let Some(best) = dominant {
            if best.page != self.current_page {
                debug!(
                    "visibility adoption: page {} -> {} (ratio {:.2})",
                    self.current_page, best.page, best.ratio
                );
                self.current_page = best.page;
            }
        }
    }
}
