//! Session-scoped viewer preferences
//!
//! The zoom factor is a session preference, not a document property: it
//! survives document swaps for as long as the process runs, and is never
//! persisted to disk. Panels record it on every zoom change and restore
//! it when a new panel comes up.

use std::sync::{LazyLock, RwLock};

#[derive(Debug, Default)]
struct SessionPrefs {
    zoom_factor: Option<f32>,
}

static SESSION: LazyLock<RwLock<SessionPrefs>> =
    LazyLock::new(|| RwLock::new(SessionPrefs::default()));

/// Record the zoom factor the user settled on
pub fn remember_zoom(factor: f32) {
    if let Ok(mut prefs) = SESSION.write() {
        prefs.zoom_factor = Some(factor);
    }
}

/// Zoom factor from earlier in the session, if any
pub fn recall_zoom() -> Option<f32> {
    SESSION.read().map(|p| p.zoom_factor).unwrap_or(None)
}

/// Forget session preferences. Panels never call this; it exists so
/// tests start from a clean slate.
pub fn reset() {
    if let Ok(mut prefs) = SESSION.write() {
        *prefs = SessionPrefs::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn remember_then_recall() {
        reset();
        assert_eq!(recall_zoom(), None);
        remember_zoom(1.75);
        assert_eq!(recall_zoom(), Some(1.75));
        reset();
        assert_eq!(recall_zoom(), None);
    }

    #[test]
    #[serial]
    fn later_value_wins() {
        reset();
        remember_zoom(0.5);
        remember_zoom(2.0);
        assert_eq!(recall_zoom(), Some(2.0));
        reset();
    }
}
