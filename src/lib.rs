// Export modules for use in tests
pub mod config;
pub mod decode;
pub mod engine;
pub mod export;
pub mod pagination;
pub mod panic_handler;
pub mod resource;
pub mod scale;
pub mod session;
pub mod viewer;
pub mod widget;

pub mod test_utils;

// Re-export the panel surface
pub use decode::ContentCategory;
pub use viewer::{DocViewer, DocumentSource, DocumentState, ViewerCommand, ViewerEffect};
pub use widget::{DocPanel, ShellState};
