/// Local image handling
///
/// This module handles:
/// - Loading source photos from disk or a URL (loader.rs)
/// - Building window-sized previews (preview.rs)
/// - Writing the generated image to disk (export.rs)

pub mod export;
pub mod loader;
pub mod preview;
