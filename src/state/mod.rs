/// State management module
///
/// This module handles all application state, including:
/// - The images flowing through one run of the tool (data.rs)
/// - The session that ties source, prompt, key and result together (session.rs)

pub mod data;
pub mod session;

pub use data::{ResultImage, SourceImage, SourceOrigin};
pub use session::{Session, DEFAULT_PROMPT};
