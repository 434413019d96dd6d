//! Responder plugins.

mod log;

pub use log::LogResponder;
