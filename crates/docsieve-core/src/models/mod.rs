//! Data models shared by every decoder path.

pub mod config;
pub mod document;

pub use config::{DocsieveConfig, LimitsConfig, PdfConfig, ServerConfig};
pub use document::{PageText, SourceDocument};
