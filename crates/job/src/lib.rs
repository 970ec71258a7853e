//! Job - JSON document description and rendering
//!
//! This crate provides:
//! - Job JSON schema types (fonts, pages, text items)
//! - Job parsing and validation
//! - Rendering a job to PDF, fetching fonts that are not on disk yet
//!
//! # Example
//!
//! ```ignore
//! use job::{Job, JobRenderer};
//!
//! let job = Job::load("zh_multi.json")?;
//! let pdf_bytes = JobRenderer::new(&job).render()?;
//! ```

pub mod parser;
mod renderer;
mod schema;

pub use parser::parse_job;
pub use renderer::JobRenderer;
pub use schema::*;

use thiserror::Error;

/// Errors that can occur during job processing
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to parse job: {0}")]
    ParseError(String),

    #[error("Invalid job: {0}")]
    ValidationError(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] font_fetch::FetchError),

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for job operations
pub type Result<T> = std::result::Result<T, JobError>;
