//! Crpt Submitter - rate-limited document registry client
//!
//! This crate submits signed documents to the CRPT registry while keeping
//! the whole process under a fixed-window rate limit. Callers that would
//! exceed the limit are suspended until the window resets instead of failing.
//!
//! ```no_run
//! use crpt_submitter::config::ClientConfig;
//! use crpt_submitter::document::{Document, DocumentFormat};
//! use crpt_submitter::DocumentSubmitter;
//!
//! # async fn run() -> crpt_submitter::error::Result<()> {
//! let submitter = DocumentSubmitter::from_config(&ClientConfig::default())?;
//! let document = Document::new(DocumentFormat::Manual, "productDocument", "milk");
//! let result = submitter.submit(document, "signature", "milk").await?;
//! println!("accepted: {}", result.is_success());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod ratelimit;
pub mod submitter;
pub mod transport;

pub use submitter::{build_url, DocumentSubmitter};
