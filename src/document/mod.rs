//! Registry documents and submission outcomes.

mod result;
mod types;

pub use result::{Failure, SubmissionResult, Success};
pub use types::{Document, DocumentFormat};
