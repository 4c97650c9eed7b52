//! Document wire model.

use serde::{Deserialize, Serialize};

/// Encoding of the product document payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentFormat {
    Manual,
    Xml,
    Csv,
}

/// A document to be registered.
///
/// The signature is attached right before submission and is empty until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "document_format")]
    format: DocumentFormat,
    product_document: String,
    product_group: String,
    #[serde(default)]
    signature: String,
}

impl Document {
    /// Create an unsigned document.
    pub fn new(
        format: DocumentFormat,
        product_document: impl Into<String>,
        product_group: impl Into<String>,
    ) -> Self {
        Self {
            format,
            product_document: product_document.into(),
            product_group: product_group.into(),
            signature: String::new(),
        }
    }

    /// Attach the signature, replacing any previous one.
    pub fn sign(&mut self, signature: impl Into<String>) {
        self.signature = signature.into();
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Get the opaque payload.
    pub fn product_document(&self) -> &str {
        &self.product_document
    }

    pub fn product_group(&self) -> &str {
        &self.product_group
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Encode the document as the registry's JSON request body.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
