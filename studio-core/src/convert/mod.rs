//! Format converters between external files and document JSON.
//!
//! Every converter is a pure function of its input bytes: the same bytes always
//! produce the same candidate (or the same failure).

pub mod json;
pub mod svg;
pub mod svg_export;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::import::{DeclaredFormat, ImportRequest};

pub use json::document_json_from_bytes;
pub use svg::{vector_graphics_to_document_json, DroppedPrimitive, SvgConversion};
pub use svg_export::page_to_svg;

/// A parsed document that has not been validated or committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateDocument(serde_json::Value);

impl CandidateDocument {
    /// Wrap a JSON value.
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The JSON value.
    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Take the JSON value.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

/// Output of converting an [`ImportRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Format the request was converted from.
    pub format: DeclaredFormat,
    /// The candidate document.
    pub candidate: CandidateDocument,
    /// Primitives dropped by a lossy conversion.
    pub dropped: Vec<DroppedPrimitive>,
}

/// Escape text for use in XML content and attribute values.
pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Dispatch a request to the converter for its declared format.
///
/// # Errors
///
/// Returns [`ImportError::Parse`] or [`ImportError::Conversion`] when the bytes
/// do not conform to the declared format.
pub fn convert(request: ImportRequest) -> Result<Conversion, ImportError> {
    let format = request.format();
    let bytes = request.into_bytes();
    match format {
        DeclaredFormat::DocumentJson => Ok(Conversion {
            format,
            candidate: CandidateDocument::new(document_json_from_bytes(&bytes)?),
            dropped: Vec::new(),
        }),
        DeclaredFormat::VectorGraphics => {
            let converted = vector_graphics_to_document_json(&bytes)?;
            Ok(Conversion {
                format,
                candidate: converted.candidate,
                dropped: converted.dropped,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
        assert_eq!(escape_xml("plain"), "plain");
    }
}
