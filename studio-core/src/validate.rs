//! Structural validation of candidate documents.
//!
//! Every imported or restored document MUST pass [`validate_document`] before
//! it reaches the engine. Validation never mutates its input and reports every
//! problem it finds rather than stopping at the first.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::element::ELEMENT_TYPES;
use crate::Document;

/// Maximum length for element IDs (UUIDs are 36 chars).
pub const MAX_ELEMENT_ID_LEN: usize = 64;
/// Maximum text content length in elements.
pub const MAX_TEXT_CONTENT_LEN: usize = 1_048_576; // 1MB
/// Maximum pages per document.
pub const MAX_PAGES: usize = 100;
/// Maximum elements per document, all pages and groups included.
pub const MAX_ELEMENTS_PER_DOCUMENT: usize = 10_000;

/// A semantic problem in an otherwise parseable document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A value that must be an object is not.
    #[error("{path}: expected an object")]
    NotAnObject {
        /// Location of the value.
        path: String,
    },
    /// A required field is absent.
    #[error("{path}: missing field `{field}`")]
    MissingField {
        /// Location of the object.
        path: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field has the wrong JSON type.
    #[error("{path}.{field}: expected {expected}")]
    WrongType {
        /// Location of the object.
        path: String,
        /// Name of the field.
        field: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },
    /// Canvas size is not a positive finite number.
    #[error("document {field} must be a positive number")]
    InvalidCanvasSize {
        /// `width` or `height`.
        field: &'static str,
    },
    /// Document has no pages.
    #[error("document has no pages")]
    NoPages,
    /// Document has too many pages.
    #[error("too many pages (max {MAX_PAGES})")]
    TooManyPages,
    /// Too many elements in the document.
    #[error("too many elements (max {MAX_ELEMENTS_PER_DOCUMENT})")]
    TooManyElements,
    /// Element ID is empty or contains invalid characters.
    #[error("{path}: element id `{id}` contains invalid characters")]
    InvalidId {
        /// Location of the element.
        path: String,
        /// Offending identifier.
        id: String,
    },
    /// Element ID exceeds maximum length.
    #[error("{path}: element id too long (max {MAX_ELEMENT_ID_LEN} chars)")]
    IdTooLong {
        /// Location of the element.
        path: String,
    },
    /// Two elements on one page share an identifier.
    #[error("page {page}: duplicate element id `{id}`")]
    DuplicateId {
        /// Index of the page.
        page: usize,
        /// Shared identifier.
        id: String,
    },
    /// Element `type` is not one the engine understands.
    #[error("{path}: unknown element type `{kind}`")]
    UnknownElementType {
        /// Location of the element.
        path: String,
        /// Unknown type name.
        kind: String,
    },
    /// A geometry value is NaN or infinite.
    #[error("{path}.{field}: must be a finite number")]
    NonFiniteGeometry {
        /// Location of the element.
        path: String,
        /// Geometry field.
        field: &'static str,
    },
    /// Width or height is negative.
    #[error("{path}.{field}: must not be negative")]
    NegativeSize {
        /// Location of the element.
        path: String,
        /// `width` or `height`.
        field: &'static str,
    },
    /// Text content exceeds maximum length.
    #[error("{path}: text content too long (max {MAX_TEXT_CONTENT_LEN} bytes)")]
    TextContentTooLong {
        /// Location of the element.
        path: String,
    },
    /// The value does not deserialize into the document schema.
    #[error("schema mismatch: {0}")]
    Schema(String),
}

/// Check if a character is valid for IDs (alphanumeric, hyphen, or underscore).
fn is_valid_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Validate a candidate document.
///
/// Returns an empty list when the candidate can be committed.
#[must_use]
pub fn validate_document(candidate: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let Some(root) = candidate.as_object() else {
        errors.push(ValidationError::NotAnObject {
            path: "document".to_string(),
        });
        return errors;
    };

    for field in ["width", "height"] {
        match root.get(field).and_then(Value::as_f64) {
            Some(v) if v.is_finite() && v > 0.0 => {}
            _ => errors.push(ValidationError::InvalidCanvasSize { field }),
        }
    }

    let pages = match root.get("pages") {
        Some(Value::Array(pages)) => pages,
        Some(_) => {
            errors.push(ValidationError::WrongType {
                path: "document".to_string(),
                field: "pages",
                expected: "an array",
            });
            return errors;
        }
        None => {
            errors.push(ValidationError::MissingField {
                path: "document".to_string(),
                field: "pages",
            });
            return errors;
        }
    };

    if pages.is_empty() {
        errors.push(ValidationError::NoPages);
    }
    if pages.len() > MAX_PAGES {
        errors.push(ValidationError::TooManyPages);
    }

    let mut total = 0usize;
    for (index, page) in pages.iter().enumerate() {
        let path = format!("pages[{index}]");
        let Some(page_obj) = page.as_object() else {
            errors.push(ValidationError::NotAnObject { path });
            continue;
        };
        if !page_obj.get("id").is_some_and(Value::is_string) {
            errors.push(ValidationError::MissingField {
                path: path.clone(),
                field: "id",
            });
        }
        match page_obj.get("children") {
            None => {}
            Some(Value::Array(children)) => {
                let mut seen = HashSet::new();
                validate_elements(children, &path, index, &mut seen, &mut total, &mut errors);
            }
            Some(_) => errors.push(ValidationError::WrongType {
                path,
                field: "children",
                expected: "an array",
            }),
        }
    }

    if total > MAX_ELEMENTS_PER_DOCUMENT {
        errors.push(ValidationError::TooManyElements);
    }

    if errors.is_empty() {
        if let Err(e) = serde_json::from_value::<Document>(candidate.clone()) {
            errors.push(ValidationError::Schema(e.to_string()));
        }
    }

    errors
}

fn validate_elements(
    elements: &[Value],
    parent: &str,
    page: usize,
    seen: &mut HashSet<String>,
    total: &mut usize,
    errors: &mut Vec<ValidationError>,
) {
    for (i, element) in elements.iter().enumerate() {
        *total += 1;
        let path = format!("{parent}.children[{i}]");
        let Some(obj) = element.as_object() else {
            errors.push(ValidationError::NotAnObject { path });
            continue;
        };

        validate_id(obj, &path, page, seen, errors);
        validate_geometry(obj, &path, errors);

        match obj.get("type").and_then(Value::as_str) {
            None => errors.push(ValidationError::MissingField {
                path: path.clone(),
                field: "type",
            }),
            Some(kind) if !ELEMENT_TYPES.contains(&kind) => {
                errors.push(ValidationError::UnknownElementType {
                    path: path.clone(),
                    kind: kind.to_string(),
                });
            }
            Some("text") => {
                if obj
                    .get("text")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.len() > MAX_TEXT_CONTENT_LEN)
                {
                    errors.push(ValidationError::TextContentTooLong { path: path.clone() });
                }
            }
            Some("group") => match obj.get("children") {
                Some(Value::Array(children)) => {
                    validate_elements(children, &path, page, seen, total, errors);
                }
                _ => errors.push(ValidationError::WrongType {
                    path: path.clone(),
                    field: "children",
                    expected: "an array",
                }),
            },
            Some(_) => {}
        }
    }
}

fn validate_id(
    obj: &Map<String, Value>,
    path: &str,
    page: usize,
    seen: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(id) = obj.get("id").and_then(Value::as_str) else {
        errors.push(ValidationError::MissingField {
            path: path.to_string(),
            field: "id",
        });
        return;
    };
    if id.len() > MAX_ELEMENT_ID_LEN {
        errors.push(ValidationError::IdTooLong {
            path: path.to_string(),
        });
    } else if id.is_empty() || !id.chars().all(is_valid_id_char) {
        errors.push(ValidationError::InvalidId {
            path: path.to_string(),
            id: id.to_string(),
        });
    }
    if !seen.insert(id.to_string()) {
        errors.push(ValidationError::DuplicateId {
            page,
            id: id.to_string(),
        });
    }
}

fn validate_geometry(obj: &Map<String, Value>, path: &str, errors: &mut Vec<ValidationError>) {
    for field in ["x", "y", "width", "height"] {
        match obj.get(field) {
            None => errors.push(ValidationError::MissingField {
                path: path.to_string(),
                field,
            }),
            Some(Value::Number(n)) => {
                let v = n.as_f64().unwrap_or(f64::NAN);
                if !v.is_finite() {
                    errors.push(ValidationError::NonFiniteGeometry {
                        path: path.to_string(),
                        field,
                    });
                } else if (field == "width" || field == "height") && v < 0.0 {
                    errors.push(ValidationError::NegativeSize {
                        path: path.to_string(),
                        field,
                    });
                }
            }
            Some(_) => errors.push(ValidationError::WrongType {
                path: path.to_string(),
                field,
                expected: "a number",
            }),
        }
    }
    if let Some(rotation) = obj.get("rotation") {
        if !rotation.as_f64().is_some_and(f64::is_finite) {
            errors.push(ValidationError::NonFiniteGeometry {
                path: path.to_string(),
                field: "rotation",
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(id: &str) -> Value {
        json!({
            "id": id, "type": "text", "text": "hi", "fontSize": 12, "fill": "black",
            "x": 0, "y": 0, "width": 10, "height": 10
        })
    }

    fn doc(children: Vec<Value>) -> Value {
        json!({"width": 100, "height": 100, "pages": [{"id": "p1", "children": children}]})
    }

    #[test]
    fn test_valid_document_has_no_errors() {
        assert!(validate_document(&doc(vec![text("a"), text("b")])).is_empty());
    }

    #[test]
    fn test_not_an_object() {
        let errors = validate_document(&json!([1, 2]));
        assert_eq!(
            errors,
            vec![ValidationError::NotAnObject {
                path: "document".into()
            }]
        );
    }

    #[test]
    fn test_missing_pages() {
        let errors = validate_document(&json!({"width": 1, "height": 1}));
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::MissingField { field: "pages", .. }]
        ));
    }

    #[test]
    fn test_empty_pages_rejected() {
        let errors = validate_document(&json!({"width": 1, "height": 1, "pages": []}));
        assert!(errors.contains(&ValidationError::NoPages));
    }

    #[test]
    fn test_bad_canvas_size() {
        let errors = validate_document(&json!({"width": 0, "height": -3, "pages": [{"id": "p"}]}));
        assert!(errors.contains(&ValidationError::InvalidCanvasSize { field: "width" }));
        assert!(errors.contains(&ValidationError::InvalidCanvasSize { field: "height" }));
    }

    #[test]
    fn test_duplicate_ids_within_page() {
        let errors = validate_document(&doc(vec![text("a"), text("a")]));
        assert!(errors.contains(&ValidationError::DuplicateId {
            page: 0,
            id: "a".into()
        }));
    }

    #[test]
    fn test_duplicate_ids_inside_group() {
        let group = json!({
            "id": "g", "type": "group", "x": 0, "y": 0, "width": 1, "height": 1,
            "children": [text("a")]
        });
        let errors = validate_document(&doc(vec![text("a"), group]));
        assert!(errors.contains(&ValidationError::DuplicateId {
            page: 0,
            id: "a".into()
        }));
    }

    #[test]
    fn test_same_id_on_different_pages_is_fine() {
        let value = json!({
            "width": 100, "height": 100,
            "pages": [{"id": "p1", "children": [text("a")]}, {"id": "p2", "children": [text("a")]}]
        });
        assert!(validate_document(&value).is_empty());
    }

    #[test]
    fn test_unknown_type_and_bad_id() {
        let mut bad = text("has space");
        bad["type"] = json!("hologram");
        let errors = validate_document(&doc(vec![bad]));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownElementType { kind, .. } if kind == "hologram")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidId { .. })));
    }

    #[test]
    fn test_geometry_checks() {
        let mut el = text("a");
        el["width"] = json!(-1);
        el["y"] = json!("top");
        el.as_object_mut().expect("object").remove("x");
        let errors = validate_document(&doc(vec![el]));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::NegativeSize { field: "width", .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::WrongType { field: "y", .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingField { field: "x", .. })));
    }

    #[test]
    fn test_schema_mismatch_reported() {
        // Passes structural checks, but a text element without fontSize is not a document.
        let el = json!({
            "id": "a", "type": "text", "text": "hi", "fill": "black",
            "x": 0, "y": 0, "width": 10, "height": 10
        });
        let errors = validate_document(&doc(vec![el]));
        assert!(matches!(errors.as_slice(), [ValidationError::Schema(_)]));
    }

    #[test]
    fn test_id_length_limit() {
        let long = "a".repeat(MAX_ELEMENT_ID_LEN + 1);
        let errors = validate_document(&doc(vec![text(&long)]));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::IdTooLong { .. })));
    }
}
