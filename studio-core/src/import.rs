//! Import requests and drag-and-drop gestures.

use serde::{Deserialize, Serialize};

use crate::error::{DropError, ImportError};
use crate::io::FileSource;

/// Extensions recognised as native document JSON.
const DOCUMENT_EXTENSIONS: &[&str] = &["json", "polotno"];

/// Extensions recognised as SVG.
const VECTOR_EXTENSIONS: &[&str] = &["svg"];

/// Format of an import, inferred from name or MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredFormat {
    /// Native document JSON.
    DocumentJson,
    /// SVG markup.
    VectorGraphics,
}

impl DeclaredFormat {
    /// Infer the format from a file name, falling back to the MIME type.
    #[must_use]
    pub fn infer(name: &str, mime: Option<&str>) -> Option<Self> {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        if let Some(ext) = extension.as_deref() {
            if DOCUMENT_EXTENSIONS.contains(&ext) {
                return Some(Self::DocumentJson);
            }
            if VECTOR_EXTENSIONS.contains(&ext) {
                return Some(Self::VectorGraphics);
            }
        }

        let mime = mime?.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/json" => Some(Self::DocumentJson),
            "image/svg+xml" => Some(Self::VectorGraphics),
            _ => None,
        }
    }
}

/// One file to import. Consumed by the conversion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    name: String,
    mime: Option<String>,
    bytes: Vec<u8>,
    format: DeclaredFormat,
}

impl ImportRequest {
    /// Build a request, inferring its format.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnsupportedFormat`] if neither the name nor the
    /// MIME type is recognised.
    pub fn new(
        name: impl Into<String>,
        mime: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, ImportError> {
        let name = name.into();
        let format = DeclaredFormat::infer(&name, mime.as_deref())
            .ok_or_else(|| ImportError::UnsupportedFormat(name.clone()))?;
        Ok(Self {
            name,
            mime,
            bytes,
            format,
        })
    }

    /// Read a file source into a request.
    ///
    /// The format is checked before the contents are read.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnsupportedFormat`] or [`ImportError::Read`].
    pub async fn from_source(source: &dyn FileSource) -> Result<Self, ImportError> {
        let name = source.name().to_string();
        let mime = source.mime().map(str::to_string);
        if DeclaredFormat::infer(&name, mime.as_deref()).is_none() {
            return Err(ImportError::UnsupportedFormat(name));
        }
        let bytes = source.read().await?;
        Self::new(name, mime, bytes)
    }

    /// File name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type.
    #[must_use]
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Inferred format.
    #[must_use]
    pub fn format(&self) -> DeclaredFormat {
        self.format
    }

    /// Size of the contents in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the contents are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Take the contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// One item of a drag-and-drop gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedItem {
    /// A file.
    File {
        /// File name.
        name: String,
        /// Declared MIME type.
        mime: Option<String>,
        /// File contents.
        bytes: Vec<u8>,
    },
    /// A non-file payload such as dragged text or a link.
    Text(String),
}

/// A whole drag-and-drop gesture: every item dropped in one go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DropGesture {
    items: Vec<DroppedItem>,
}

impl DropGesture {
    /// Wrap the dropped items in order.
    #[must_use]
    pub fn from_items(items: Vec<DroppedItem>) -> Self {
        Self { items }
    }

    /// Number of dropped items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of items that are files of a recognised format.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| match item {
                DroppedItem::File { name, mime, .. } => {
                    DeclaredFormat::infer(name, mime.as_deref()).is_some()
                }
                DroppedItem::Text(_) => false,
            })
            .count()
    }

    /// Check the gesture is all-or-nothing importable.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::CountMismatch`] if any item is not a recognised file.
    pub fn check(&self) -> Result<(), DropError> {
        let (items, files) = (self.item_count(), self.file_count());
        if items == files {
            Ok(())
        } else {
            Err(DropError::CountMismatch { items, files })
        }
    }

    /// Turn a checked gesture into import requests, in drop order.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::CountMismatch`] if [`DropGesture::check`] fails.
    pub fn into_requests(self) -> Result<Vec<ImportRequest>, DropError> {
        self.check()?;
        let (items, files) = (self.item_count(), self.file_count());
        self.items
            .into_iter()
            .map(|item| match item {
                DroppedItem::File { name, mime, bytes } => ImportRequest::new(name, mime, bytes).ok(),
                DroppedItem::Text(_) => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(DropError::CountMismatch { items, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BytesSource;

    fn file(name: &str) -> DroppedItem {
        DroppedItem::File {
            name: name.into(),
            mime: None,
            bytes: b"{}".to_vec(),
        }
    }

    #[test]
    fn test_infer_from_extension() {
        assert_eq!(DeclaredFormat::infer("a.json", None), Some(DeclaredFormat::DocumentJson));
        assert_eq!(DeclaredFormat::infer("a.POLOTNO", None), Some(DeclaredFormat::DocumentJson));
        assert_eq!(DeclaredFormat::infer("logo.Svg", None), Some(DeclaredFormat::VectorGraphics));
        assert_eq!(DeclaredFormat::infer("photo.png", None), None);
    }

    #[test]
    fn test_infer_from_mime() {
        assert_eq!(
            DeclaredFormat::infer("upload", Some("application/json; charset=utf-8")),
            Some(DeclaredFormat::DocumentJson)
        );
        assert_eq!(
            DeclaredFormat::infer("blob", Some("image/svg+xml")),
            Some(DeclaredFormat::VectorGraphics)
        );
        assert_eq!(DeclaredFormat::infer("blob", Some("image/png")), None);
    }

    #[test]
    fn test_extension_wins_over_mime() {
        assert_eq!(
            DeclaredFormat::infer("design.svg", Some("application/json")),
            Some(DeclaredFormat::VectorGraphics)
        );
    }

    #[test]
    fn test_unsupported_request() {
        let err = ImportRequest::new("notes.txt", None, Vec::new()).expect_err("reject");
        assert!(matches!(err, ImportError::UnsupportedFormat(name) if name == "notes.txt"));
    }

    #[tokio::test]
    async fn test_from_source() {
        let source = BytesSource::new("design.json", b"{}".to_vec());
        let request = ImportRequest::from_source(&source).await.expect("request");
        assert_eq!(request.name(), "design.json");
        assert_eq!(request.format(), DeclaredFormat::DocumentJson);
        assert_eq!(request.len(), 2);
    }

    #[test]
    fn test_drop_all_files_accepted() {
        let gesture = DropGesture::from_items(vec![file("a.json"), file("b.svg")]);
        assert!(gesture.check().is_ok());
        let requests = gesture.into_requests().expect("requests");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].name(), "b.svg");
    }

    #[test]
    fn test_drop_with_text_payload_rejected() {
        let gesture = DropGesture::from_items(vec![
            file("a.json"),
            DroppedItem::Text("https://example.com".into()),
            file("b.json"),
        ]);
        assert_eq!(
            gesture.check(),
            Err(DropError::CountMismatch { items: 3, files: 2 })
        );
    }

    #[test]
    fn test_drop_with_unrecognised_file_rejected() {
        let gesture = DropGesture::from_items(vec![file("a.json"), file("b.png")]);
        assert_eq!(
            gesture.into_requests(),
            Err(DropError::CountMismatch { items: 2, files: 1 })
        );
    }

    #[test]
    fn test_empty_drop_is_trivially_accepted() {
        assert_eq!(DropGesture::default().into_requests(), Ok(Vec::new()));
    }
}
