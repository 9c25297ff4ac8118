//! Design documents: an ordered sequence of pages, each a tree of elements.
//!
//! The serialized form is the native document JSON consumed by the editor
//! front-end (camelCase keys, `pages[].children[]`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Element, StudioError, StudioResult};

/// A single page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier.
    pub id: String,
    /// Background color or image URL.
    #[serde(default = "Page::default_background")]
    pub background: String,
    /// Direct child elements, back to front.
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Page {
    fn default_background() -> String {
        "white".to_string()
    }

    /// Create an empty page with a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Create an empty page with the given identifier.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            background: Self::default_background(),
            children: Vec::new(),
        }
    }

    /// Find a direct child by identifier.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.id == id)
    }

    /// Find a direct child by identifier, mutably.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|e| e.id == id)
    }

    /// Count direct children carrying the identifier.
    #[must_use]
    pub fn count_id(&self, id: &str) -> usize {
        self.children.iter().filter(|e| e.id == id).count()
    }

    /// Append an element on top of the page.
    pub fn add_element(&mut self, element: Element) {
        self.children.push(element);
    }

    /// Remove a direct child by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if no direct child has the identifier.
    pub fn remove_element(&mut self, id: &str) -> StudioResult<Element> {
        let index = self
            .children
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StudioError::ElementNotFound(id.to_string()))?;
        Ok(self.children.remove(index))
    }

    /// Number of elements on the page, nested group members included.
    #[must_use]
    pub fn element_count(&self) -> usize {
        fn count(elements: &[Element]) -> usize {
            elements.iter().map(|e| 1 + count(e.children())).sum()
        }
        count(&self.children)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Canvas width in document units.
    pub width: f64,
    /// Canvas height in document units.
    pub height: f64,
    /// Display unit of the canvas.
    #[serde(default = "Document::default_unit")]
    pub unit: String,
    /// Resolution used when converting units for print.
    #[serde(default = "Document::default_dpi")]
    pub dpi: f64,
    /// Pages in order.
    pub pages: Vec<Page>,
}

impl Document {
    fn default_unit() -> String {
        "px".to_string()
    }

    const fn default_dpi() -> f64 {
        72.0
    }

    /// Create a document with a single empty page.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            unit: Self::default_unit(),
            dpi: Self::default_dpi(),
            pages: vec![Page::new()],
        }
    }

    /// Get a page by index.
    #[must_use]
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Get a page by index, mutably.
    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of elements across all pages.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.pages.iter().map(Page::element_count).sum()
    }

    /// Serialize the document to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StudioResult<String> {
        serde_json::to_string(self).map_err(StudioError::Serialization)
    }

    /// Serialize the document to indented JSON for download.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> StudioResult<String> {
        serde_json::to_string_pretty(self).map_err(StudioError::Serialization)
    }

    /// Deserialize a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid document.
    pub fn from_json(json: &str) -> StudioResult<Self> {
        serde_json::from_str(json).map_err(StudioError::Serialization)
    }

    /// Convert a parsed JSON value into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the document schema.
    pub fn from_value(value: serde_json::Value) -> StudioResult<Self> {
        serde_json::from_value(value).map_err(StudioError::Serialization)
    }

    /// Convert the document into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> StudioResult<serde_json::Value> {
        serde_json::to_value(self).map_err(StudioError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementKind;

    fn line(id: &str) -> Element {
        Element::new(id, ElementKind::Line { color: "#000".into() })
    }

    #[test]
    fn test_new_document_has_one_empty_page() {
        let doc = Document::new(2550.0, 3300.0);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.element_count(), 0);
        assert_eq!(doc.unit, "px");
    }

    #[test]
    fn test_page_add_find_remove() {
        let mut page = Page::with_id("p");
        page.add_element(line("a"));
        page.add_element(line("b"));

        assert!(page.find("a").is_some());
        assert_eq!(page.count_id("b"), 1);

        let removed = page.remove_element("a").expect("should remove");
        assert_eq!(removed.id, "a");
        assert!(page.find("a").is_none());
        assert!(matches!(
            page.remove_element("a"),
            Err(StudioError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_element_count_includes_group_members() {
        let mut page = Page::with_id("p");
        page.add_element(Element::new(
            "g",
            ElementKind::Group {
                children: vec![line("a"), line("b")],
            },
        ));
        assert_eq!(page.element_count(), 3);
    }

    #[test]
    fn test_json_round_trip() {
        let mut doc = Document::new(800.0, 600.0);
        doc.pages[0].add_element(line("l1").with_frame(1.5, 2.0, 30.0, 4.0));

        let json = doc.to_json().expect("serialize");
        let back = Document::from_json(&json).expect("parse");
        assert_eq!(back, doc);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let doc = Document::from_json(r#"{"width":10,"height":20,"pages":[{"id":"p1"}]}"#)
            .expect("parse");
        assert!((doc.dpi - 72.0).abs() < f64::EPSILON);
        assert_eq!(doc.pages[0].background, "white");
        assert!(doc.pages[0].children.is_empty());
    }
}
