//! Page elements - the building blocks of a design document.

use serde::{Deserialize, Serialize};

/// Element type names accepted in document JSON.
pub const ELEMENT_TYPES: &[&str] = &["text", "image", "svg", "figure", "line", "group"];

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
    /// Justified.
    Justify,
}

/// Vertical text alignment inside the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    /// Top of the box.
    #[default]
    Top,
    /// Middle of the box.
    Middle,
    /// Bottom of the box.
    Bottom,
}

/// Basic shape drawn by a figure element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureShape {
    /// Rectangle, optionally with rounded corners.
    Rect,
    /// Circle inscribed in the element box.
    Circle,
    /// Ellipse inscribed in the element box.
    Ellipse,
}

/// The type-specific content of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ElementKind {
    /// A text block.
    Text {
        /// Text content.
        text: String,
        /// Font size in document units.
        font_size: f64,
        /// Font family name.
        #[serde(default = "ElementKind::default_font_family")]
        font_family: String,
        /// Text color.
        fill: String,
        /// Horizontal alignment.
        #[serde(default)]
        align: TextAlign,
        /// Vertical alignment.
        #[serde(default)]
        vertical_align: VerticalAlign,
    },

    /// A raster image.
    Image {
        /// Image URL or data URI.
        src: String,
    },

    /// An embedded vector graphic.
    Svg {
        /// SVG URL or data URI.
        src: String,
    },

    /// A basic filled/stroked shape.
    Figure {
        /// Shape drawn inside the element box.
        sub_type: FigureShape,
        /// Fill color.
        fill: String,
        /// Stroke color, if stroked.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke: Option<String>,
        /// Stroke width.
        #[serde(default)]
        stroke_width: f64,
        /// Corner radius (rectangles only).
        #[serde(default)]
        corner_radius: f64,
    },

    /// A straight line along the element's width, rotated by `rotation`.
    Line {
        /// Line color.
        color: String,
    },

    /// A container for nested elements.
    Group {
        /// Child elements, back to front.
        children: Vec<Element>,
    },
}

impl ElementKind {
    fn default_font_family() -> String {
        "Roboto".to_string()
    }

    /// JSON `type` name of this kind.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Svg { .. } => "svg",
            Self::Figure { .. } => "figure",
            Self::Line { .. } => "line",
            Self::Group { .. } => "group",
        }
    }
}

/// An element on a page: identity, content, frame, and interaction flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Identifier, unique within the page.
    pub id: String,
    /// Element content type.
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Left edge in document units.
    pub x: f64,
    /// Top edge in document units.
    pub y: f64,
    /// Width in document units.
    pub width: f64,
    /// Height in document units.
    pub height: f64,
    /// Rotation in degrees around the top-left corner.
    #[serde(default)]
    pub rotation: f64,
    /// Opacity from 0.0 to 1.0.
    #[serde(default = "Element::default_opacity")]
    pub opacity: f64,
    /// Whether the element can be selected on the canvas.
    #[serde(default = "Element::default_flag")]
    pub selectable: bool,
    /// Whether the element can be deleted.
    #[serde(default = "Element::default_flag")]
    pub removable: bool,
    /// Whether the element's content and style can be edited.
    #[serde(default = "Element::default_flag")]
    pub editable: bool,
}

impl Element {
    const fn default_opacity() -> f64 {
        1.0
    }

    const fn default_flag() -> bool {
        true
    }

    /// Create an element with a 100x100 frame at the origin.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            opacity: 1.0,
            selectable: true,
            removable: true,
            editable: true,
        }
    }

    /// Set position and size.
    #[must_use]
    pub fn with_frame(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    /// Set the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Clear the selectable, removable, and editable flags.
    #[must_use]
    pub fn locked(mut self) -> Self {
        self.selectable = false;
        self.removable = false;
        self.editable = false;
        self
    }

    /// Whether all interaction flags are cleared.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.selectable && !self.removable && !self.editable
    }

    /// Nested children, if this is a group.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        match &self.kind {
            ElementKind::Group { children } => children,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_element_json_shape() {
        let element = Element::new(
            "t1",
            ElementKind::Text {
                text: "Hello".to_string(),
                font_size: 20.0,
                font_family: "Roboto".to_string(),
                fill: "black".to_string(),
                align: TextAlign::Center,
                vertical_align: VerticalAlign::Middle,
            },
        );

        let json = serde_json::to_value(&element).expect("serialize");
        assert_eq!(json["type"], "text");
        assert_eq!(json["fontSize"], 20.0);
        assert_eq!(json["verticalAlign"], "middle");
        assert_eq!(json["selectable"], true);
    }

    #[test]
    fn test_defaults_applied_on_parse() {
        let json = r##"{"id":"f1","type":"figure","subType":"rect","fill":"#ff0000","x":1,"y":2,"width":3,"height":4}"##;
        let element: Element = serde_json::from_str(json).expect("parse");
        assert!((element.opacity - 1.0).abs() < f64::EPSILON);
        assert!(element.removable && element.selectable && element.editable);
        assert!(matches!(
            element.kind,
            ElementKind::Figure {
                sub_type: FigureShape::Rect,
                stroke: None,
                ..
            }
        ));
    }

    #[test]
    fn test_group_children_nest() {
        let child = Element::new("c", ElementKind::Line { color: "red".into() });
        let group = Element::new(
            "g",
            ElementKind::Group {
                children: vec![child.clone()],
            },
        );
        let json = serde_json::to_string(&group).expect("serialize");
        let back: Element = serde_json::from_str(&json).expect("parse");
        assert_eq!(back.children(), &[child]);
    }

    #[test]
    fn test_locked() {
        let element = Element::new("x", ElementKind::Image { src: "a.png".into() }).locked();
        assert!(element.is_locked());
        assert_eq!(element.kind.type_name(), "image");
    }
}
