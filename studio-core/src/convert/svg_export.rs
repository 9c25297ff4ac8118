//! SVG export of a single page.

use std::fmt::Write;

use super::escape_xml;
use crate::element::{FigureShape, TextAlign, VerticalAlign};
use crate::{Document, Element, ElementKind, StudioError, StudioResult};

/// Render one page of a document as standalone SVG markup.
///
/// # Errors
///
/// Returns [`StudioError::PageOutOfRange`] if the page does not exist.
pub fn page_to_svg(document: &Document, page_index: usize) -> StudioResult<String> {
    let page = document
        .page(page_index)
        .ok_or(StudioError::PageOutOfRange {
            index: page_index,
            count: document.page_count(),
        })?;
    let (w, h) = (document.width, document.height);

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"{w}\" height=\"{h}\" fill=\"{}\"/>",
        escape_xml(&page.background),
    );
    for element in &page.children {
        render_element_svg(&mut svg, element);
    }
    svg.push_str("</svg>");
    Ok(svg)
}

/// Render a single element, recursing into groups.
fn render_element_svg(svg: &mut String, element: &Element) {
    let (x, y, w, h) = (element.x, element.y, element.width, element.height);
    let _ = write!(svg, "<g id=\"{}\"", escape_xml(&element.id));
    if element.rotation != 0.0 {
        let _ = write!(svg, " transform=\"rotate({} {x} {y})\"", element.rotation);
    }
    if element.opacity < 1.0 {
        let _ = write!(svg, " opacity=\"{}\"", element.opacity);
    }
    svg.push('>');

    match &element.kind {
        ElementKind::Text {
            text,
            font_size,
            font_family,
            fill,
            align,
            vertical_align,
        } => {
            let (anchor, text_x) = match align {
                TextAlign::Left | TextAlign::Justify => ("start", x),
                TextAlign::Center => ("middle", x + w / 2.0),
                TextAlign::Right => ("end", x + w),
            };
            let text_y = match vertical_align {
                VerticalAlign::Top => y + font_size,
                VerticalAlign::Middle => y + (h + font_size) / 2.0,
                VerticalAlign::Bottom => y + h,
            };
            let _ = write!(
                svg,
                "<text x=\"{text_x}\" y=\"{text_y}\" font-size=\"{font_size}\" font-family=\"{}\" fill=\"{}\" text-anchor=\"{anchor}\">{}</text>",
                escape_xml(font_family),
                escape_xml(fill),
                escape_xml(text),
            );
        }

        ElementKind::Image { src } | ElementKind::Svg { src } => {
            let _ = write!(
                svg,
                "<image x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" href=\"{}\"/>",
                escape_xml(src),
            );
        }

        ElementKind::Figure {
            sub_type,
            fill,
            stroke,
            stroke_width,
            corner_radius,
        } => {
            let mut paint = format!("fill=\"{}\"", escape_xml(fill));
            if let Some(stroke) = stroke {
                let _ = write!(
                    paint,
                    " stroke=\"{}\" stroke-width=\"{stroke_width}\"",
                    escape_xml(stroke)
                );
            }
            match sub_type {
                FigureShape::Rect => {
                    let _ = write!(
                        svg,
                        "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" rx=\"{corner_radius}\" {paint}/>",
                    );
                }
                FigureShape::Circle | FigureShape::Ellipse => {
                    let _ = write!(
                        svg,
                        "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" {paint}/>",
                        x + w / 2.0,
                        y + h / 2.0,
                        w / 2.0,
                        h / 2.0,
                    );
                }
            }
        }

        ElementKind::Line { color } => {
            let mid = y + h / 2.0;
            let _ = write!(
                svg,
                "<line x1=\"{x}\" y1=\"{mid}\" x2=\"{}\" y2=\"{mid}\" stroke=\"{}\" stroke-width=\"{h}\"/>",
                x + w,
                escape_xml(color),
            );
        }

        ElementKind::Group { children } => {
            for child in children {
                render_element_svg(svg, child);
            }
        }
    }

    svg.push_str("</g>");
}
