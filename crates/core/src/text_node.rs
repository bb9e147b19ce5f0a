//! Positioned text nodes
//!
//! One node exists per text item. A node carries the absolute position,
//! font and rotation that make its (transparent) text line up with the
//! glyphs drawn on the page image, and the highlight state search put on
//! it.

use crate::geometry::Viewport;
use crate::highlight::{FragmentRender, HighlightClass};
use crate::text_content::{FontStyle, TextItem};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Font used to display and measure a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font size in pixels
    pub size_px: f64,
    pub family: String,
}

impl FontSpec {
    /// CSS `font` shorthand, e.g. `"12px serif"`
    pub fn css(&self) -> String {
        format!("{}px {}", self.size_px, self.family)
    }
}

/// Computed placement of a node on the page view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    pub left: f64,
    pub top: f64,
    pub font: FontSpec,
    /// Rotation in degrees, clockwise in screen space
    pub angle_deg: f64,
    /// Width the run occupies on the rendered page, in pixels
    pub canvas_width: f64,
    /// Horizontal stretch so measured text matches `canvas_width`; set on commit
    pub scale_x: Option<f64>,
}

impl NodeLayout {
    /// Compute placement for `item` under `viewport`
    pub fn compute(item: &TextItem, style: &FontStyle, viewport: &Viewport) -> Self {
        let tx = viewport.transform().multiply(&item.transform);

        let mut angle = tx.b.atan2(tx.a);
        if style.vertical {
            angle += FRAC_PI_2;
        }

        let font_height = tx.c.hypot(tx.d);
        let ascent = style.ascent_for(font_height);

        let canvas_width =
            if style.vertical { item.height * viewport.scale } else { item.width * viewport.scale };

        Self {
            left: tx.e + ascent * angle.sin(),
            top: tx.f - ascent * angle.cos(),
            font: FontSpec { size_px: font_height, family: style.font_family.clone() },
            angle_deg: angle.to_degrees(),
            canvas_width,
            scale_x: None,
        }
    }

    /// CSS transform applied once the node is committed
    pub fn css_transform(&self) -> Option<String> {
        self.scale_x.map(|scale| format!("rotate({}deg) scale({}, 1)", self.angle_deg, scale))
    }
}

/// Commit state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Created, waiting for the layout commit
    Pending,
    /// Measured and appended to the overlay
    Attached,
    /// Measured zero width; never appended
    Dropped,
    /// Whitespace only; never measured or appended
    Whitespace,
}

/// Overlay node for one text item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub index: usize,
    pub text: String,
    /// `None` for whitespace-only items
    pub layout: Option<NodeLayout>,
    pub state: NodeState,
    /// Highlight rendering; `None` shows the plain text
    pub render: Option<FragmentRender>,
}

impl TextNode {
    pub fn from_item(index: usize, item: &TextItem, style: &FontStyle, viewport: &Viewport) -> Self {
        if item.is_whitespace() {
            return Self {
                index,
                text: item.text.clone(),
                layout: None,
                state: NodeState::Whitespace,
                render: None,
            };
        }

        Self {
            index,
            text: item.text.clone(),
            layout: Some(NodeLayout::compute(item, style, viewport)),
            state: NodeState::Pending,
            render: None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.state == NodeState::Whitespace
    }

    pub fn is_attached(&self) -> bool {
        self.state == NodeState::Attached
    }

    /// Class set on the node element itself (interior of a multi-item match)
    pub fn node_class(&self) -> Option<HighlightClass> {
        match &self.render {
            Some(FragmentRender::Whole { class }) => Some(*class),
            _ => None,
        }
    }

    /// Text the node currently displays
    pub fn display_text(&self) -> String {
        match &self.render {
            Some(FragmentRender::Spans { spans }) => spans.iter().map(|s| s.text.as_str()).collect(),
            _ => self.text.clone(),
        }
    }
}

/// Offscreen text measurement
///
/// Implementations return the advance width in pixels of `text` drawn with
/// `font`, without any transform applied.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font: &FontSpec) -> f64;
}

/// Measurer assuming every character advances by a fixed fraction of the
/// font size
///
/// Good enough for headless runs where no font rasterizer is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvanceMeasurer {
    pub advance_em: f64,
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self { advance_em: 0.5 }
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> f64 {
        text.chars().count() as f64 * font.size_px * self.advance_em
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    fn page() -> Viewport {
        Viewport::new([0.0, 0.0, 612.0, 792.0], 1.0, 0)
    }

    #[test]
    fn test_horizontal_layout() {
        let item = TextItem::new("Hello", Transform::new(12.0, 0.0, 0.0, 12.0, 72.0, 700.0), "f1")
            .with_size(30.0, 12.0);
        let style = FontStyle::new("serif").with_ascent(0.8);

        let layout = NodeLayout::compute(&item, &style, &page());
        assert_close(layout.left, 72.0);
        assert_close(layout.top, 92.0 - 9.6);
        assert_close(layout.font.size_px, 12.0);
        assert_close(layout.angle_deg, 0.0);
        assert_close(layout.canvas_width, 30.0);
        assert_eq!(layout.font.css(), "12px serif");
        assert_eq!(layout.css_transform(), None);
    }

    #[test]
    fn test_scaled_viewport_scales_canvas_width() {
        let item = TextItem::new("Hello", Transform::new(10.0, 0.0, 0.0, 10.0, 0.0, 0.0), "f1")
            .with_size(25.0, 10.0);
        let viewport = Viewport::new([0.0, 0.0, 612.0, 792.0], 2.0, 0);

        let layout = NodeLayout::compute(&item, &FontStyle::default(), &viewport);
        assert_close(layout.canvas_width, 50.0);
        assert_close(layout.font.size_px, 20.0);
    }

    #[test]
    fn test_vertical_layout_uses_height() {
        let item = TextItem::new("縦書き", Transform::new(10.0, 0.0, 0.0, 10.0, 100.0, 500.0), "f1")
            .with_size(10.0, 30.0);
        let style = FontStyle::new("serif").with_vertical(true);

        let layout = NodeLayout::compute(&item, &style, &page());
        assert_close(layout.angle_deg, 90.0);
        assert_close(layout.canvas_width, 30.0);
        // With a 90 degree rotation the ascent shifts the node horizontally.
        assert_close(layout.left, 110.0);
        assert_close(layout.top, 292.0);
    }

    #[test]
    fn test_whitespace_node_has_no_layout() {
        let item = TextItem::new("  ", Transform::IDENTITY, "f1");
        let node = TextNode::from_item(3, &item, &FontStyle::default(), &page());

        assert!(node.is_whitespace());
        assert!(node.layout.is_none());
        assert_eq!(node.index, 3);
    }

    #[test]
    fn test_fixed_advance_measurer() {
        let measurer = FixedAdvanceMeasurer::default();
        let font = FontSpec { size_px: 10.0, family: "serif".to_string() };
        assert_close(measurer.measure("abcd", &font), 20.0);
        assert_close(measurer.measure("", &font), 0.0);
    }
}
