//! Page text content as reported by the PDF engine
//!
//! A page's text arrives as an ordered list of runs ("items"), each with a
//! single transform and font. Item order is stable and defines the offset
//! space used by search: offset `n` is the `n`th `char` of all item strings
//! concatenated.

use crate::geometry::Transform;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One run of text with a single transform and font
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    /// Text content of the run
    #[serde(rename = "str")]
    pub text: String,

    /// Text-space to page-space transform
    pub transform: Transform,

    /// Key into [`TextContent::styles`]
    pub font_name: String,

    /// Advance width in text space units
    #[serde(default)]
    pub width: f64,

    /// Run height in text space units (used for vertical text)
    #[serde(default)]
    pub height: f64,
}

impl TextItem {
    pub fn new(text: impl Into<String>, transform: Transform, font_name: impl Into<String>) -> Self {
        Self { text: text.into(), transform, font_name: font_name.into(), width: 0.0, height: 0.0 }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Length in `char`s, the unit of the search offset space
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the run contains only whitespace (or nothing)
    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Font properties the engine reports for a font name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontStyle {
    /// CSS-style family list, e.g. `"sans-serif"`
    pub font_family: String,

    /// Ascent as a fraction of the font height
    #[serde(default)]
    pub ascent: Option<f64>,

    /// Descent as a (negative) fraction of the font height
    #[serde(default)]
    pub descent: Option<f64>,

    /// Glyphs run top to bottom
    #[serde(default)]
    pub vertical: bool,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self { font_family: "sans-serif".to_string(), ascent: None, descent: None, vertical: false }
    }
}

impl FontStyle {
    pub fn new(font_family: impl Into<String>) -> Self {
        Self { font_family: font_family.into(), ..Self::default() }
    }

    pub fn with_ascent(mut self, ascent: f64) -> Self {
        self.ascent = Some(ascent);
        self
    }

    pub fn with_descent(mut self, descent: f64) -> Self {
        self.descent = Some(descent);
        self
    }

    pub fn with_vertical(mut self, vertical: bool) -> Self {
        self.vertical = vertical;
        self
    }

    /// Distance from the baseline to the top of the glyph box
    pub fn ascent_for(&self, font_height: f64) -> f64 {
        match (self.ascent, self.descent) {
            (Some(ascent), _) if ascent != 0.0 => ascent * font_height,
            (_, Some(descent)) if descent != 0.0 => (1.0 + descent) * font_height,
            _ => font_height,
        }
    }
}

/// All text runs of one page plus the styles they reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,

    #[serde(default)]
    pub styles: HashMap<String, FontStyle>,
}

impl TextContent {
    pub fn new(items: Vec<TextItem>, styles: HashMap<String, FontStyle>) -> Self {
        Self { items, styles }
    }

    /// Style for a font name, falling back to the default style
    pub fn style_for(&self, font_name: &str) -> FontStyle {
        self.styles.get(font_name).cloned().unwrap_or_default()
    }

    /// Concatenated text of all items, in order
    pub fn full_text(&self) -> String {
        self.items.iter().map(|item| item.text.as_str()).collect()
    }

    /// Total length of the offset space in `char`s
    pub fn char_len(&self) -> usize {
        self.items.iter().map(TextItem::char_len).sum()
    }
}

/// Substring by `char` offsets, clamped to the string
pub fn char_slice(text: &str, from: usize, to: usize) -> &str {
    if from >= to {
        return "";
    }

    let start = byte_offset(text, from);
    let end = byte_offset(text, to);
    &text[start..end]
}

fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices().nth(char_offset).map(|(index, _)| index).unwrap_or(text.len())
}
