//! Affine transforms and page viewports
//!
//! Transforms use the PDF `[a b c d e f]` layout:
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```

use serde::{Deserialize, Serialize};

/// 2D affine transform in PDF matrix order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Matrix product `self x other` (apply `other` first, then `self`)
    pub fn multiply(&self, other: &Transform) -> Transform {
        Transform {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Map a point through this transform
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 6]> for Transform {
    fn from(m: [f64; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }
}

impl From<Transform> for [f64; 6] {
    fn from(t: Transform) -> Self {
        [t.a, t.b, t.c, t.d, t.e, t.f]
    }
}

/// Mapping from page space to on-screen pixels for one page view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ViewportParams", into = "ViewportParams")]
pub struct Viewport {
    /// Page bounding box in points `[x1, y1, x2, y2]`
    pub view_box: [f64; 4],

    /// Zoom factor (1.0 = 72 dpi)
    pub scale: f64,

    /// Rotation in degrees, normalized to `0..360`
    pub rotation: i32,

    /// Keep the PDF's y-up orientation instead of flipping to screen space
    pub dont_flip: bool,

    /// Page-space to pixel transform, derived from the fields above
    transform: Transform,
}

/// Serialized form of a [`Viewport`]; the transform is always derived
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ViewportParams {
    view_box: [f64; 4],
    scale: f64,
    #[serde(default)]
    rotation: i32,
    #[serde(default)]
    dont_flip: bool,
}

impl From<ViewportParams> for Viewport {
    fn from(params: ViewportParams) -> Self {
        Viewport::build(params.view_box, params.scale, params.rotation, params.dont_flip)
    }
}

impl From<Viewport> for ViewportParams {
    fn from(viewport: Viewport) -> Self {
        ViewportParams {
            view_box: viewport.view_box,
            scale: viewport.scale,
            rotation: viewport.rotation,
            dont_flip: viewport.dont_flip,
        }
    }
}

impl Viewport {
    pub fn new(view_box: [f64; 4], scale: f64, rotation: i32) -> Self {
        Self::build(view_box, scale, rotation, false)
    }

    /// Clone with a different flip setting
    ///
    /// Annotation layers position their elements in unflipped page space.
    pub fn clone_with(&self, dont_flip: bool) -> Self {
        Self::build(self.view_box, self.scale, self.rotation, dont_flip)
    }

    fn build(view_box: [f64; 4], scale: f64, rotation: i32, dont_flip: bool) -> Self {
        let [x1, y1, x2, y2] = view_box;
        let center_x = (x1 + x2) / 2.0;
        let center_y = (y1 + y2) / 2.0;

        let rotation = rotation.rem_euclid(360);
        let (mut rotate_a, mut rotate_b, mut rotate_c, mut rotate_d) = match rotation {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };

        if dont_flip {
            rotate_c = -rotate_c;
            rotate_d = -rotate_d;
        }

        let width = (x2 - x1).abs();
        let height = (y2 - y1).abs();
        let (offset_canvas_x, offset_canvas_y) = if rotate_a == 0.0 {
            (height * scale / 2.0, width * scale / 2.0)
        } else {
            (width * scale / 2.0, height * scale / 2.0)
        };

        rotate_a *= scale;
        rotate_b *= scale;
        rotate_c *= scale;
        rotate_d *= scale;

        let transform = Transform {
            a: rotate_a,
            b: rotate_b,
            c: rotate_c,
            d: rotate_d,
            e: offset_canvas_x - rotate_a * center_x - rotate_c * center_y,
            f: offset_canvas_y - rotate_b * center_x - rotate_d * center_y,
        };

        Self { view_box, scale, rotation, dont_flip, transform }
    }

    /// Page-space to pixel transform
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Width of the page view in pixels
    pub fn width(&self) -> f64 {
        let [x1, y1, x2, y2] = self.view_box;
        let (w, h) = ((x2 - x1).abs(), (y2 - y1).abs());
        if self.rotation % 180 == 0 { w * self.scale } else { h * self.scale }
    }

    /// Height of the page view in pixels
    pub fn height(&self) -> f64 {
        let [x1, y1, x2, y2] = self.view_box;
        let (w, h) = ((x2 - x1).abs(), (y2 - y1).abs());
        if self.rotation % 180 == 0 { h * self.scale } else { w * self.scale }
    }
}

/// Offset applied when scrolling a highlighted match into view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollMargin {
    pub top: f64,
    pub left: f64,
}

impl Default for ScrollMargin {
    fn default() -> Self {
        Self { top: -50.0, left: -400.0 }
    }
}
