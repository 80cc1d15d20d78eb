//! Rectangle and coordinate types
//!
//! All coordinates are pixels in some camera's active-array space with the
//! origin at the top-left corner of that array.

use serde::{Deserialize, Serialize};

/// Width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, `None` for a zero height
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.height == 0 {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Full-frame rectangle covering this dimension
    pub fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }
}

/// Rectangle as origin plus size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height)
    }

    /// True when both sides are strictly positive
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn to_edges(&self) -> RectEdges {
        RectEdges {
            left: self.left,
            top: self.top,
            right: self.right(),
            bottom: self.bottom(),
        }
    }

    /// Overlapping area of two rectangles
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > left && bottom > top {
            Some(Rect::new(
                left,
                top,
                right.saturating_sub(left),
                bottom.saturating_sub(top),
            ))
        } else {
            None
        }
    }

    /// Clamp into `[0, bounds]` on both axes
    pub fn clamp_to(&self, bounds: Dimension) -> Rect {
        self.to_edges().clamp_to(bounds).to_rect()
    }

    /// Largest centered sub-rectangle with the given width/height ratio
    pub fn aligned_to_aspect(&self, aspect: f32) -> Rect {
        if !self.has_area() || aspect <= 0.0 {
            return *self;
        }

        let current = self.width as f32 / self.height as f32;
        if (current - aspect).abs() < f32::EPSILON {
            *self
        } else if current > aspect {
            let width = (self.height as f32 * aspect).round() as i32;
            Rect::new(
                self.left + (self.width - width) / 2,
                self.top,
                width,
                self.height,
            )
        } else {
            let height = (self.width as f32 / aspect).round() as i32;
            Rect::new(
                self.left,
                self.top + (self.height - height) / 2,
                self.width,
                height,
            )
        }
    }
}

/// Rectangle as four edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RectEdges {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectEdges {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width(), self.height())
    }

    /// Clamp every edge into `[0, bounds]`
    pub fn clamp_to(&self, bounds: Dimension) -> RectEdges {
        let max_x = bounds.width as i32;
        let max_y = bounds.height as i32;
        RectEdges {
            left: self.left.clamp(0, max_x),
            top: self.top.clamp(0, max_y),
            right: self.right.clamp(0, max_x),
            bottom: self.bottom.clamp(0, max_y),
        }
    }

    /// Whether `self` lies entirely within `outer`
    pub fn is_inside(&self, outer: &Rect) -> bool {
        self.left >= outer.left
            && self.top >= outer.top
            && self.right <= outer.right()
            && self.bottom <= outer.bottom()
    }
}

/// Single pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Metering region (AF/AE/AWB) with its weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeightedRegion {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
    pub weight: i32,
}

impl WeightedRegion {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32, weight: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            weight,
        }
    }

    /// An all-zero region means "not set" on the wire
    pub fn is_unset(&self) -> bool {
        self.x_max == 0 || self.y_max == 0
    }

    pub fn edges(&self) -> RectEdges {
        RectEdges::new(self.x_min, self.y_min, self.x_max, self.y_max)
    }

    pub fn with_edges(&self, edges: RectEdges) -> Self {
        Self {
            x_min: edges.left,
            y_min: edges.top,
            x_max: edges.right,
            y_max: edges.bottom,
            weight: self.weight,
        }
    }
}

/// Measured spatial misalignment between two sensors' framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelShift {
    pub x: i32,
    pub y: i32,
}

impl PixelShift {
    pub const ZERO: PixelShift = PixelShift { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}
