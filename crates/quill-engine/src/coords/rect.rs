/// Axis-aligned rectangle in physical pixels (top-left origin).
///
/// Used for scissor rectangles and viewports, which GPU APIs take as integers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(w: i32, h: i32) -> Self {
        Self { x: 0, y: 0, w, h }
    }

    #[inline]
    pub const fn right(self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub const fn bottom(self) -> i32 {
        self.y + self.h
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub const fn contains(self, px: i32, py: i32) -> bool {
        px >= self.x && py >= self.y && px < self.right() && py < self.bottom()
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());

        if x1 <= x0 || y1 <= y0 {
            None
        } else {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Clamps the rectangle to `[0, width) x [0, height)` and returns
    /// `(x, y, w, h)` ready for `set_scissor_rect`.
    ///
    /// Returns `None` for an empty result; the draw should be skipped.
    pub fn to_scissor(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let bounds = Rect::from_size(width as i32, height as i32);
        let r = self.intersect(bounds)?;
        Some((r.x as u32, r.y as u32, r.w as u32, r.h as u32))
    }
}
