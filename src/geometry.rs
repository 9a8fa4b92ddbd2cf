//! Screen geometry shared by the menu hierarchy and the display backends

/// Width and height of a laid-out menu surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Screen rectangle (root coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_origin(origin: (i32, i32), size: Size) -> Self {
        Self::new(origin.0, origin.1, size.width, size.height)
    }

    /// Right edge (inclusive)
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Bottom edge (inclusive)
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        contains(x, y, self)
    }
}

/// Inclusive hit test: points on any edge count as inside.
pub fn contains(x: i32, y: i32, rect: &Rect) -> bool {
    (rect.x <= x && x <= rect.right()) && (rect.y <= y && y <= rect.bottom())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_interior_point() {
        let rect = Rect::new(100, 100, 50, 20);
        assert!(rect.contains(120, 110));
        assert!(!rect.contains(99, 110));
        assert!(!rect.contains(120, 121));
    }

    #[test]
    fn test_contains_is_inclusive_on_every_edge() {
        let rect = Rect::new(10, 20, 30, 40);
        for (x, y) in [(10, 20), (40, 20), (10, 60), (40, 60), (25, 20), (40, 45)] {
            assert!(contains(x, y, &rect), "({x}, {y}) should be inside");
        }
        assert!(!contains(41, 60, &rect));
        assert!(!contains(10, 19, &rect));
    }

    #[test]
    fn test_zero_sized_rect_contains_only_its_origin() {
        let rect = Rect::new(5, 5, 0, 0);
        assert!(rect.contains(5, 5));
        assert!(!rect.contains(6, 5));
    }
}
