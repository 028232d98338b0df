use std::fmt;
use std::ops::Neg;

/// Axis-aligned pixel rectangle; `bottom()` and `right()` are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl Rect {
    pub fn new(top: usize, left: usize, height: usize, width: usize) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pair of points believed to depict the same physical feature
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Correspondence {
    pub reference: Point2,
    pub target: Point2,
    /// Descriptor distance of the match that produced this pair
    pub distance: f32,
}

impl Correspondence {
    /// `reference - target`
    pub fn offset(&self) -> OffsetVector {
        OffsetVector::new(
            self.reference.x - self.target.x,
            self.reference.y - self.target.y,
        )
    }
}

/// Displacement implied by one correspondence or one searched candidate
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetVector {
    pub dx: f64,
    pub dy: f64,
}

impl OffsetVector {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    #[inline]
    pub fn squared_distance(&self, other: &OffsetVector) -> f64 {
        let ddx = self.dx - other.dx;
        let ddy = self.dy - other.dy;
        ddx * ddx + ddy * ddy
    }
}

impl From<Translation> for OffsetVector {
    fn from(t: Translation) -> Self {
        OffsetVector::new(t.dx as f64, t.dy as f64)
    }
}

/// Integer stage drift in pixels, `position_in_reference - position_in_target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Translation {
    pub dx: i64,
    pub dy: i64,
}

impl Translation {
    pub fn new(dx: i64, dy: i64) -> Self {
        Self { dx, dy }
    }

    /// Rounds each axis to the nearest integer, ties to even
    pub fn from_rounded(offset: OffsetVector) -> Self {
        Self {
            dx: offset.dx.round_ties_even() as i64,
            dy: offset.dy.round_ties_even() as i64,
        }
    }
}

impl Neg for Translation {
    type Output = Translation;

    fn neg(self) -> Translation {
        Translation::new(-self.dx, -self.dy)
    }
}

impl From<Translation> for (i64, i64) {
    fn from(t: Translation) -> Self {
        (t.dx, t.dy)
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correspondence_offset_is_reference_minus_target() {
        let c = Correspondence {
            reference: Point2::new(40.0, 12.5),
            target: Point2::new(35.0, 15.5),
            distance: 0.0,
        };
        assert_eq!(c.offset(), OffsetVector::new(5.0, -3.0));
    }

    #[test]
    fn test_rounding_ties_to_even() {
        let t = Translation::from_rounded(OffsetVector::new(2.5, -3.5));
        assert_eq!(t, Translation::new(2, -4));
        let t = Translation::from_rounded(OffsetVector::new(4.4999, -0.51));
        assert_eq!(t, Translation::new(4, -1));
    }

    #[test]
    fn test_negation_and_display() {
        let t = Translation::new(7, -4);
        assert_eq!(-t, Translation::new(-7, 4));
        assert_eq!(t.to_string(), "(7, -4)");
        assert_eq!(<(i64, i64)>::from(t), (7, -4));
    }
}
