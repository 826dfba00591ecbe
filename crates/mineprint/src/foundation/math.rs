//! Math utilities and types
//!
//! Window sizes and positions are integer pixel vectors.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Integer 2D vector used for window sizes and screen positions
pub type IVec2 = Vector2<i32>;

/// Shorthand constructor for [`IVec2`]
#[inline]
pub fn ivec2(x: i32, y: i32) -> IVec2 {
    IVec2::new(x, y)
}

/// Returns true if both components are strictly positive
#[inline]
pub fn is_positive_extent(size: &IVec2) -> bool {
    size.x > 0 && size.y > 0
}

/// Top-left position that centres `size` inside an area starting at `origin`
pub fn centered_in(origin: IVec2, area: IVec2, size: IVec2) -> IVec2 {
    origin + (area - size) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_extent() {
        assert!(is_positive_extent(&ivec2(800, 600)));
        assert!(!is_positive_extent(&ivec2(0, 600)));
        assert!(!is_positive_extent(&ivec2(800, -1)));
    }

    #[test]
    fn test_centered_in() {
        let pos = centered_in(ivec2(0, 0), ivec2(1920, 1080), ivec2(800, 600));
        assert_eq!(pos, ivec2(560, 240));

        let offset = centered_in(ivec2(1920, 0), ivec2(1920, 1080), ivec2(1920, 1080));
        assert_eq!(offset, ivec2(1920, 0));
    }
}
