//! Stall floor geometry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle, in the venue's area unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Width.
    pub width: Decimal,
    /// Height (depth).
    pub height: Decimal,
}

impl Rect {
    /// Area of the rectangle; negative sides count as zero.
    pub fn area(&self) -> Decimal {
        self.width.max(Decimal::ZERO) * self.height.max(Decimal::ZERO)
    }
}

/// Floor geometry of a stall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StallShape {
    /// Plain rectangle.
    Rectangle {
        /// Width.
        width: Decimal,
        /// Height.
        height: Decimal,
    },
    /// L-, T- or U-shaped stall made of non-overlapping rectangles.
    Compound {
        /// The rectangles making up the stall.
        parts: Vec<Rect>,
    },
}

impl StallShape {
    /// Billable area of the stall.
    pub fn area(&self) -> Decimal {
        match self {
            Self::Rectangle { width, height } => Rect {
                width: *width,
                height: *height,
            }
            .area(),
            Self::Compound { parts } => parts.iter().map(Rect::area).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_rectangle_area() {
        let shape = StallShape::Rectangle {
            width: dec!(10),
            height: dec!(10),
        };
        assert_eq!(shape.area(), dec!(100));
    }

    #[test]
    fn test_compound_area_sums_parts() {
        let shape = StallShape::Compound {
            parts: vec![
                Rect {
                    width: dec!(6),
                    height: dec!(3),
                },
                Rect {
                    width: dec!(3),
                    height: dec!(4),
                },
            ],
        };
        assert_eq!(shape.area(), dec!(30));
    }

    #[test]
    fn test_shape_json_tag() {
        let json = serde_json::json!({"type": "rectangle", "width": 3.0, "height": 2.5});
        let shape: StallShape = serde_json::from_value(json).unwrap();
        assert_eq!(shape.area(), dec!(7.5));
    }
}
