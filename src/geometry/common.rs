use bevy_math::{Vec2, Vec3};

use crate::config::LabelConfig;
use crate::core::{Color, Placement, PrimitiveDescriptor};

const GOLDEN_ANGLE_DEGREES: f32 = 137.5;

/// Hue of category `index`, spread by the golden angle so neighbours contrast.
pub fn golden_hue(index: usize) -> f32 {
    (index as f32 * GOLDEN_ANGLE_DEGREES) % 360.0
}

pub fn palette_color(index: usize) -> Color {
    Color::hsl(golden_hue(index), 0.7, 0.6)
}

/// Scale `value` so that `peak` maps to `scale`. A zero peak flattens everything.
pub fn scaled_height(value: f64, peak: f64, scale: f32) -> f32 {
    if peak <= 0.0 || !peak.is_finite() {
        return 0.0;
    }
    ((value / peak) as f32) * scale
}

/// Whole numbers print without a fractional part; everything else prints as-is.
pub fn format_value(val: f64) -> String {
    if val == 0.0 {
        "0".to_string()
    } else if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{:.0}", val)
    } else {
        format!("{}", val)
    }
}

pub(crate) fn label_sprite(
    text: String,
    size: [f32; 2],
    at: Vec3,
    labels: &LabelConfig,
) -> PrimitiveDescriptor {
    PrimitiveDescriptor::sprite(text, Vec2::from(size), Placement::at(at), labels.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_deterministic_and_distinct() {
        assert_eq!(golden_hue(0), 0.0);
        assert_eq!(golden_hue(1), 137.5);
        assert_eq!(golden_hue(2), 275.0);
        assert!((golden_hue(3) - 52.5).abs() < 1e-4);
        assert_eq!(palette_color(4), palette_color(4));
        assert_ne!(palette_color(0), palette_color(1));
    }

    #[test]
    fn values_format_like_the_form() {
        assert_eq!(format_value(10.0), "10");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(-0.0), "0");
    }

    #[test]
    fn zero_peak_flattens() {
        assert_eq!(scaled_height(5.0, 0.0, 10.0), 0.0);
        assert_eq!(scaled_height(30.0, 60.0, 10.0), 5.0);
        assert_eq!(scaled_height(-60.0, 60.0, 10.0), -10.0);
    }
}
