//! Scene tuning knobs. Every constant the strategies, the framer and the
//! lighting rig use lives here so a deployment can override it from JSON.

use std::path::Path;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::core::Color;
use crate::{ChartError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: Color,
    /// Visual height of the largest value, regardless of its magnitude.
    pub value_scale: f32,
    pub bar: BarConfig,
    pub series: SeriesConfig,
    pub pie: PieConfig,
    pub radar: RadarConfig,
    pub area: AreaConfig,
    pub labels: LabelConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub grid: GridConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: Color::hex(0xf8f9fa),
            value_scale: 10.0,
            bar: BarConfig::default(),
            series: SeriesConfig::default(),
            pie: PieConfig::default(),
            radar: RadarConfig::default(),
            area: AreaConfig::default(),
            labels: LabelConfig::default(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    pub width: f32,
    /// Centre-to-centre distance; kept larger than `width` so faces never touch.
    pub spacing: f32,
    pub show_labels: bool,
    /// Gap between a bar's top face and its value label.
    pub label_offset: f32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            width: 0.8,
            spacing: 1.2,
            show_labels: true,
            label_offset: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub spacing: f32,
    pub line_marker_radius: f32,
    pub scatter_radius: f32,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            spacing: 5.0,
            line_marker_radius: 0.4,
            scatter_radius: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieConfig {
    pub radius: f32,
    pub depth: f32,
    /// Radial push applied to every wedge along its mid-angle.
    pub separation: f32,
    /// Height of the wedge bottoms above the ground plane.
    pub lift: f32,
    pub show_labels: bool,
    /// Distance of labels beyond the outer radius.
    pub label_gap: f32,
    pub label_height: f32,
}

impl Default for PieConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            depth: 2.0,
            separation: 0.5,
            lift: 0.2,
            show_labels: true,
            label_gap: 2.0,
            label_height: 1.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub radius: f32,
    pub depth: f32,
    pub lift: f32,
    pub fill: Color,
    pub outline: Color,
    pub marker_radius: f32,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            depth: 1.0,
            lift: 0.2,
            fill: Color::hex(0x1e90ff),
            outline: Color::BLACK,
            marker_radius: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub spacing: f32,
    pub depth: f32,
    /// Height of the baseline above the ground plane.
    pub clearance: f32,
    pub fill: Color,
    pub marker_radius: f32,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            spacing: 5.0,
            depth: 2.0,
            clearance: 0.1,
            fill: Color::hex(0x32cd32),
            marker_radius: 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Canvas the label text is drawn onto, in pixels.
    pub canvas: [u32; 2],
    pub font_px: f32,
    pub text: Color,
    pub bar_size: [f32; 2],
    pub pie_size: [f32; 2],
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            canvas: [256, 64],
            font_px: 24.0,
            text: Color::BLACK,
            bar_size: [2.0, 0.5],
            pie_size: [5.0, 1.2],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar clamp for linear layouts, radians from straight up.
    pub linear_max_polar: f32,
    /// Polar clamp for pie and radar so the view never dips under the slab.
    pub radial_max_polar: f32,
    /// Camera height and distance as multiples of the chart height and span.
    pub height_factor: f32,
    pub distance_factor: f32,
    /// Radial camera elevation and distance as multiples of the radius.
    pub radial_elevation: f32,
    pub radial_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            damping_factor: 0.05,
            min_distance: 1.0,
            max_distance: 100.0,
            linear_max_polar: std::f32::consts::FRAC_PI_2,
            radial_max_polar: std::f32::consts::PI / 2.2,
            height_factor: 1.3,
            distance_factor: 1.3,
            radial_elevation: 2.0,
            radial_distance: 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: f32,
    pub directional: f32,
    pub directional_position: [f32; 3],
    pub shadows: bool,
    pub point: f32,
    pub point_position: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.6,
            directional: 0.8,
            directional_position: [10.0, 20.0, 10.0],
            shadows: true,
            point: 0.5,
            point_position: [-10.0, 10.0, -10.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub margin: f32,
    pub divisions: u32,
    pub elevation: f32,
    pub color: Color,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            margin: 5.0,
            divisions: 20,
            elevation: -0.1,
            color: Color::rgba(0.0, 0.0, 0.0, 0.35),
        }
    }
}

impl SceneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Report::new(ChartError::InvalidConfig(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Report::new(ChartError::InvalidConfig(e.to_string()))
                .attach(format!("reading {}", path.display()))
        })?;
        Self::from_json_str(&json).map_err(|r| r.attach(format!("in {}", path.display())))
    }

    pub fn with_value_scale(mut self, scale: f32) -> Self {
        self.value_scale = scale;
        self
    }

    pub fn with_labels(mut self, show: bool) -> Self {
        self.bar.show_labels = show;
        self.pie.show_labels = show;
        self
    }

    pub fn with_background(mut self, c: Color) -> Self {
        self.background = c;
        self
    }

    pub fn with_damping(mut self, factor: f32) -> Self {
        self.camera.damping_factor = factor;
        self
    }

    /// Reject settings that would produce degenerate or overlapping geometry.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("value_scale", self.value_scale),
            ("bar.width", self.bar.width),
            ("bar.spacing", self.bar.spacing),
            ("series.spacing", self.series.spacing),
            ("pie.radius", self.pie.radius),
            ("pie.depth", self.pie.depth),
            ("radar.radius", self.radar.radius),
            ("radar.depth", self.radar.depth),
            ("area.spacing", self.area.spacing),
            ("area.depth", self.area.depth),
            ("camera.near", self.camera.near),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Report::new(ChartError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                ))));
            }
        }
        if self.bar.spacing <= self.bar.width {
            return Err(Report::new(ChartError::InvalidConfig(format!(
                "bar.spacing ({}) must exceed bar.width ({})",
                self.bar.spacing, self.bar.width
            ))));
        }
        let damping = self.camera.damping_factor;
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(Report::new(ChartError::InvalidConfig(format!(
                "camera.damping_factor must be in (0, 1], got {damping}"
            ))));
        }
        if self.camera.far <= self.camera.near {
            return Err(Report::new(ChartError::InvalidConfig(
                "camera.far must exceed camera.near".into(),
            )));
        }
        if self.grid.divisions == 0 {
            return Err(Report::new(ChartError::InvalidConfig(
                "grid.divisions must be at least 1".into(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SceneConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SceneConfig::from_json_str(r#"{"value_scale": 4.0, "pie": {"radius": 3.0}}"#)
            .unwrap();
        assert_eq!(config.value_scale, 4.0);
        assert_eq!(config.pie.radius, 3.0);
        assert_eq!(config.pie.depth, PieConfig::default().depth);
        assert_eq!(config.bar, BarConfig::default());
    }

    #[test]
    fn overlapping_bars_are_rejected() {
        let json = r#"{"bar": {"width": 2.0, "spacing": 1.0}}"#;
        let err = SceneConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err.current_context(), ChartError::InvalidConfig(_)));
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let config = SceneConfig::new().with_value_scale(6.0).with_labels(false);
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(SceneConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_config_file_reports_invalid_config() {
        let err = SceneConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err.current_context(), ChartError::InvalidConfig(_)));
    }
}
