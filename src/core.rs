use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bevy_math::{Quat, Vec2, Vec3};
use error_stack::Report;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ChartError, Result};

/// A single spreadsheet cell as handed over by the parser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric reading of the cell. Anything that is not a finite number
    /// (blank text, words, NaN, infinities, null) reads as `0.0`.
    pub fn as_number(&self) -> f64 {
        let n = match self {
            CellValue::Null => 0.0,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::Number(n) => *n,
            CellValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse::<f64>().unwrap_or(0.0)
                }
            }
        };
        if n.is_finite() { n } else { 0.0 }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{}", crate::geometry::format_value(*n)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// One row. Field order is the order the fields appeared in the source.
pub type Record = IndexMap<String, CellValue>;

/// Ordered rows; row order defines category order on every axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabularDataset {
    records: Vec<Record>,
}

impl TabularDataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse the JSON array-of-objects shape produced by the spreadsheet parser.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Report::new(ChartError::InvalidDataset(e.to_string()))
                .attach(format!("while parsing {} bytes of dataset JSON", json.len()))
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Field names in first-seen order across all rows.
    pub fn columns(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for record in &self.records {
            for key in record.keys() {
                if !seen.contains(&key.as_str()) {
                    seen.push(key.as_str());
                }
            }
        }
        seen
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.records.iter().any(|r| r.contains_key(field))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        })
    }
}

/// Field names picked in the axis form. Blank names count as unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisSelection {
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
}

impl AxisSelection {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: Some(x.into()),
            y: Some(y.into()),
            z: None,
        }
    }

    pub fn with_z(mut self, z: impl Into<String>) -> Self {
        self.z = Some(z.into());
        self
    }

    pub fn field(&self, axis: Axis) -> Option<&str> {
        let name = match axis {
            Axis::X => self.x.as_deref(),
            Axis::Y => self.y.as_deref(),
            Axis::Z => self.z.as_deref(),
        };
        name.filter(|n| !n.trim().is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Scatter,
    Pie,
    Radar,
    Area,
}

impl ChartType {
    pub const ALL: [ChartType; 6] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Scatter,
        ChartType::Pie,
        ChartType::Radar,
        ChartType::Area,
    ];

    pub fn layout(self) -> Layout {
        match self {
            ChartType::Pie | ChartType::Radar => Layout::Radial,
            _ => Layout::Linear,
        }
    }

    pub fn required_axes(self) -> &'static [Axis] {
        &[Axis::X, Axis::Y]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::Radar => "radar",
            ChartType::Area => "area",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = Report<ChartError>;

    fn from_str(tag: &str) -> Result<Self> {
        let wanted = tag.trim().to_ascii_lowercase();
        ChartType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| Report::new(ChartError::UnsupportedChartType(tag.to_string())))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Categories laid out along +X.
    Linear,
    /// Categories arranged around the origin on the ground plane.
    Radial,
}

/// Everything a rebuild depends on. A change to any field is a rebuild trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartRequest {
    pub dataset: Arc<TabularDataset>,
    pub axes: AxisSelection,
    pub chart_type: ChartType,
}

impl ChartRequest {
    pub fn new(dataset: Arc<TabularDataset>, axes: AxisSelection, chart_type: ChartType) -> Self {
        Self {
            dataset,
            axes,
            chart_type,
        }
    }

    /// Build a request from raw form state, rejecting unknown chart tags.
    pub fn parse(dataset: Arc<TabularDataset>, axes: AxisSelection, tag: &str) -> Result<Self> {
        let chart_type = tag.parse::<ChartType>()?;
        Ok(Self::new(dataset, axes, chart_type))
    }
}

/// Parallel numeric columns derived from a dataset, one entry per record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedSeries {
    /// Display text of the x field, used for category labels.
    pub labels: Vec<String>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub zs: Vec<f64>,
}

impl NormalizedSeries {
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }

    /// Largest magnitude among `ys`, or `0.0` for an all-zero series.
    pub fn peak(&self) -> f64 {
        peak_abs(&self.ys)
    }

    pub fn peak_z(&self) -> f64 {
        peak_abs(&self.zs)
    }
}

fn peak_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
    pub const fn with_a(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// `0xRRGGBB`, as used for the default palette.
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        )
    }

    /// Hue in degrees, saturation and lightness in `[0, 1]`.
    pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        Self::rgb(r + m, g + m, b + m)
    }

    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
}

impl From<Color> for bevy::prelude::Color {
    #[inline]
    fn from(c: Color) -> Self {
        bevy::prelude::Color::srgba(c.r, c.g, c.b, c.a)
    }
}

/// Position, orientation and scale of a primitive in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Placement {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Map a point from the primitive's local frame into world space.
    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.translation + self.rotation * (local * self.scale)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    /// Axis-aligned box centred on its placement.
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
    /// Connected line through `points`, optionally coloured per vertex.
    Polyline {
        points: Vec<Vec3>,
        colors: Option<Vec<Color>>,
        closed: bool,
    },
    /// Closed outline in the local XY plane swept from z = 0 to z = depth.
    Extrusion { outline: Vec<Vec2>, depth: f32 },
    /// Camera-facing text plate; the text lives in the descriptor's label.
    Sprite { width: f32, height: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveRole {
    /// Exactly one per category with a visible share.
    Datum,
    /// Connecting lines, fills and outlines.
    Decoration,
    Label,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveDescriptor {
    pub shape: ShapeKind,
    pub placement: Placement,
    pub color: Color,
    pub label: Option<String>,
    pub role: PrimitiveRole,
}

impl PrimitiveDescriptor {
    pub fn datum(shape: ShapeKind, placement: Placement, color: Color) -> Self {
        Self {
            shape,
            placement,
            color,
            label: None,
            role: PrimitiveRole::Datum,
        }
    }

    pub fn decoration(shape: ShapeKind, placement: Placement, color: Color) -> Self {
        Self {
            role: PrimitiveRole::Decoration,
            ..Self::datum(shape, placement, color)
        }
    }

    pub fn sprite(text: String, size: Vec2, placement: Placement, color: Color) -> Self {
        Self {
            shape: ShapeKind::Sprite {
                width: size.x,
                height: size.y,
            },
            placement,
            color,
            label: Some(text),
            role: PrimitiveRole::Label,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_label(&self) -> bool {
        self.role == PrimitiveRole::Label
    }
}

/// Bounding measures reported by a strategy and used to frame the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extents {
    pub layout: Layout,
    /// Span along X (linear) or diameter (radial).
    pub width: f32,
    pub depth: f32,
    /// Largest raw magnitude in the value series.
    pub peak_value: f64,
    /// World-space height of the tallest primitive above `base`.
    pub height: f32,
    /// Elevation of the geometry's lowest face.
    pub base: f32,
}

impl Extents {
    /// Centre of the laid-out geometry, which the camera looks at.
    pub fn focus(&self) -> Vec3 {
        let y = self.base + self.height * 0.5;
        match self.layout {
            Layout::Linear => Vec3::new(self.width * 0.5, y, 0.0),
            Layout::Radial => Vec3::new(0.0, y, 0.0),
        }
    }

    pub fn footprint(&self) -> f32 {
        self.width.max(self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_coercion_matches_form_semantics() {
        assert_eq!(CellValue::Number(4.5).as_number(), 4.5);
        assert_eq!(CellValue::Text(" 12 ".into()).as_number(), 12.0);
        assert_eq!(CellValue::Text("".into()).as_number(), 0.0);
        assert_eq!(CellValue::Text("abc".into()).as_number(), 0.0);
        assert_eq!(CellValue::Text("NaN".into()).as_number(), 0.0);
        assert_eq!(CellValue::Text("inf".into()).as_number(), 0.0);
        assert_eq!(CellValue::Number(f64::NAN).as_number(), 0.0);
        assert_eq!(CellValue::Bool(true).as_number(), 1.0);
        assert_eq!(CellValue::Null.as_number(), 0.0);
    }

    #[test]
    fn dataset_parses_rows_in_order() {
        let ds = TabularDataset::from_json_str(
            r#"[{"cat":"A","val":10},{"cat":"B","val":null,"extra":true}]"#,
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0]["cat"], CellValue::Text("A".into()));
        assert_eq!(ds.records()[1]["val"], CellValue::Null);
        assert_eq!(ds.columns(), vec!["cat", "val", "extra"]);
        assert!(ds.has_field("extra"));
        assert!(!ds.has_field("missing"));
    }

    #[test]
    fn columns_keep_source_field_order() {
        let ds = TabularDataset::from_json_str(
            r#"[{"val":1,"cat":"A","month":"Jan"},{"zone":"N","val":2}]"#,
        )
        .unwrap();
        assert_eq!(ds.columns(), vec!["val", "cat", "month", "zone"]);
        let keys: Vec<&str> = ds.records()[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["val", "cat", "month"]);
    }

    #[test]
    fn malformed_dataset_json_is_rejected() {
        let err = TabularDataset::from_json_str("{not json").unwrap_err();
        assert!(matches!(err.current_context(), ChartError::InvalidDataset(_)));
    }

    #[test]
    fn chart_tags_parse_case_insensitively() {
        assert_eq!("Pie".parse::<ChartType>().unwrap(), ChartType::Pie);
        assert_eq!(" radar ".parse::<ChartType>().unwrap(), ChartType::Radar);
        let err = "doughnut".parse::<ChartType>().unwrap_err();
        assert_eq!(
            err.current_context(),
            &ChartError::UnsupportedChartType("doughnut".into())
        );
    }

    #[test]
    fn blank_axis_names_count_as_unset() {
        let axes = AxisSelection::new("", "  ");
        assert_eq!(axes.field(Axis::X), None);
        assert_eq!(axes.field(Axis::Y), None);
        assert_eq!(AxisSelection::new("a", "b").field(Axis::Y), Some("b"));
    }

    #[test]
    fn hsl_primaries() {
        let red = Color::hsl(0.0, 1.0, 0.5);
        assert!((red.r - 1.0).abs() < 1e-6 && red.g.abs() < 1e-6 && red.b.abs() < 1e-6);
        let blue = Color::hsl(240.0, 1.0, 0.5);
        assert!(blue.r.abs() < 1e-6 && (blue.b - 1.0).abs() < 1e-6);
        assert_eq!(Color::hex(0xff8000), Color::rgb(1.0, 128.0 / 255.0, 0.0));
    }

    #[test]
    fn placement_applies_rotation_after_scale() {
        let p = Placement::at(Vec3::new(1.0, 0.0, 0.0))
            .rotated(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2))
            .scaled(Vec3::splat(2.0));
        let world = p.apply(Vec3::new(0.0, 0.0, 1.0));
        assert!((world - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }
}
