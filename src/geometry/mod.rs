//! Chart-type strategies that turn a normalized series into primitives.
//!
//! This module is organized into focused submodules:
//! - `common`: Shared helpers (palette, value scaling, label sprites)
//! - `bars`: Bar charts
//! - `series`: Line and scatter plots
//! - `radial`: Pie and radar charts
//! - `area`: Filled area charts
//!
//! Every strategy is a pure function of its inputs: the same series and
//! config always yield the same primitives in the same order.

mod area;
mod bars;
mod common;
mod radial;
mod series;

pub use area::build_area;
pub use bars::build_bars;
pub use common::{format_value, golden_hue, palette_color, scaled_height};
pub use radial::{build_pie, build_radar, sector_outline, wedge_sweeps};
pub use series::{build_line, build_scatter};

use crate::config::SceneConfig;
use crate::core::{ChartType, Extents, NormalizedSeries, PrimitiveDescriptor, PrimitiveRole};

/// Output of a strategy: ordered primitives plus the extents used for framing.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryOutput {
    pub primitives: Vec<PrimitiveDescriptor>,
    pub extents: Extents,
}

impl GeometryOutput {
    pub fn count(&self, role: PrimitiveRole) -> usize {
        self.primitives.iter().filter(|p| p.role == role).count()
    }

    pub fn datums(&self) -> impl Iterator<Item = &PrimitiveDescriptor> {
        self.primitives
            .iter()
            .filter(|p| p.role == PrimitiveRole::Datum)
    }
}

pub type GeometryStrategy = fn(&NormalizedSeries, &SceneConfig) -> GeometryOutput;

/// Strategy table keyed by chart type.
pub fn strategy_for(chart_type: ChartType) -> GeometryStrategy {
    match chart_type {
        ChartType::Bar => build_bars,
        ChartType::Line => build_line,
        ChartType::Scatter => build_scatter,
        ChartType::Pie => build_pie,
        ChartType::Radar => build_radar,
        ChartType::Area => build_area,
    }
}

pub fn build_geometry(
    series: &NormalizedSeries,
    chart_type: ChartType,
    config: &SceneConfig,
) -> GeometryOutput {
    let output = strategy_for(chart_type)(series, config);
    tracing::debug!(
        chart = %chart_type,
        primitives = output.primitives.len(),
        datums = output.count(PrimitiveRole::Datum),
        width = output.extents.width,
        height = output.extents.height,
        "built chart geometry"
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> NormalizedSeries {
        NormalizedSeries {
            labels: (0..values.len()).map(|i| format!("c{i}")).collect(),
            xs: vec![0.0; values.len()],
            ys: values.to_vec(),
            zs: vec![0.0; values.len()],
        }
    }

    #[test]
    fn one_datum_per_category_for_every_linear_type() {
        let s = series(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        let config = SceneConfig::default();
        for chart in [
            ChartType::Bar,
            ChartType::Line,
            ChartType::Scatter,
            ChartType::Radar,
            ChartType::Area,
        ] {
            let out = build_geometry(&s, chart, &config);
            assert_eq!(out.count(PrimitiveRole::Datum), 5, "{chart}");
        }
    }

    #[test]
    fn all_zero_series_builds_without_nan() {
        let s = series(&[0.0, 0.0, 0.0]);
        let config = SceneConfig::default();
        for chart in ChartType::ALL {
            let out = build_geometry(&s, chart, &config);
            for p in &out.primitives {
                assert!(p.placement.translation.is_finite(), "{chart}");
            }
            assert!(out.extents.height.is_finite());
            assert!(out.extents.width.is_finite());
        }
    }

    #[test]
    fn strategies_are_deterministic() {
        let s = series(&[2.0, 7.0, 1.0, 8.0]);
        let config = SceneConfig::default();
        for chart in ChartType::ALL {
            assert_eq!(
                build_geometry(&s, chart, &config),
                build_geometry(&s, chart, &config)
            );
        }
    }
}
