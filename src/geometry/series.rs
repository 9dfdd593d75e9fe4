use bevy_math::Vec3;

use super::GeometryOutput;
use super::common::{palette_color, scaled_height};
use crate::config::SceneConfig;
use crate::core::{
    Color, Extents, Layout, NormalizedSeries, Placement, PrimitiveDescriptor, ShapeKind,
};

fn vertices(series: &NormalizedSeries, config: &SceneConfig) -> Vec<Vec3> {
    let peak = series.peak();
    series
        .ys
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            Vec3::new(
                i as f32 * config.series.spacing,
                scaled_height(v, peak, config.value_scale),
                0.0,
            )
        })
        .collect()
}

fn linear_extents(series: &NormalizedSeries, config: &SceneConfig, depth: f32) -> Extents {
    let peak = series.peak();
    Extents {
        layout: Layout::Linear,
        width: series.len().saturating_sub(1) as f32 * config.series.spacing,
        depth,
        peak_value: peak,
        height: if peak > 0.0 { config.value_scale } else { 0.0 },
        base: 0.0,
    }
}

fn marker(at: Vec3, radius: f32, index: usize, label: &str) -> PrimitiveDescriptor {
    PrimitiveDescriptor::datum(
        ShapeKind::Sphere { radius },
        Placement::at(at),
        palette_color(index),
    )
    .with_label(label)
}

/// Sphere per point joined by a polyline coloured per vertex.
pub fn build_line(series: &NormalizedSeries, config: &SceneConfig) -> GeometryOutput {
    let radius = config.series.line_marker_radius;
    let points = vertices(series, config);

    let mut primitives: Vec<PrimitiveDescriptor> = points
        .iter()
        .enumerate()
        .map(|(i, &p)| marker(p, radius, i, &series.labels[i]))
        .collect();

    if points.len() >= 2 {
        let colors: Vec<Color> = (0..points.len()).map(palette_color).collect();
        primitives.push(PrimitiveDescriptor::decoration(
            ShapeKind::Polyline {
                points,
                colors: Some(colors),
                closed: false,
            },
            Placement::default(),
            Color::WHITE,
        ));
    }

    GeometryOutput {
        primitives,
        extents: linear_extents(series, config, radius * 2.0),
    }
}

/// Spheres only. A selected z column pushes points along the depth axis.
pub fn build_scatter(series: &NormalizedSeries, config: &SceneConfig) -> GeometryOutput {
    let radius = config.series.scatter_radius;
    let peak_z = series.peak_z();
    let mut reach = 0.0_f32;

    let primitives = vertices(series, config)
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            p.z = scaled_height(series.zs[i], peak_z, config.value_scale);
            reach = reach.max(p.z.abs());
            marker(p, radius, i, &series.labels[i])
        })
        .collect();

    GeometryOutput {
        primitives,
        extents: linear_extents(series, config, 2.0 * (reach + radius)),
    }
}
