//! Radial visualizations: pie charts and radar/spider charts.
//!
//! Both lay their outline in a local XY plane and tip it flat onto the
//! ground with a -90 degree turn about X, so local `(x, y, z)` lands at
//! world `(x, z, -y)`.

use std::f32::consts::{FRAC_PI_2, TAU};

use bevy_math::{Quat, Vec2, Vec3};

use super::GeometryOutput;
use super::common::{format_value, label_sprite, palette_color};
use crate::config::SceneConfig;
use crate::core::{
    Extents, Layout, NormalizedSeries, Placement, PrimitiveDescriptor, ShapeKind,
};

const CIRCLE_SEGMENTS: usize = 64;
const FULL_TURN_EPSILON: f32 = 1e-5;
/// Lifts the radar outline off the slab's top face to avoid z-fighting.
const OUTLINE_OFFSET: f32 = 0.01;

fn lay_flat(translation: Vec3) -> Placement {
    Placement::at(translation).rotated(Quat::from_rotation_x(-FRAC_PI_2))
}

fn ground(p: Vec2, height: f32) -> Vec3 {
    Vec3::new(p.x, height, -p.y)
}

/// Angular share of each record: `value / total * TAU` for positive values,
/// zero for the rest. Empty when nothing is positive.
pub fn wedge_sweeps(values: &[f64]) -> Vec<f32> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    values
        .iter()
        .map(|&v| if v > 0.0 { (v / total) as f32 * TAU } else { 0.0 })
        .collect()
}

/// Outline of a circular sector starting at `start` and sweeping `sweep`
/// radians counter-clockwise. A full turn yields a plain circle with no apex.
pub fn sector_outline(radius: f32, start: f32, sweep: f32) -> Vec<Vec2> {
    let on_arc = |angle: f32| Vec2::new(angle.cos(), angle.sin()) * radius;

    if sweep >= TAU - FULL_TURN_EPSILON {
        return (0..CIRCLE_SEGMENTS)
            .map(|j| on_arc(start + j as f32 / CIRCLE_SEGMENTS as f32 * TAU))
            .collect();
    }

    let segments = ((sweep / TAU * CIRCLE_SEGMENTS as f32).ceil() as usize).max(2);
    let mut outline = Vec::with_capacity(segments + 2);
    outline.push(Vec2::ZERO);
    for j in 0..=segments {
        outline.push(on_arc(start + j as f32 / segments as f32 * sweep));
    }
    outline
}

/// One extruded wedge per positive value, pushed out along its mid-angle.
pub fn build_pie(series: &NormalizedSeries, config: &SceneConfig) -> GeometryOutput {
    let pie = &config.pie;
    let sweeps = wedge_sweeps(&series.ys);
    let mut primitives = Vec::new();
    let mut start = 0.0_f32;

    for (i, &sweep) in sweeps.iter().enumerate() {
        if sweep <= 0.0 {
            continue;
        }
        let mid = start + sweep * 0.5;
        let direction = Vec2::new(mid.cos(), mid.sin());
        // A lone full-turn wedge has no mid-angle to separate along.
        let offset = if sweep >= TAU - FULL_TURN_EPSILON {
            Vec2::ZERO
        } else {
            direction * pie.separation
        };

        primitives.push(
            PrimitiveDescriptor::datum(
                ShapeKind::Extrusion {
                    outline: sector_outline(pie.radius, start, sweep),
                    depth: pie.depth,
                },
                lay_flat(ground(offset, pie.lift)),
                palette_color(i),
            )
            .with_label(series.labels[i].clone()),
        );

        if pie.show_labels {
            let text = format!("{}: {}", series.labels[i], format_value(series.ys[i]));
            let at = ground(
                direction * (pie.radius + pie.label_gap),
                pie.lift + pie.depth + pie.label_height,
            );
            primitives.push(label_sprite(text, config.labels.pie_size, at, &config.labels));
        }

        start += sweep;
    }

    let reach = pie.radius + pie.separation;
    GeometryOutput {
        primitives,
        extents: Extents {
            layout: Layout::Radial,
            width: reach * 2.0,
            depth: reach * 2.0,
            peak_value: series.peak(),
            height: pie.depth,
            base: pie.lift,
        },
    }
}

/// Star polygon with one vertex per category at `i * TAU / n`, extruded into
/// a slab, outlined on top and marked at every vertex.
pub fn build_radar(series: &NormalizedSeries, config: &SceneConfig) -> GeometryOutput {
    let radar = &config.radar;
    let n = series.len();
    let peak = series.ys.iter().copied().fold(0.0_f64, f64::max);
    let peak = if peak > 0.0 { peak } else { 1.0 };
    let step = if n > 0 { TAU / n as f32 } else { 0.0 };

    let outline: Vec<Vec2> = series
        .ys
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let r = (v.max(0.0) / peak) as f32 * radar.radius;
            let angle = i as f32 * step;
            Vec2::new(angle.cos(), angle.sin()) * r
        })
        .collect();

    let top = radar.lift + radar.depth;
    let mut primitives = Vec::with_capacity(n + 2);
    primitives.push(PrimitiveDescriptor::decoration(
        ShapeKind::Extrusion {
            outline: outline.clone(),
            depth: radar.depth,
        },
        lay_flat(Vec3::new(0.0, radar.lift, 0.0)),
        radar.fill.with_a(0.7),
    ));
    primitives.push(PrimitiveDescriptor::decoration(
        ShapeKind::Polyline {
            points: outline
                .iter()
                .map(|&p| ground(p, top + OUTLINE_OFFSET))
                .collect(),
            colors: None,
            closed: true,
        },
        Placement::default(),
        radar.outline,
    ));
    for (i, &p) in outline.iter().enumerate() {
        primitives.push(
            PrimitiveDescriptor::datum(
                ShapeKind::Sphere {
                    radius: radar.marker_radius,
                },
                Placement::at(ground(p, top)),
                palette_color(i),
            )
            .with_label(series.labels[i].clone()),
        );
    }

    GeometryOutput {
        primitives,
        extents: Extents {
            layout: Layout::Radial,
            width: radar.radius * 2.0,
            depth: radar.radius * 2.0,
            peak_value: series.peak(),
            height: radar.depth,
            base: radar.lift,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PrimitiveRole;
    use approx::assert_relative_eq;

    fn series(labels: &[&str], values: &[f64]) -> NormalizedSeries {
        NormalizedSeries {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            xs: vec![0.0; values.len()],
            ys: values.to_vec(),
            zs: vec![0.0; values.len()],
        }
    }

    #[test]
    fn wedge_angles_match_value_shares() {
        let sweeps = wedge_sweeps(&[10.0, 30.0, 60.0]);
        assert_relative_eq!(sweeps[0], 0.628_318_5, epsilon = 1e-4);
        assert_relative_eq!(sweeps[1], 1.884_955_6, epsilon = 1e-4);
        assert_relative_eq!(sweeps[2], 3.769_911_2, epsilon = 1e-4);
        assert_relative_eq!(sweeps.iter().sum::<f32>(), TAU, epsilon = 1e-4);
    }

    #[test]
    fn non_positive_values_get_no_wedge() {
        let s = series(&["a", "b", "c", "d"], &[5.0, 0.0, -3.0, 5.0]);
        let out = build_pie(&s, &SceneConfig::default().with_labels(false));
        assert_eq!(out.count(PrimitiveRole::Datum), 2);
        let labels: Vec<_> = out.datums().filter_map(|p| p.label.as_deref()).collect();
        assert_eq!(labels, vec!["a", "d"]);
        assert!(wedge_sweeps(&[0.0, -1.0]).is_empty());
    }

    #[test]
    fn single_record_is_a_full_circle_without_apex() {
        let s = series(&["only"], &[42.0]);
        let out = build_pie(&s, &SceneConfig::default());
        let wedge = out.datums().next().unwrap();
        let ShapeKind::Extrusion { outline, .. } = &wedge.shape else {
            panic!("pie datum must be an extrusion");
        };
        assert_eq!(outline.len(), CIRCLE_SEGMENTS);
        assert!(outline.iter().all(|p| (p.length() - 5.0).abs() < 1e-4));
        assert_eq!(wedge.placement.translation, Vec3::new(0.0, 0.2, 0.0));
    }

    #[test]
    fn wedges_are_separated_along_their_mid_angle() {
        let s = series(&["a", "b"], &[1.0, 1.0]);
        let out = build_pie(&s, &SceneConfig::default().with_labels(false));
        let offsets: Vec<Vec3> = out.datums().map(|p| p.placement.translation).collect();
        // First wedge spans [0, PI) so it moves towards world -Z.
        assert_relative_eq!(offsets[0].x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(offsets[0].z, -0.5, epsilon = 1e-5);
        assert_relative_eq!(offsets[1].z, 0.5, epsilon = 1e-5);
        assert!(offsets.iter().all(|o| o.y == 0.2));
    }

    #[test]
    fn pie_labels_carry_category_and_value() {
        let s = series(&["A", "B", "C"], &[10.0, 30.0, 60.0]);
        let out = build_pie(&s, &SceneConfig::default());
        let texts: Vec<_> = out
            .primitives
            .iter()
            .filter(|p| p.is_label())
            .filter_map(|p| p.label.as_deref())
            .collect();
        assert_eq!(texts, vec!["A: 10", "B: 30", "C: 60"]);
    }

    #[test]
    fn sector_outline_starts_at_apex() {
        let outline = sector_outline(2.0, 0.0, FRAC_PI_2);
        assert_eq!(outline[0], Vec2::ZERO);
        assert_relative_eq!(outline[1].x, 2.0, epsilon = 1e-5);
        let last = *outline.last().unwrap();
        assert_relative_eq!(last.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn radar_vertices_follow_angle_and_value() {
        let s = series(&["a", "b", "c", "d"], &[4.0, 2.0, 0.0, 4.0]);
        let out = build_radar(&s, &SceneConfig::default());
        assert_eq!(out.count(PrimitiveRole::Datum), 4);
        assert_eq!(out.count(PrimitiveRole::Decoration), 2);

        let markers: Vec<Vec3> = out.datums().map(|p| p.placement.translation).collect();
        let top = 0.2 + 1.0;
        assert_relative_eq!(markers[0].x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(markers[0].y, top, epsilon = 1e-5);
        // Second vertex at a quarter turn, half the radius.
        assert_relative_eq!(markers[1].z, -2.5, epsilon = 1e-5);
        assert_relative_eq!(markers[2].length(), top, epsilon = 1e-5);
        assert_relative_eq!(markers[3].z, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn all_zero_radar_collapses_to_centre() {
        let s = series(&["a", "b", "c"], &[0.0, 0.0, 0.0]);
        let out = build_radar(&s, &SceneConfig::default());
        assert!(out.datums().all(|p| {
            let t = p.placement.translation;
            t.x.abs() < 1e-6 && t.z.abs() < 1e-6
        }));
    }
}
