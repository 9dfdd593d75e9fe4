use bevy_math::{Vec2, Vec3};

use super::GeometryOutput;
use super::common::{palette_color, scaled_height};
use crate::config::SceneConfig;
use crate::core::{Extents, Layout, NormalizedSeries, Placement, PrimitiveDescriptor, ShapeKind};

/// Filled profile under the series, extruded along Z and centred on z = 0.
///
/// The outline runs from the baseline origin through every value vertex and
/// back down to the baseline under the last category.
pub fn build_area(series: &NormalizedSeries, config: &SceneConfig) -> GeometryOutput {
    let area = &config.area;
    let peak = series.peak();
    let profile: Vec<Vec2> = series
        .ys
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            Vec2::new(
                i as f32 * area.spacing,
                scaled_height(v, peak, config.value_scale),
            )
        })
        .collect();
    let last_x = profile.last().map_or(0.0, |p| p.x);

    let lobes = baseline_lobes(&profile);
    let mut primitives = Vec::with_capacity(profile.len() + lobes.len());
    for outline in lobes {
        primitives.push(PrimitiveDescriptor::decoration(
            ShapeKind::Extrusion {
                outline,
                depth: area.depth,
            },
            Placement::at(Vec3::new(0.0, area.clearance, -area.depth * 0.5)),
            area.fill.with_a(0.7),
        ));
    }

    // Markers sit on the front face so they stay visible through the fill.
    let front = area.depth * 0.5;
    for (i, p) in profile.iter().enumerate() {
        primitives.push(
            PrimitiveDescriptor::datum(
                ShapeKind::Sphere {
                    radius: area.marker_radius,
                },
                Placement::at(Vec3::new(p.x, area.clearance + p.y, front)),
                palette_color(i),
            )
            .with_label(series.labels[i].clone()),
        );
    }

    GeometryOutput {
        primitives,
        extents: Extents {
            layout: Layout::Linear,
            width: last_x,
            depth: area.depth,
            peak_value: peak,
            height: if peak > 0.0 { config.value_scale } else { 0.0 },
            base: area.clearance,
        },
    }
}

/// Split the filled region into outlines that each stay on one side of the
/// baseline, cutting at every zero crossing. Each outline starts and ends on
/// the baseline. Flat stretches are dropped unless they are all there is.
fn baseline_lobes(profile: &[Vec2]) -> Vec<Vec<Vec2>> {
    let Some(first) = profile.first() else {
        return Vec::new();
    };
    let mut lobes = Vec::new();
    let mut current = vec![Vec2::new(first.x, 0.0)];
    let mut sign = 0.0_f32;
    let mut prev = *first;

    for &p in profile {
        if sign * p.y < 0.0 {
            let t = prev.y / (prev.y - p.y);
            let crossing = Vec2::new(prev.x + t * (p.x - prev.x), 0.0);
            current.push(crossing);
            lobes.push((sign, std::mem::replace(&mut current, vec![crossing])));
            sign = 0.0;
        }
        if sign == 0.0 && p.y != 0.0 {
            sign = p.y.signum();
        }
        current.push(p);
        prev = p;
    }
    current.push(Vec2::new(prev.x, 0.0));
    lobes.push((sign, current));

    if lobes.len() == 1 {
        return lobes.into_iter().map(|(_, outline)| outline).collect();
    }
    lobes
        .into_iter()
        .filter(|(sign, _)| *sign != 0.0)
        .map(|(_, outline)| outline)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PrimitiveRole;
    use crate::mesh::extrude_outline;

    #[test]
    fn outline_closes_along_the_baseline() {
        let s = NormalizedSeries {
            labels: vec!["a".into(), "b".into(), "c".into()],
            xs: vec![0.0; 3],
            ys: vec![2.0, 4.0, 1.0],
            zs: vec![0.0; 3],
        };
        let out = build_area(&s, &SceneConfig::default());
        assert_eq!(out.count(PrimitiveRole::Datum), 3);

        let ShapeKind::Extrusion { outline, depth } = &out.primitives[0].shape else {
            panic!("area fill must be an extrusion");
        };
        assert_eq!(
            outline,
            &vec![
                Vec2::ZERO,
                Vec2::new(0.0, 5.0),
                Vec2::new(5.0, 10.0),
                Vec2::new(10.0, 2.5),
                Vec2::new(10.0, 0.0),
            ]
        );
        assert_eq!(*depth, 2.0);
        assert_eq!(
            out.primitives[0].placement.translation,
            Vec3::new(0.0, 0.1, -1.0)
        );
        assert_eq!(out.extents.width, 10.0);
    }

    #[test]
    fn mixed_sign_profile_splits_at_the_baseline() {
        let s = NormalizedSeries {
            labels: vec!["a".into(), "b".into(), "c".into()],
            xs: vec![0.0; 3],
            ys: vec![2.0, -2.0, 2.0],
            zs: vec![0.0; 3],
        };
        let out = build_area(&s, &SceneConfig::default());
        assert_eq!(out.count(PrimitiveRole::Datum), 3);

        let lobes: Vec<&Vec<Vec2>> = out
            .primitives
            .iter()
            .filter_map(|p| match &p.shape {
                ShapeKind::Extrusion { outline, .. } => Some(outline),
                _ => None,
            })
            .collect();
        assert_eq!(
            lobes,
            vec![
                &vec![Vec2::ZERO, Vec2::new(0.0, 10.0), Vec2::new(2.5, 0.0)],
                &vec![Vec2::new(2.5, 0.0), Vec2::new(5.0, -10.0), Vec2::new(7.5, 0.0)],
                &vec![Vec2::new(7.5, 0.0), Vec2::new(10.0, 10.0), Vec2::new(10.0, 0.0)],
            ]
        );

        // Every wall faces away from its own lobe, above and below the baseline.
        for outline in lobes {
            let centroid = outline.iter().copied().sum::<Vec2>() / outline.len() as f32;
            let mesh = extrude_outline(outline, 2.0).unwrap();
            for tri in mesh.indices.chunks_exact(3) {
                let normal = Vec3::from(mesh.normals[tri[0] as usize]);
                if normal.z != 0.0 {
                    continue;
                }
                let mid = tri
                    .iter()
                    .map(|&i| Vec3::from(mesh.positions[i as usize]).truncate())
                    .sum::<Vec2>()
                    / 3.0;
                assert!((mid - centroid).dot(normal.truncate()) > 0.0);
            }
        }
    }

    #[test]
    fn flat_series_keeps_a_single_outline() {
        let s = NormalizedSeries {
            labels: vec!["a".into(), "b".into()],
            xs: vec![0.0; 2],
            ys: vec![0.0, 0.0],
            zs: vec![0.0; 2],
        };
        let out = build_area(&s, &SceneConfig::default());
        assert_eq!(out.count(PrimitiveRole::Decoration), 1);
    }
}
