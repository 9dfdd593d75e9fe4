use bevy_math::Vec3;

use super::GeometryOutput;
use super::common::{format_value, label_sprite, palette_color, scaled_height};
use crate::config::SceneConfig;
use crate::core::{Extents, Layout, NormalizedSeries, Placement, PrimitiveDescriptor, ShapeKind};

/// One box per category along +X, heights proportional to `value / peak`.
///
/// Negative values hang below the ground plane. With value labels enabled
/// each bar also gets a sprite floating just above its top face.
pub fn build_bars(series: &NormalizedSeries, config: &SceneConfig) -> GeometryOutput {
    let bar = &config.bar;
    let peak = series.peak();
    let mut primitives = Vec::with_capacity(series.len() * 2);

    for (i, &value) in series.ys.iter().enumerate() {
        let h = scaled_height(value, peak, config.value_scale);
        let x = i as f32 * bar.spacing;

        primitives.push(
            PrimitiveDescriptor::datum(
                ShapeKind::Box {
                    width: bar.width,
                    height: h.abs(),
                    depth: bar.width,
                },
                Placement::at(Vec3::new(x, h * 0.5, 0.0)),
                palette_color(i),
            )
            .with_label(series.labels[i].clone()),
        );

        if bar.show_labels {
            primitives.push(label_sprite(
                format_value(value),
                config.labels.bar_size,
                Vec3::new(x, h.max(0.0) + bar.label_offset, 0.0),
                &config.labels,
            ));
        }
    }

    let width = series.len().saturating_sub(1) as f32 * bar.spacing;
    let height = if peak > 0.0 { config.value_scale } else { 0.0 };
    GeometryOutput {
        primitives,
        extents: Extents {
            layout: Layout::Linear,
            width,
            depth: bar.width,
            peak_value: peak,
            height,
            base: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PrimitiveRole;

    fn series(values: &[f64]) -> NormalizedSeries {
        NormalizedSeries {
            labels: vec!["a".into(); values.len()],
            xs: vec![0.0; values.len()],
            ys: values.to_vec(),
            zs: vec![0.0; values.len()],
        }
    }

    fn heights(out: &GeometryOutput) -> Vec<f32> {
        out.datums()
            .map(|p| match p.shape {
                ShapeKind::Box { height, .. } => height,
                _ => panic!("bar datum must be a box"),
            })
            .collect()
    }

    #[test]
    fn heights_are_proportional_to_peak() {
        let config = SceneConfig::default();
        let out = build_bars(&series(&[5.0, 0.0, 10.0]), &config);
        let h = config.value_scale;
        assert_eq!(heights(&out), vec![0.5 * h, 0.0, h]);

        let xs: Vec<f32> = out.datums().map(|p| p.placement.translation.x).collect();
        assert_eq!(xs, vec![0.0, 1.2, 2.4]);
        let centres: Vec<f32> = out.datums().map(|p| p.placement.translation.y).collect();
        assert_eq!(centres, vec![0.25 * h, 0.0, 0.5 * h]);
    }

    #[test]
    fn labels_show_raw_values() {
        let out = build_bars(&series(&[5.0, 2.5]), &SceneConfig::default());
        let texts: Vec<_> = out
            .primitives
            .iter()
            .filter(|p| p.role == PrimitiveRole::Label)
            .filter_map(|p| p.label.as_deref())
            .collect();
        assert_eq!(texts, vec!["5", "2.5"]);

        let plain = build_bars(
            &series(&[5.0, 2.5]),
            &SceneConfig::default().with_labels(false),
        );
        assert_eq!(plain.primitives.len(), 2);
    }

    #[test]
    fn neighbouring_bars_never_touch() {
        let config = SceneConfig::default();
        let out = build_bars(&series(&[1.0, 2.0, 3.0]), &config);
        let xs: Vec<f32> = out.datums().map(|p| p.placement.translation.x).collect();
        for pair in xs.windows(2) {
            assert!(pair[1] - pair[0] > config.bar.width);
        }
    }

    #[test]
    fn all_zero_series_yields_flat_bars() {
        let out = build_bars(&series(&[0.0, 0.0]), &SceneConfig::default());
        assert_eq!(heights(&out), vec![0.0, 0.0]);
        assert_eq!(out.extents.height, 0.0);
    }

    #[test]
    fn negative_values_hang_below_ground() {
        let out = build_bars(&series(&[-4.0, 2.0]), &SceneConfig::default());
        let first = out.datums().next().unwrap();
        assert_eq!(first.placement.translation.y, -5.0);
        assert_eq!(heights(&out)[0], 10.0);
    }
}
