//! Turns spreadsheet rows plus an axis selection into numeric columns.

use error_stack::Report;

use crate::core::{Axis, AxisSelection, ChartType, NormalizedSeries, TabularDataset};
use crate::{ChartError, Result};

/// Pure conversion; one output entry per record, in record order.
///
/// Checks run before any work: required axes must be selected and name a
/// column somewhere in the dataset, and the dataset must have rows. Missing
/// cells and non-numeric text read as `0.0`.
pub fn normalize(
    dataset: &TabularDataset,
    axes: &AxisSelection,
    chart_type: ChartType,
) -> Result<NormalizedSeries> {
    for &axis in chart_type.required_axes() {
        if axes.field(axis).is_none() {
            return Err(Report::new(ChartError::MissingAxis {
                axis,
                reason: "no field selected".into(),
            })
            .attach(format!("{chart_type} charts need the {axis} axis")));
        }
    }

    if dataset.is_empty() {
        return Err(Report::new(ChartError::EmptyDataset));
    }

    for axis in [Axis::X, Axis::Y, Axis::Z] {
        let Some(field) = axes.field(axis) else {
            continue;
        };
        if !dataset.has_field(field) {
            return Err(Report::new(ChartError::MissingAxis {
                axis,
                reason: format!("field `{field}` is not present in any record"),
            }));
        }
    }

    let x_field = axes.field(Axis::X);
    let y_field = axes.field(Axis::Y);
    let z_field = axes.field(Axis::Z);

    let n = dataset.len();
    let mut series = NormalizedSeries {
        labels: Vec::with_capacity(n),
        xs: Vec::with_capacity(n),
        ys: Vec::with_capacity(n),
        zs: Vec::with_capacity(n),
    };

    for record in dataset.records() {
        let cell = |field: Option<&str>| field.and_then(|f| record.get(f));
        let x = cell(x_field);
        series
            .labels
            .push(x.map(ToString::to_string).unwrap_or_default());
        series.xs.push(x.map_or(0.0, |c| c.as_number()));
        series.ys.push(cell(y_field).map_or(0.0, |c| c.as_number()));
        series.zs.push(cell(z_field).map_or(0.0, |c| c.as_number()));
    }

    tracing::debug!(
        records = n,
        chart = %chart_type,
        peak = series.peak(),
        "normalized dataset"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(json: &str) -> TabularDataset {
        TabularDataset::from_json_str(json).unwrap()
    }

    #[test]
    fn parallel_columns_follow_record_order() {
        let ds = dataset(r#"[{"cat":"A","val":10},{"cat":"B","val":"30"},{"cat":"C","val":60}]"#);
        let s = normalize(&ds, &AxisSelection::new("cat", "val"), ChartType::Pie).unwrap();
        assert_eq!(s.labels, vec!["A", "B", "C"]);
        assert_eq!(s.xs, vec![0.0, 0.0, 0.0]);
        assert_eq!(s.ys, vec![10.0, 30.0, 60.0]);
        assert_eq!(s.zs, vec![0.0, 0.0, 0.0]);
        assert_eq!(s.peak(), 60.0);
    }

    #[test]
    fn missing_and_garbage_cells_read_as_zero() {
        let ds = dataset(r#"[{"x":1,"y":"n/a"},{"x":2},{"x":3,"y":null},{"x":4,"y":"7.5"}]"#);
        let s = normalize(&ds, &AxisSelection::new("x", "y"), ChartType::Line).unwrap();
        assert_eq!(s.xs, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.ys, vec![0.0, 0.0, 0.0, 7.5]);
        // Deterministic: a second pass yields the same series.
        assert_eq!(
            s,
            normalize(&ds, &AxisSelection::new("x", "y"), ChartType::Line).unwrap()
        );
    }

    #[test]
    fn unset_axes_are_rejected_before_anything_else() {
        let ds = dataset(r#"[{"x":1,"y":2}]"#);
        let err = normalize(&ds, &AxisSelection::new("", ""), ChartType::Line).unwrap_err();
        assert!(matches!(
            err.current_context(),
            ChartError::MissingAxis { axis: Axis::X, .. }
        ));

        let err = normalize(&TabularDataset::default(), &AxisSelection::default(), ChartType::Bar)
            .unwrap_err();
        assert!(matches!(err.current_context(), ChartError::MissingAxis { .. }));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = normalize(
            &TabularDataset::default(),
            &AxisSelection::new("x", "y"),
            ChartType::Bar,
        )
        .unwrap_err();
        assert_eq!(err.current_context(), &ChartError::EmptyDataset);
    }

    #[test]
    fn unknown_field_is_a_missing_axis() {
        let ds = dataset(r#"[{"x":1,"y":2}]"#);
        let err = normalize(&ds, &AxisSelection::new("x", "nope"), ChartType::Bar).unwrap_err();
        assert!(matches!(
            err.current_context(),
            ChartError::MissingAxis { axis: Axis::Y, .. }
        ));
    }

    #[test]
    fn optional_z_column_is_read_when_selected() {
        let ds = dataset(r#"[{"x":1,"y":2,"h":3},{"x":2,"y":4}]"#);
        let axes = AxisSelection::new("x", "y").with_z("h");
        let s = normalize(&ds, &axes, ChartType::Scatter).unwrap();
        assert_eq!(s.zs, vec![3.0, 0.0]);
        assert_eq!(s.peak_z(), 3.0);
    }
}
