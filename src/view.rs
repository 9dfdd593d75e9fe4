use std::sync::Arc;

use crate::config::SceneConfig;
use crate::core::{AxisSelection, ChartType, Color, TabularDataset};
use crate::render::ChartView;

pub fn chart(dataset: impl Into<Arc<TabularDataset>>) -> ChartBuilder {
    ChartBuilder {
        dataset: dataset.into(),
        axes: AxisSelection::default(),
        chart_type: ChartType::Bar.as_str().to_string(),
        config: SceneConfig::default(),
    }
}

pub struct ChartBuilder {
    dataset: Arc<TabularDataset>,
    axes: AxisSelection,
    chart_type: String,
    config: SceneConfig,
}

impl ChartBuilder {
    pub fn x(mut self, field: impl Into<String>) -> Self {
        self.axes.x = Some(field.into());
        self
    }

    pub fn y(mut self, field: impl Into<String>) -> Self {
        self.axes.y = Some(field.into());
        self
    }

    /// Optional depth column; only scatter charts use it.
    pub fn z(mut self, field: impl Into<String>) -> Self {
        self.axes.z = Some(field.into());
        self
    }

    pub fn kind(mut self, chart_type: ChartType) -> Self {
        self.chart_type = chart_type.as_str().to_string();
        self
    }

    /// Raw tag as it arrives from a form; unknown tags surface as an error
    /// on the chart's status once it is built.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.chart_type = tag.into();
        self
    }

    pub fn config(mut self, config: SceneConfig) -> Self {
        self.config = config;
        self
    }

    pub fn background_color(mut self, c: Color) -> Self {
        self.config.background = c;
        self
    }

    pub fn labels(mut self, show: bool) -> Self {
        self.config = self.config.with_labels(show);
        self
    }

    pub fn build(self) -> ChartView {
        ChartView {
            dataset: self.dataset,
            axes: self.axes,
            chart_type: self.chart_type,
            config: self.config,
        }
    }
}
