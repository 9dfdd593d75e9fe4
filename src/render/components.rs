use std::path::PathBuf;
use std::sync::Arc;

use bevy::prelude::*;

use super::SurfaceId;
use super::slot::SlotState;
use crate::ChartError;
use crate::config::SceneConfig;
use crate::core::{AxisSelection, ChartRequest, TabularDataset};

/// A chart to keep on screen. Any change to this component rebuilds the
/// scene; removing it (or despawning the entity) disposes the scene.
#[derive(Component, Clone, Debug)]
#[require(ChartStatus)]
pub struct ChartView {
    pub dataset: Arc<TabularDataset>,
    pub axes: AxisSelection,
    /// Raw chart tag as picked in the form, e.g. `"pie"`.
    pub chart_type: String,
    pub config: SceneConfig,
}

impl ChartView {
    pub fn request(&self) -> crate::Result<ChartRequest> {
        ChartRequest::parse(self.dataset.clone(), self.axes.clone(), &self.chart_type)
    }
}

/// Lifecycle state mirrored from the chart's slot after every update.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct ChartStatus {
    pub state: SlotState,
    pub frames: u64,
    /// Last build, render or snapshot error; cleared by a successful rebuild.
    pub error: Option<ChartError>,
}

/// Insert on a `ChartView` entity to save its next rendered frame to `path`.
#[derive(Component, Clone, Debug)]
pub struct SnapshotRequest {
    pub path: PathBuf,
}

impl SnapshotRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// 3D camera rendering one chart surface.
#[derive(Component, Clone, Copy, Debug)]
pub struct ChartCamera {
    pub surface: SurfaceId,
}

/// 2D camera drawing a surface's label text on top of its 3D view.
#[derive(Component, Clone, Copy, Debug)]
pub struct ChartOverlayCamera {
    pub surface: SurfaceId,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct ChartLabel {
    pub surface: SurfaceId,
}
