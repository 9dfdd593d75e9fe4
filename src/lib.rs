pub mod camera;
pub mod config;
pub mod core;
pub mod geometry;
pub mod mesh;
pub mod normalize;
pub mod render;
pub mod runtime;
pub mod scene;
pub mod view;

use thiserror::Error;

use crate::core::Axis;

/// Everything that can go wrong between a form submission and a live scene.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// A required axis field is unset or names no column in the dataset.
    #[error("missing {axis} axis: {reason}")]
    MissingAxis { axis: Axis, reason: String },

    #[error("dataset has no records")]
    EmptyDataset,

    #[error("unsupported chart type `{0}`")]
    UnsupportedChartType(String),

    /// Tolerated during teardown; reported, never returned as `Err`.
    #[error("disposal failure: {0}")]
    DisposalFailure(String),

    #[error("render backend error: {0}")]
    Backend(String),

    #[error("tessellation failed: {0}")]
    Tessellation(String),

    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

pub type Result<T> = std::result::Result<T, error_stack::Report<ChartError>>;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

pub mod prelude {
    pub use crate::ChartError;
    pub use crate::camera::*;
    pub use crate::config::*;
    pub use crate::core::*;
    pub use crate::render::{ChartScenePlugin, ChartStatus, ChartView, SnapshotRequest};
    pub use crate::render::{ChartSlot, DisposeReport, SceneHandle, SlotState};
    pub use crate::runtime::*;
    pub use crate::view::*;
}
