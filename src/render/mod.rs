//! Scene lifecycle: allocation, the per-frame loop, resizing and teardown.
//!
//! The lifecycle is written against two seams. [`RenderBackend`] owns GPU
//! resources behind opaque ids; [`Host`] is the embedding environment that
//! provides the container, resize notifications and frame scheduling.
//! [`FrameHost`] is the host both for tests and for [`ChartScenePlugin`].
//! `headless` records backend calls for tests; `backend` renders with Bevy.

pub mod backend;
pub mod components;
pub mod frame_loop;
pub mod handle;
pub mod headless;
pub mod host;
pub mod resources;
pub mod slot;
pub mod systems;

use std::path::Path;

use bevy::prelude::*;

use crate::Result;
use crate::camera::CameraState;
use crate::core::{Color, Placement};
use crate::mesh::GeometrySpec;
use crate::scene::{LabelSpec, LightSpec, MaterialSpec};

pub use components::{ChartStatus, ChartView, SnapshotRequest};
pub use frame_loop::RenderLoop;
pub use handle::{DisposeReport, SceneHandle};
pub use headless::HeadlessBackend;
pub use host::FrameHost;
pub use resources::{ChartRegistry, ChartSlots, HostState};
pub use slot::{ChartSlot, SlotState};

macro_rules! opaque_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u64);
        )*
    };
}

opaque_id! {
    /// A drawing surface plus the camera that renders into it.
    SurfaceId,
    GeometryId,
    MaterialId,
    /// Rasterized label text.
    TextureId,
    /// A mesh instance or light placed in a surface's scene.
    ObjectId,
    ListenerId,
    /// Pending request for one frame callback.
    FrameRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Instance of an allocated geometry/material pair in a surface's scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectSpec<'a> {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub texture: Option<TextureId>,
    pub placement: &'a Placement,
    pub cast_shadows: bool,
    pub billboard: bool,
}

/// GPU resource owner. Every `create_*`/`spawn_*` must be paired with the
/// matching `dispose_*`/`despawn` exactly once.
pub trait RenderBackend {
    fn create_surface(&mut self, size: SurfaceSize, background: Color) -> Result<SurfaceId>;
    fn resize_surface(&mut self, surface: SurfaceId, size: SurfaceSize);
    fn dispose_surface(&mut self, surface: SurfaceId);

    fn create_geometry(&mut self, geometry: &GeometrySpec) -> Result<GeometryId>;
    fn create_material(&mut self, material: &MaterialSpec) -> Result<MaterialId>;
    fn create_label_texture(&mut self, label: &LabelSpec) -> Result<TextureId>;
    fn dispose_geometry(&mut self, geometry: GeometryId);
    fn dispose_material(&mut self, material: MaterialId);
    fn dispose_texture(&mut self, texture: TextureId);

    fn spawn_object(&mut self, surface: SurfaceId, object: ObjectSpec<'_>) -> Result<ObjectId>;
    fn spawn_light(&mut self, surface: SurfaceId, light: &LightSpec) -> Result<ObjectId>;
    fn despawn(&mut self, object: ObjectId);

    fn render(&mut self, surface: SurfaceId, camera: &CameraState) -> Result<()>;
    /// Write the surface's most recent frame to `path`.
    fn capture(&mut self, surface: SurfaceId, path: &Path) -> Result<()>;
}

/// The embedding environment a chart is mounted into.
pub trait Host {
    fn container_size(&self) -> SurfaceSize;
    fn mount(&mut self, surface: SurfaceId) -> Result<()>;
    /// Fails when the surface is not (or no longer) attached to the container.
    fn unmount(&mut self, surface: SurfaceId) -> Result<()>;
    fn add_resize_listener(&mut self) -> ListenerId;
    fn remove_resize_listener(&mut self, listener: ListenerId) -> bool;
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest) -> bool;
}

/// Drives every [`ChartView`] entity: rebuilds on change, renders each
/// frame, follows window resizes and tears scenes down on removal or exit.
#[derive(Default)]
pub struct ChartScenePlugin;

impl Plugin for ChartScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ChartRegistry>()
            .init_resource::<ChartSlots>()
            .init_resource::<HostState>()
            .add_systems(
                Update,
                (
                    systems::sync_host_size,
                    systems::dispose_removed_views,
                    systems::rebuild_changed_views,
                    systems::follow_window_resize,
                    systems::orbit_input,
                    systems::drive_render_loops,
                    systems::take_snapshots,
                )
                    .chain(),
            )
            .add_systems(Last, systems::dispose_on_exit);
    }
}
