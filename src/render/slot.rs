use std::path::Path;

use error_stack::Report;

use super::handle::{DisposeReport, SceneHandle};
use super::{FrameRequest, Host, RenderBackend, SurfaceSize};
use crate::config::SceneConfig;
use crate::core::ChartRequest;
use crate::scene::prepare_scene;
use crate::{ChartError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SlotState {
    #[default]
    Empty,
    Building,
    Live,
    Disposing,
}

/// Owns at most one live scene and enforces the lifecycle
/// `Empty -> Building -> Live -> Disposing -> Empty`.
///
/// A rebuild always disposes the previous scene before building the next,
/// so two scenes never coexist in one slot.
#[derive(Debug, Default)]
pub struct ChartSlot {
    state: SlotState,
    scene: Option<SceneHandle>,
    builds: u64,
    disposals: u64,
}

impl ChartSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == SlotState::Live
    }

    pub fn scene(&self) -> Option<&SceneHandle> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut SceneHandle> {
        self.scene.as_mut()
    }

    /// Successful builds so far.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Teardowns that released a live scene.
    pub fn disposals(&self) -> u64 {
        self.disposals
    }

    /// Dispose whatever is live, then validate `config` and build `request`.
    /// On failure the slot is left `Empty` and the error is returned.
    pub fn rebuild<B, H>(
        &mut self,
        request: &ChartRequest,
        config: &SceneConfig,
        backend: &mut B,
        host: &mut H,
    ) -> Result<&SceneHandle>
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        self.dispose(&mut *backend, &mut *host);

        self.state = SlotState::Building;
        let aspect = host.container_size().aspect();
        let built = config
            .validate()
            .and_then(|()| prepare_scene(request, config, aspect))
            .and_then(|prepared| SceneHandle::build(prepared, &mut *backend, &mut *host));

        match built {
            Ok(handle) => {
                self.state = SlotState::Live;
                self.builds += 1;
                Ok(self.scene.insert(handle))
            }
            Err(report) => {
                self.state = SlotState::Empty;
                tracing::error!(
                    chart = %request.chart_type,
                    error = %report.current_context(),
                    "chart build failed"
                );
                Err(report)
            }
        }
    }

    /// Like [`ChartSlot::rebuild`] but takes the chart type as a raw tag.
    /// The previous scene is disposed even when the tag is unsupported.
    pub fn rebuild_tagged<B, H>(
        &mut self,
        dataset: std::sync::Arc<crate::core::TabularDataset>,
        axes: crate::core::AxisSelection,
        tag: &str,
        config: &SceneConfig,
        backend: &mut B,
        host: &mut H,
    ) -> Result<&SceneHandle>
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        match ChartRequest::parse(dataset, axes, tag) {
            Ok(request) => self.rebuild(&request, config, backend, host),
            Err(report) => {
                self.dispose(backend, host);
                Err(report)
            }
        }
    }

    /// Tear down the live scene, if any. Disposing an empty slot is a no-op.
    pub fn dispose<B, H>(&mut self, backend: &mut B, host: &mut H) -> DisposeReport
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        let Some(scene) = self.scene.take() else {
            tracing::trace!("dispose on empty chart slot");
            return DisposeReport::default();
        };
        self.state = SlotState::Disposing;
        let report = scene.dispose(backend, host);
        self.state = SlotState::Empty;
        self.disposals += 1;
        report
    }

    /// Feed one fired frame callback to the live scene.
    pub fn on_frame<B, H>(&mut self, fired: FrameRequest, backend: &mut B, host: &mut H) -> Result<bool>
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        match self.scene.as_mut() {
            Some(scene) if self.state == SlotState::Live => scene.on_frame(fired, backend, host),
            _ => Ok(false),
        }
    }

    /// Feed a batch of fired callbacks; returns how many frames rendered.
    pub fn pump<B, H>(&mut self, fired: &[FrameRequest], backend: &mut B, host: &mut H) -> Result<usize>
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        let mut rendered = 0;
        for &request in fired {
            if self.on_frame(request, &mut *backend, &mut *host)? {
                rendered += 1;
            }
        }
        Ok(rendered)
    }

    pub fn resize<B>(&mut self, size: SurfaceSize, backend: &mut B) -> bool
    where
        B: RenderBackend + ?Sized,
    {
        match self.scene.as_mut() {
            Some(scene) if self.state == SlotState::Live => scene.resize(size, backend),
            _ => false,
        }
    }

    /// Capture the current frame. Only a live scene that has rendered at
    /// least one frame can be captured.
    pub fn snapshot<B>(&self, path: &Path, backend: &mut B) -> Result<()>
    where
        B: RenderBackend + ?Sized,
    {
        match self.scene.as_ref() {
            Some(scene) if self.state == SlotState::Live => scene.snapshot(path, backend),
            _ => Err(Report::new(ChartError::SnapshotUnavailable(format!(
                "chart is {:?}, not live",
                self.state
            )))),
        }
    }
}
