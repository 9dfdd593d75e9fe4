use std::path::Path;

use bevy_math::Vec3;
use error_stack::Report;

use super::frame_loop::RenderLoop;
use super::{
    FrameRequest, GeometryId, Host, ListenerId, MaterialId, ObjectId, ObjectSpec, RenderBackend,
    SurfaceId, SurfaceSize, TextureId,
};
use crate::camera::{CameraState, OrbitControls};
use crate::core::{ChartType, Extents, PrimitiveRole};
use crate::scene::{PreparedScene, SceneObject};
use crate::{ChartError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct LiveObject {
    role: Option<PrimitiveRole>,
    object: Option<ObjectId>,
    geometry: Option<GeometryId>,
    material: Option<MaterialId>,
    texture: Option<TextureId>,
}

/// What a teardown released. Failures were tolerated; teardown always runs
/// to completion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisposeReport {
    pub objects: usize,
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
    pub lights: usize,
    pub frame_cancelled: bool,
    pub listener_removed: bool,
    pub surface_disposed: bool,
    pub failures: Vec<ChartError>,
}

impl DisposeReport {
    /// Nothing was held, so nothing was released.
    pub fn is_noop(&self) -> bool {
        self.objects == 0
            && self.geometries == 0
            && self.materials == 0
            && self.textures == 0
            && self.lights == 0
            && !self.frame_cancelled
            && !self.listener_removed
            && !self.surface_disposed
    }
}

/// Every resource a live chart holds, as opaque backend ids.
///
/// Built by [`SceneHandle::build`], released exactly once by
/// [`SceneHandle::dispose`]. Dropping a handle without disposing it leaks
/// its resources and logs a warning.
#[derive(Debug)]
pub struct SceneHandle {
    chart_type: ChartType,
    extents: Extents,
    focus: Vec3,
    size: SurfaceSize,
    surface: Option<SurfaceId>,
    mounted: bool,
    primitives: Vec<LiveObject>,
    grid: Option<LiveObject>,
    lights: Vec<ObjectId>,
    camera: Option<CameraState>,
    controls: Option<OrbitControls>,
    resize_listener: Option<ListenerId>,
    render_loop: RenderLoop,
    released: bool,
}

impl SceneHandle {
    /// Allocate `prepared` on the backend, mount it into the host and start
    /// rendering. On any failure everything allocated so far is released
    /// before the error is returned.
    pub fn build<B, H>(prepared: PreparedScene, backend: &mut B, host: &mut H) -> Result<Self>
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        let PreparedScene { graph, framing } = prepared;
        let size = host.container_size();
        let mut handle = SceneHandle {
            chart_type: graph.chart_type,
            extents: graph.extents,
            focus: framing.controls.target,
            size,
            surface: None,
            mounted: false,
            primitives: Vec::with_capacity(graph.objects.len()),
            grid: None,
            lights: Vec::with_capacity(graph.lights.len()),
            camera: None,
            controls: None,
            resize_listener: None,
            render_loop: RenderLoop::default(),
            released: false,
        };

        let allocated = (|| -> Result<()> {
            let surface = backend.create_surface(size, graph.background)?;
            handle.surface = Some(surface);
            host.mount(surface)?;
            handle.mounted = true;

            // Partially allocated objects are recorded before the error
            // propagates so rollback can release them.
            for object in &graph.objects {
                let mut live = LiveObject::default();
                let result = allocate_object(&mut live, surface, object, &mut *backend);
                handle.primitives.push(live);
                result?;
            }

            let mut grid = LiveObject::default();
            let result = allocate_object(&mut grid, surface, &graph.grid, &mut *backend);
            handle.grid = Some(grid);
            result?;

            for light in &graph.lights {
                handle.lights.push(backend.spawn_light(surface, light)?);
            }

            let mut camera = framing.camera;
            camera.set_aspect(size.aspect());
            handle.camera = Some(camera);
            handle.controls = Some(framing.controls);

            handle.render_loop.start(&mut *host);
            handle.resize_listener = Some(host.add_resize_listener());
            Ok(())
        })();

        if let Err(report) = allocated {
            let rollback = handle.release(backend, host);
            tracing::warn!(
                chart = %handle.chart_type,
                error = %report.current_context(),
                released = rollback.geometries + rollback.materials + rollback.objects,
                "scene build failed, rolled back partial allocation"
            );
            return Err(report.attach(format!(
                "rolled back a partially built {} scene",
                handle.chart_type
            )));
        }

        tracing::info!(
            chart = %handle.chart_type,
            primitives = handle.primitives.len(),
            width = size.width,
            height = size.height,
            "scene is live"
        );
        Ok(handle)
    }

    /// Handle one fired frame callback: aim the camera, apply damping,
    /// render. Returns `false` for stale callbacks, which render nothing.
    pub fn on_frame<B, H>(&mut self, fired: FrameRequest, backend: &mut B, host: &mut H) -> Result<bool>
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        if self.released || !self.render_loop.accept(fired, &mut *host) {
            return Ok(false);
        }
        let (Some(surface), Some(camera), Some(controls)) =
            (self.surface, self.camera.as_mut(), self.controls.as_mut())
        else {
            return Ok(false);
        };
        controls.target = self.focus;
        controls.update(camera);
        backend.render(surface, camera)?;
        Ok(true)
    }

    /// Follow a container size change. Zero-height sizes are ignored and
    /// repeating the current size is a no-op. Returns `true` when applied.
    pub fn resize<B>(&mut self, size: SurfaceSize, backend: &mut B) -> bool
    where
        B: RenderBackend + ?Sized,
    {
        if self.released || size.height == 0 || size == self.size {
            return false;
        }
        let Some(surface) = self.surface else {
            return false;
        };
        self.size = size;
        if let Some(camera) = self.camera.as_mut() {
            camera.set_aspect(size.aspect());
        }
        backend.resize_surface(surface, size);
        tracing::debug!(width = size.width, height = size.height, "resized chart surface");
        true
    }

    /// Capture the last rendered frame. Requires at least one rendered frame.
    pub fn snapshot<B>(&self, path: &Path, backend: &mut B) -> Result<()>
    where
        B: RenderBackend + ?Sized,
    {
        let Some(surface) = self.surface.filter(|_| !self.released) else {
            return Err(Report::new(ChartError::SnapshotUnavailable(
                "scene has been disposed".into(),
            )));
        };
        if self.render_loop.frames_rendered() == 0 {
            return Err(Report::new(ChartError::SnapshotUnavailable(
                "no frame has been rendered yet".into(),
            )));
        }
        backend.capture(surface, path)
    }

    /// Tear the scene down: stop the loop, detach the resize listener,
    /// release every primitive, the grid and the lights, then unmount and
    /// release the surface and drop the camera.
    pub fn dispose<B, H>(mut self, backend: &mut B, host: &mut H) -> DisposeReport
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        let report = self.release(backend, host);
        tracing::info!(
            chart = %self.chart_type,
            objects = report.objects,
            geometries = report.geometries,
            materials = report.materials,
            textures = report.textures,
            failures = report.failures.len(),
            "scene disposed"
        );
        report
    }

    fn release<B, H>(&mut self, backend: &mut B, host: &mut H) -> DisposeReport
    where
        B: RenderBackend + ?Sized,
        H: Host + ?Sized,
    {
        let mut report = DisposeReport::default();
        if self.released {
            return report;
        }
        self.released = true;

        report.frame_cancelled = self.render_loop.stop(&mut *host);
        if let Some(listener) = self.resize_listener.take() {
            report.listener_removed = host.remove_resize_listener(listener);
        }

        for live in self.primitives.drain(..).chain(self.grid.take()) {
            release_object(live, backend, &mut report);
        }
        for light in self.lights.drain(..) {
            backend.despawn(light);
            report.lights += 1;
        }

        if let Some(surface) = self.surface.take() {
            if self.mounted {
                self.mounted = false;
                if let Err(e) = host.unmount(surface) {
                    tracing::warn!(error = %e.current_context(), "surface already detached");
                    report.failures.push(e.current_context().clone());
                }
            }
            backend.dispose_surface(surface);
            report.surface_disposed = true;
        }

        self.camera = None;
        self.controls = None;
        report
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn extents(&self) -> &Extents {
        &self.extents
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn camera(&self) -> Option<&CameraState> {
        self.camera.as_ref()
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.controls.as_mut()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn count(&self, role: PrimitiveRole) -> usize {
        self.primitives
            .iter()
            .filter(|p| p.role == Some(role))
            .count()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn has_grid(&self) -> bool {
        self.grid.is_some()
    }

    pub fn resize_listener(&self) -> Option<ListenerId> {
        self.resize_listener
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.render_loop.pending()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.render_loop.frames_rendered()
    }
}

impl Drop for SceneHandle {
    fn drop(&mut self) {
        if !self.released && self.surface.is_some() {
            tracing::warn!(
                chart = %self.chart_type,
                primitives = self.primitives.len(),
                "scene handle dropped without dispose; GPU resources leaked"
            );
        }
    }
}

fn allocate_object<B>(
    live: &mut LiveObject,
    surface: SurfaceId,
    object: &SceneObject,
    backend: &mut B,
) -> Result<()>
where
    B: RenderBackend + ?Sized,
{
    live.role = Some(object.role);
    let geometry = backend.create_geometry(&object.geometry)?;
    live.geometry = Some(geometry);
    let material = backend.create_material(&object.material)?;
    live.material = Some(material);
    if let Some(label) = &object.label {
        live.texture = Some(backend.create_label_texture(label)?);
    }
    live.object = Some(backend.spawn_object(
        surface,
        ObjectSpec {
            geometry,
            material,
            texture: live.texture,
            placement: &object.placement,
            cast_shadows: object.cast_shadows,
            billboard: object.billboard,
        },
    )?);
    Ok(())
}

fn release_object<B>(live: LiveObject, backend: &mut B, report: &mut DisposeReport)
where
    B: RenderBackend + ?Sized,
{
    if let Some(object) = live.object {
        backend.despawn(object);
        report.objects += 1;
    }
    if let Some(geometry) = live.geometry {
        backend.dispose_geometry(geometry);
        report.geometries += 1;
    }
    if let Some(material) = live.material {
        backend.dispose_material(material);
        report.materials += 1;
    }
    if let Some(texture) = live.texture {
        backend.dispose_texture(texture);
        report.textures += 1;
    }
}
