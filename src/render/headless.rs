//! In-memory backend. Nothing is drawn; every allocation, release and frame
//! is recorded so lifecycle behaviour can be inspected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use error_stack::Report;

use super::{
    GeometryId, MaterialId, ObjectId, ObjectSpec, RenderBackend, SurfaceId, SurfaceSize,
    TextureId,
};
use crate::camera::CameraState;
use crate::core::Color;
use crate::mesh::GeometrySpec;
use crate::scene::{LabelSpec, LightSpec, MaterialSpec};
use crate::{ChartError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedFrame {
    pub surface: SurfaceId,
    pub camera: CameraState,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SurfaceRecord {
    size: SurfaceSize,
    background: Color,
    resizes: u32,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    allocations: usize,
    fail_at: Option<usize>,
    surfaces: BTreeMap<SurfaceId, SurfaceRecord>,
    geometries: BTreeMap<GeometryId, GeometrySpec>,
    materials: BTreeMap<MaterialId, MaterialSpec>,
    textures: BTreeMap<TextureId, LabelSpec>,
    objects: BTreeMap<ObjectId, SurfaceId>,
    lights: BTreeMap<ObjectId, LightSpec>,
    releases: BTreeMap<u64, u32>,
    frames: Vec<RenderedFrame>,
    captures: Vec<PathBuf>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th allocation from now (1-based) fail with a backend error.
    pub fn fail_on_allocation(&mut self, n: usize) {
        self.fail_at = Some(self.allocations + n);
    }

    fn allocate(&mut self, what: &str) -> Result<u64> {
        self.allocations += 1;
        if self.fail_at == Some(self.allocations) {
            self.fail_at = None;
            return Err(Report::new(ChartError::Backend(format!(
                "injected failure allocating {what}"
            ))));
        }
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn release(&mut self, raw: u64, found: bool) {
        *self.releases.entry(raw).or_default() += 1;
        if !found {
            tracing::warn!(id = raw, "release of unknown or already released resource");
        }
    }

    /// Surfaces, geometries, materials, textures, objects and lights still held.
    pub fn live_count(&self) -> usize {
        self.surfaces.len()
            + self.geometries.len()
            + self.materials.len()
            + self.textures.len()
            + self.objects.len()
            + self.lights.len()
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn live_lights(&self) -> usize {
        self.lights.len()
    }

    pub fn live_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// How often the resource with this raw id was released.
    pub fn release_count(&self, raw: u64) -> u32 {
        self.releases.get(&raw).copied().unwrap_or(0)
    }

    /// Ids released more than once.
    pub fn double_releases(&self) -> Vec<u64> {
        self.releases
            .iter()
            .filter(|&(_, &n)| n > 1)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn total_releases(&self) -> usize {
        self.releases.values().map(|&n| n as usize).sum()
    }

    pub fn frames(&self) -> &[RenderedFrame] {
        &self.frames
    }

    pub fn frames_for(&self, surface: SurfaceId) -> usize {
        self.frames.iter().filter(|f| f.surface == surface).count()
    }

    pub fn surface_size(&self, surface: SurfaceId) -> Option<SurfaceSize> {
        self.surfaces.get(&surface).map(|s| s.size)
    }

    /// Resize calls that actually reached the backend for this surface.
    pub fn resize_calls(&self, surface: SurfaceId) -> u32 {
        self.surfaces.get(&surface).map_or(0, |s| s.resizes)
    }

    pub fn captures(&self) -> &[PathBuf] {
        &self.captures
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_surface(&mut self, size: SurfaceSize, background: Color) -> Result<SurfaceId> {
        let id = SurfaceId(self.allocate("surface")?);
        self.surfaces.insert(
            id,
            SurfaceRecord {
                size,
                background,
                resizes: 0,
            },
        );
        Ok(id)
    }

    fn resize_surface(&mut self, surface: SurfaceId, size: SurfaceSize) {
        if let Some(record) = self.surfaces.get_mut(&surface) {
            record.size = size;
            record.resizes += 1;
        }
    }

    fn dispose_surface(&mut self, surface: SurfaceId) {
        let found = self.surfaces.remove(&surface).is_some();
        self.release(surface.0, found);
    }

    fn create_geometry(&mut self, geometry: &GeometrySpec) -> Result<GeometryId> {
        let id = GeometryId(self.allocate("geometry")?);
        self.geometries.insert(id, geometry.clone());
        Ok(id)
    }

    fn create_material(&mut self, material: &MaterialSpec) -> Result<MaterialId> {
        let id = MaterialId(self.allocate("material")?);
        self.materials.insert(id, material.clone());
        Ok(id)
    }

    fn create_label_texture(&mut self, label: &LabelSpec) -> Result<TextureId> {
        let id = TextureId(self.allocate("label texture")?);
        self.textures.insert(id, label.clone());
        Ok(id)
    }

    fn dispose_geometry(&mut self, geometry: GeometryId) {
        let found = self.geometries.remove(&geometry).is_some();
        self.release(geometry.0, found);
    }

    fn dispose_material(&mut self, material: MaterialId) {
        let found = self.materials.remove(&material).is_some();
        self.release(material.0, found);
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        let found = self.textures.remove(&texture).is_some();
        self.release(texture.0, found);
    }

    fn spawn_object(&mut self, surface: SurfaceId, object: ObjectSpec<'_>) -> Result<ObjectId> {
        if !self.geometries.contains_key(&object.geometry)
            || !self.materials.contains_key(&object.material)
        {
            return Err(Report::new(ChartError::Backend(
                "object references a released geometry or material".into(),
            )));
        }
        let id = ObjectId(self.allocate("object")?);
        self.objects.insert(id, surface);
        Ok(id)
    }

    fn spawn_light(&mut self, _surface: SurfaceId, light: &LightSpec) -> Result<ObjectId> {
        let id = ObjectId(self.allocate("light")?);
        self.lights.insert(id, light.clone());
        Ok(id)
    }

    fn despawn(&mut self, object: ObjectId) {
        let found = self.objects.remove(&object).is_some() || self.lights.remove(&object).is_some();
        self.release(object.0, found);
    }

    fn render(&mut self, surface: SurfaceId, camera: &CameraState) -> Result<()> {
        if !self.surfaces.contains_key(&surface) {
            return Err(Report::new(ChartError::Backend(format!(
                "render to unknown surface {surface:?}"
            ))));
        }
        self.frames.push(RenderedFrame {
            surface,
            camera: *camera,
        });
        Ok(())
    }

    /// Writes a binary PPM filled with the surface's clear colour.
    fn capture(&mut self, surface: SurfaceId, path: &Path) -> Result<()> {
        let record = self.surfaces.get(&surface).copied().ok_or_else(|| {
            Report::new(ChartError::Backend(format!(
                "capture of unknown surface {surface:?}"
            )))
        })?;
        let SurfaceSize { width, height } = record.size;
        let pixel = record.background.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let mut bytes = format!("P6\n{width} {height}\n255\n").into_bytes();
        for _ in 0..(width as usize * height as usize) {
            bytes.extend_from_slice(&pixel[..3]);
        }
        std::fs::write(path, bytes).map_err(|e| {
            Report::new(ChartError::Backend(e.to_string()))
                .attach(format!("writing snapshot to {}", path.display()))
        })?;
        self.captures.push(path.to_path_buf());
        Ok(())
    }
}
