use std::collections::{BTreeSet, HashMap};

use bevy::prelude::*;

use super::host::FrameHost;
use super::{GeometryId, MaterialId, ObjectId, SurfaceId, SurfaceSize, TextureId};
use super::slot::ChartSlot;
use crate::scene::LabelSpec;

/// Live chart slot per `ChartView` entity.
#[derive(Resource, Default)]
pub struct ChartSlots {
    pub by_view: HashMap<Entity, ChartSlot>,
}

/// Frame scheduling and container bookkeeping for the primary window.
/// Frames requested during one update fire at the start of the next.
#[derive(Resource, Deref, DerefMut)]
pub struct HostState(pub FrameHost);

impl Default for HostState {
    fn default() -> Self {
        Self(FrameHost::new(SurfaceSize::new(1280, 720)))
    }
}

pub(crate) struct SurfaceEntry {
    pub camera: Entity,
    pub overlay: Entity,
    /// World layer; the overlay uses `layer + 1`.
    pub layer: usize,
    pub size: SurfaceSize,
}

pub(crate) struct LabelEntry {
    pub spec: LabelSpec,
    pub text: Option<Entity>,
}

pub(crate) enum ObjectKind {
    Mesh {
        billboard: bool,
        texture: Option<TextureId>,
    },
    Light,
    /// Ambient light is a global resource, not an entity.
    Ambient,
}

pub(crate) struct ObjectEntry {
    pub entity: Option<Entity>,
    pub surface: SurfaceId,
    pub anchor: Vec3,
    pub kind: ObjectKind,
}

/// Maps backend ids to the Bevy assets and entities behind them.
#[derive(Resource, Default)]
pub struct ChartRegistry {
    next_id: u64,
    used_layers: BTreeSet<usize>,
    pub(crate) surfaces: HashMap<SurfaceId, SurfaceEntry>,
    pub(crate) geometries: HashMap<GeometryId, Handle<Mesh>>,
    pub(crate) materials: HashMap<MaterialId, Handle<StandardMaterial>>,
    pub(crate) textures: HashMap<TextureId, LabelEntry>,
    pub(crate) objects: HashMap<ObjectId, ObjectEntry>,
}

impl ChartRegistry {
    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Lowest free world layer. Layer 0 is left to the application and
    /// each surface takes a pair: world and overlay.
    pub(crate) fn claim_layer(&mut self) -> usize {
        let mut layer = 1;
        while self.used_layers.contains(&layer) {
            layer += 2;
        }
        self.used_layers.insert(layer);
        layer
    }

    pub(crate) fn free_layer(&mut self, layer: usize) {
        self.used_layers.remove(&layer);
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn live_assets(&self) -> usize {
        self.geometries.len() + self.materials.len() + self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_are_reused_after_release() {
        let mut registry = ChartRegistry::default();
        let a = registry.claim_layer();
        let b = registry.claim_layer();
        assert_eq!((a, b), (1, 3));
        registry.free_layer(a);
        assert_eq!(registry.claim_layer(), 1);
        assert_eq!(registry.claim_layer(), 5);
    }
}
