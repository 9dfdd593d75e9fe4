//! Bevy implementation of [`RenderBackend`]: meshes and materials become
//! assets, objects and lights become entities on the surface's render layer,
//! and label text is drawn by a 2D overlay camera.

use std::path::Path;

use bevy::ecs::system::SystemParam;
use bevy::light::NotShadowCaster;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_camera::visibility::RenderLayers;
use bevy_camera::{ClearColorConfig, PerspectiveProjection, Projection};
use bevy_mesh::{Indices, PrimitiveTopology};
use bevy_render::view::screenshot::{Screenshot, save_to_disk};
use error_stack::Report;

use super::components::{ChartCamera, ChartLabel, ChartOverlayCamera};
use super::resources::{ChartRegistry, LabelEntry, ObjectEntry, ObjectKind, SurfaceEntry};
use super::{
    GeometryId, MaterialId, ObjectId, ObjectSpec, RenderBackend, SurfaceId, SurfaceSize, TextureId,
};
use crate::camera::CameraState;
use crate::core::Color as ChartColor;
use crate::mesh::{GeometrySpec, MeshData, Topology};
use crate::scene::{LabelSpec, LightSpec, MaterialSpec, Shading};
use crate::ChartError;

// Unit intensities map onto physical light units.
const AMBIENT_BRIGHTNESS: f32 = 500.0;
const DIRECTIONAL_LUX: f32 = 10_000.0;
const POINT_LUMENS: f32 = 1_000_000.0;

const SPHERE_SECTORS: u32 = 32;
const SPHERE_STACKS: u32 = 16;

#[derive(SystemParam)]
pub struct ChartBackend<'w, 's> {
    commands: Commands<'w, 's>,
    meshes: ResMut<'w, Assets<Mesh>>,
    materials: ResMut<'w, Assets<StandardMaterial>>,
    registry: ResMut<'w, ChartRegistry>,
}

impl<'w, 's> ChartBackend<'w, 's> {
    pub fn commands(&mut self) -> &mut Commands<'w, 's> {
        &mut self.commands
    }

    fn despawn_entity(&mut self, entity: Entity) {
        if let Ok(mut e) = self.commands.get_entity(entity) {
            e.despawn();
        }
    }

    fn camera_of(&self, surface: SurfaceId) -> crate::Result<Entity> {
        self.registry
            .surfaces
            .get(&surface)
            .map(|entry| entry.camera)
            .ok_or_else(|| Report::new(ChartError::Backend(format!("unknown surface {surface:?}"))))
    }

    fn layers_of(&self, surface: SurfaceId) -> crate::Result<(RenderLayers, RenderLayers)> {
        let entry = self.registry.surfaces.get(&surface).ok_or_else(|| {
            Report::new(ChartError::Backend(format!("unknown surface {surface:?}")))
        })?;
        Ok((
            RenderLayers::layer(entry.layer),
            RenderLayers::layer(entry.layer + 1),
        ))
    }
}

fn bevy_mesh(geometry: &GeometrySpec) -> Mesh {
    match geometry {
        GeometrySpec::Cuboid { size } => Mesh::from(Cuboid::new(size.x, size.y, size.z)),
        GeometrySpec::Sphere { radius } => Sphere::new(*radius)
            .mesh()
            .uv(SPHERE_SECTORS, SPHERE_STACKS),
        GeometrySpec::Quad { size } => Mesh::from(Rectangle::new(size.x, size.y)),
        GeometrySpec::Custom(data) => custom_mesh(data),
    }
}

fn custom_mesh(data: &MeshData) -> Mesh {
    let topology = match data.topology {
        Topology::Triangles => PrimitiveTopology::TriangleList,
        Topology::Lines => PrimitiveTopology::LineList,
    };
    let uvs: Vec<[f32; 2]> = vec![[0.0, 0.0]; data.vertex_count()];

    let mut mesh = Mesh::new(topology, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    if let Some(colors) = &data.colors {
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors.clone());
    }
    mesh.insert_indices(Indices::U32(data.indices.clone()));
    mesh
}

fn standard_material(spec: &MaterialSpec) -> StandardMaterial {
    let mut material = StandardMaterial {
        base_color: spec.color.into(),
        unlit: spec.shading == Shading::Unlit,
        double_sided: spec.double_sided,
        perceptual_roughness: 0.35,
        reflectance: 0.5,
        alpha_mode: if spec.is_transparent() {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        ..default()
    };
    if spec.double_sided {
        material.cull_mode = None;
    }
    material
}

/// Facing for a quad whose front is +Z: turned so +Z points at `eye`.
fn billboard_rotation(at: Vec3, eye: Vec3, up: Vec3) -> Quat {
    Transform::from_translation(at)
        .looking_at(at * 2.0 - eye, up)
        .rotation
}

impl RenderBackend for ChartBackend<'_, '_> {
    fn create_surface(&mut self, size: SurfaceSize, background: ChartColor) -> crate::Result<SurfaceId> {
        let surface = SurfaceId(self.registry.next_id());
        let layer = self.registry.claim_layer();

        let camera = self
            .commands
            .spawn((
                Name::new(format!("chart_cam_{}", surface.0)),
                ChartCamera { surface },
                Camera3d::default(),
                Camera {
                    order: layer as isize,
                    clear_color: ClearColorConfig::Custom(background.into()),
                    ..default()
                },
                Projection::from(PerspectiveProjection::default()),
                Transform::default(),
                RenderLayers::layer(layer),
            ))
            .id();

        let overlay = self
            .commands
            .spawn((
                Name::new(format!("chart_overlay_{}", surface.0)),
                ChartOverlayCamera { surface },
                Camera2d,
                Camera {
                    order: layer as isize + 1,
                    clear_color: ClearColorConfig::None,
                    ..default()
                },
                RenderLayers::layer(layer + 1),
            ))
            .id();

        self.registry.surfaces.insert(
            surface,
            SurfaceEntry {
                camera,
                overlay,
                layer,
                size,
            },
        );
        Ok(surface)
    }

    fn resize_surface(&mut self, surface: SurfaceId, size: SurfaceSize) {
        if let Some(entry) = self.registry.surfaces.get_mut(&surface) {
            entry.size = size;
        }
    }

    fn dispose_surface(&mut self, surface: SurfaceId) {
        let Some(entry) = self.registry.surfaces.remove(&surface) else {
            tracing::warn!(?surface, "dispose of unknown surface");
            return;
        };
        self.registry.free_layer(entry.layer);
        self.despawn_entity(entry.camera);
        self.despawn_entity(entry.overlay);
    }

    fn create_geometry(&mut self, geometry: &GeometrySpec) -> crate::Result<GeometryId> {
        let id = GeometryId(self.registry.next_id());
        let handle = self.meshes.add(bevy_mesh(geometry));
        self.registry.geometries.insert(id, handle);
        Ok(id)
    }

    fn create_material(&mut self, material: &MaterialSpec) -> crate::Result<MaterialId> {
        let id = MaterialId(self.registry.next_id());
        let handle = self.materials.add(standard_material(material));
        self.registry.materials.insert(id, handle);
        Ok(id)
    }

    fn create_label_texture(&mut self, label: &LabelSpec) -> crate::Result<TextureId> {
        let id = TextureId(self.registry.next_id());
        self.registry.textures.insert(
            id,
            LabelEntry {
                spec: label.clone(),
                text: None,
            },
        );
        Ok(id)
    }

    fn dispose_geometry(&mut self, geometry: GeometryId) {
        if let Some(handle) = self.registry.geometries.remove(&geometry) {
            self.meshes.remove(&handle);
        }
    }

    fn dispose_material(&mut self, material: MaterialId) {
        if let Some(handle) = self.registry.materials.remove(&material) {
            self.materials.remove(&handle);
        }
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        if let Some(text) = self
            .registry
            .textures
            .remove(&texture)
            .and_then(|entry| entry.text)
        {
            self.despawn_entity(text);
        }
    }

    fn spawn_object(&mut self, surface: SurfaceId, object: ObjectSpec<'_>) -> crate::Result<ObjectId> {
        let (world, overlay) = self.layers_of(surface)?;
        let (Some(mesh), Some(material)) = (
            self.registry.geometries.get(&object.geometry).cloned(),
            self.registry.materials.get(&object.material).cloned(),
        ) else {
            return Err(Report::new(ChartError::Backend(
                "object references a released geometry or material".into(),
            )));
        };

        let placement = object.placement;
        let mut entity = self.commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform {
                translation: placement.translation,
                rotation: placement.rotation,
                scale: placement.scale,
            },
            world,
        ));
        if !object.cast_shadows {
            entity.insert(NotShadowCaster);
        }
        let entity = entity.id();

        if let Some(texture) = object.texture {
            let label = self.registry.textures.get(&texture).map(|e| e.spec.clone());
            if let Some(label) = label {
                let text = self
                    .commands
                    .spawn((
                        Text2d::new(label.text.clone()),
                        TextFont {
                            font_size: label.font_px,
                            ..default()
                        },
                        TextColor(label.color.into()),
                        Transform::default(),
                        Visibility::Hidden,
                        ChartLabel { surface },
                        overlay,
                    ))
                    .id();
                if let Some(entry) = self.registry.textures.get_mut(&texture) {
                    entry.text = Some(text);
                }
            }
        }

        let id = ObjectId(self.registry.next_id());
        self.registry.objects.insert(
            id,
            ObjectEntry {
                entity: Some(entity),
                surface,
                anchor: placement.translation,
                kind: ObjectKind::Mesh {
                    billboard: object.billboard,
                    texture: object.texture,
                },
            },
        );
        Ok(id)
    }

    fn spawn_light(&mut self, surface: SurfaceId, light: &LightSpec) -> crate::Result<ObjectId> {
        let (world, _) = self.layers_of(surface)?;
        let (entity, kind, anchor) = match light {
            LightSpec::Ambient { color, intensity } => {
                // Per-camera override; removed again in `despawn`.
                let camera = self.camera_of(surface)?;
                self.commands.entity(camera).insert(AmbientLight {
                    color: (*color).into(),
                    brightness: intensity * AMBIENT_BRIGHTNESS,
                    ..default()
                });
                (None, ObjectKind::Ambient, Vec3::ZERO)
            }
            LightSpec::Directional {
                color,
                intensity,
                position,
                cast_shadows,
            } => {
                let entity = self
                    .commands
                    .spawn((
                        DirectionalLight {
                            color: (*color).into(),
                            illuminance: intensity * DIRECTIONAL_LUX,
                            shadows_enabled: *cast_shadows,
                            ..default()
                        },
                        Transform::from_translation(*position).looking_at(Vec3::ZERO, Vec3::Y),
                        world,
                    ))
                    .id();
                (Some(entity), ObjectKind::Light, *position)
            }
            LightSpec::Point {
                color,
                intensity,
                position,
            } => {
                let entity = self
                    .commands
                    .spawn((
                        PointLight {
                            color: (*color).into(),
                            intensity: intensity * POINT_LUMENS,
                            range: 1_000.0,
                            ..default()
                        },
                        Transform::from_translation(*position),
                        world,
                    ))
                    .id();
                (Some(entity), ObjectKind::Light, *position)
            }
        };

        let id = ObjectId(self.registry.next_id());
        self.registry.objects.insert(
            id,
            ObjectEntry {
                entity,
                surface,
                anchor,
                kind,
            },
        );
        Ok(id)
    }

    fn despawn(&mut self, object: ObjectId) {
        let Some(entry) = self.registry.objects.remove(&object) else {
            tracing::warn!(?object, "despawn of unknown object");
            return;
        };
        if let ObjectKind::Ambient = entry.kind {
            let camera = self.registry.surfaces.get(&entry.surface).map(|s| s.camera);
            if let Some(mut e) = camera.and_then(|c| self.commands.get_entity(c).ok()) {
                e.remove::<AmbientLight>();
            }
        }
        if let Some(entity) = entry.entity {
            self.despawn_entity(entity);
        }
    }

    fn render(&mut self, surface: SurfaceId, camera: &CameraState) -> crate::Result<()> {
        let Some(entry) = self.registry.surfaces.get(&surface) else {
            return Err(Report::new(ChartError::Backend(format!(
                "render to unknown surface {surface:?}"
            ))));
        };
        let viewport = Vec2::new(entry.size.width as f32, entry.size.height as f32);
        let camera_entity = entry.camera;

        self.commands.entity(camera_entity).insert((
            Transform::from_translation(camera.position).looking_at(camera.target, camera.up),
            Projection::Perspective(PerspectiveProjection {
                fov: camera.fov_y,
                aspect_ratio: camera.aspect,
                near: camera.near,
                far: camera.far,
                ..default()
            }),
        ));

        let mut updates = Vec::new();
        for entry in self.registry.objects.values() {
            let ObjectKind::Mesh { billboard, texture } = entry.kind else {
                continue;
            };
            if entry.surface != surface {
                continue;
            }
            if let (true, Some(entity)) = (billboard, entry.entity) {
                let rotation = billboard_rotation(entry.anchor, camera.position, camera.up);
                let facing = Transform::from_translation(entry.anchor).with_rotation(rotation);
                updates.push((entity, facing, None));
            }
            let text = texture
                .and_then(|t| self.registry.textures.get(&t))
                .and_then(|label| label.text);
            if let Some(text) = text {
                let placed = camera
                    .project(entry.anchor)
                    .filter(|ndc| ndc.z.abs() <= 1.0)
                    .map(|ndc| CameraState::ndc_to_viewport(ndc, viewport));
                let visibility = if placed.is_some() {
                    Visibility::Visible
                } else {
                    Visibility::Hidden
                };
                let at = placed.unwrap_or(Vec2::ZERO);
                updates.push((text, Transform::from_xyz(at.x, at.y, 0.0), Some(visibility)));
            }
        }

        for (entity, transform, visibility) in updates {
            if let Ok(mut e) = self.commands.get_entity(entity) {
                e.insert(transform);
                if let Some(visibility) = visibility {
                    e.insert(visibility);
                }
            }
        }
        Ok(())
    }

    fn capture(&mut self, surface: SurfaceId, path: &Path) -> crate::Result<()> {
        if !self.registry.surfaces.contains_key(&surface) {
            return Err(Report::new(ChartError::Backend(format!(
                "capture of unknown surface {surface:?}"
            ))));
        }
        self.commands
            .spawn(Screenshot::primary_window())
            .observe(save_to_disk(path.to_path_buf()));
        tracing::info!(path = %path.display(), "snapshot requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::polyline;

    #[test]
    fn line_meshes_keep_vertex_colours() {
        let data = polyline(
            &[Vec3::ZERO, Vec3::X],
            Some(&[ChartColor::BLACK, ChartColor::WHITE][..]),
            false,
        );
        let mesh = custom_mesh(&data);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::LineList);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_some());
        assert_eq!(mesh.count_vertices(), 2);
    }

    #[test]
    fn transparent_double_sided_material() {
        let mut spec = MaterialSpec::glossy(ChartColor::rgba(1.0, 0.0, 0.0, 0.5));
        spec.double_sided = true;
        let material = standard_material(&spec);
        assert_eq!(material.alpha_mode, AlphaMode::Blend);
        assert!(material.cull_mode.is_none());
        assert!(!material.unlit);
    }

    #[test]
    fn billboard_faces_the_eye() {
        let at = Vec3::new(1.0, 2.0, 3.0);
        let eye = Vec3::new(1.0, 2.0, 10.0);
        let facing = billboard_rotation(at, eye, Vec3::Y) * Vec3::Z;
        assert!(facing.dot((eye - at).normalize()) > 0.999);
    }
}
