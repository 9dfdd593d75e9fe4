//! Scene assembly: strategy output plus lighting, ground grid and framing,
//! described without touching any rendering backend.

use bevy_math::Vec3;

use crate::camera::{Framing, frame_camera};
use crate::config::SceneConfig;
use crate::core::{
    ChartRequest, ChartType, Color, Extents, Layout, Placement, PrimitiveDescriptor,
    PrimitiveRole, ShapeKind,
};
use crate::geometry::build_geometry;
use crate::mesh::{GeometrySpec, grid_lines};
use crate::normalize::normalize;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Lit with specular highlights.
    Glossy,
    /// Flat colour, ignores lights.
    Unlit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialSpec {
    pub color: Color,
    pub shading: Shading,
    /// Multiply by per-vertex colours carried on the mesh.
    pub vertex_colors: bool,
    pub double_sided: bool,
}

impl MaterialSpec {
    pub fn glossy(color: Color) -> Self {
        Self {
            color,
            shading: Shading::Glossy,
            vertex_colors: false,
            double_sided: false,
        }
    }

    pub fn unlit(color: Color) -> Self {
        Self {
            shading: Shading::Unlit,
            ..Self::glossy(color)
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.color.a < 1.0
    }
}

/// Text rasterized onto a texture for a camera-facing label.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelSpec {
    pub text: String,
    pub canvas: [u32; 2],
    pub font_px: f32,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LightSpec {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
        cast_shadows: bool,
    },
    Point {
        color: Color,
        intensity: f32,
        position: Vec3,
    },
}

/// One drawable: geometry, material and, for labels, the text texture.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    pub geometry: GeometrySpec,
    pub material: MaterialSpec,
    pub label: Option<LabelSpec>,
    pub placement: Placement,
    pub role: PrimitiveRole,
    pub cast_shadows: bool,
    /// Always turned to face the camera.
    pub billboard: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneGraph {
    pub chart_type: ChartType,
    pub objects: Vec<SceneObject>,
    pub lights: Vec<LightSpec>,
    pub grid: SceneObject,
    pub extents: Extents,
    pub background: Color,
}

impl SceneGraph {
    pub fn count(&self, role: PrimitiveRole) -> usize {
        self.objects.iter().filter(|o| o.role == role).count()
    }
}

/// Everything needed to allocate a live scene.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedScene {
    pub graph: SceneGraph,
    pub framing: Framing,
}

fn scene_object(primitive: PrimitiveDescriptor, config: &SceneConfig) -> Result<SceneObject> {
    let geometry = GeometrySpec::for_shape(&primitive.shape)?;
    let (material, cast_shadows, billboard) = match &primitive.shape {
        ShapeKind::Polyline { colors, .. } => {
            let mut material = MaterialSpec::unlit(primitive.color);
            material.vertex_colors = colors.is_some();
            (material, false, false)
        }
        ShapeKind::Sprite { .. } => (MaterialSpec::unlit(Color::WHITE), false, true),
        ShapeKind::Extrusion { .. } => {
            let mut material = MaterialSpec::glossy(primitive.color);
            material.double_sided = primitive.role == PrimitiveRole::Decoration;
            (material, true, false)
        }
        ShapeKind::Box { .. } | ShapeKind::Sphere { .. } => {
            (MaterialSpec::glossy(primitive.color), true, false)
        }
    };

    let label = match (&primitive.shape, primitive.role) {
        (ShapeKind::Sprite { .. }, PrimitiveRole::Label) => Some(LabelSpec {
            text: primitive.label.clone().unwrap_or_default(),
            canvas: config.labels.canvas,
            font_px: config.labels.font_px,
            color: primitive.color,
        }),
        _ => None,
    };

    Ok(SceneObject {
        geometry,
        material,
        label,
        placement: primitive.placement,
        role: primitive.role,
        cast_shadows,
        billboard,
    })
}

pub fn lighting_rig(config: &SceneConfig) -> Vec<LightSpec> {
    let lighting = &config.lighting;
    vec![
        LightSpec::Ambient {
            color: Color::WHITE,
            intensity: lighting.ambient,
        },
        LightSpec::Directional {
            color: Color::WHITE,
            intensity: lighting.directional,
            position: Vec3::from(lighting.directional_position),
            cast_shadows: lighting.shadows,
        },
        LightSpec::Point {
            color: Color::WHITE,
            intensity: lighting.point,
            position: Vec3::from(lighting.point_position),
        },
    ]
}

/// Ground grid sized to the chart's footprint plus a margin, centred under it.
pub fn ground_grid(extents: &Extents, config: &SceneConfig) -> SceneObject {
    let grid = &config.grid;
    let size = extents.footprint() + grid.margin;
    let centre_x = match extents.layout {
        Layout::Linear => extents.width * 0.5,
        Layout::Radial => 0.0,
    };
    SceneObject {
        geometry: GeometrySpec::Custom(grid_lines(size, grid.divisions)),
        material: MaterialSpec::unlit(grid.color),
        label: None,
        placement: Placement::at(Vec3::new(centre_x, grid.elevation, 0.0)),
        role: PrimitiveRole::Decoration,
        cast_shadows: false,
        billboard: false,
    }
}

pub fn build_scene(
    primitives: Vec<PrimitiveDescriptor>,
    extents: Extents,
    chart_type: ChartType,
    config: &SceneConfig,
) -> Result<SceneGraph> {
    let objects = primitives
        .into_iter()
        .map(|p| scene_object(p, config))
        .collect::<Result<Vec<_>>>()?;

    Ok(SceneGraph {
        chart_type,
        objects,
        lights: lighting_rig(config),
        grid: ground_grid(&extents, config),
        extents,
        background: config.background,
    })
}

/// Normalize, lay out, assemble and frame a chart. Pure: the same inputs
/// always give an equal result.
pub fn prepare_scene(
    request: &ChartRequest,
    config: &SceneConfig,
    aspect: f32,
) -> Result<PreparedScene> {
    let series = normalize(&request.dataset, &request.axes, request.chart_type)?;
    let output = build_geometry(&series, request.chart_type, config);
    let graph = build_scene(output.primitives, output.extents, request.chart_type, config)?;
    let framing = frame_camera(&graph.extents, &config.camera, aspect);
    Ok(PreparedScene { graph, framing })
}
