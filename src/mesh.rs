//! Backend-neutral mesh data for every shape the strategies emit.
//!
//! Boxes, spheres and sprite quads stay analytic so a backend can use its
//! own primitives. Extrusions, polylines and the ground grid are expanded
//! into explicit vertex buffers here.

use bevy_math::{Vec2, Vec3};
use error_stack::Report;
use lyon_tessellation::math::point;
use lyon_tessellation::path::Path;
use lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};

use crate::core::{Color, ShapeKind};
use crate::{ChartError, Result};

const AREA_EPSILON: f32 = 1e-6;
const POINT_EPSILON: f32 = 1e-5;
const CAP_TOLERANCE: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub topology: Topology,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            positions: Vec::new(),
            normals: Vec::new(),
            colors: None,
            indices: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        index
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GeometrySpec {
    Cuboid { size: Vec3 },
    Sphere { radius: f32 },
    /// Unit-facing quad in the local XY plane.
    Quad { size: Vec2 },
    Custom(MeshData),
}

impl GeometrySpec {
    pub fn for_shape(shape: &ShapeKind) -> Result<Self> {
        Ok(match shape {
            ShapeKind::Box {
                width,
                height,
                depth,
            } => GeometrySpec::Cuboid {
                size: Vec3::new(*width, *height, *depth),
            },
            ShapeKind::Sphere { radius } => GeometrySpec::Sphere { radius: *radius },
            ShapeKind::Sprite { width, height } => GeometrySpec::Quad {
                size: Vec2::new(*width, *height),
            },
            ShapeKind::Polyline {
                points,
                colors,
                closed,
            } => GeometrySpec::Custom(polyline(points, colors.as_deref(), *closed)),
            ShapeKind::Extrusion { outline, depth } => {
                GeometrySpec::Custom(extrude_outline(outline, *depth)?)
            }
        })
    }
}

/// Twice the signed area; positive for counter-clockwise outlines.
fn signed_area(outline: &[Vec2]) -> f32 {
    let n = outline.len();
    (0..n)
        .map(|i| outline[i].perp_dot(outline[(i + 1) % n]))
        .sum()
}

/// Drop repeated consecutive points, including a closing duplicate.
fn clean_outline(outline: &[Vec2]) -> Vec<Vec2> {
    let mut cleaned: Vec<Vec2> = Vec::with_capacity(outline.len());
    for &p in outline {
        if cleaned
            .last()
            .is_none_or(|last| last.distance(p) > POINT_EPSILON)
        {
            cleaned.push(p);
        }
    }
    while cleaned.len() > 1
        && cleaned[0].distance(cleaned[cleaned.len() - 1]) <= POINT_EPSILON
    {
        cleaned.pop();
    }
    cleaned
}

fn tessellate_cap(outline: &[Vec2]) -> Result<VertexBuffers<[f32; 2], u32>> {
    let mut builder = Path::builder();
    builder.begin(point(outline[0].x, outline[0].y));
    for p in &outline[1..] {
        builder.line_to(point(p.x, p.y));
    }
    builder.end(true);
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::tolerance(CAP_TOLERANCE),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        )
        .map_err(|e| {
            Report::new(ChartError::Tessellation(format!("{e:?}")))
                .attach(format!("outline with {} points", outline.len()))
        })?;
    Ok(buffers)
}

/// Sweep a closed outline in the XY plane from z = 0 to z = `depth`.
///
/// Caps face -Z and +Z, side walls face outward regardless of the outline's
/// winding. Zero-area outlines produce walls only; fewer than two distinct
/// points produce an empty mesh.
pub fn extrude_outline(outline: &[Vec2], depth: f32) -> Result<MeshData> {
    let outline = clean_outline(outline);
    let mut mesh = MeshData::new(Topology::Triangles);
    if outline.len() < 2 {
        return Ok(mesh);
    }

    let area = signed_area(&outline);
    if outline.len() >= 3 && area.abs() > AREA_EPSILON {
        let cap = tessellate_cap(&outline)?;
        for (z, normal) in [(0.0, Vec3::NEG_Z), (depth, Vec3::Z)] {
            let base = mesh.positions.len() as u32;
            for v in &cap.vertices {
                mesh.push_vertex(Vec3::new(v[0], v[1], z), normal);
            }
            for tri in cap.indices.chunks_exact(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]];
                let pa = Vec2::from(cap.vertices[a as usize]);
                let pb = Vec2::from(cap.vertices[b as usize]);
                let pc = Vec2::from(cap.vertices[c as usize]);
                let ccw = (pb - pa).perp_dot(pc - pa) >= 0.0;
                // Front faces are counter-clockwise seen from the normal side.
                let flip = ccw != (normal.z > 0.0);
                let (b, c) = if flip { (c, b) } else { (b, c) };
                mesh.indices.extend([base + a, base + b, base + c]);
            }
        }
    }

    let ccw = area >= 0.0;
    let n = outline.len();
    for i in 0..n {
        let a = outline[i];
        let b = outline[(i + 1) % n];
        let d = b - a;
        if d.length() <= POINT_EPSILON {
            continue;
        }
        let out = if ccw { Vec2::new(d.y, -d.x) } else { Vec2::new(-d.y, d.x) };
        let normal = out.normalize().extend(0.0);

        let a0 = mesh.push_vertex(a.extend(0.0), normal);
        let b0 = mesh.push_vertex(b.extend(0.0), normal);
        let b1 = mesh.push_vertex(b.extend(depth), normal);
        let a1 = mesh.push_vertex(a.extend(depth), normal);
        if ccw {
            mesh.indices.extend([a0, b0, b1, a0, b1, a1]);
        } else {
            mesh.indices.extend([a0, b1, b0, a0, a1, b1]);
        }
    }
    Ok(mesh)
}

/// Line-list mesh through `points`; `colors`, when given, pairs with points.
pub fn polyline(points: &[Vec3], colors: Option<&[Color]>, closed: bool) -> MeshData {
    let mut mesh = MeshData::new(Topology::Lines);
    for &p in points {
        mesh.push_vertex(p, Vec3::Y);
    }
    if let Some(colors) = colors {
        mesh.colors = Some(
            (0..points.len())
                .map(|i| colors.get(i).copied().unwrap_or(Color::WHITE).to_array())
                .collect(),
        );
    }
    let n = points.len() as u32;
    if n >= 2 {
        for i in 0..n - 1 {
            mesh.indices.extend([i, i + 1]);
        }
        if closed && n >= 3 {
            mesh.indices.extend([n - 1, 0]);
        }
    }
    mesh
}

/// Square line grid of `size` centred on the local origin, `divisions`
/// cells per side, lying in the XZ plane.
pub fn grid_lines(size: f32, divisions: u32) -> MeshData {
    let mut mesh = MeshData::new(Topology::Lines);
    let half = size * 0.5;
    let divisions = divisions.max(1);
    let step = size / divisions as f32;
    for i in 0..=divisions {
        let t = -half + i as f32 * step;
        for (from, to) in [
            (Vec3::new(-half, 0.0, t), Vec3::new(half, 0.0, t)),
            (Vec3::new(t, 0.0, -half), Vec3::new(t, 0.0, half)),
        ] {
            let a = mesh.push_vertex(from, Vec3::Y);
            let b = mesh.push_vertex(to, Vec3::Y);
            mesh.indices.extend([a, b]);
        }
    }
    mesh
}
