use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floats per vertex for lit meshes: `position.xyz` followed by `normal.xyz`.
pub const LIT_STRIDE: usize = 6;
/// Floats per vertex for the screen quad: `position.xy` followed by `uv`.
pub const QUAD_STRIDE: usize = 4;

const MAX_VERTICES: usize = u16::MAX as usize;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    #[error("{shape} needs {vertices} vertices, more than a 16-bit index buffer can address")]
    TooManyVertices { shape: &'static str, vertices: usize },
    #[error("{shape} needs at least {minimum} segments, got {segments}")]
    NotEnoughSegments {
        shape: &'static str,
        segments: u32,
        minimum: u32,
    },
}

/// Interleaved vertex data with a 16-bit triangle list, ready for upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
    /// Floats per vertex.
    pub stride: usize,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.vertices.len() / self.stride
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Stride in bytes, as the GPU sees it.
    pub fn stride_bytes(&self) -> i32 {
        (self.stride * std::mem::size_of::<f32>()) as i32
    }

    fn push_lit(&mut self, position: Vec3, normal: Vec3) {
        self.vertices.extend_from_slice(&position.to_array());
        self.vertices.extend_from_slice(&normal.to_array());
    }
}

/// Unit cube spanning [-1, 1] with one flat normal per face.
pub fn create_cube() -> Mesh {
    #[rustfmt::skip]
    let vertices = vec![
        // front
        -1.0, -1.0,  1.0,   0.0,  0.0,  1.0,
         1.0, -1.0,  1.0,   0.0,  0.0,  1.0,
         1.0,  1.0,  1.0,   0.0,  0.0,  1.0,
        -1.0,  1.0,  1.0,   0.0,  0.0,  1.0,
        // back
        -1.0, -1.0, -1.0,   0.0,  0.0, -1.0,
        -1.0,  1.0, -1.0,   0.0,  0.0, -1.0,
         1.0,  1.0, -1.0,   0.0,  0.0, -1.0,
         1.0, -1.0, -1.0,   0.0,  0.0, -1.0,
        // top
        -1.0,  1.0, -1.0,   0.0,  1.0,  0.0,
        -1.0,  1.0,  1.0,   0.0,  1.0,  0.0,
         1.0,  1.0,  1.0,   0.0,  1.0,  0.0,
         1.0,  1.0, -1.0,   0.0,  1.0,  0.0,
        // bottom
        -1.0, -1.0, -1.0,   0.0, -1.0,  0.0,
         1.0, -1.0, -1.0,   0.0, -1.0,  0.0,
         1.0, -1.0,  1.0,   0.0, -1.0,  0.0,
        -1.0, -1.0,  1.0,   0.0, -1.0,  0.0,
        // right
         1.0, -1.0, -1.0,   1.0,  0.0,  0.0,
         1.0,  1.0, -1.0,   1.0,  0.0,  0.0,
         1.0,  1.0,  1.0,   1.0,  0.0,  0.0,
         1.0, -1.0,  1.0,   1.0,  0.0,  0.0,
        // left
        -1.0, -1.0, -1.0,  -1.0,  0.0,  0.0,
        -1.0, -1.0,  1.0,  -1.0,  0.0,  0.0,
        -1.0,  1.0,  1.0,  -1.0,  0.0,  0.0,
        -1.0,  1.0, -1.0,  -1.0,  0.0,  0.0,
    ];

    let indices = (0..6u16)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base, base + 2, base + 3]
        })
        .collect();

    Mesh {
        vertices,
        indices,
        stride: LIT_STRIDE,
    }
}

/// Latitude/longitude sphere. The seam column is duplicated so every ring
/// has `width_segments + 1` vertices.
pub fn create_sphere(
    radius: f32,
    width_segments: u32,
    height_segments: u32,
) -> Result<Mesh, MeshError> {
    require_segments("sphere", width_segments, 3)?;
    require_segments("sphere", height_segments, 2)?;
    let columns = width_segments as usize + 1;
    let rows = height_segments as usize + 1;
    check_vertex_budget("sphere", columns * rows)?;

    let mut mesh = Mesh {
        vertices: Vec::with_capacity(columns * rows * LIT_STRIDE),
        indices: Vec::with_capacity(width_segments as usize * height_segments as usize * 6),
        stride: LIT_STRIDE,
    };

    for lat in 0..=height_segments {
        let theta = lat as f32 * PI / height_segments as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for lon in 0..=width_segments {
            let phi = lon as f32 * 2.0 * PI / width_segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let direction = Vec3::new(cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);
            mesh.push_lit(direction * radius, direction);
        }
    }

    let ring = columns as u16;
    for lat in 0..height_segments as u16 {
        for lon in 0..width_segments as u16 {
            let first = lat * ring + lon;
            let second = first + ring;
            mesh.indices
                .extend_from_slice(&[first, first + 1, second, second, first + 1, second + 1]);
        }
    }

    Ok(mesh)
}

/// Capped cylinder centred on the origin with its axis along Y.
///
/// Every radial step contributes four vertices: bottom cap, top cap, bottom
/// side and top side. The two cap centres follow the ring vertices.
pub fn create_cylinder(radius: f32, height: f32, radial_segments: u32) -> Result<Mesh, MeshError> {
    require_segments("cylinder", radial_segments, 3)?;
    let steps = radial_segments as usize + 1;
    check_vertex_budget("cylinder", steps * 4 + 2)?;

    let half = height / 2.0;
    let mut mesh = Mesh {
        vertices: Vec::with_capacity((steps * 4 + 2) * LIT_STRIDE),
        indices: Vec::with_capacity(radial_segments as usize * 12),
        stride: LIT_STRIDE,
    };

    for step in 0..=radial_segments {
        let angle = step as f32 * 2.0 * PI / radial_segments as f32;
        let (sin, cos) = angle.sin_cos();
        let outward = Vec3::new(cos, 0.0, sin);
        let bottom = Vec3::new(radius * cos, -half, radius * sin);
        let top = Vec3::new(radius * cos, half, radius * sin);

        mesh.push_lit(bottom, Vec3::NEG_Y);
        mesh.push_lit(top, Vec3::Y);
        mesh.push_lit(bottom, outward);
        mesh.push_lit(top, outward);
    }

    let bottom_center = (steps * 4) as u16;
    let top_center = bottom_center + 1;
    mesh.push_lit(Vec3::new(0.0, -half, 0.0), Vec3::NEG_Y);
    mesh.push_lit(Vec3::new(0.0, half, 0.0), Vec3::Y);

    for step in 0..radial_segments as u16 {
        let current = step * 4;
        let next = current + 4;

        let (side_bottom, side_top) = (current + 2, current + 3);
        let (next_bottom, next_top) = (next + 2, next + 3);
        mesh.indices.extend_from_slice(&[
            side_bottom,
            side_top,
            next_bottom,
            side_top,
            next_top,
            next_bottom,
        ]);

        mesh.indices
            .extend_from_slice(&[bottom_center, current, next]);
        mesh.indices
            .extend_from_slice(&[top_center, next + 1, current + 1]);
    }

    Ok(mesh)
}

/// Square pyramid of edge `size` centred on the origin, apex on +Y.
pub fn create_pyramid(size: f32) -> Mesh {
    let h = size / 2.0;
    let apex = Vec3::new(0.0, h, 0.0);
    let corners = [
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, -h, h),
        Vec3::new(-h, -h, h),
    ];

    let mut mesh = Mesh {
        vertices: Vec::with_capacity(16 * LIT_STRIDE),
        indices: Vec::with_capacity(18),
        stride: LIT_STRIDE,
    };

    for corner in corners {
        mesh.push_lit(corner, Vec3::NEG_Y);
    }
    mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);

    // Walk the base edges counter-clockwise as seen from outside each face.
    let faces = [
        (corners[3], corners[2]),
        (corners[2], corners[1]),
        (corners[1], corners[0]),
        (corners[0], corners[3]),
    ];
    for (a, b) in faces {
        let normal = (b - a).cross(apex - a).normalize();
        let base = (mesh.vertices.len() / LIT_STRIDE) as u16;
        mesh.push_lit(a, normal);
        mesh.push_lit(b, normal);
        mesh.push_lit(apex, normal);
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    mesh
}

/// Full-screen quad in normalized device coordinates, used by the post passes.
pub fn create_quad() -> Mesh {
    #[rustfmt::skip]
    let vertices = vec![
        -1.0, -1.0,   0.0, 0.0,
         1.0, -1.0,   1.0, 0.0,
         1.0,  1.0,   1.0, 1.0,
        -1.0,  1.0,   0.0, 1.0,
    ];
    Mesh {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
        stride: QUAD_STRIDE,
    }
}

fn require_segments(shape: &'static str, segments: u32, minimum: u32) -> Result<(), MeshError> {
    if segments < minimum {
        return Err(MeshError::NotEnoughSegments {
            shape,
            segments,
            minimum,
        });
    }
    Ok(())
}

fn check_vertex_budget(shape: &'static str, vertices: usize) -> Result<(), MeshError> {
    if vertices > MAX_VERTICES {
        return Err(MeshError::TooManyVertices { shape, vertices });
    }
    Ok(())
}
