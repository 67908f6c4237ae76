use anyhow::{anyhow, Result};
use log::{debug, warn};

use crate::gpu::{BufferUse, DeviceBuffer, GpuContext};

use super::{Face, MeshVertex, SourceVertex};

/// Geometry resident in device-local memory: one vertex buffer and one
/// index buffer, created together from immutable source geometry.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    vertex_count: u32,
    index_count: u32,
    bounding_radius: f32,
    vertex_buffer: Option<DeviceBuffer>,
    index_buffer: Option<DeviceBuffer>,
}

impl Mesh {
    /// Copy the source geometry into dense GPU arrays and upload both via a
    /// staged transfer. Absent per-vertex attributes become zero vectors;
    /// face index lists are flattened in face order then index order.
    ///
    /// All-or-nothing: on any upload failure no device resource survives.
    pub fn new(
        gpu: &dyn GpuContext,
        name: impl Into<String>,
        source_vertices: &[SourceVertex],
        faces: &[Face],
    ) -> Result<Self> {
        let name = name.into();

        let mut max_axis_sq = 0.0f32;
        let vertices: Vec<MeshVertex> = source_vertices
            .iter()
            .map(|source| {
                let p = source.position;
                max_axis_sq = max_axis_sq
                    .max(p.x * p.x)
                    .max(p.y * p.y)
                    .max(p.z * p.z);
                MeshVertex::from(source)
            })
            .collect();
        // Max of squared axis components, not squared Euclidean distance;
        // the rest of the renderer is calibrated to this radius.
        let bounding_radius = max_axis_sq.sqrt();

        let indices: Vec<u32> = faces
            .iter()
            .flat_map(|face| face.indices.iter().copied())
            .collect();

        debug!(
            "Creating mesh '{}' ({} vertices, {} indices, radius {})",
            name,
            vertices.len(),
            indices.len(),
            bounding_radius
        );

        let vertex_buffer = gpu.upload_buffer(bytemuck::cast_slice(&vertices), BufferUse::Vertex)?;
        let index_buffer = match gpu.upload_buffer(bytemuck::cast_slice(&indices), BufferUse::Index)
        {
            Ok(buffer) => buffer,
            Err(e) => {
                // The upload failure is the error worth reporting; a failing
                // release on top of it only gets logged.
                if let Err(cleanup) = gpu.destroy_buffer(vertex_buffer) {
                    warn!("mesh '{}': vertex buffer leaked while unwinding a failed index upload: {cleanup:#}", name);
                }
                return Err(e);
            }
        };

        Ok(Self {
            name,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            bounding_radius,
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Radius of the origin-centred sphere containing every vertex, using
    /// the max-of-axes formula documented in [`Mesh::new`].
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Raw buffer handles for draw recording. `None` after destruction.
    pub fn buffers(&self) -> Option<(ash::vk::Buffer, ash::vk::Buffer)> {
        match (&self.vertex_buffer, &self.index_buffer) {
            (Some(vb), Some(ib)) => Some((vb.buffer, ib.buffer)),
            _ => None,
        }
    }

    /// Release the index buffer then the vertex buffer. Both releases are
    /// attempted even if the first fails, and every failure is surfaced.
    /// Destroying twice is a no-op.
    pub fn destroy(&mut self, gpu: &dyn GpuContext) -> Result<()> {
        debug!("Destroying mesh '{}'", self.name);
        let mut errors = Vec::new();
        if let Some(index_buffer) = self.index_buffer.take() {
            if let Err(e) = gpu.destroy_buffer(index_buffer) {
                errors.push(e);
            }
        }
        if let Some(vertex_buffer) = self.vertex_buffer.take() {
            if let Err(e) = gpu.destroy_buffer(vertex_buffer) {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "mesh '{}' destruction failed: {}",
                self.name,
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            ))
        }
    }
}
