use ash::vk;
use glam::{Vec2, Vec3};

/// Import-side vertex as produced by the asset front end. Attributes the
/// source mesh did not carry stay `None` and are zero-filled on upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceVertex {
    pub position: Vec3,
    pub normal: Option<Vec3>,
    pub tangent: Option<Vec3>,
    pub tex_coord: Option<Vec2>,
}

impl SourceVertex {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            normal: None,
            tangent: None,
            tex_coord: None,
        }
    }
}

/// One face of a source mesh: a small ordered list of indices into the
/// source vertex array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl Face {
    pub fn new(indices: impl Into<Vec<u32>>) -> Self {
        Self {
            indices: indices.into(),
        }
    }
}

/// The vertex layout uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl MeshVertex {
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<MeshVertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 24,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 3,
                format: vk::Format::R32G32_SFLOAT,
                offset: 36,
            },
        ]
    }
}

impl From<&SourceVertex> for MeshVertex {
    fn from(source: &SourceVertex) -> Self {
        Self {
            position: source.position.to_array(),
            normal: source.normal.unwrap_or(Vec3::ZERO).to_array(),
            tangent: source.tangent.unwrap_or(Vec3::ZERO).to_array(),
            tex_coord: source.tex_coord.unwrap_or(Vec2::ZERO).to_array(),
        }
    }
}
