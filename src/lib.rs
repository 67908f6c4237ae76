//! Resource lifecycle and per-entity binding core of a forward renderer.
//!
//! [`model`] owns device-resident geometry and texture resources, [`render`]
//! batches entities sharing a pipeline and binds their material textures per
//! in-flight frame, and [`gpu`] is the explicit collaborator boundary both
//! sit on: a trait implemented by a real `ash` + `gpu-allocator` context and
//! by a recording fake in tests.

pub mod gpu;
pub mod model;
pub mod render;

pub use gpu::{GpuContext, VulkanContext};
pub use model::{Face, Material, Mesh, MeshVertex, SourceVertex, Texture};
pub use render::{Entity, SubrenderTarget, Subrenderer};
