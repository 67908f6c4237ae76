//! Collaborator boundary between rendering resources and the device.
//!
//! Everything that touches device memory or issues commands goes through
//! [`GpuContext`]. Resource types (`Mesh`, `Texture`, the subrenderer) only
//! consume these contracts, so unit tests can drive them with a fake that
//! never opens a device.

use std::path::Path;

use anyhow::Result;
use ash::vk;
use gpu_allocator::vulkan::Allocation;

mod vulkan;
pub use vulkan::VulkanContext;

#[cfg(test)]
pub mod fake;

/// What a device buffer will be bound as at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUse {
    Vertex,
    Index,
}

/// A device-local buffer paired with its memory allocation.
///
/// The two are created together and must be released together through
/// [`GpuContext::destroy_buffer`]. The allocation is `None` only for
/// contexts that do not go through `gpu-allocator` (the test fake).
#[derive(Debug)]
pub struct DeviceBuffer {
    pub buffer: vk::Buffer,
    pub allocation: Option<Allocation>,
    pub size: u64,
}

/// A device-local image paired with its memory allocation.
#[derive(Debug)]
pub struct DeviceImage {
    pub image: vk::Image,
    pub allocation: Option<Allocation>,
}

/// Decoded cube-map pixel data, six layers packed +X,-X,+Y,-Y,+Z,-Z.
///
/// Width, height and format are whatever the decoder determined; they are
/// passed through untouched.
pub struct CubeTextureData {
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
    pub pixels: Vec<u8>,
}

/// Paths to precompiled SPIR-V shader stages for one pipeline.
pub struct ShaderStages<'a> {
    pub vertex: &'a Path,
    pub fragment: &'a Path,
}

/// One indexed draw for a single entity, descriptor set already chosen for
/// the current in-flight frame.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall {
    pub pipeline_layout: vk::PipelineLayout,
    pub resource_set_index: u32,
    pub descriptor_set: vk::DescriptorSet,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
}

/// Device, allocator, queue and descriptor contracts consumed by the
/// resource layer.
///
/// All upload operations are synchronous: the data is fully resident and
/// visible to later submissions once the call returns.
pub trait GpuContext {
    /// Number of in-flight frame slots; per-entity descriptor groups are
    /// sized to exactly this.
    fn frames_in_flight(&self) -> usize;

    /// Upload host bytes into a device-local buffer via a staged transfer.
    fn upload_buffer(&self, data: &[u8], usage: BufferUse) -> Result<DeviceBuffer>;

    /// Release a buffer and its allocation together.
    fn destroy_buffer(&self, buffer: DeviceBuffer) -> Result<()>;

    /// Decode the named files from `base_dir` and upload them as the layers
    /// of one combined `R8G8B8A8_UNORM` image. All files must share one
    /// extent, which is returned.
    fn upload_image_files(
        &self,
        base_dir: &Path,
        file_names: &[String],
        flags: vk::ImageCreateFlags,
    ) -> Result<(DeviceImage, vk::Extent2D)>;

    /// Upload pre-decoded cube-map data as a 6-layer image in the decoder's
    /// format.
    fn upload_cube_image(
        &self,
        cube: &CubeTextureData,
        flags: vk::ImageCreateFlags,
    ) -> Result<DeviceImage>;

    /// Release an image and its allocation together.
    fn destroy_image(&self, image: DeviceImage) -> Result<()>;

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        view_type: vk::ImageViewType,
        layer_count: u32,
    ) -> Result<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    /// Sampler with the context's default filtering/addressing policy.
    fn create_sampler(&self) -> Result<vk::Sampler>;

    fn destroy_sampler(&self, sampler: vk::Sampler);

    /// Declarative descriptor-set layout: parallel arrays of descriptor
    /// counts, kinds and stage visibilities, one binding per element.
    fn create_descriptor_set_layout(
        &self,
        counts: &[u32],
        kinds: &[vk::DescriptorType],
        stages: &[vk::ShaderStageFlags],
    ) -> Result<vk::DescriptorSetLayout>;

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout>;

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(
        &self,
        shaders: &ShaderStages<'_>,
        extent: vk::Extent2D,
        layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline>;

    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    /// Allocate `count` descriptor sets with the given layout from the
    /// context's pool. The sets stay live until explicitly freed; they are
    /// never reclaimed while a frame may still read them.
    fn allocate_image_descriptor_sets(
        &self,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>>;

    fn free_descriptor_sets(&self, sets: &[vk::DescriptorSet]) -> Result<()>;

    /// Write a combined-image-sampler array into binding 0 of `set`.
    fn update_image_descriptors(&self, set: vk::DescriptorSet, images: &[vk::DescriptorImageInfo]);

    fn bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);

    fn record_draw(&self, cmd: vk::CommandBuffer, call: &DrawCall);
}
