use std::ffi::CString;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use log::{debug, info, warn};

use crate::model::MeshVertex;
use crate::render::RESOURCE_ARRAY_LENGTH;

use super::{BufferUse, CubeTextureData, DeviceBuffer, DeviceImage, DrawCall, GpuContext, ShaderStages};

const DESCRIPTOR_POOL_MAX_SETS: u32 = 1024;

/// The live-device implementation of [`GpuContext`].
///
/// Owns the command pool used for one-time upload submissions and the
/// descriptor pool backing per-entity sets. All uploads block on queue
/// completion before returning, so a resource is fully resident once its
/// constructor hands it back.
pub struct VulkanContext {
    device: ash::Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    descriptor_pool: vk::DescriptorPool,
    allocator: Mutex<Allocator>,
    frames_in_flight: usize,
}

impl VulkanContext {
    pub fn new(
        device: ash::Device,
        queue: vk::Queue,
        queue_family_index: u32,
        allocator: Allocator,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let command_pool = unsafe {
            let pool_info = vk::CommandPoolCreateInfo::builder()
                .queue_family_index(queue_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);
            device.create_command_pool(&pool_info, None)?
        };

        let descriptor_pool = unsafe {
            // Every set allocated against the resource layout consumes a
            // full image array, so the pool needs descriptors for
            // max_sets worth of arrays, not max_sets descriptors.
            let pool_sizes = [vk::DescriptorPoolSize::builder()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(DESCRIPTOR_POOL_MAX_SETS * RESOURCE_ARRAY_LENGTH)
                .build()];
            let pool_info = vk::DescriptorPoolCreateInfo::builder()
                .pool_sizes(&pool_sizes)
                .max_sets(DESCRIPTOR_POOL_MAX_SETS)
                .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);
            device.create_descriptor_pool(&pool_info, None)?
        };

        info!(
            "Vulkan context ready ({} frames in flight)",
            frames_in_flight
        );

        Ok(Self {
            device,
            queue,
            command_pool,
            descriptor_pool,
            allocator: Mutex::new(allocator),
            frames_in_flight,
        })
    }

    /// Destroy the pools owned by the context. The device and allocator are
    /// the caller's to tear down afterwards.
    pub fn destroy(&mut self) {
        info!("Destroying Vulkan context pools");
        unsafe {
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }

    fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| anyhow!("device allocator mutex poisoned"))
    }

    /// Record and synchronously submit a one-time command buffer. The
    /// command buffer is returned to the pool even when recording or the
    /// submit fails.
    fn one_time_submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let cmd = unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::builder()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            self.device.allocate_command_buffers(&alloc_info)?[0]
        };
        let cmds = [cmd];

        let submit = || -> Result<()> {
            unsafe {
                let begin_info = vk::CommandBufferBeginInfo::builder()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(cmd, &begin_info)?;

                record(cmd);

                self.device.end_command_buffer(cmd)?;

                let submit_info = vk::SubmitInfo::builder().command_buffers(&cmds).build();
                self.device
                    .queue_submit(self.queue, &[submit_info], vk::Fence::null())?;
                self.device.queue_wait_idle(self.queue)?;
            }
            Ok(())
        };

        let result = submit();
        unsafe {
            self.device.free_command_buffers(self.command_pool, &cmds);
        }
        result
    }

    /// Release a buffer on an unwind path. A failing release is logged so
    /// the error that started the unwind stays the one reported.
    fn release_buffer_best_effort(&self, buffer: DeviceBuffer) {
        if let Err(e) = self.destroy_buffer(buffer) {
            warn!("leaked a buffer while unwinding a failed upload: {e:#}");
        }
    }

    fn release_image_best_effort(&self, image: DeviceImage) {
        if let Err(e) = self.destroy_image(image) {
            warn!("leaked an image while unwinding a failed upload: {e:#}");
        }
    }

    fn create_raw_buffer(
        &self,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<DeviceBuffer> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::builder()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self.device.create_buffer(&buffer_info, None)?;
            let requirements = self.device.get_buffer_memory_requirements(buffer);

            let allocation = match self.allocator()?.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e).context("buffer memory allocation failed");
                }
            };

            if let Err(e) =
                self.device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                self.release_buffer_best_effort(DeviceBuffer {
                    buffer,
                    allocation: Some(allocation),
                    size,
                });
                return Err(e).context("failed to bind buffer memory");
            }

            Ok(DeviceBuffer {
                buffer,
                allocation: Some(allocation),
                size,
            })
        }
    }

    /// Host-visible staging buffer pre-filled with `data`.
    fn create_staging_buffer(&self, data: &[u8]) -> Result<DeviceBuffer> {
        let staging = self.create_raw_buffer(
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;
        let mapped = match staging.allocation.as_ref().and_then(|a| a.mapped_ptr()) {
            Some(ptr) => ptr,
            None => {
                self.release_buffer_best_effort(staging);
                return Err(anyhow!("staging allocation is not host mapped"));
            }
        };
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.as_ptr() as *mut u8, data.len());
        }
        Ok(staging)
    }

    fn transition_image_layout(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layer_count: u32,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) {
        let (src_access, dst_access, src_stage, dst_stage) = match (old_layout, new_layout) {
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
            ),
            _ => (
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ),
        };

        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::builder()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(layer_count)
                    .build(),
            )
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .build();

        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Create a device-local layered image and fill it from packed host
    /// pixel data via a staged transfer.
    fn upload_layered_image(
        &self,
        pixels: &[u8],
        extent: vk::Extent2D,
        layer_count: u32,
        format: vk::Format,
        flags: vk::ImageCreateFlags,
        name: &str,
    ) -> Result<DeviceImage> {
        let staging = self.create_staging_buffer(pixels)?;

        let image_info = vk::ImageCreateInfo::builder()
            .flags(flags)
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(layer_count)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let image = match unsafe { self.device.create_image(&image_info, None) } {
            Ok(image) => image,
            Err(e) => {
                self.release_buffer_best_effort(staging);
                return Err(e).context("image creation failed");
            }
        };

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let allocation = match self.allocator().and_then(|mut a| {
            a.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .context("image memory allocation failed")
        }) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                self.release_buffer_best_effort(staging);
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            self.release_image_best_effort(DeviceImage {
                image,
                allocation: Some(allocation),
            });
            self.release_buffer_best_effort(staging);
            return Err(e).context("failed to bind image memory");
        }
        let device_image = DeviceImage {
            image,
            allocation: Some(allocation),
        };

        let copy = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(
                vk::ImageSubresourceLayers::builder()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .mip_level(0)
                    .base_array_layer(0)
                    .layer_count(layer_count)
                    .build(),
            )
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .build();

        let staging_buffer = staging.buffer;
        if let Err(e) = self.one_time_submit(|cmd| {
            self.transition_image_layout(
                cmd,
                image,
                layer_count,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );
            unsafe {
                self.device.cmd_copy_buffer_to_image(
                    cmd,
                    staging_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[copy],
                );
            }
            self.transition_image_layout(
                cmd,
                image,
                layer_count,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        }) {
            self.release_image_best_effort(device_image);
            self.release_buffer_best_effort(staging);
            return Err(e);
        }

        self.destroy_buffer(staging)?;

        Ok(device_image)
    }

    fn create_shader_module(&self, path: &Path) -> Result<vk::ShaderModule> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read shader {}", path.display()))?;
        let code = ash::util::read_spv(&mut Cursor::new(&bytes))
            .with_context(|| format!("invalid SPIR-V in {}", path.display()))?;
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        unsafe { Ok(self.device.create_shader_module(&create_info, None)?) }
    }
}

impl GpuContext for VulkanContext {
    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn upload_buffer(&self, data: &[u8], usage: BufferUse) -> Result<DeviceBuffer> {
        let usage_flags = match usage {
            BufferUse::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUse::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        };
        debug!("Uploading {} byte {:?} buffer", data.len(), usage);

        let staging = self.create_staging_buffer(data)?;
        let device_buffer = match self.create_raw_buffer(
            data.len() as u64,
            usage_flags | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            "device buffer",
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.release_buffer_best_effort(staging);
                return Err(e);
            }
        };

        let region = vk::BufferCopy::builder().size(data.len() as u64).build();
        let (src, dst) = (staging.buffer, device_buffer.buffer);
        if let Err(e) = self.one_time_submit(|cmd| unsafe {
            self.device.cmd_copy_buffer(cmd, src, dst, &[region]);
        }) {
            self.release_buffer_best_effort(staging);
            self.release_buffer_best_effort(device_buffer);
            return Err(e);
        }

        self.destroy_buffer(staging)?;
        Ok(device_buffer)
    }

    fn destroy_buffer(&self, mut buffer: DeviceBuffer) -> Result<()> {
        unsafe {
            self.device.destroy_buffer(buffer.buffer, None);
        }
        if let Some(allocation) = buffer.allocation.take() {
            self.allocator()?
                .free(allocation)
                .context("failed to free buffer allocation")?;
        }
        Ok(())
    }

    fn upload_image_files(
        &self,
        base_dir: &Path,
        file_names: &[String],
        flags: vk::ImageCreateFlags,
    ) -> Result<(DeviceImage, vk::Extent2D)> {
        let mut extent = vk::Extent2D::default();
        let mut pixels = Vec::new();

        for (layer, name) in file_names.iter().enumerate() {
            let path = base_dir.join(name);
            let decoded = image::open(&path)
                .with_context(|| format!("failed to load texture {}", path.display()))?
                .to_rgba8();
            let (width, height) = decoded.dimensions();
            if layer == 0 {
                extent = vk::Extent2D { width, height };
            } else if width != extent.width || height != extent.height {
                bail!(
                    "texture layer {} is {}x{}, expected {}x{}",
                    name,
                    width,
                    height,
                    extent.width,
                    extent.height
                );
            }
            pixels.extend_from_slice(decoded.as_raw());
        }

        debug!(
            "Uploading {} layer image ({}x{})",
            file_names.len(),
            extent.width,
            extent.height
        );
        let image = self.upload_layered_image(
            &pixels,
            extent,
            file_names.len() as u32,
            vk::Format::R8G8B8A8_UNORM,
            flags,
            "texture image",
        )?;
        Ok((image, extent))
    }

    fn upload_cube_image(
        &self,
        cube: &CubeTextureData,
        flags: vk::ImageCreateFlags,
    ) -> Result<DeviceImage> {
        debug!(
            "Uploading cube image ({}x{}, {:?})",
            cube.width, cube.height, cube.format
        );
        self.upload_layered_image(
            &cube.pixels,
            vk::Extent2D {
                width: cube.width,
                height: cube.height,
            },
            6,
            cube.format,
            flags | vk::ImageCreateFlags::CUBE_COMPATIBLE,
            "cube texture image",
        )
    }

    fn destroy_image(&self, mut image: DeviceImage) -> Result<()> {
        unsafe {
            self.device.destroy_image(image.image, None);
        }
        if let Some(allocation) = image.allocation.take() {
            self.allocator()?
                .free(allocation)
                .context("failed to free image allocation")?;
        }
        Ok(())
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        view_type: vk::ImageViewType,
        layer_count: u32,
    ) -> Result<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(view_type)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::builder()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(layer_count)
                    .build(),
            );
        unsafe { Ok(self.device.create_image_view(&view_info, None)?) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe {
            self.device.destroy_image_view(view, None);
        }
    }

    fn create_sampler(&self) -> Result<vk::Sampler> {
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false);
        unsafe { Ok(self.device.create_sampler(&sampler_info, None)?) }
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe {
            self.device.destroy_sampler(sampler, None);
        }
    }

    fn create_descriptor_set_layout(
        &self,
        counts: &[u32],
        kinds: &[vk::DescriptorType],
        stages: &[vk::ShaderStageFlags],
    ) -> Result<vk::DescriptorSetLayout> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = counts
            .iter()
            .zip(kinds)
            .zip(stages)
            .enumerate()
            .map(|(binding, ((&count, &kind), &stage))| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(binding as u32)
                    .descriptor_type(kind)
                    .descriptor_count(count)
                    .stage_flags(stage)
                    .build()
            })
            .collect();

        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        unsafe { Ok(self.device.create_descriptor_set_layout(&layout_info, None)?) }
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe {
            self.device.destroy_descriptor_set_layout(layout, None);
        }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout> {
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(set_layouts);
        unsafe { Ok(self.device.create_pipeline_layout(&layout_info, None)?) }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe {
            self.device.destroy_pipeline_layout(layout, None);
        }
    }

    fn create_graphics_pipeline(
        &self,
        shaders: &ShaderStages<'_>,
        extent: vk::Extent2D,
        layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline> {
        debug!(
            "Creating graphics pipeline from {} / {}",
            shaders.vertex.display(),
            shaders.fragment.display()
        );
        let vertex_module = self.create_shader_module(shaders.vertex)?;
        let fragment_module = self.create_shader_module(shaders.fragment)?;

        let entry_point = CString::new("main").map_err(|_| anyhow!("bad shader entry point"))?;
        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(&entry_point)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(&entry_point)
                .build(),
        ];

        let binding_descriptions = [MeshVertex::binding_description()];
        let attribute_descriptions = MeshVertex::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        let pipeline = unsafe {
            let result = self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_info],
                None,
            );
            self.device.destroy_shader_module(vertex_module, None);
            self.device.destroy_shader_module(fragment_module, None);
            result
                .map_err(|(_, e)| anyhow!("failed to create graphics pipeline: {:?}", e))?[0]
        };

        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.destroy_pipeline(pipeline, None);
        }
    }

    fn allocate_image_descriptor_sets(
        &self,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout; count];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&layouts);
        unsafe {
            self.device
                .allocate_descriptor_sets(&alloc_info)
                .context("descriptor set allocation failed")
        }
    }

    fn free_descriptor_sets(&self, sets: &[vk::DescriptorSet]) -> Result<()> {
        unsafe {
            self.device
                .free_descriptor_sets(self.descriptor_pool, sets)
                .context("failed to free descriptor sets")
        }
    }

    fn update_image_descriptors(&self, set: vk::DescriptorSet, images: &[vk::DescriptorImageInfo]) {
        let write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(images)
            .build();
        unsafe {
            self.device.update_descriptor_sets(&[write], &[]);
        }
    }

    fn bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    fn record_draw(&self, cmd: vk::CommandBuffer, call: &DrawCall) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                call.pipeline_layout,
                call.resource_set_index,
                &[call.descriptor_set],
                &[],
            );
            self.device
                .cmd_bind_vertex_buffers(cmd, 0, &[call.vertex_buffer], &[0]);
            self.device
                .cmd_bind_index_buffer(cmd, call.index_buffer, 0, vk::IndexType::UINT32);
            self.device.cmd_draw_indexed(cmd, call.index_count, 1, 0, 0, 0);
        }
    }
}
