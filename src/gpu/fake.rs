//! A recording [`GpuContext`] for unit tests.
//!
//! Mints handles from a counter instead of a device and logs every create,
//! destroy and draw so tests can assert on resource lifecycles without a
//! live GPU.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use ash::vk::{self, Handle};

use super::{BufferUse, CubeTextureData, DeviceBuffer, DeviceImage, DrawCall, GpuContext, ShaderStages};

const FAKE_EXTENT: vk::Extent2D = vk::Extent2D {
    width: 4,
    height: 4,
};

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub image: vk::Image,
    pub layer_count: u32,
    pub format: vk::Format,
    pub flags: vk::ImageCreateFlags,
}

#[derive(Debug, Clone)]
pub struct ViewRecord {
    pub view: vk::ImageView,
    pub image: vk::Image,
    pub format: vk::Format,
    pub view_type: vk::ImageViewType,
    pub layer_count: u32,
}

#[derive(Debug, Clone)]
pub struct LayoutRecord {
    pub layout: vk::DescriptorSetLayout,
    pub counts: Vec<u32>,
    pub kinds: Vec<vk::DescriptorType>,
    pub stages: Vec<vk::ShaderStageFlags>,
}

#[derive(Debug, Clone)]
pub struct PipelineRecord {
    pub pipeline: vk::Pipeline,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub extent: vk::Extent2D,
    pub layout: vk::PipelineLayout,
}

#[derive(Default)]
pub struct FakeGpu {
    frames_in_flight: usize,
    next_handle: Cell<u64>,

    pub buffers_created: RefCell<Vec<(vk::Buffer, BufferUse, Vec<u8>)>>,
    pub buffers_destroyed: RefCell<Vec<vk::Buffer>>,
    pub images_created: RefCell<Vec<ImageRecord>>,
    pub images_destroyed: RefCell<Vec<vk::Image>>,
    pub views_created: RefCell<Vec<ViewRecord>>,
    pub views_destroyed: RefCell<Vec<vk::ImageView>>,
    pub samplers_created: RefCell<Vec<vk::Sampler>>,
    pub samplers_destroyed: RefCell<Vec<vk::Sampler>>,
    pub set_layouts_created: RefCell<Vec<LayoutRecord>>,
    pub set_layouts_destroyed: RefCell<Vec<vk::DescriptorSetLayout>>,
    pub pipeline_layouts_created: RefCell<Vec<(vk::PipelineLayout, Vec<vk::DescriptorSetLayout>)>>,
    pub pipeline_layouts_destroyed: RefCell<Vec<vk::PipelineLayout>>,
    pub pipelines_created: RefCell<Vec<PipelineRecord>>,
    pub pipelines_destroyed: RefCell<Vec<vk::Pipeline>>,
    pub sets_allocated: RefCell<Vec<(vk::DescriptorSetLayout, Vec<vk::DescriptorSet>)>>,
    pub sets_freed: RefCell<Vec<vk::DescriptorSet>>,
    pub set_writes: RefCell<Vec<(vk::DescriptorSet, Vec<vk::DescriptorImageInfo>)>>,
    pub pipelines_bound: RefCell<Vec<(vk::CommandBuffer, vk::Pipeline)>>,
    pub draws: RefCell<Vec<(vk::CommandBuffer, DrawCall)>>,

    /// When set, buffer upload number N (zero-based) fails.
    pub fail_buffer_upload_at: Cell<Option<usize>>,
    pub fail_buffer_destroy: Cell<bool>,
    pub fail_image_destroy: Cell<bool>,
    pub fail_view_create: Cell<bool>,
    pub fail_descriptor_alloc: Cell<bool>,
    pub fail_pipeline_create: Cell<bool>,
}

impl FakeGpu {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frames_in_flight,
            next_handle: Cell::new(1),
            ..Self::default()
        }
    }

    fn mint(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers_created.borrow().len() - self.buffers_destroyed.borrow().len()
    }
}

impl GpuContext for FakeGpu {
    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn upload_buffer(&self, data: &[u8], usage: BufferUse) -> Result<DeviceBuffer> {
        let index = self.buffers_created.borrow().len();
        if self.fail_buffer_upload_at.get() == Some(index) {
            return Err(anyhow!("fake device out of memory"));
        }
        let buffer = vk::Buffer::from_raw(self.mint());
        self.buffers_created
            .borrow_mut()
            .push((buffer, usage, data.to_vec()));
        Ok(DeviceBuffer {
            buffer,
            allocation: None,
            size: data.len() as u64,
        })
    }

    fn destroy_buffer(&self, buffer: DeviceBuffer) -> Result<()> {
        if self.fail_buffer_destroy.get() {
            return Err(anyhow!("fake buffer destroy failed"));
        }
        self.buffers_destroyed.borrow_mut().push(buffer.buffer);
        Ok(())
    }

    fn upload_image_files(
        &self,
        _base_dir: &Path,
        file_names: &[String],
        flags: vk::ImageCreateFlags,
    ) -> Result<(DeviceImage, vk::Extent2D)> {
        let image = vk::Image::from_raw(self.mint());
        self.images_created.borrow_mut().push(ImageRecord {
            image,
            layer_count: file_names.len() as u32,
            format: vk::Format::R8G8B8A8_UNORM,
            flags,
        });
        Ok((
            DeviceImage {
                image,
                allocation: None,
            },
            FAKE_EXTENT,
        ))
    }

    fn upload_cube_image(
        &self,
        cube: &CubeTextureData,
        flags: vk::ImageCreateFlags,
    ) -> Result<DeviceImage> {
        let image = vk::Image::from_raw(self.mint());
        self.images_created.borrow_mut().push(ImageRecord {
            image,
            layer_count: 6,
            format: cube.format,
            flags,
        });
        Ok(DeviceImage {
            image,
            allocation: None,
        })
    }

    fn destroy_image(&self, image: DeviceImage) -> Result<()> {
        if self.fail_image_destroy.get() {
            return Err(anyhow!("fake image destroy failed"));
        }
        self.images_destroyed.borrow_mut().push(image.image);
        Ok(())
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        view_type: vk::ImageViewType,
        layer_count: u32,
    ) -> Result<vk::ImageView> {
        if self.fail_view_create.get() {
            return Err(anyhow!("fake view creation failed"));
        }
        let view = vk::ImageView::from_raw(self.mint());
        self.views_created.borrow_mut().push(ViewRecord {
            view,
            image,
            format,
            view_type,
            layer_count,
        });
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.views_destroyed.borrow_mut().push(view);
    }

    fn create_sampler(&self) -> Result<vk::Sampler> {
        let sampler = vk::Sampler::from_raw(self.mint());
        self.samplers_created.borrow_mut().push(sampler);
        Ok(sampler)
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.samplers_destroyed.borrow_mut().push(sampler);
    }

    fn create_descriptor_set_layout(
        &self,
        counts: &[u32],
        kinds: &[vk::DescriptorType],
        stages: &[vk::ShaderStageFlags],
    ) -> Result<vk::DescriptorSetLayout> {
        let layout = vk::DescriptorSetLayout::from_raw(self.mint());
        self.set_layouts_created.borrow_mut().push(LayoutRecord {
            layout,
            counts: counts.to_vec(),
            kinds: kinds.to_vec(),
            stages: stages.to_vec(),
        });
        Ok(layout)
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.set_layouts_destroyed.borrow_mut().push(layout);
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout> {
        let layout = vk::PipelineLayout::from_raw(self.mint());
        self.pipeline_layouts_created
            .borrow_mut()
            .push((layout, set_layouts.to_vec()));
        Ok(layout)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.pipeline_layouts_destroyed.borrow_mut().push(layout);
    }

    fn create_graphics_pipeline(
        &self,
        shaders: &ShaderStages<'_>,
        extent: vk::Extent2D,
        layout: vk::PipelineLayout,
        _render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline> {
        if self.fail_pipeline_create.get() {
            return Err(anyhow!("fake pipeline creation failed"));
        }
        let pipeline = vk::Pipeline::from_raw(self.mint());
        self.pipelines_created.borrow_mut().push(PipelineRecord {
            pipeline,
            vertex_shader: shaders.vertex.to_path_buf(),
            fragment_shader: shaders.fragment.to_path_buf(),
            extent,
            layout,
        });
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.pipelines_destroyed.borrow_mut().push(pipeline);
    }

    fn allocate_image_descriptor_sets(
        &self,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>> {
        if self.fail_descriptor_alloc.get() {
            return Err(anyhow!("fake descriptor pool exhausted"));
        }
        let sets: Vec<vk::DescriptorSet> = (0..count)
            .map(|_| vk::DescriptorSet::from_raw(self.mint()))
            .collect();
        self.sets_allocated
            .borrow_mut()
            .push((layout, sets.clone()));
        Ok(sets)
    }

    fn free_descriptor_sets(&self, sets: &[vk::DescriptorSet]) -> Result<()> {
        self.sets_freed.borrow_mut().extend_from_slice(sets);
        Ok(())
    }

    fn update_image_descriptors(&self, set: vk::DescriptorSet, images: &[vk::DescriptorImageInfo]) {
        self.set_writes.borrow_mut().push((set, images.to_vec()));
    }

    fn bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.pipelines_bound.borrow_mut().push((cmd, pipeline));
    }

    fn record_draw(&self, cmd: vk::CommandBuffer, call: &DrawCall) {
        self.draws.borrow_mut().push((cmd, *call));
    }
}
