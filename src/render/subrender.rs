use std::path::PathBuf;

use anyhow::{ensure, Result};
use ash::vk;
use log::{debug, info, warn};

use crate::gpu::{DrawCall, GpuContext, ShaderStages};

use super::Entity;

/// Upper bound on the per-material image array declared in the resource
/// descriptor-set layout.
pub const RESOURCE_ARRAY_LENGTH: u32 = 16;

/// Position of the resource layout in the pipeline's set-layout list:
/// [per_object, per_object, shadow, per_object, resources].
const RESOURCE_SET_INDEX: u32 = 4;

/// Output target and shared layouts a subrenderer's pipeline is built
/// against, supplied by the frame driver.
pub struct SubrenderTarget {
    pub extent: vk::Extent2D,
    pub render_pass: vk::RenderPass,
    pub per_object_layout: vk::DescriptorSetLayout,
    pub shadow_layout: vk::DescriptorSetLayout,
}

struct RegisteredEntity {
    entity: Entity,
    /// One set per in-flight frame slot, all referencing the entity's
    /// diffuse texture as captured at registration.
    descriptor_sets: Vec<vk::DescriptorSet>,
}

/// Groups entities that share one graphics pipeline and owns their
/// per-entity resource binding.
///
/// Lifecycle: `new` (uninitialized) → [`Subrenderer::init`] → entities
/// added/removed → [`Subrenderer::destroy`]. Entities draw in registration
/// order; there is no sorting or cross-entity batching.
pub struct Subrenderer {
    name: String,
    vertex_shader: PathBuf,
    fragment_shader: PathBuf,
    initialized: bool,
    resource_layout: vk::DescriptorSetLayout,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    /// Per-binding-slot image bookkeeping, one entry per registered entity
    /// in registration order. Read through [`Subrenderer::bound_images`] by
    /// callers rewriting descriptor arrays after a swapchain rebuild.
    maps: Vec<Vec<vk::DescriptorImageInfo>>,
    entities: Vec<RegisteredEntity>,
}

impl Subrenderer {
    pub fn new(
        name: impl Into<String>,
        vertex_shader: impl Into<PathBuf>,
        fragment_shader: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            initialized: false,
            resource_layout: vk::DescriptorSetLayout::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            maps: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Create the resource descriptor-set layout, the pipeline layout and
    /// the graphics pipeline. Any failure here is fatal for the
    /// subrenderer: intermediate objects are torn down and the error
    /// propagates.
    pub fn init(&mut self, gpu: &dyn GpuContext, target: &SubrenderTarget) -> Result<()> {
        ensure!(!self.initialized, "subrenderer '{}' already initialized", self.name);
        info!("Initializing subrenderer '{}'", self.name);

        self.resource_layout = gpu.create_descriptor_set_layout(
            &[RESOURCE_ARRAY_LENGTH],
            &[vk::DescriptorType::COMBINED_IMAGE_SAMPLER],
            &[vk::ShaderStageFlags::FRAGMENT],
        )?;

        let set_layouts = [
            target.per_object_layout,
            target.per_object_layout,
            target.shadow_layout,
            target.per_object_layout,
            self.resource_layout,
        ];
        self.pipeline_layout = match gpu.create_pipeline_layout(&set_layouts) {
            Ok(layout) => layout,
            Err(e) => {
                gpu.destroy_descriptor_set_layout(self.resource_layout);
                self.resource_layout = vk::DescriptorSetLayout::null();
                return Err(e);
            }
        };

        let shaders = ShaderStages {
            vertex: &self.vertex_shader,
            fragment: &self.fragment_shader,
        };
        self.pipeline = match gpu.create_graphics_pipeline(
            &shaders,
            target.extent,
            self.pipeline_layout,
            target.render_pass,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                gpu.destroy_pipeline_layout(self.pipeline_layout);
                gpu.destroy_descriptor_set_layout(self.resource_layout);
                self.pipeline_layout = vk::PipelineLayout::null();
                self.resource_layout = vk::DescriptorSetLayout::null();
                return Err(e);
            }
        };

        if self.maps.is_empty() {
            self.maps.push(Vec::new());
        }

        self.initialized = true;
        Ok(())
    }

    /// Register an entity: allocate one descriptor set per in-flight frame
    /// slot bound to the entity's diffuse texture, then store the entity.
    ///
    /// The entity's material must carry a diffuse texture; registering one
    /// without it is a caller error and panics. On descriptor allocation
    /// failure the entity is not registered.
    pub fn add_entity(&mut self, gpu: &dyn GpuContext, entity: Entity) -> Result<()> {
        ensure!(
            self.initialized,
            "subrenderer '{}' used before init",
            self.name
        );

        let diffuse = entity
            .material
            .diffuse
            .as_ref()
            .unwrap_or_else(|| {
                panic!(
                    "entity '{}' registered on subrenderer '{}' without a diffuse texture",
                    entity.name, self.name
                )
            });
        let image_infos = vec![diffuse.image_info()];

        let descriptor_sets = self.bind_material_images(gpu, &image_infos)?;

        debug!(
            "Registered entity '{}' on subrenderer '{}' ({} frame sets)",
            entity.name,
            self.name,
            descriptor_sets.len()
        );
        self.maps[0].extend_from_slice(&image_infos);
        self.entities.push(RegisteredEntity {
            entity,
            descriptor_sets,
        });
        Ok(())
    }

    /// Shared bind-materials step: one descriptor set per in-flight frame
    /// slot, each written with the full image-binding list.
    fn bind_material_images(
        &self,
        gpu: &dyn GpuContext,
        image_infos: &[vk::DescriptorImageInfo],
    ) -> Result<Vec<vk::DescriptorSet>> {
        let sets = gpu.allocate_image_descriptor_sets(self.resource_layout, gpu.frames_in_flight())?;
        for &set in &sets {
            gpu.update_image_descriptors(set, image_infos);
        }
        Ok(sets)
    }

    /// Unregister an entity by name and free its descriptor sets. The
    /// caller guarantees no in-flight frame still reads those sets.
    /// Returns false if no entity with that name is registered.
    pub fn remove_entity(&mut self, gpu: &dyn GpuContext, name: &str) -> Result<bool> {
        let Some(index) = self
            .entities
            .iter()
            .position(|r| r.entity.name == name)
        else {
            return Ok(false);
        };

        let removed = self.entities.remove(index);
        if index < self.maps[0].len() {
            self.maps[0].remove(index);
        }
        debug!(
            "Removed entity '{}' from subrenderer '{}'",
            removed.entity.name, self.name
        );
        gpu.free_descriptor_sets(&removed.descriptor_sets)?;
        Ok(true)
    }

    /// Record draws for all registered entities, in registration order,
    /// with each entity's descriptor set for `frame_index` bound at the
    /// resource set slot.
    pub fn draw(&self, gpu: &dyn GpuContext, cmd: vk::CommandBuffer, frame_index: usize) {
        if !self.initialized || self.entities.is_empty() {
            return;
        }
        gpu.bind_pipeline(cmd, self.pipeline);

        for registered in &self.entities {
            let Some(set) = registered.descriptor_sets.get(frame_index) else {
                warn!(
                    "frame index {} out of range for entity '{}'",
                    frame_index, registered.entity.name
                );
                continue;
            };
            let Some((vertex_buffer, index_buffer)) = registered.entity.mesh.buffers() else {
                warn!(
                    "entity '{}' references a destroyed mesh, skipping",
                    registered.entity.name
                );
                continue;
            };
            gpu.record_draw(
                cmd,
                &DrawCall {
                    pipeline_layout: self.pipeline_layout,
                    resource_set_index: RESOURCE_SET_INDEX,
                    descriptor_set: *set,
                    vertex_buffer,
                    index_buffer,
                    index_count: registered.entity.mesh.index_count(),
                },
            );
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Descriptor sets registered for the named entity, one per in-flight
    /// frame slot.
    pub fn descriptor_sets_for(&self, name: &str) -> Option<&[vk::DescriptorSet]> {
        self.entities
            .iter()
            .find(|r| r.entity.name == name)
            .map(|r| r.descriptor_sets.as_slice())
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    /// Image bindings captured for binding slot `slot`, one per registered
    /// entity in registration order. Empty once destroyed or for a slot
    /// this subrenderer never wrote.
    pub fn bound_images(&self, slot: usize) -> &[vk::DescriptorImageInfo] {
        self.maps.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tear down the pipeline, layouts and every entity's descriptor sets.
    /// Null handles are skipped, so a partially initialized or
    /// already-destroyed subrenderer is safe here.
    pub fn destroy(&mut self, gpu: &dyn GpuContext) -> Result<()> {
        info!("Destroying subrenderer '{}'", self.name);
        let mut result = Ok(());

        for registered in self.entities.drain(..) {
            if let Err(e) = gpu.free_descriptor_sets(&registered.descriptor_sets) {
                result = Err(e);
            }
        }
        self.maps.clear();

        if self.pipeline != vk::Pipeline::null() {
            gpu.destroy_pipeline(self.pipeline);
            self.pipeline = vk::Pipeline::null();
        }
        if self.pipeline_layout != vk::PipelineLayout::null() {
            gpu.destroy_pipeline_layout(self.pipeline_layout);
            self.pipeline_layout = vk::PipelineLayout::null();
        }
        if self.resource_layout != vk::DescriptorSetLayout::null() {
            gpu.destroy_descriptor_set_layout(self.resource_layout);
            self.resource_layout = vk::DescriptorSetLayout::null();
        }
        self.initialized = false;
        result
    }
}
