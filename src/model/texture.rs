use std::path::Path;

use anyhow::Result;
use ash::vk;
use log::{debug, warn};

use crate::gpu::{CubeTextureData, DeviceImage, GpuContext};

/// A sampled image resident on the device: image + view + sampler, created
/// together and destroyed together.
///
/// A `Texture` built from an empty file list is a valid empty object: every
/// handle is null and destruction is a no-op.
#[derive(Debug)]
pub struct Texture {
    pub name: String,
    image: Option<DeviceImage>,
    view: vk::ImageView,
    sampler: vk::Sampler,
    format: vk::Format,
    extent: vk::Extent2D,
    layer_count: u32,
}

impl Texture {
    /// Load the named files from `base_dir` into one combined image, one
    /// layer per file, `R8G8B8A8_UNORM`. The view spans all layers with the
    /// requested view type. An empty `file_names` yields the empty texture.
    pub fn from_files(
        gpu: &dyn GpuContext,
        name: impl Into<String>,
        base_dir: &Path,
        file_names: &[String],
        flags: vk::ImageCreateFlags,
        view_type: vk::ImageViewType,
    ) -> Result<Self> {
        let name = name.into();
        if file_names.is_empty() {
            return Ok(Self::empty(name));
        }

        let format = vk::Format::R8G8B8A8_UNORM;
        let layer_count = file_names.len() as u32;
        let (image, extent) = gpu.upload_image_files(base_dir, file_names, flags)?;
        Self::finish(gpu, name, image, format, extent, view_type, layer_count)
    }

    /// Build a cube map from pre-decoded cube texture data. Extent and
    /// format come from the decoder; the view always spans exactly 6 layers
    /// with cube view type.
    pub fn from_cube(
        gpu: &dyn GpuContext,
        name: impl Into<String>,
        cube: &CubeTextureData,
        flags: vk::ImageCreateFlags,
    ) -> Result<Self> {
        let name = name.into();
        let extent = vk::Extent2D {
            width: cube.width,
            height: cube.height,
        };
        let image = gpu.upload_cube_image(cube, flags)?;
        Self::finish(
            gpu,
            name,
            image,
            cube.format,
            extent,
            vk::ImageViewType::CUBE,
            6,
        )
    }

    fn empty(name: String) -> Self {
        Self {
            name,
            image: None,
            view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
            layer_count: 0,
        }
    }

    /// View + sampler creation shared by both constructors. Unwinds the
    /// already-created pieces on failure so no partial resource escapes.
    fn finish(
        gpu: &dyn GpuContext,
        name: String,
        image: DeviceImage,
        format: vk::Format,
        extent: vk::Extent2D,
        view_type: vk::ImageViewType,
        layer_count: u32,
    ) -> Result<Self> {
        debug!(
            "Creating texture '{}' ({} layers, {:?}, {}x{})",
            name, layer_count, view_type, extent.width, extent.height
        );

        let view = match gpu.create_image_view(image.image, format, view_type, layer_count) {
            Ok(view) => view,
            Err(e) => {
                // Keep the creation error; a failing release only gets
                // logged.
                if let Err(cleanup) = gpu.destroy_image(image) {
                    warn!("texture '{}': image leaked while unwinding a failed view creation: {cleanup:#}", name);
                }
                return Err(e);
            }
        };

        let sampler = match gpu.create_sampler() {
            Ok(sampler) => sampler,
            Err(e) => {
                gpu.destroy_image_view(view);
                if let Err(cleanup) = gpu.destroy_image(image) {
                    warn!("texture '{}': image leaked while unwinding a failed sampler creation: {cleanup:#}", name);
                }
                return Err(e);
            }
        };

        Ok(Self {
            name,
            image: Some(image),
            view,
            sampler,
            format,
            extent,
            layer_count,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.view == vk::ImageView::null() && self.sampler == vk::Sampler::null()
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// Image info for a combined-image-sampler binding in shader-read-only
    /// layout.
    pub fn image_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler,
            image_view: self.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    /// Release sampler, then view, then image. Each release is skipped for
    /// null handles and attempted independently of the others, so a
    /// partially constructed or already-destroyed texture is safe here.
    pub fn destroy(&mut self, gpu: &dyn GpuContext) -> Result<()> {
        debug!("Destroying texture '{}'", self.name);
        if self.sampler != vk::Sampler::null() {
            gpu.destroy_sampler(self.sampler);
            self.sampler = vk::Sampler::null();
        }
        if self.view != vk::ImageView::null() {
            gpu.destroy_image_view(self.view);
            self.view = vk::ImageView::null();
        }
        if let Some(image) = self.image.take() {
            gpu.destroy_image(image)?;
        }
        Ok(())
    }
}
