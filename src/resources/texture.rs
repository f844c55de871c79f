//! Texture registry: decode image files, upload them and look them up by tag.
//!
//! Textures are registered once during scene setup. Each successful
//! registration appends a [`TextureEntry`]; its position in the registry is its
//! *slot*, the index used at draw time to pick the bind group. Lookups are a
//! linear scan over the (small) entry list and return `None` for unknown tags,
//! which callers treat as "draw untextured".

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageError, ImageReader, RgbaImage, imageops::FilterType};
use thiserror::Error;

use crate::data_structures::texture::Texture;

/// Errors that keep a texture out of the registry.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("could not load image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {path:?} has {channels} channels; only RGB and RGBA are supported")]
    UnsupportedChannels { path: PathBuf, channels: u8 },
    #[error("a texture tagged {0:?} is already registered")]
    DuplicateTag(String),
}

/// Pixel layout of the source image, chosen from its channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// A decoded, flipped image with its full mip chain, ready for upload.
///
/// wgpu has no 3-channel color format, so RGB sources are expanded to RGBA
/// with an opaque alpha. `layout` still records what the file contained.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub layout: PixelLayout,
    pub width: u32,
    pub height: u32,
    pub levels: Vec<RgbaImage>,
}

/// Decodes `path`, flips it vertically and builds its mip chain.
///
/// The format comes from the file contents, the extension is only a fallback.
pub fn prepare_image(path: &Path) -> Result<PreparedImage, TextureError> {
    let img = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(ImageError::IoError)
        .and_then(|reader| reader.decode())
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    prepare_decoded(path, img)
}

fn prepare_decoded(path: &Path, img: DynamicImage) -> Result<PreparedImage, TextureError> {
    let channels = img.color().channel_count();
    let layout =
        PixelLayout::from_channels(channels).ok_or_else(|| TextureError::UnsupportedChannels {
            path: path.to_path_buf(),
            channels,
        })?;

    // Image rows run top to bottom, texture coordinates bottom to top.
    let img = img.flipv();
    let base = match layout {
        PixelLayout::Rgb => DynamicImage::ImageRgb8(img.to_rgb8()).to_rgba8(),
        PixelLayout::Rgba => img.to_rgba8(),
    };
    let (width, height) = base.dimensions();

    Ok(PreparedImage {
        layout,
        width,
        height,
        levels: mip_chain(base),
    })
}

/// Number of mip levels down to 1x1: `floor(log2(max(w, h))) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Halves the image until it is 1x1. The base image is level 0.
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height()) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);
    while levels.len() < count {
        let prev = &levels[levels.len() - 1];
        let w = (prev.width() / 2).max(1);
        let h = (prev.height() / 2).max(1);
        let next = image::imageops::resize(prev, w, h, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

/// Identifier handed out on upload, independent of the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Moves a prepared image into graphics memory.
pub trait TextureUploader {
    type Handle;

    fn upload(&mut self, image: &PreparedImage, tag: &str) -> Self::Handle;
}

/// Uploads into wgpu textures with repeat wrapping, linear filtering and mipmaps.
pub struct GpuUploader<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl TextureUploader for GpuUploader<'_> {
    type Handle = Texture;

    fn upload(&mut self, image: &PreparedImage, tag: &str) -> Texture {
        Texture::from_mip_chain(self.device, self.queue, &image.levels, tag)
    }
}

#[derive(Debug)]
pub struct TextureEntry<H> {
    pub tag: String,
    pub id: TextureId,
    pub handle: H,
}

/// Append-only list of registered textures. Slot = registration order.
#[derive(Debug)]
pub struct TextureRegistry<H = Texture> {
    entries: Vec<TextureEntry<H>>,
    next_id: u32,
}

impl<H> Default for TextureRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> TextureRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            // 0 is never handed out so a zeroed id can't alias a real texture
            next_id: 1,
        }
    }

    /// Loads `path` and registers it under `tag`.
    ///
    /// Returns `false` and logs when the image can't be decoded, has an
    /// unsupported channel count, or the tag is taken. Nothing is registered then.
    pub fn register<U>(&mut self, uploader: &mut U, path: impl AsRef<Path>, tag: &str) -> bool
    where
        U: TextureUploader<Handle = H>,
    {
        match self.try_register(uploader, path.as_ref(), tag) {
            Ok(_) => true,
            Err(e @ TextureError::DuplicateTag(_)) => {
                log::warn!("{e}");
                false
            }
            Err(e) => {
                log::error!("{e}");
                false
            }
        }
    }

    pub fn try_register<U>(
        &mut self,
        uploader: &mut U,
        path: &Path,
        tag: &str,
    ) -> Result<TextureId, TextureError>
    where
        U: TextureUploader<Handle = H>,
    {
        if self.find_slot(tag).is_some() {
            return Err(TextureError::DuplicateTag(tag.to_string()));
        }
        let image = prepare_image(path)?;
        log::info!(
            "Loaded image {:?} (width {}, height {}, channels {}, {} mip levels)",
            path,
            image.width,
            image.height,
            image.layout.channels(),
            image.levels.len()
        );
        let handle = uploader.upload(&image, tag);
        // the decoded pixels are dropped here, only the GPU copy stays alive
        drop(image);

        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.entries.push(TextureEntry {
            tag: tag.to_string(),
            id,
            handle,
        });
        Ok(id)
    }

    pub fn find_slot(&self, tag: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.tag == tag)
    }

    pub fn find_id(&self, tag: &str) -> Option<TextureId> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.id)
    }

    pub fn tag(&self, slot: usize) -> Option<&str> {
        self.entries.get(slot).map(|entry| entry.tag.as_str())
    }

    pub fn get(&self, slot: usize) -> Option<&TextureEntry<H>> {
        self.entries.get(slot)
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TextureEntry<H>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bind groups indexed by texture slot, built once by [`TextureRegistry::bind_all`].
#[derive(Debug)]
pub struct SlotBindings {
    groups: Vec<wgpu::BindGroup>,
    fallback: wgpu::BindGroup,
}

impl SlotBindings {
    /// Bind group for `slot`, or the plain white fallback for untextured draws.
    pub fn get(&self, slot: Option<usize>) -> &wgpu::BindGroup {
        slot.and_then(|slot| self.groups.get(slot))
            .unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl TextureRegistry<Texture> {
    /// Binds every registered texture to the slot equal to its registration order.
    ///
    /// Call once after all textures are registered and before the first draw.
    pub fn bind_all(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> SlotBindings {
        let groups = self
            .entries
            .iter()
            .map(|entry| mk_texture_bind_group(device, layout, &entry.handle, &entry.tag))
            .collect();
        let white = Texture::create_solid(device, queue, [255; 4], "untextured");
        let fallback = mk_texture_bind_group(device, layout, &white, "untextured");
        log::debug!("Bound {} textures to slots", self.entries.len());
        SlotBindings { groups, fallback }
    }
}

pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

fn mk_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    let sampler = match &texture.sampler {
        Some(sampler) => sampler.clone(),
        None => crate::data_structures::texture::create_default_sampler(device),
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
        label: Some(label),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, GrayImage, RgbImage};
    use tempfile::TempDir;

    /// Counts uploads instead of touching a GPU.
    #[derive(Default)]
    struct CountingUploader {
        uploaded: Vec<(String, u32, u32, usize)>,
    }

    impl TextureUploader for CountingUploader {
        type Handle = usize;

        fn upload(&mut self, image: &PreparedImage, tag: &str) -> usize {
            self.uploaded
                .push((tag.to_string(), image.width, image.height, image.levels.len()));
            self.uploaded.len() - 1
        }
    }

    fn write_rgb(dir: &TempDir, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.path().join(name);
        RgbImage::from_pixel(w, h, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn write_rgba(dir: &TempDir, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.path().join(name);
        RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 128]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn slots_follow_registration_order() {
        let dir = TempDir::new().unwrap();
        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();

        assert!(registry.register(&mut uploader, write_rgb(&dir, "wood.png", 4, 4), "Wood"));
        assert!(registry.register(&mut uploader, write_rgba(&dir, "glass.png", 2, 2), "Glass"));
        assert!(registry.register(&mut uploader, write_rgb(&dir, "black.png", 1, 1), "Black"));

        assert_eq!(registry.find_slot("Wood"), Some(0));
        assert_eq!(registry.find_slot("Glass"), Some(1));
        assert_eq!(registry.find_slot("Black"), Some(2));
        assert_eq!(registry.tag(1), Some("Glass"));
        assert_eq!(uploader.uploaded.len(), 3);
        assert_eq!(registry.get(2).map(|e| e.handle), Some(2));
    }

    #[test]
    fn ids_are_distinct_and_never_zero() {
        let dir = TempDir::new().unwrap();
        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        registry.register(&mut uploader, write_rgb(&dir, "a.png", 2, 2), "A");
        registry.register(&mut uploader, write_rgb(&dir, "b.png", 2, 2), "B");

        let a = registry.find_id("A").unwrap();
        let b = registry.find_id("B").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, TextureId(0));
        assert_ne!(b, TextureId(0));
    }

    #[test]
    fn unknown_tags_are_not_found() {
        let registry: TextureRegistry<usize> = TextureRegistry::new();
        assert_eq!(registry.find_slot("Wood"), None);
        assert_eq!(registry.find_id("Wood"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn grayscale_images_are_rejected() {
        let dir = TempDir::new().unwrap();
        let gray = dir.path().join("gray.png");
        GrayImage::from_pixel(2, 2, image::Luma([7])).save(&gray).unwrap();
        let gray_alpha = dir.path().join("gray_alpha.png");
        GrayAlphaImage::from_pixel(2, 2, image::LumaA([7, 255]))
            .save(&gray_alpha)
            .unwrap();

        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        assert!(!registry.register(&mut uploader, &gray, "Gray"));
        assert!(!registry.register(&mut uploader, &gray_alpha, "GrayAlpha"));
        assert_eq!(registry.len(), 0);
        assert!(uploader.uploaded.is_empty());

        let err = registry
            .try_register(&mut uploader, &gray, "Gray")
            .unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedChannels { channels: 1, .. }));
    }

    #[test]
    fn undecodable_files_register_nothing() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"definitely not a png").unwrap();
        let missing = dir.path().join("missing.jpg");

        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        assert!(!registry.register(&mut uploader, &bogus, "Bogus"));
        assert!(!registry.register(&mut uploader, &missing, "Missing"));
        assert!(registry.is_empty());
        assert_eq!(registry.find_slot("Bogus"), None);
    }

    #[test]
    fn format_is_detected_from_contents() {
        let dir = TempDir::new().unwrap();
        let misnamed = dir.path().join("wood.jpg");
        RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]))
            .save_with_format(&misnamed, image::ImageFormat::Png)
            .unwrap();
        let bare = dir.path().join("shade");
        RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]))
            .save_with_format(&bare, image::ImageFormat::Png)
            .unwrap();

        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        assert!(registry.register(&mut uploader, &misnamed, "Wood"));
        assert!(registry.register(&mut uploader, &bare, "Shade"));
        assert_eq!(uploader.uploaded[0].1, 4);
        assert_eq!(uploader.uploaded[1], ("Shade".to_string(), 2, 2, 2));
    }

    #[test]
    fn failed_registration_does_not_shift_later_slots() {
        let dir = TempDir::new().unwrap();
        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        registry.register(&mut uploader, write_rgb(&dir, "a.png", 2, 2), "A");
        registry.register(&mut uploader, dir.path().join("nope.png"), "Nope");
        registry.register(&mut uploader, write_rgb(&dir, "b.png", 2, 2), "B");
        assert_eq!(registry.find_slot("B"), Some(1));
    }

    #[test]
    fn duplicate_tags_keep_the_first_texture() {
        let dir = TempDir::new().unwrap();
        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        assert!(registry.register(&mut uploader, write_rgb(&dir, "a.png", 2, 2), "Wood"));
        assert!(!registry.register(&mut uploader, write_rgb(&dir, "b.png", 8, 8), "Wood"));
        assert_eq!(registry.len(), 1);
        assert_eq!(uploader.uploaded[0].1, 2);
    }

    #[test]
    fn images_are_flipped_vertically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stripes.png");
        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([0, 0, 255]));
        img.save(&path).unwrap();

        let prepared = prepare_image(&path).unwrap();
        assert_eq!(prepared.layout, PixelLayout::Rgb);
        assert_eq!(*prepared.levels[0].get_pixel(0, 0), image::Rgba([0, 0, 255, 255]));
        assert_eq!(*prepared.levels[0].get_pixel(0, 1), image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn rgba_alpha_survives_preparation() {
        let dir = TempDir::new().unwrap();
        let prepared = prepare_image(&write_rgba(&dir, "glass.png", 2, 2)).unwrap();
        assert_eq!(prepared.layout, PixelLayout::Rgba);
        assert_eq!(prepared.levels[0].get_pixel(1, 1)[3], 128);
    }

    #[test]
    fn mip_chain_ends_at_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(4, 2), 3);
        assert_eq!(mip_level_count(5, 3), 3);
        assert_eq!(mip_level_count(1024, 512), 11);

        let levels = mip_chain(RgbaImage::new(8, 2));
        let dims: Vec<_> = levels.iter().map(|l| l.dimensions()).collect();
        assert_eq!(dims, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn uploader_sees_the_mip_chain() {
        let dir = TempDir::new().unwrap();
        let mut uploader = CountingUploader::default();
        let mut registry = TextureRegistry::new();
        registry.register(&mut uploader, write_rgb(&dir, "wood.png", 16, 4), "Wood");
        assert_eq!(uploader.uploaded[0], ("Wood".to_string(), 16, 4, 5));
    }
}
