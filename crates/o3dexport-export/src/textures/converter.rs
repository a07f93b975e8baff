//! Image codec access
//!
//! [`ImageIo`] is the seam between the export pipeline and image codecs.
//! [`FsImageIo`] reads image datablocks from their source files with the
//! `image` crate and re-encodes them in the format of the target extension.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat};
use o3dexport_scene::Image;

use crate::asset::ColorChannel;
use crate::textures::{TextureError, TextureResult};

/// Image codec operations the texture phase needs
pub trait ImageIo {
    /// Writes `image` to `target`, encoded after the target's extension
    fn save_image(&self, image: &Image, target: &Path) -> TextureResult<()>;

    /// Writes `channel` of the texture at `source` as a single-channel image
    fn extract_channel(&self, source: &Path, channel: ColorChannel, target: &Path) -> TextureResult<()>;
}

/// [`ImageIo`] over the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageIo;

impl FsImageIo {
    pub fn new() -> Self {
        Self
    }

    fn target_format(target: &Path) -> TextureResult<ImageFormat> {
        ImageFormat::from_path(target)
            .map_err(|_| TextureError::UnsupportedFormat(target.display().to_string()))
    }

    fn write_image(img: DynamicImage, target: &Path) -> TextureResult<()> {
        let format = Self::target_format(target)?;
        // The JPEG encoder rejects alpha
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
            _ => img,
        };
        img.save_with_format(target, format)?;
        Ok(())
    }
}

impl ImageIo for FsImageIo {
    fn save_image(&self, image: &Image, target: &Path) -> TextureResult<()> {
        if !image.has_data {
            return Err(TextureError::NoData { name: image.name.clone() });
        }
        let source = image
            .source_path
            .as_deref()
            .ok_or_else(|| TextureError::MissingSource { name: image.name.clone() })?;
        if !source.exists() {
            return Err(TextureError::SourceNotFound(source.to_path_buf()));
        }

        let img = image::open(source)?;
        Self::write_image(img, target)
    }

    fn extract_channel(&self, source: &Path, channel: ColorChannel, target: &Path) -> TextureResult<()> {
        if !source.exists() {
            return Err(TextureError::SourceNotFound(source.to_path_buf()));
        }

        let rgba = image::open(source)?.to_rgba8();
        let index = channel.index();
        let gray = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            image::Luma([rgba.get_pixel(x, y)[index]])
        });
        Self::write_image(DynamicImage::ImageLuma8(gray), target)
    }
}
