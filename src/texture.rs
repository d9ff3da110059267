//! Decoded bitmaps and the GPU textures made from them.
//!
//! A [`Bitmap`] holds RGBA8 pixels on the CPU. Turning it into a
//! [`Texture`] consumes it, so the pixels are freed as soon as the upload
//! is done and the bitmap cannot be reused by accident.

use std::path::Path;

use anyhow::{Context, anyhow, bail};
use image::{ImageFormat, RgbaImage, load_from_memory_with_format};

use crate::backend::{GraphicsBackend, TextureFilter, TextureId};

/// RGBA8 pixels at the resolution they were decoded at.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    /// Reads and decodes an image file without any density scaling.
    ///
    /// Returns `None` (and logs a warning) if the file is missing or
    /// cannot be decoded.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(bitmap) => Some(bitmap),
            Err(e) => {
                log::warn!("{} could not be decoded: {e:#}", path.display());
                None
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let format = path.extension().and_then(|ext| ext.to_str());
        Self::from_bytes(&bytes, format)
    }

    /// Decodes image file contents.
    ///
    /// `format` is an optional extension hint such as `"png"`; without it
    /// the format is guessed from the data.
    pub fn from_bytes(bytes: &[u8], format: Option<&str>) -> anyhow::Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => {
                let format = ImageFormat::from_extension(fmt)
                    .ok_or_else(|| anyhow!("unknown image format {fmt:?}"))?;
                load_from_memory_with_format(bytes, format)?
            }
        };
        Ok(Self {
            image: img.to_rgba8(),
        })
    }

    /// Wraps tightly packed RGBA8 rows.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            bail!("bitmap must not be empty, got {width}x{height}");
        }
        let len = pixels.len();
        let image = RgbaImage::from_raw(width, height, pixels)
            .with_context(|| format!("{len} bytes do not hold {width}x{height} RGBA pixels"))?;
        Ok(Self { image })
    }

    /// A bitmap filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

/// A 2D texture object on the GPU.
///
/// Sampled with nearest-neighbour filtering. There is no `Drop` impl: GL
/// objects can only be released while their context is current, so the
/// owner calls [`delete`](Self::delete) or lets the context take the
/// texture down with it.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    id: TextureId,
}

impl Texture {
    /// Uploads `bitmap` as level 0 of a new texture.
    ///
    /// If the driver cannot allocate a texture name the result carries
    /// `TextureId::INVALID`, which tiles treat as "draw nothing".
    pub fn new(gl: &impl GraphicsBackend, bitmap: Bitmap) -> Self {
        Self::upload(gl, bitmap, false)
    }

    /// Like [`new`](Self::new), and also builds the mipmap chain.
    ///
    /// Some drivers fail to generate mipmaps for non-square images without
    /// reporting a GL error; squash such images to a square first.
    pub fn with_mipmaps(gl: &impl GraphicsBackend, bitmap: Bitmap) -> Self {
        Self::upload(gl, bitmap, true)
    }

    fn upload(gl: &impl GraphicsBackend, bitmap: Bitmap, mipmaps: bool) -> Self {
        let id = gl.gen_texture();
        if !id.is_valid() {
            log::warn!("Could not generate a new OpenGL texture object.");
            return Self { id };
        }

        gl.bind_texture(id);
        // A texture without filters set samples as black.
        gl.texture_filters(TextureFilter::Nearest, TextureFilter::Nearest);
        gl.tex_image_2d(bitmap.width(), bitmap.height(), bitmap.pixels());
        if mipmaps {
            gl.generate_mipmap();
        }
        gl.bind_texture(TextureId::INVALID);

        log::debug!(
            "Uploaded {}x{} bitmap to {id}",
            bitmap.width(),
            bitmap.height()
        );
        Self { id }
    }

    /// A texture that was never uploaded; tiles using it draw nothing.
    pub fn invalid() -> Self {
        Self {
            id: TextureId::INVALID,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }

    /// Releases the GPU object. Tiles still holding the id must not be
    /// drawn afterwards.
    pub fn delete(self, gl: &impl GraphicsBackend) {
        if self.id.is_valid() {
            gl.delete_texture(self.id);
        }
    }
}
