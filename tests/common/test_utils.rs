use std::cell::RefCell;
use std::sync::Once;

use gles_tiles::{
    Bitmap, ShaderProgram, Texture,
    backend::{GlCall, RecordingBackend},
};
use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "integration-tests")]
use gles_tiles::backend::GlowBackend;
#[cfg(feature = "integration-tests")]
use glow::HasContext;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Collects log records per thread, so parallel tests don't see each
/// other's output.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Starts capturing log output of the current test thread.
pub(crate) fn capture_logs() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("another logger is already installed");
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

pub(crate) fn logged(level: Level) -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}

pub(crate) fn warnings() -> Vec<String> {
    logged(Level::Warn)
}

pub(crate) fn errors() -> Vec<String> {
    logged(Level::Error)
}

/// A fully opaque square bitmap with a checker pattern.
pub(crate) fn opaque_bitmap(size: u32) -> Bitmap {
    let pixels = (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size, i / size);
            if (x / 32 + y / 32) % 2 == 0 {
                [200, 180, 120, 255]
            } else {
                [40, 90, 30, 255]
            }
        })
        .collect();
    Bitmap::from_rgba(size, size, pixels).expect("checker bitmap")
}

/// Program and texture ready to be drawn, with the setup calls cleared.
pub(crate) fn program_and_texture(gl: &RecordingBackend, alpha: f32) -> (ShaderProgram, Texture) {
    let program = ShaderProgram::new(gl, alpha);
    let texture = Texture::new(gl, opaque_bitmap(256));
    gl.take_calls();
    (program, texture)
}

pub(crate) fn is_draw(call: &GlCall) -> bool {
    matches!(call, GlCall::DrawArrays(..))
}

/// A GLES2 context without a window, rendering into a square texture.
#[cfg(feature = "integration-tests")]
pub(crate) struct HeadlessGl {
    pub(crate) backend: GlowBackend,
    size: u32,
    framebuffer: glow::NativeFramebuffer,
    target: glow::NativeTexture,
    // Dropped after the backend, the context has to outlive every GL call.
    _context: glutin::api::egl::context::PossiblyCurrentContext,
}

#[cfg(feature = "integration-tests")]
impl HeadlessGl {
    pub(crate) fn new(size: u32) -> Self {
        use glutin::api::egl::{device::Device, display::Display};
        use glutin::config::{Api, ConfigSurfaceTypes, ConfigTemplateBuilder};
        use glutin::context::{ContextApi, ContextAttributesBuilder, Version};
        use glutin::prelude::*;

        let device = Device::query_devices()
            .expect("EGL device enumeration")
            .next()
            .expect("no EGL device available");
        let display = unsafe { Display::with_device(&device, None) }.expect("EGL display");
        let template = ConfigTemplateBuilder::new()
            .with_api(Api::GLES2)
            .with_surface_type(ConfigSurfaceTypes::empty())
            .build();
        let config = unsafe { display.find_configs(template) }
            .expect("EGL configs")
            .next()
            .expect("no GLES2 config");
        let attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(2, 0))))
            .build(None);
        let context = unsafe { display.create_context(&config, &attributes) }
            .expect("GLES2 context")
            .make_current_surfaceless()
            .expect("surfaceless context made current");
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name))
        };

        let (framebuffer, target) = unsafe {
            let target = gl.create_texture().expect("render target");
            gl.bind_texture(glow::TEXTURE_2D, Some(target));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                size as i32,
                size as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);

            let framebuffer = gl.create_framebuffer().expect("framebuffer");
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(target),
                0,
            );
            assert_eq!(
                gl.check_framebuffer_status(glow::FRAMEBUFFER),
                glow::FRAMEBUFFER_COMPLETE
            );
            (framebuffer, target)
        };

        Self {
            backend: GlowBackend::new(gl),
            size,
            framebuffer,
            target,
            _context: context,
        }
    }

    /// The rendered frame with row 0 at the top, like the tile coordinates.
    pub(crate) fn read_frame(&self) -> image::RgbaImage {
        let gl = self.backend.context();
        let mut pixels = vec![0; (self.size * self.size * 4) as usize];
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.read_pixels(
                0,
                0,
                self.size as i32,
                self.size as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(pixels.as_mut_slice())),
            );
        }
        let frame = image::RgbaImage::from_raw(self.size, self.size, pixels)
            .expect("frame matches the target size");
        image::imageops::flip_vertical(&frame)
    }
}

#[cfg(feature = "integration-tests")]
impl Drop for HeadlessGl {
    fn drop(&mut self) {
        let gl = self.backend.context();
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_texture(self.target);
        }
    }
}
