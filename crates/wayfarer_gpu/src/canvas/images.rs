//! Image calls of the canvas

use std::path::Path;

use wayfarer_image::{next_pot, ImageData};
use wayfarer_paint::{Color, Point, Vertex};

use crate::backend::{GraphicsBackend, Primitive};
use crate::error::{CanvasError, Result};
use crate::image::{ImageId, ImageKind, ImageMode};

use super::Canvas;

/// Texel inset keeping scaled draws from sampling their neighbours
const FILTER_SHIFT: f32 = 0.5;

/// Texcoord step separating the stretched band from the fixed corners
const NEXT_TEXEL: f32 = 0.0001;

/// Vertices of the nine-patch strip drawn by `draw_image_stretch`
const STRETCH_VERTICES: usize = 22;

impl<B: GraphicsBackend> Canvas<B> {
    // -- lifecycle --

    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<ImageId> {
        self.images
            .load(&mut self.backend, &mut self.state, path.as_ref())
    }

    /// Load a tiling image for [`Canvas::draw_multiple_tex_lines`].
    pub fn load_image_pattern(&mut self, path: impl AsRef<Path>) -> Result<ImageId> {
        self.images
            .load_pattern(&mut self.backend, &mut self.state, path.as_ref())
    }

    /// Wrap `width` x `height` RGBA pixels. Fails when the unmanaged list
    /// is full.
    pub fn image_from_buffer(&mut self, width: u32, height: u32, rgba: Vec<u8>) -> Result<ImageId> {
        self.images
            .from_buffer(&mut self.backend, &mut self.state, width, height, rgba)
    }

    /// Allocate a transparent render target.
    pub fn new_blank_image(&mut self, width: u32, height: u32) -> Result<ImageId> {
        self.images
            .new_blank(&mut self.backend, &mut self.state, width, height)
    }

    pub fn buffer_from_image(&self, image: ImageId) -> Option<ImageData> {
        self.images.buffer_from(image)
    }

    /// Re-send the retained pixels of `image`.
    pub fn upload_image(&mut self, image: ImageId) -> Result<()> {
        self.images.upload(&mut self.backend, &mut self.state, image)
    }

    pub fn free_image(&mut self, image: ImageId) -> Result<()> {
        self.images.free(&mut self.backend, &mut self.state, image)
    }

    pub fn invalidate_image(&mut self, image: ImageId) {
        self.images.invalidate(image);
    }

    /// Invalidate every unmanaged image, returning how many there were.
    pub fn invalidate_all_images(&mut self) -> usize {
        self.images.invalidate_all()
    }

    /// Add a loaded image to the unmanaged list.
    pub fn track_unmanaged(&mut self, image: ImageId) -> Result<usize> {
        self.images.track_unmanaged(image)
    }

    // -- drawing --

    /// Restore `image` if needed, then set color and blending for it and bind
    /// its texture.
    fn prepare_image(&mut self, image: ImageId, opacity: i32, mode: ImageMode) -> bool {
        if !self.state.is_ready() {
            return false;
        }
        if !self.images.ensure_valid(&mut self.backend, &mut self.state, image) {
            return false;
        }
        let Some(texture) = self.images.get(image).and_then(|img| img.texture()) else {
            tracing::error!("image {:?} has no texture", image);
            return false;
        };

        let opacity = if mode == ImageMode::Selected || opacity <= 0 || opacity > 255 {
            255
        } else {
            opacity
        };
        let alpha = opacity as f32 / 255.0;

        if mode == ImageMode::NoBlend {
            self.backend.set_blend(false);
        }
        self.apply_color(Color::new(1.0, 1.0, 1.0, alpha));

        if !self.state.bind(&mut self.backend, texture) {
            if mode == ImageMode::NoBlend {
                self.backend.set_blend(true);
            }
            return false;
        }
        true
    }

    fn finish_image(&mut self, mode: ImageMode) {
        self.reselect_pen();
        if mode == ImageMode::NoBlend {
            self.backend.set_blend(true);
        }
    }

    /// Draw `image` at its natural size with its top-left at `position`.
    pub fn draw_image(&mut self, image: ImageId, position: Point, opacity: i32, mode: ImageMode) {
        self.draw_image_angle(image, position, opacity, 0.0, mode);
    }

    /// Like [`Canvas::draw_image`], rotated by `angle` degrees around the
    /// image center.
    pub fn draw_image_angle(
        &mut self,
        image: ImageId,
        position: Point,
        opacity: i32,
        angle: f32,
        mode: ImageMode,
    ) {
        let Some((width, height)) = self.images.get(image).map(|img| (img.width(), img.height()))
        else {
            tracing::warn!("unknown image {:?}", image);
            return;
        };
        let bottom_right = Point::new(position.x + width as i32, position.y + height as i32);
        self.draw_image_scaled_angle(image, position, bottom_right, opacity, angle, mode);
    }

    /// Draw `image` scaled into the rectangle from `top_left` to
    /// `bottom_right`.
    pub fn draw_image_scaled(
        &mut self,
        image: ImageId,
        top_left: Point,
        bottom_right: Point,
        opacity: i32,
        mode: ImageMode,
    ) {
        self.draw_image_scaled_angle(image, top_left, bottom_right, opacity, 0.0, mode);
    }

    pub fn draw_image_scaled_angle(
        &mut self,
        image: ImageId,
        top_left: Point,
        bottom_right: Point,
        opacity: i32,
        angle: f32,
        mode: ImageMode,
    ) {
        if !self.prepare_image(image, opacity, mode) {
            return;
        }
        let Some(img) = self.images.get(image) else {
            return;
        };

        let (tex_w, tex_h) = img.texture_size(self.images.atlas().size());
        let (off_x, off_y) = img.atlas_offset().unwrap_or((0, 0));
        let (off_x, off_y) = (off_x as f32, off_y as f32);
        let (width, height) = (img.width() as f32, img.height() as f32);

        // unscaled draws sample texel centers exactly
        let unscaled = bottom_right.x == top_left.x + img.width() as i32
            && bottom_right.y == top_left.y + img.height() as i32
            && *img.kind() != ImageKind::Blank;
        let shift = if unscaled { 0.0 } else { FILTER_SHIFT };

        let u0 = (off_x + shift) / tex_w;
        let u1 = (off_x + width - shift) / tex_w;
        let v0 = (off_y + shift) / tex_h;
        let v1 = (off_y + height - shift) / tex_h;

        let (left, top) = (top_left.x as f32, top_left.y as f32);
        let (right, bottom) = (bottom_right.x as f32, bottom_right.y as f32);

        let rotated = angle != 0.0;
        if rotated {
            let center_x = ((top_left.x + bottom_right.x) / 2) as f32;
            let center_y = ((top_left.y + bottom_right.y) / 2) as f32;
            self.backend.push_matrix();
            self.backend.translate(center_x, center_y);
            self.backend.rotate(angle);
            self.backend.translate(-center_x, -center_y);
        }

        let quad = [
            Vertex::new(left, top, u0, v0),
            Vertex::new(right, top, u1, v0),
            Vertex::new(right, bottom, u1, v1),
            Vertex::new(left, bottom, u0, v1),
        ];
        self.backend.draw_arrays(Primitive::TriangleFan, &quad);

        self.finish_image(mode);
        if rotated {
            self.backend.pop_matrix();
        }
    }

    /// Fill the rectangle with `image`, keeping the corners around `pivot`
    /// at their natural size and stretching the row and column through it.
    pub fn draw_image_stretch(
        &mut self,
        image: ImageId,
        top_left: Point,
        bottom_right: Point,
        pivot: Point,
        opacity: i32,
        mode: ImageMode,
    ) {
        if !self.prepare_image(image, opacity, mode) {
            return;
        }
        let Some(img) = self.images.get(image) else {
            return;
        };

        let (width, height) = (img.width() as f32, img.height() as f32);
        let (tex_w, tex_h, x_off, y_off) = match img.atlas_offset() {
            Some((x, y)) => {
                let size = self.images.atlas().size() as f32;
                (size, size, x as f32 / size, y as f32 / size)
            }
            None => (
                next_pot(img.width()) as f32,
                next_pot(img.height()) as f32,
                0.0,
                0.0,
            ),
        };

        let tl_off = (pivot.x as f32, pivot.y as f32);
        let br_off = (width - pivot.x as f32, height - pivot.y as f32);

        let mid_u = x_off + tl_off.0 / tex_w;
        let mid_v = y_off + tl_off.1 / tex_h;
        let right_u = x_off + width / tex_w;
        let bottom_v = y_off + height / tex_h;
        let next_u = mid_u + NEXT_TEXEL;
        let next_v = mid_v + NEXT_TEXEL;

        let (left, top) = (top_left.x as f32, top_left.y as f32);
        let (right, bottom) = (bottom_right.x as f32, bottom_right.y as f32);
        let inner_left = left + tl_off.0;
        let inner_top = top + tl_off.1;
        let inner_right = right - br_off.0;
        let inner_bottom = bottom - br_off.1;

        let strip: [Vertex; STRETCH_VERTICES] = [
            // top-left corner
            Vertex::new(left, top, x_off, y_off),
            Vertex::new(inner_left, top, mid_u, y_off),
            Vertex::new(left, inner_top, x_off, mid_v),
            Vertex::new(inner_left, inner_top, mid_u, mid_v),
            // left column
            Vertex::new(left, inner_bottom, x_off, next_v),
            Vertex::new(inner_left, inner_bottom, mid_u, next_v),
            // bottom-left corner
            Vertex::new(left, bottom, x_off, bottom_v),
            Vertex::new(inner_left, bottom, mid_u, bottom_v),
            Vertex::new(inner_right, bottom, next_u, bottom_v),
            // center
            Vertex::new(inner_left, inner_bottom, mid_u, next_v),
            Vertex::new(inner_right, inner_bottom, next_u, next_v),
            Vertex::new(inner_left, inner_top, mid_u, mid_v),
            Vertex::new(inner_right, inner_top, next_u, mid_v),
            // top row
            Vertex::new(inner_left, top, mid_u, y_off),
            Vertex::new(inner_right, top, next_u, y_off),
            Vertex::new(right, top, right_u, y_off),
            // right column
            Vertex::new(inner_right, inner_top, next_u, mid_v),
            Vertex::new(right, inner_top, right_u, mid_v),
            Vertex::new(inner_right, inner_bottom, next_u, next_v),
            Vertex::new(right, inner_bottom, right_u, next_v),
            // bottom-right corner
            Vertex::new(inner_right, bottom, next_u, bottom_v),
            Vertex::new(right, bottom, right_u, bottom_v),
        ];
        self.backend.draw_arrays(Primitive::TriangleStrip, &strip);

        self.finish_image(mode);
    }

    /// [`Canvas::draw_image_stretch`] pivoting on the image center.
    pub fn draw_image_middle_stretch(
        &mut self,
        image: ImageId,
        top_left: Point,
        bottom_right: Point,
        opacity: i32,
        mode: ImageMode,
    ) {
        let Some(pivot) = self
            .images
            .get(image)
            .map(|img| Point::new((img.width() >> 1) as i32, (img.height() >> 1) as i32))
        else {
            tracing::warn!("unknown image {:?}", image);
            return;
        };
        self.draw_image_stretch(image, top_left, bottom_right, pivot, opacity, mode);
    }

    // -- render to texture --

    /// Redirect drawing into `image` with a projection of its size.
    pub fn begin_draw_to_image(&mut self, image: ImageId) -> Result<()> {
        if !self.state.is_ready() {
            return Err(CanvasError::NotReady);
        }
        if !self.images.ensure_valid(&mut self.backend, &mut self.state, image) {
            return Err(CanvasError::RestoreFailed(format!("image {:?}", image)));
        }
        let framebuffer = self.images.framebuffer(&mut self.backend, image)?;
        let (width, height) = self
            .images
            .get(image)
            .map(|img| (img.width(), img.height()))
            .ok_or(CanvasError::UnknownImage)?;

        self.apply_color(Color::WHITE);
        self.backend.bind_framebuffer(Some(framebuffer));
        self.backend.set_projection(width, height);
        Ok(())
    }

    /// Return to the screen after [`Canvas::begin_draw_to_image`].
    pub fn end_draw_to_image(&mut self) {
        self.backend.bind_framebuffer(None);
        let (width, height) = self.screen;
        self.backend.set_projection(width, height);
    }
}
