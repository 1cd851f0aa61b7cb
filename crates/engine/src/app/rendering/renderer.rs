use std::collections::HashSet;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{Camera2D, DrawCommand, DrawList, ImageRegion};
use crate::assets::{AssetCatalog, LoadedImage};
use crate::geom::Vec2;

use super::transform::world_to_screen;
use super::Viewport;

const VIEW_CULL_PADDING_PX: f32 = 2.0;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    warned_missing_images: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            warned_missing_images: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn render_blank(&mut self, clear_rgba: [u8; 4]) -> Result<(), Error> {
        clear(self.pixels.frame_mut(), clear_rgba);
        self.pixels.render()
    }

    pub fn render(&mut self, draw_list: &DrawList, assets: &AssetCatalog) -> Result<(), Error> {
        let viewport = self.viewport;
        let frame = self.pixels.frame_mut();
        clear(frame, draw_list.clear_rgba);

        let images: Vec<Option<&LoadedImage>> = draw_list
            .image_keys()
            .iter()
            .map(|key| {
                let image = assets.image(key);
                if image.is_none() && self.warned_missing_images.insert(key.clone()) {
                    warn!(image = key.as_str(), "renderer_image_missing_using_fallback");
                }
                image
            })
            .collect();

        for command in draw_list.commands() {
            draw_command(frame, viewport, &draw_list.camera, command, &images);
        }
        self.pixels.render()
    }
}

fn draw_command(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    command: &DrawCommand,
    images: &[Option<&LoadedImage>],
) {
    let zoom = camera.effective_zoom();
    match command {
        DrawCommand::Tile {
            min,
            size,
            region,
            fallback_rgba,
        } => {
            let top_left = world_to_screen(*min, camera, viewport);
            let bottom_right = world_to_screen(
                Vec2::new(min.x + size.x, min.y + size.y),
                camera,
                viewport,
            );
            let rect = ScreenRectPx::from_corners(top_left, bottom_right);
            if !rect.intersects_viewport(viewport) {
                return;
            }
            let source = region.and_then(|region| {
                images
                    .get(region.image)
                    .copied()
                    .flatten()
                    .map(|image| (image, region))
            });
            match source {
                Some((image, region)) => blit_region_scaled(frame, viewport, rect, image, region),
                None => fill_rect_clipped(frame, viewport, rect, *fallback_rgba),
            }
        }
        DrawCommand::Circle {
            center,
            radius,
            rgba,
        } => {
            let screen = world_to_screen(*center, camera, viewport);
            let radius_px = radius * zoom;
            if !circle_visible(screen, radius_px, viewport) {
                return;
            }
            draw_circle_filled(frame, viewport, screen, radius_px, *rgba);
        }
        DrawCommand::Line { from, to, rgba } => {
            let a = world_to_screen(*from, camera, viewport);
            let b = world_to_screen(*to, camera, viewport);
            draw_line_clipped(frame, viewport, a, b, *rgba);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl ScreenRectPx {
    /// Exclusive right/bottom edges; rounding both corners keeps adjacent tiles
    /// seamless at fractional zoom.
    fn from_corners(top_left: Vec2, bottom_right: Vec2) -> Self {
        Self {
            left: top_left.x.round() as i32,
            top: top_left.y.round() as i32,
            right: bottom_right.x.round() as i32,
            bottom: bottom_right.y.round() as i32,
        }
    }

    fn intersects_viewport(&self, viewport: Viewport) -> bool {
        self.right > 0
            && self.bottom > 0
            && self.left < viewport.width as i32
            && self.top < viewport.height as i32
            && self.left < self.right
            && self.top < self.bottom
    }
}

fn circle_visible(center: Vec2, radius_px: f32, viewport: Viewport) -> bool {
    let reach = radius_px + VIEW_CULL_PADDING_PX;
    center.x + reach >= 0.0
        && center.y + reach >= 0.0
        && center.x - reach <= viewport.width as f32
        && center.y - reach <= viewport.height as f32
}

fn clear(frame: &mut [u8], rgba: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&rgba);
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn fill_rect_clipped(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right.min(viewport.width as i32);
    let bottom = rect.bottom.min(viewport.height as i32);
    for y in top..bottom {
        for x in left..right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn blit_region_scaled(
    frame: &mut [u8],
    viewport: Viewport,
    rect: ScreenRectPx,
    image: &LoadedImage,
    region: ImageRegion,
) {
    let out_w = (rect.right - rect.left).max(1) as f32;
    let out_h = (rect.bottom - rect.top).max(1) as f32;
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right.min(viewport.width as i32);
    let bottom = rect.bottom.min(viewport.height as i32);
    let width = viewport.width as usize;

    for y in top..bottom {
        let v = (y - rect.top) as f32 / out_h;
        let src_y = region.y + ((v * region.height as f32) as u32).min(region.height.max(1) - 1);
        for x in left..right {
            let u = (x - rect.left) as f32 / out_w;
            let src_x =
                region.x + ((u * region.width as f32) as u32).min(region.width.max(1) - 1);
            let Some(color) = image.pixel(src_x, src_y) else {
                continue;
            };
            if color[3] == 0 {
                continue;
            }
            write_pixel_rgba_clipped(frame, width, x, y, color);
        }
    }
}

fn draw_circle_filled(
    frame: &mut [u8],
    viewport: Viewport,
    center: Vec2,
    radius_px: f32,
    color: [u8; 4],
) {
    if !radius_px.is_finite() || radius_px <= 0.0 {
        return;
    }
    let radius_sq = radius_px * radius_px;
    let top = (center.y - radius_px).floor().max(0.0) as i32;
    let bottom = (center.y + radius_px).ceil().min(viewport.height as f32) as i32;
    let left = (center.x - radius_px).floor().max(0.0) as i32;
    let right = (center.x + radius_px).ceil().min(viewport.width as f32) as i32;
    for y in top..bottom {
        let dy = y as f32 + 0.5 - center.y;
        for x in left..right {
            let dx = x as f32 + 0.5 - center.x;
            if dx * dx + dy * dy <= radius_sq {
                write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
            }
        }
    }
}

fn draw_line_clipped(frame: &mut [u8], viewport: Viewport, from: Vec2, to: Vec2, color: [u8; 4]) {
    let delta = to - from;
    let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as i32;
    let step = delta * (1.0 / steps as f32);
    let mut point = from;
    for _ in 0..=steps {
        write_pixel_rgba_clipped(
            frame,
            viewport.width as usize,
            point.x.round() as i32,
            point.y.round() as i32,
            color,
        );
        point += step;
    }
}
