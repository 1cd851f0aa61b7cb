use crate::app::Camera2D;
use crate::geom::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

pub fn world_to_screen(world: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2 {
        x: (world.x - camera.position.x) * zoom + viewport.width as f32 * 0.5,
        y: (world.y - camera.position.y) * zoom + viewport.height as f32 * 0.5,
    }
}

pub fn world_to_screen_px(camera: &Camera2D, window_size: (u32, u32), world: Vec2) -> (i32, i32) {
    let viewport = Viewport {
        width: window_size.0,
        height: window_size.1,
    };
    let screen = world_to_screen(world, camera, viewport);
    (screen.x.round() as i32, screen.y.round() as i32)
}

pub fn screen_to_world_px(camera: &Camera2D, window_size: (u32, u32), screen_px: Vec2) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2 {
        x: (screen_px.x - window_size.0 as f32 * 0.5) / zoom + camera.position.x,
        y: (screen_px.y - window_size.1 as f32 * 0.5) / zoom + camera.position.y,
    }
}
