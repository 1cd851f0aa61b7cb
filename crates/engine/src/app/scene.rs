use super::input::{ActionStates, InputAction};
use crate::assets::AssetCatalog;
use crate::geom::{Rect, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    quit_requested: bool,
    keyboard_bound: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    zoom_delta_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        keyboard_bound: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
        zoom_delta_steps: i32,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            keyboard_bound,
            actions,
            cursor_position_px,
            left_click_pressed,
            zoom_delta_steps,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// False until the host has delivered at least one keyboard event.
    pub fn keyboard_bound(&self) -> bool {
        self.keyboard_bound
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn any_directional_down(&self) -> bool {
        InputAction::DIRECTIONAL
            .into_iter()
            .any(|action| self.actions.is_down(action))
    }

    /// Marks the keyboard bound as a side effect, since a pressed action implies
    /// one.
    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self.keyboard_bound = true;
        self
    }

    pub fn with_keyboard_bound(mut self, keyboard_bound: bool) -> Self {
        self.keyboard_bound = keyboard_bound;
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_zoom_delta_steps(mut self, zoom_delta_steps: i32) -> Self {
        self.zoom_delta_steps = zoom_delta_steps;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn zoom_delta_steps(&self) -> i32 {
        self.zoom_delta_steps
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;

/// View into world space. `position` is the world point at the viewport center;
/// `zoom` is screen pixels per world pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub bounds: Option<Rect>,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: CAMERA_ZOOM_DEFAULT,
            bounds: None,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            CAMERA_ZOOM_DEFAULT
        }
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32, min_zoom: f32, max_zoom: f32) {
        let zoom = if zoom.is_finite() {
            zoom
        } else {
            CAMERA_ZOOM_DEFAULT
        };
        self.zoom = zoom.clamp(min_zoom, max_zoom);
    }

    /// World-space rectangle visible through a viewport of `window_size` pixels.
    pub fn visible_rect(&self, window_size: (u32, u32)) -> Rect {
        let zoom = self.effective_zoom();
        let half = Vec2::new(
            window_size.0 as f32 * 0.5 / zoom,
            window_size.1 as f32 * 0.5 / zoom,
        );
        Rect {
            min: self.position - half,
            max: self.position + half,
        }
    }

    /// Centers on `target`, then shifts so the visible rectangle stays inside
    /// `bounds`. An axis where the view is larger than the bounds is centered on
    /// the bounds instead.
    pub fn center_on(&mut self, target: Vec2, window_size: (u32, u32)) {
        let Some(bounds) = self.bounds else {
            self.position = target;
            return;
        };
        let zoom = self.effective_zoom();
        let half_w = window_size.0 as f32 * 0.5 / zoom;
        let half_h = window_size.1 as f32 * 0.5 / zoom;
        self.position = Vec2::new(
            clamp_axis(target.x, half_w, bounds.min.x, bounds.max.x),
            clamp_axis(target.y, half_h, bounds.min.y, bounds.max.y),
        );
    }
}

fn clamp_axis(center: f32, half_extent: f32, min: f32, max: f32) -> f32 {
    if max - min <= half_extent * 2.0 {
        return (min + max) * 0.5;
    }
    center.clamp(min + half_extent, max - half_extent)
}

/// One image region referenced by a draw command. `image` indexes
/// [`DrawList::image_keys`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRegion {
    pub image: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Tile {
        min: Vec2,
        size: Vec2,
        region: Option<ImageRegion>,
        fallback_rgba: [u8; 4],
    },
    Circle {
        center: Vec2,
        radius: f32,
        rgba: [u8; 4],
    },
    Line {
        from: Vec2,
        to: Vec2,
        rgba: [u8; 4],
    },
}

/// Per-frame output of a scene, consumed by the renderer in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub camera: Camera2D,
    pub clear_rgba: [u8; 4],
    commands: Vec<DrawCommand>,
    image_keys: Vec<String>,
}

impl DrawList {
    pub fn reset(&mut self) {
        self.commands.clear();
        self.image_keys.clear();
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn intern_image(&mut self, key: &str) -> usize {
        if let Some(index) = self.image_keys.iter().position(|existing| existing == key) {
            return index;
        }
        self.image_keys.push(key.to_string());
        self.image_keys.len() - 1
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn image_keys(&self) -> &[String] {
        &self.image_keys
    }
}

/// Lifecycle driven by the host loop: `preload` once, `create` once, then
/// `update` and `draw` every frame until `teardown`.
pub trait Scene {
    fn preload(&mut self, assets: &mut AssetCatalog);

    /// Builds the world. Returning false tells the host to leave the viewport
    /// blank; `update` and `draw` are never called afterwards.
    fn create(&mut self, assets: &AssetCatalog) -> bool;
    fn update(&mut self, dt_seconds: f32, input: &InputSnapshot);
    fn draw(&self, draw_list: &mut DrawList);
    fn teardown(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}
