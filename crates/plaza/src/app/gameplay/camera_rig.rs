use engine::{Camera2D, EntityId, Rect, Vec2};
use tracing::{debug, info};

use super::config::CameraConfig;

#[derive(Debug, Clone)]
pub(crate) struct CameraRig {
    camera: Camera2D,
    target: Option<EntityId>,
    min_zoom: f32,
    max_zoom: f32,
    zoom_step: f32,
}

impl CameraRig {
    pub(crate) fn new(config: &CameraConfig) -> Self {
        let mut camera = Camera2D::default();
        camera.set_zoom_clamped(config.initial_zoom, config.min_zoom, config.max_zoom);
        Self {
            camera,
            target: None,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
        }
    }

    pub(crate) fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub(crate) fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub(crate) fn zoom_level(&self) -> f32 {
        self.camera.zoom
    }

    /// Binds the view center to `target`, pinned inside `bounds`.
    pub(crate) fn follow(&mut self, target: EntityId, bounds: Rect) {
        self.target = Some(target);
        self.camera.bounds = Some(bounds);
        info!(
            entity = target.0,
            bounds_w = bounds.width(),
            bounds_h = bounds.height(),
            "camera_bound"
        );
    }

    pub(crate) fn unbind(&mut self) {
        if self.target.take().is_some() {
            debug!("camera_unbound");
        }
        self.camera.bounds = None;
    }

    pub(crate) fn zoom(&mut self, delta: f32) {
        self.set_zoom(self.camera.zoom + delta);
    }

    pub(crate) fn set_zoom(&mut self, value: f32) {
        self.camera
            .set_zoom_clamped(value, self.min_zoom, self.max_zoom);
    }

    pub(crate) fn apply_zoom_steps(&mut self, steps: i32) {
        if steps != 0 {
            self.zoom(steps as f32 * self.zoom_step);
        }
    }

    pub(crate) fn update(&mut self, target_position: Vec2, window_size: (u32, u32)) {
        if self.target.is_some() {
            self.camera.center_on(target_position, window_size);
        }
    }
}
