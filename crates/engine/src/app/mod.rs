mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{screen_to_world_px, world_to_screen, world_to_screen_px, Renderer, Viewport};
pub use scene::{
    Camera2D, DrawCommand, DrawList, EntityId, EntityIdAllocator, ImageRegion, InputSnapshot,
    Scene, CAMERA_ZOOM_DEFAULT,
};
