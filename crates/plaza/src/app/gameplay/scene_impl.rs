use engine::{AssetCatalog, DrawList, InputSnapshot, Scene};

use super::orchestrator::WorldOrchestrator;

impl Scene for WorldOrchestrator {
    fn preload(&mut self, assets: &mut AssetCatalog) {
        self.preload_assets(assets);
    }

    fn create(&mut self, assets: &AssetCatalog) -> bool {
        WorldOrchestrator::create(self, assets)
    }

    fn update(&mut self, dt_seconds: f32, input: &InputSnapshot) {
        WorldOrchestrator::update(self, dt_seconds, input);
    }

    fn draw(&self, draw_list: &mut DrawList) {
        WorldOrchestrator::draw(self, draw_list);
    }

    fn teardown(&mut self) {
        WorldOrchestrator::teardown(self);
    }

    fn debug_title(&self) -> Option<String> {
        if !self.is_created() {
            return None;
        }
        Some(format!("Plaza | critters: {}", self.critters().len()))
    }
}
