use std::{cell::Cell, f32::consts::TAU, rc::Rc};

use glam::{Mat4, Vec3, Vec4};
use log::{debug, trace};

use moonimpact_core::{
    params::{CameraMatrices, CraterParameters, ParameterSink, TerrainParameters, TextureHandle},
    FrameContext, FrameTime, RenderFrame, SimulationStep,
};

/// Latest view matrix published by the simulation for the renderer.
pub type SharedView = Rc<Cell<Mat4>>;

const TERRAIN_SIZE: f32 = 1024.0;
const HEIGHTMAP_TEXTURE: TextureHandle = TextureHandle(0);

/// Slowly orbiting camera around the terrain centre.
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    radians_per_sec: f32,
    view: SharedView,
}

impl OrbitCamera {
    pub fn new(view: SharedView) -> Self {
        let cam = Self {
            yaw: 0.0,
            pitch: 0.6,
            distance: 150.0,
            radians_per_sec: 0.1,
            view,
        };
        cam.publish();
        cam
    }

    fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * sy, sp, cp * cy) * self.distance
    }

    fn publish(&self) {
        self.view.set(Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y));
    }
}

impl SimulationStep for OrbitCamera {
    fn step(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
        self.yaw = (self.yaw + self.radians_per_sec * ctx.time().elapsed_secs()) % TAU;
        self.publish();
        Ok(())
    }
}

/// Counts parameter uploads instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct UploadCounter {
    pub uploads: u64,
}

impl ParameterSink for UploadCounter {
    fn set_matrix(&mut self, name: &'static str, _value: &Mat4) {
        trace!("upload {name}");
        self.uploads += 1;
    }

    fn set_vector(&mut self, name: &'static str, _value: Vec4) {
        trace!("upload {name}");
        self.uploads += 1;
    }

    fn set_scalar(&mut self, name: &'static str, _value: f32) {
        trace!("upload {name}");
        self.uploads += 1;
    }

    fn set_texture(&mut self, name: &'static str, _texture: TextureHandle) {
        trace!("upload {name}");
        self.uploads += 1;
    }
}

/// Feeds the crater and terrain parameter caches once per frame.
pub struct TerrainRenderer {
    view: SharedView,
    craters: CraterParameters,
    terrain: TerrainParameters,
    sink: UploadCounter,
}

impl TerrainRenderer {
    pub fn new(view: SharedView, width: u32, height: u32) -> Self {
        let mut craters = CraterParameters::new();
        craters.set_projection(Mat4::orthographic_rh(0.0, TERRAIN_SIZE, TERRAIN_SIZE, 0.0, -1.0, 1.0));

        let mut terrain = TerrainParameters::new();
        terrain.set_texture(Some(HEIGHTMAP_TEXTURE));
        terrain.set_resolution(Vec3::new(TERRAIN_SIZE, TERRAIN_SIZE, 0.0));
        terrain.set_light_direction(Vec3::new(1.0, -1.0, 0.5).normalize());

        let aspect = height.max(1) as f32 / width.max(1) as f32;
        terrain.set_projection(Mat4::orthographic_rh(-5.0, 5.0, -5.0 * aspect, 5.0 * aspect, -8000.0, 8000.0));

        Self {
            view,
            craters,
            terrain,
            sink: UploadCounter::default(),
        }
    }

    pub fn uploads(&self) -> u64 {
        self.sink.uploads
    }
}

impl RenderFrame for TerrainRenderer {
    fn render(&mut self, time: &FrameTime) -> anyhow::Result<()> {
        let view = self.view.get();
        if view != self.terrain.view() {
            self.terrain.set_view(view);
        }

        self.craters.apply(&mut self.sink);
        self.terrain.apply(&mut self.sink);

        if time.frame_index % 600 == 0 {
            debug!("frame {} uploads so far {}", time.frame_index, self.sink.uploads);
        }
        Ok(())
    }
}
