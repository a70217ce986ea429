mod host;
mod viewer;

use std::{cell::Cell, path::Path, rc::Rc};

use glam::Mat4;
use log::info;

use moonimpact_core::{
    load_config_toml,
    logging::{init_console_logger, ConsoleLoggerConfig},
    ExitSignal, FrameScheduler, MoonImpactConfig,
};

use crate::{
    host::Host,
    viewer::{OrbitCamera, SharedView, TerrainRenderer},
};

const CONFIG_PATH: &str = "moonimpact.toml";

fn load_config() -> anyhow::Result<MoonImpactConfig> {
    let path = std::env::var("MOONIMPACT_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        info!("no config at '{path}', using defaults");
        return Ok(MoonImpactConfig::default());
    }
    info!("config '{path}'");
    Ok(load_config_toml(&path)?)
}

fn main() -> anyhow::Result<()> {
    init_console_logger(&ConsoleLoggerConfig::from_env())?;

    let cfg = load_config()?;
    let sched_cfg = cfg.frame.to_scheduler_config()?;
    info!(
        "fixed_step={} target={:?} max_elapsed={:?} (<= {} steps/tick)",
        sched_cfg.is_fixed_time_step(),
        sched_cfg.target_elapsed_time(),
        sched_cfg.max_elapsed_time(),
        sched_cfg.max_steps_per_tick()
    );

    let exit = ExitSignal::new();
    exit.install_ctrlc_handler()?;
    let scheduler = FrameScheduler::new(sched_cfg).with_exit_signal(exit);

    let view: SharedView = Rc::new(Cell::new(Mat4::IDENTITY));
    let camera = OrbitCamera::new(view.clone());
    let renderer = TerrainRenderer::new(view, cfg.window.width, cfg.window.height);

    Host::new(&cfg, scheduler, camera, renderer).run()
}
