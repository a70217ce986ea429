use std::time::Instant;

use anyhow::Result;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use moonimpact_core::{
    config::WindowConfig, telemetry::Telemetry, FrameScheduler, MoonImpactConfig,
    RenderFrame, SimulationStep,
};

/// Drives a [`FrameScheduler`] from the winit event loop.
///
/// One scheduler tick per `about_to_wait`; the window is closed (the loop
/// exits) after the tick that reports an exit request.
pub struct Host<S, R> {
    scheduler: FrameScheduler,
    sim: S,
    render: R,
    telemetry: Telemetry,

    window_cfg: WindowConfig,
    control_flow_poll: bool,

    window: Option<Window>,
    window_id: Option<WindowId>,
    last: Instant,
    shutdown_done: bool,
    fatal: Option<anyhow::Error>,
}

impl<S: SimulationStep, R: RenderFrame> Host<S, R> {
    pub fn new(cfg: &MoonImpactConfig, scheduler: FrameScheduler, sim: S, render: R) -> Self {
        let mut telemetry = Telemetry::new();
        telemetry.configure_fps_logging(cfg.frame.log_fps, cfg.frame.fps_log_period());

        Self {
            scheduler,
            sim,
            render,
            telemetry,
            window_cfg: cfg.window.clone(),
            control_flow_poll: cfg.runtime.is_poll(),
            window: None,
            window_id: None,
            last: Instant::now(),
            shutdown_done: false,
            fatal: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        match self.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn shutdown_once(&mut self, el: &ActiveEventLoop) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;

        info!(
            "shutdown after {} frames, {:.1}s simulated",
            self.scheduler.time().frame_index,
            self.scheduler.total_game_time().as_secs_f64()
        );
        self.window = None;
        el.exit();
    }
}

impl<S: SimulationStep, R: RenderFrame> ApplicationHandler for Host<S, R> {
    fn resumed(&mut self, el: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.window_cfg.title.clone())
            .with_inner_size(LogicalSize::new(self.window_cfg.width, self.window_cfg.height));

        let window = match el.create_window(attrs) {
            Ok(w) => w,
            Err(e) => {
                error!("failed to create window: {e}");
                self.fatal = Some(anyhow::anyhow!("failed to create window: {e}"));
                el.exit();
                return;
            }
        };

        self.window_id = Some(window.id());
        self.window = Some(window);

        // Window creation can take a while; don't count it as simulation backlog.
        self.scheduler.reset_elapsed_time();
        self.last = Instant::now();
        info!("first frame");
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if Some(id) != self.window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.scheduler.request_exit(),
            WindowEvent::Focused(focused) => self.scheduler.set_active(focused),
            WindowEvent::Occluded(occluded) => self.scheduler.set_active(!occluded),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    if let PhysicalKey::Code(KeyCode::Escape) = event.physical_key {
                        self.scheduler.request_exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, el: &ActiveEventLoop) {
        el.set_control_flow(if self.control_flow_poll {
            ControlFlow::Poll
        } else {
            ControlFlow::Wait
        });

        if self.shutdown_done || self.window.is_none() {
            return;
        }

        let outcome = match self.scheduler.tick(&mut self.sim, &mut self.render) {
            Ok(o) => o,
            Err(e) => {
                error!("frame failed: {e:#}");
                self.fatal = Some(e);
                self.shutdown_once(el);
                return;
            }
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;

        if outcome.backlog_clamped {
            warn!("stall of {:.0} ms, backlog clamped", dt.as_secs_f64() * 1000.0);
        }
        self.telemetry.frame_tick(dt, &outcome, self.scheduler.time());

        if outcome.exit_requested {
            self.shutdown_once(el);
            return;
        }

        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }
}
