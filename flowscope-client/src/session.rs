use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};

use flowscope_messages::{ControlValue, FrameRate, Interrupted, RunFlag};

use crate::budget::FrameBudget;
use crate::controls::{self, PointerTracker};
use crate::display::DensityDisplay;
use crate::pacing::{FramePacer, HostPump};
use crate::proxy::ServerProxy;
use crate::render;

/// Construction-time session constants.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hard cap on rendered frames per session.
    pub max_frames: u64,
    /// Hard cap on session wall-clock time.
    pub timeout: Duration,
    /// Initial target frame rate; adjustable while running.
    pub target_fps: FrameRate,
    /// Spacing of cooperative pump calls while idling inside a frame.
    pub poll_interval: Duration,
    /// Fetch and overlay tracer particles each frame.
    pub show_tracers: bool,
    pub tracer_alpha: f32,
    pub tracer_color: [u8; 3],
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_frames: 10_000,
            timeout: Duration::from_secs(30 * 60),
            target_fps: FrameRate(20.0),
            poll_interval: Duration::from_millis(10),
            show_tracers: true,
            tracer_alpha: 0.6,
            tracer_color: [255, 64, 64],
        }
    }
}

/// Grid dimensions reported by the server during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub nx: usize,
    pub ny: usize,
}

/// A host display loop the session can hand its per-frame work to.
pub trait FrameHost {
    /// Present one host frame, invoking `frame` once when the host is
    /// ready for the next image. Returns false once the host is gone
    /// (window closed, callback deregistered).
    fn present_frame(&mut self, frame: &mut dyn FnMut()) -> bool;
}

/// How the session's frame loop is driven.
pub enum DriveMode<'a> {
    /// The host invokes the update once per displayed frame. Keeps the
    /// host responsive; the mode for interactive use.
    Hosted(&'a mut dyn FrameHost),
    /// Explicit loop that monopolizes the thread between pump calls.
    /// Simple, but only fit for unattended runs.
    Polled,
}

/// One client-to-server connection lifetime, handshake to quit.
///
/// Single-threaded by construction: at most one update cycle is ever
/// in flight, and frame N's fetch completes before frame N+1's starts.
/// Stopping the session is observed at tick boundaries; an in-flight
/// request is never interrupted, only not reissued.
pub struct Session<P: ServerProxy> {
    proxy: P,
    config: SessionConfig,
    run: RunFlag,
    budget: Option<FrameBudget>,
    pacer: FramePacer,
    pointer: PointerTracker,
    target_fps: FrameRate,
    grid: Option<GridSize>,
    frames_rendered: u64,
    render_started: Option<Instant>,
}

impl<P: ServerProxy> Session<P> {
    pub fn new(proxy: P, config: SessionConfig) -> Self {
        let pacer = FramePacer::new(config.poll_interval);
        let target_fps = config.target_fps;
        Self {
            proxy,
            config,
            run: RunFlag::new(),
            budget: None,
            pacer,
            pointer: PointerTracker::default(),
            target_fps,
            grid: None,
            frames_rendered: 0,
            render_started: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// Shared run flag, e.g. for stopping the session from outside.
    pub fn run_flag(&self) -> RunFlag {
        self.run.clone()
    }

    /// Handle to pass to the server so it can tell when this client is
    /// gone. Reads nothing but this session's own run state.
    pub fn interrupted(&self) -> Interrupted {
        self.run.interrupted()
    }

    pub fn grid(&self) -> Option<GridSize> {
        self.grid
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn target_fps(&self) -> FrameRate {
        self.target_fps
    }

    pub fn set_target_fps(&mut self, fps: FrameRate) {
        self.target_fps = fps;
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Measured output rate since the budget scope opened.
    pub fn measured_fps(&self) -> f64 {
        match self.render_started {
            Some(started) if self.frames_rendered > 0 => {
                self.frames_rendered as f64 / started.elapsed().as_secs_f64().max(1e-6)
            }
            _ => 0.0,
        }
    }

    /// Handshake: learn the grid dimensions. Fatal if the server is
    /// unreachable.
    pub fn connect(&mut self) -> Result<GridSize> {
        let values = self
            .proxy
            .get(&["Nx", "Ny"])
            .context("handshake with simulation server failed")?;
        let grid = GridSize {
            nx: dimension(&values, "Nx")?,
            ny: dimension(&values, "Ny")?,
        };
        info!("connected: {}x{} density grid", grid.nx, grid.ny);
        self.grid = Some(grid);
        Ok(grid)
    }

    /// Open the frame-budget scope; frames can flow after this.
    pub fn begin(&mut self) {
        debug!(
            "frame budget: {} frames / {:?}",
            self.config.max_frames, self.config.timeout
        );
        self.budget = Some(FrameBudget::start(self.config.max_frames, self.config.timeout));
        self.frames_rendered = 0;
        self.render_started = Some(Instant::now());
    }

    /// True while the session should keep ticking: still running and
    /// the budget has frames and time left.
    pub fn should_continue(&self) -> bool {
        self.is_running() && self.budget.as_ref().is_some_and(|budget| budget.is_active())
    }

    /// One host-driven tick: draw a frame from the budget, then run the
    /// update cycle. No-op once the budget or the session is done.
    pub fn host_tick(
        &mut self,
        display: &mut dyn DensityDisplay,
        pump: &mut dyn HostPump,
    ) -> Result<()> {
        if !self.should_continue() {
            return Ok(());
        }
        if self.budget.as_mut().and_then(|budget| budget.next()).is_none() {
            return Ok(());
        }
        self.update_frame(display, pump)
    }

    /// The update cycle: fetch one density frame, render it, present
    /// it, all inside one paced frame scope. The scope's pacing tail
    /// runs even when the fetch fails, so the host is never starved.
    ///
    /// Fetch failures are fatal and propagate; everything else here
    /// only touches display state.
    pub fn update_frame(
        &mut self,
        display: &mut dyn DensityDisplay,
        pump: &mut dyn HostPump,
    ) -> Result<()> {
        if !self.is_running() || self.budget.is_none() {
            return Ok(());
        }
        let pacer = self.pacer;
        let rate = self.target_fps;
        pacer.frame_scope(rate, pump, || self.render_one(display))
    }

    fn render_one(&mut self, display: &mut dyn DensityDisplay) -> Result<()> {
        let density = self
            .proxy
            .get_array("density")
            .context("failed to fetch density frame")?;
        let mut image = render::rgba_from_density(&density);
        if self.config.show_tracers {
            let tracers = self.proxy.get_tracers().context("failed to fetch tracers")?;
            render::overlay_tracers(
                &mut image,
                &tracers,
                self.config.tracer_alpha,
                self.config.tracer_color,
            );
        }
        display.set_image(image);
        self.frames_rendered += 1;
        display.set_status(&format!("{:.1} fps", self.measured_fps()));
        Ok(())
    }

    /// Drive the whole frame loop in the given mode, then wind down.
    /// Always ends with the quit sequence, whatever stopped the loop.
    pub fn run(
        &mut self,
        mode: DriveMode<'_>,
        display: &mut dyn DensityDisplay,
        pump: &mut dyn HostPump,
    ) -> Result<()> {
        self.begin();
        let result = match mode {
            DriveMode::Polled => self.drive_polled(display, pump),
            DriveMode::Hosted(host) => self.drive_hosted(host, display, pump),
        };
        self.finish();
        result
    }

    fn drive_polled(
        &mut self,
        display: &mut dyn DensityDisplay,
        pump: &mut dyn HostPump,
    ) -> Result<()> {
        while self.should_continue() {
            if self.budget.as_mut().and_then(|budget| budget.next()).is_none() {
                break;
            }
            self.update_frame(display, pump)?;
            self.pump_one_interval(pump);
        }
        Ok(())
    }

    fn drive_hosted(
        &mut self,
        host: &mut dyn FrameHost,
        display: &mut dyn DensityDisplay,
        pump: &mut dyn HostPump,
    ) -> Result<()> {
        while self.should_continue() {
            let mut frame_result = Ok(());
            let presented = {
                let mut tick = || frame_result = self.host_tick(display, pump);
                host.present_frame(&mut tick)
            };
            frame_result?;
            if !presented {
                debug!("host display loop ended");
                break;
            }
            // Keep interruption observable even if the host goes quiet.
            pump.pump_once();
        }
        Ok(())
    }

    /// Enough pump turns to span one frame interval at the host's own
    /// cadence.
    fn pump_one_interval(&mut self, pump: &mut dyn HostPump) {
        let poll = pump.poll_interval().as_secs_f64();
        if poll <= 0.0 {
            return;
        }
        let turns = (self.target_fps.interval().as_secs_f64() / poll).ceil() as u64;
        for _ in 0..turns {
            pump.pump_once();
        }
    }

    /// Close the frame loop: drop the budget and, if the session is
    /// still running, run the quit sequence. Safe to call repeatedly.
    pub fn finish(&mut self) {
        self.budget = None;
        if self.is_running() {
            self.quit();
        }
    }

    /// Ask the server to shut down, then stop. Only the first call
    /// talks to the server; the session never restarts.
    pub fn quit(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Err(err) = self.proxy.do_action("quit") {
            warn!("quit request failed: {err:#}");
        }
        self.run.stop();
        info!("session stopped after {} frames", self.frames_rendered);
    }

    /// Forward a changed control to the server. Ignored once stopped;
    /// a failed send costs one control update, not the session.
    pub fn on_value_change(&mut self, name: &str, value: ControlValue) {
        if !self.is_running() {
            return;
        }
        debug!("control change: {name} = {value}");
        if let Err(err) = self.proxy.set(vec![(name.to_string(), value)]) {
            warn!("dropped control update for {name}: {err:#}");
        }
    }

    /// Route a button press: "quit" runs the quit sequence, anything
    /// else goes to the server verbatim.
    pub fn on_click(&mut self, name: &str) {
        if !self.is_running() {
            return;
        }
        if name == "quit" {
            self.quit();
        } else if let Err(err) = self.proxy.do_action(name) {
            warn!("action {name} failed: {err:#}");
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.pointer.press(x, y);
        self.forward_finger(x, y, width, height);
    }

    /// Moves only count while the pointer is held down.
    pub fn pointer_moved(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if self.pointer.is_down {
            self.pointer.motion(x, y);
            self.forward_finger(x, y, width, height);
        }
    }

    pub fn pointer_up(&mut self) {
        self.pointer.release();
    }

    pub fn pointer_left(&mut self) {
        self.pointer.release();
    }

    fn forward_finger(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if !self.is_running() {
            return;
        }
        let (finger_x, finger_y) = controls::normalized_finger(x, y, width, height);
        let update = vec![
            ("finger_x".to_string(), ControlValue::Float(finger_x)),
            ("finger_y".to_string(), ControlValue::Float(finger_y)),
        ];
        if let Err(err) = self.proxy.set(update) {
            warn!("dropped finger update: {err:#}");
        }
    }
}

fn dimension(values: &HashMap<String, ControlValue>, key: &str) -> Result<usize> {
    let value = values
        .get(key)
        .with_context(|| format!("server reply is missing {key}"))?;
    let n = value
        .as_i64()
        .with_context(|| format!("{key} is not an integer: {value}"))?;
    if n <= 0 {
        bail!("{key} must be positive, got {n}");
    }
    Ok(n as usize)
}
