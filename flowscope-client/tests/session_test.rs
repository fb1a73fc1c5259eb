use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};

use flowscope_client::{
    DensityDisplay, DriveMode, FrameHost, IdlePump, RgbaImage, ServerProxy, Session, SessionConfig,
};
use flowscope_messages::{ControlValue, DensityFrame, FrameRate, TracerFrame};

// Test doubles shared between the session under test and the test body.

/// Everything the scripted server saw.
#[derive(Default)]
struct ServerLog {
    get_array_calls: usize,
    sets: Vec<Vec<(String, ControlValue)>>,
    actions: Vec<String>,
}

struct ScriptedServer {
    log: Rc<RefCell<ServerLog>>,
    nx: usize,
    ny: usize,
    /// Fail the n-th `get_array` call (1-based).
    fail_get_array_at: Option<usize>,
    fail_sets: bool,
}

impl ScriptedServer {
    fn new(log: Rc<RefCell<ServerLog>>) -> Self {
        Self {
            log,
            nx: 8,
            ny: 4,
            fail_get_array_at: None,
            fail_sets: false,
        }
    }
}

impl ServerProxy for ScriptedServer {
    fn get(&mut self, keys: &[&str]) -> Result<HashMap<String, ControlValue>> {
        let mut values = HashMap::new();
        for key in keys {
            match *key {
                "Nx" => values.insert("Nx".to_string(), ControlValue::Int(self.nx as i64)),
                "Ny" => values.insert("Ny".to_string(), ControlValue::Int(self.ny as i64)),
                other => bail!("unknown key {other}"),
            };
        }
        Ok(values)
    }

    fn get_array(&mut self, _name: &str) -> Result<DensityFrame> {
        let mut log = self.log.borrow_mut();
        log.get_array_calls += 1;
        if self.fail_get_array_at == Some(log.get_array_calls) {
            bail!("connection reset");
        }
        Ok(DensityFrame::new(
            self.nx,
            self.ny,
            vec![1.0; self.nx * self.ny],
        ))
    }

    fn get_tracers(&mut self) -> Result<TracerFrame> {
        Ok(TracerFrame::default())
    }

    fn set(&mut self, values: Vec<(String, ControlValue)>) -> Result<()> {
        if self.fail_sets {
            bail!("socket buffer full");
        }
        self.log.borrow_mut().sets.push(values);
        Ok(())
    }

    fn do_action(&mut self, action: &str) -> Result<()> {
        self.log.borrow_mut().actions.push(action.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDisplay {
    frame_times: Vec<Instant>,
    statuses: Vec<String>,
}

impl DensityDisplay for RecordingDisplay {
    fn set_image(&mut self, _image: RgbaImage) {
        self.frame_times.push(Instant::now());
    }

    fn set_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }
}

/// Host that presents a fixed number of frames, then reports itself gone.
struct ScriptedHost {
    presents_left: usize,
}

impl FrameHost for ScriptedHost {
    fn present_frame(&mut self, frame: &mut dyn FnMut()) -> bool {
        if self.presents_left == 0 {
            return false;
        }
        self.presents_left -= 1;
        frame();
        true
    }
}

fn fast_config(max_frames: u64) -> SessionConfig {
    SessionConfig {
        max_frames,
        timeout: Duration::from_secs(1000),
        target_fps: FrameRate(200.0),
        poll_interval: Duration::from_millis(1),
        show_tracers: false,
        ..SessionConfig::default()
    }
}

fn session_with_log(
    config: SessionConfig,
) -> (Session<ScriptedServer>, Rc<RefCell<ServerLog>>) {
    let log = Rc::new(RefCell::new(ServerLog::default()));
    let session = Session::new(ScriptedServer::new(Rc::clone(&log)), config);
    (session, log)
}

#[test]
fn test_polled_run_renders_exactly_max_frames() {
    let (mut session, log) = session_with_log(fast_config(5));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    session.connect().unwrap();
    session
        .run(DriveMode::Polled, &mut display, &mut pump)
        .unwrap();

    let log = log.borrow();
    assert_eq!(log.get_array_calls, 5);
    assert_eq!(display.frame_times.len(), 5);
    assert_eq!(log.actions, vec!["quit"]);
    assert!(!session.is_running());
    assert_eq!(session.frames_rendered(), 5);
}

#[test]
fn test_frame_period_never_beats_target_rate() {
    let config = SessionConfig {
        target_fps: FrameRate(20.0),
        ..fast_config(3)
    };
    let (mut session, _log) = session_with_log(config);
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    session
        .run(DriveMode::Polled, &mut display, &mut pump)
        .unwrap();

    assert_eq!(display.frame_times.len(), 3);
    for pair in display.frame_times.windows(2) {
        let period = pair[1] - pair[0];
        assert!(
            period >= Duration::from_millis(45),
            "frames only {period:?} apart at a 50ms target interval"
        );
    }
}

#[test]
fn test_timeout_bounds_session_length() {
    let config = SessionConfig {
        max_frames: u64::MAX,
        timeout: Duration::from_millis(150),
        target_fps: FrameRate(50.0),
        ..fast_config(0)
    };
    let (mut session, log) = session_with_log(config);
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    let tic = Instant::now();
    session
        .run(DriveMode::Polled, &mut display, &mut pump)
        .unwrap();
    let elapsed = tic.elapsed();

    assert!(elapsed >= Duration::from_millis(150), "stopped early: {elapsed:?}");
    assert!(
        elapsed < Duration::from_millis(400),
        "overran the timeout by too much: {elapsed:?}"
    );
    assert!(!session.is_running());
    assert_eq!(log.borrow().actions, vec!["quit"]);
}

#[test]
fn test_fetch_failure_stops_the_session() {
    let log = Rc::new(RefCell::new(ServerLog::default()));
    let mut server = ScriptedServer::new(Rc::clone(&log));
    server.fail_get_array_at = Some(3);
    let mut session = Session::new(server, fast_config(100));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    let result = session.run(DriveMode::Polled, &mut display, &mut pump);

    assert!(result.is_err());
    let log = log.borrow();
    // Two good frames, then the failing third call ends the loop.
    assert_eq!(log.get_array_calls, 3);
    assert_eq!(display.frame_times.len(), 2);
    // Quit was still attempted, exactly once.
    assert_eq!(log.actions, vec!["quit"]);
    assert!(!session.is_running());
}

#[test]
fn test_quit_twice_sends_one_quit() {
    let (mut session, log) = session_with_log(fast_config(5));

    session.quit();
    session.quit();
    session.finish();

    assert_eq!(log.borrow().actions, vec!["quit"]);
    assert!(!session.is_running());
}

#[test]
fn test_value_change_after_stop_is_ignored() {
    let (mut session, log) = session_with_log(fast_config(5));

    session.quit();
    session.on_value_change("cooling", ControlValue::Float(0.01));
    session.on_click("reset");

    let log = log.borrow();
    assert!(log.sets.is_empty());
    assert_eq!(log.actions, vec!["quit"]);
}

#[test]
fn test_value_change_forwards_while_running() {
    let (mut session, log) = session_with_log(fast_config(5));

    session.on_value_change("cooling", ControlValue::Float(0.01));

    let log = log.borrow();
    assert_eq!(log.sets.len(), 1);
    assert_eq!(
        log.sets[0],
        vec![("cooling".to_string(), ControlValue::Float(0.01))]
    );
}

#[test]
fn test_click_dispatches_to_server_actions() {
    let (mut session, log) = session_with_log(fast_config(5));

    session.on_click("reset");
    session.on_click("reset_tracers");

    assert_eq!(log.borrow().actions, vec!["reset", "reset_tracers"]);
    assert!(session.is_running());
}

#[test]
fn test_pointer_down_forwards_normalized_finger() {
    let (mut session, log) = session_with_log(fast_config(5));

    session.pointer_down(100.0, 50.0, 500.0, 300.0);

    let log = log.borrow();
    assert_eq!(log.sets.len(), 1);
    let update = &log.sets[0];
    assert_eq!(update[0].0, "finger_x");
    assert!((update[0].1.as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(update[1].0, "finger_y");
    let expected_y = 1.0 - 50.0 / 300.0;
    assert!((update[1].1.as_f64().unwrap() - expected_y).abs() < 1e-6);
}

#[test]
fn test_pointer_moves_only_forward_while_down() {
    let (mut session, log) = session_with_log(fast_config(5));

    session.pointer_moved(10.0, 10.0, 500.0, 300.0);
    assert!(log.borrow().sets.is_empty());

    session.pointer_down(100.0, 50.0, 500.0, 300.0);
    session.pointer_moved(120.0, 60.0, 500.0, 300.0);
    assert_eq!(log.borrow().sets.len(), 2);

    session.pointer_up();
    session.pointer_moved(130.0, 70.0, 500.0, 300.0);
    assert_eq!(log.borrow().sets.len(), 2);

    // Leaving the display behaves like lifting the finger
    session.pointer_down(100.0, 50.0, 500.0, 300.0);
    session.pointer_left();
    session.pointer_moved(10.0, 10.0, 500.0, 300.0);
    assert_eq!(log.borrow().sets.len(), 3);
}

#[test]
fn test_set_failure_does_not_stop_the_session() {
    let log = Rc::new(RefCell::new(ServerLog::default()));
    let mut server = ScriptedServer::new(Rc::clone(&log));
    server.fail_sets = true;
    let mut session = Session::new(server, fast_config(3));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    session.on_value_change("cooling", ControlValue::Float(0.5));
    assert!(session.is_running());

    // The frame loop is unaffected by the failed control update
    session
        .run(DriveMode::Polled, &mut display, &mut pump)
        .unwrap();
    assert_eq!(display.frame_times.len(), 3);
}

#[test]
fn test_hosted_run_draws_from_the_same_budget() {
    let (mut session, log) = session_with_log(fast_config(4));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));
    let mut host = ScriptedHost { presents_left: 100 };

    session
        .run(DriveMode::Hosted(&mut host), &mut display, &mut pump)
        .unwrap();

    assert_eq!(display.frame_times.len(), 4);
    assert_eq!(log.borrow().actions, vec!["quit"]);
    assert!(!session.is_running());
}

#[test]
fn test_hosted_run_stops_when_the_host_goes_away() {
    let (mut session, log) = session_with_log(fast_config(10));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));
    let mut host = ScriptedHost { presents_left: 2 };

    session
        .run(DriveMode::Hosted(&mut host), &mut display, &mut pump)
        .unwrap();

    assert_eq!(display.frame_times.len(), 2);
    assert_eq!(log.borrow().actions, vec!["quit"]);
    assert!(!session.is_running());
}

#[test]
fn test_update_frame_is_a_noop_outside_budget_scope() {
    let (mut session, log) = session_with_log(fast_config(5));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    // No begin(): no budget scope is open
    session.update_frame(&mut display, &mut pump).unwrap();

    assert_eq!(log.borrow().get_array_calls, 0);
    assert!(display.frame_times.is_empty());
}

#[test]
fn test_status_reports_measured_rate() {
    let (mut session, _log) = session_with_log(fast_config(2));
    let mut display = RecordingDisplay::default();
    let mut pump = IdlePump::new(Duration::from_millis(1));

    session
        .run(DriveMode::Polled, &mut display, &mut pump)
        .unwrap();

    assert_eq!(display.statuses.len(), 2);
    assert!(display.statuses[0].ends_with("fps"));
}

#[test]
fn test_connect_reports_grid_size() {
    let (mut session, _log) = session_with_log(fast_config(5));
    let grid = session.connect().unwrap();
    assert_eq!((grid.nx, grid.ny), (8, 4));
    assert_eq!(session.grid(), Some(grid));
}

#[test]
fn test_interrupted_flag_tracks_the_session() {
    let (mut session, _log) = session_with_log(fast_config(5));
    let interrupted = session.interrupted();

    assert!(!interrupted.is_set());
    session.quit();
    assert!(interrupted.is_set());
}
