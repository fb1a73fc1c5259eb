use std::thread;
use std::time::{Duration, Instant};

use flowscope_messages::FrameRate;

/// Injected handle to the host environment's cooperative scheduler.
///
/// The session calls `pump_once` wherever the host needs a chance to
/// run pending UI or event work between frames.
pub trait HostPump {
    /// Run one pending host task, if any.
    fn pump_once(&mut self);

    /// Recommended spacing between pump calls while idle.
    fn poll_interval(&self) -> Duration;
}

/// Pump for environments with no host scheduler of their own
/// (headless runs). `pump_once` has nothing to do.
#[derive(Debug, Clone, Copy)]
pub struct IdlePump {
    poll_interval: Duration,
}

impl IdlePump {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for IdlePump {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl HostPump for IdlePump {
    fn pump_once(&mut self) {}

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Paces one render cycle to a target frame rate.
///
/// `frame_scope` stamps the frame start, runs the body, then keeps the
/// host pump fed until one full frame interval has passed since the
/// stamp. The pacing tail runs whether or not the body succeeded, so a
/// failed frame still hands control back to the host before the error
/// propagates. A slow body gets no catch-up: the next frame is simply
/// late.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    poll_interval: Duration,
}

impl FramePacer {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn frame_scope<T>(
        &self,
        rate: FrameRate,
        pump: &mut dyn HostPump,
        body: impl FnOnce() -> T,
    ) -> T {
        let tic = Instant::now();
        let out = body();

        // One turn for the host even on an overrun frame.
        pump.pump_once();

        let deadline = tic + rate.interval();
        while Instant::now() < deadline {
            pump.pump_once();
            let left = deadline.saturating_duration_since(Instant::now());
            let nap = left.min(self.poll_interval);
            if !nap.is_zero() {
                thread::sleep(nap);
            }
        }
        out
    }
}
