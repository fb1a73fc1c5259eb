use std::time::Duration;

/// A target frame rate in frames per second.
///
/// User-set rates can be zero or absurdly small; all timing math goes
/// through `effective()`, which floors the rate at 1 fps so a frame
/// interval is always finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FrameRate(pub f64);

impl FrameRate {
    /// The rate actually used for pacing, floored at 1 fps.
    pub fn effective(self) -> f64 {
        self.0.max(1.0)
    }

    /// Duration of one frame at the effective rate.
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective())
    }

    pub const fn as_fps(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} fps", self.0)
    }
}

impl From<f64> for FrameRate {
    fn from(fps: f64) -> Self {
        Self(fps)
    }
}
