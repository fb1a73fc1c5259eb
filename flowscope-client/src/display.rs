use log::debug;

use crate::render::RgbaImage;

/// Where rendered frames end up.
///
/// Implemented by the GUI's density view; the session only ever writes
/// through this trait, so the core stays free of toolkit types.
pub trait DensityDisplay {
    /// Replace the displayed pixel buffer. Ownership moves to the
    /// display; the previous frame is gone.
    fn set_image(&mut self, image: RgbaImage);

    /// Update the one-line status text (measured rate, failures).
    fn set_status(&mut self, status: &str);
}

/// Display for headless runs: counts frames, logs the status line.
#[derive(Debug, Default)]
pub struct NullDisplay {
    frames: u64,
}

impl NullDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DensityDisplay for NullDisplay {
    fn set_image(&mut self, _image: RgbaImage) {
        self.frames += 1;
    }

    fn set_status(&mut self, status: &str) {
        debug!("status: {status}");
    }
}
