/// Pointer gesture state over the density view.
///
/// Coordinates are display-local pixels; only whether the pointer is
/// held down gates move forwarding.
#[derive(Debug, Default)]
pub struct PointerTracker {
    pub is_down: bool,
    pub last_x: f32,
    pub last_y: f32,
}

impl PointerTracker {
    pub fn press(&mut self, x: f32, y: f32) {
        self.is_down = true;
        self.last_x = x;
        self.last_y = y;
    }

    pub fn motion(&mut self, x: f32, y: f32) {
        self.last_x = x;
        self.last_y = y;
    }

    pub fn release(&mut self) {
        self.is_down = false;
    }
}

/// Map display coordinates to the simulation's finger coordinates in
/// [0, 1]. Display y grows downward while the simulation's y grows
/// upward, so the vertical axis flips.
pub fn normalized_finger(x: f32, y: f32, width: f32, height: f32) -> (f64, f64) {
    let finger_x = (x / width) as f64;
    let finger_y = 1.0 - (y / height) as f64;
    (finger_x, finger_y)
}
