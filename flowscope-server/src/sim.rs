use flowscope_messages::{ControlValue, DensityFrame, TracerFrame};

/// Toy density field: a Gaussian bump orbiting the grid center over a
/// unit background, dented wherever the user's finger is. Tracers ride
/// a rigid swirl around the center. Stands in for a real solver so the
/// whole client pipeline can run end to end.
pub struct FluidSim {
    nx: usize,
    ny: usize,
    t: f64,
    cooling: f64,
    finger_x: f64,
    finger_y: f64,
    tracers: Vec<[f32; 2]>,
}

const TRACER_COLS: usize = 8;
const TRACER_ROWS: usize = 4;

/// Swirl angular velocity in radians per simulated second.
const SWIRL_OMEGA: f64 = 0.4;

impl FluidSim {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            t: 0.0,
            cooling: 0.01,
            finger_x: 0.5,
            finger_y: 0.5,
            tracers: seed_tracers(nx, ny),
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Advance the field by `dt` seconds. Cooling slows everything down.
    pub fn step(&mut self, dt: f64) {
        let dt = dt / (1.0 + self.cooling);
        self.t += dt;

        let cx = (self.nx as f64 - 1.0) / 2.0;
        let cy = (self.ny as f64 - 1.0) / 2.0;
        let (sin, cos) = (SWIRL_OMEGA * dt).sin_cos();
        for p in &mut self.tracers {
            let dx = p[0] as f64 - cx;
            let dy = p[1] as f64 - cy;
            p[0] = (cx + dx * cos - dy * sin) as f32;
            p[1] = (cy + dx * sin + dy * cos) as f32;
        }
    }

    pub fn density(&self) -> DensityFrame {
        let cx = (self.nx as f64 - 1.0) / 2.0;
        let cy = (self.ny as f64 - 1.0) / 2.0;
        let orbit = 0.3 * self.nx.min(self.ny) as f64;
        let bump_x = cx + orbit * self.t.cos();
        let bump_y = cy + orbit * self.t.sin();
        let sigma2 = (self.nx as f64 / 8.0).powi(2);

        let dent_x = self.finger_x * (self.nx as f64 - 1.0);
        let dent_y = self.finger_y * (self.ny as f64 - 1.0);
        let dent_sigma2 = (self.nx as f64 / 12.0).powi(2);

        let mut data = Vec::with_capacity(self.nx * self.ny);
        for iy in 0..self.ny {
            for ix in 0..self.nx {
                let x = ix as f64;
                let y = iy as f64;
                let bump = (-((x - bump_x).powi(2) + (y - bump_y).powi(2)) / (2.0 * sigma2)).exp();
                let dent =
                    (-((x - dent_x).powi(2) + (y - dent_y).powi(2)) / (2.0 * dent_sigma2)).exp();
                data.push((1.0 + bump - 0.7 * dent) as f32);
            }
        }
        DensityFrame::new(self.nx, self.ny, data)
    }

    pub fn tracers(&self) -> TracerFrame {
        TracerFrame {
            positions: self.tracers.clone(),
        }
    }

    /// Put the field back to its initial state. Control parameters keep
    /// their values; only the flow restarts.
    pub fn reset(&mut self) {
        self.t = 0.0;
    }

    pub fn reset_tracers(&mut self) {
        self.tracers = seed_tracers(self.nx, self.ny);
    }

    /// Apply one control parameter. Returns false for names this
    /// simulation does not know.
    pub fn set_param(&mut self, name: &str, value: &ControlValue) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        match name {
            "cooling" => self.cooling = v.max(0.0),
            "finger_x" => self.finger_x = v.clamp(0.0, 1.0),
            "finger_y" => self.finger_y = v.clamp(0.0, 1.0),
            _ => return false,
        }
        true
    }

    pub fn get_param(&self, name: &str) -> Option<ControlValue> {
        match name {
            "Nx" => Some(ControlValue::Int(self.nx as i64)),
            "Ny" => Some(ControlValue::Int(self.ny as i64)),
            "cooling" => Some(ControlValue::Float(self.cooling)),
            "finger_x" => Some(ControlValue::Float(self.finger_x)),
            "finger_y" => Some(ControlValue::Float(self.finger_y)),
            _ => None,
        }
    }
}

fn seed_tracers(nx: usize, ny: usize) -> Vec<[f32; 2]> {
    let mut tracers = Vec::with_capacity(TRACER_COLS * TRACER_ROWS);
    for row in 0..TRACER_ROWS {
        for col in 0..TRACER_COLS {
            let x = nx as f32 * (col as f32 + 0.5) / TRACER_COLS as f32;
            let y = ny as f32 * (row as f32 + 0.5) / TRACER_ROWS as f32;
            tracers.push([x, y]);
        }
    }
    tracers
}
