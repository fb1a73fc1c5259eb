use eframe::egui::{Response, Slider, Ui, Widget};

use flowscope_messages::ControlValue;

/// Events the control panel hands back to the session driver.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    /// Local pacing control; never forwarded to the server.
    TargetFps(f64),
    /// A server-side parameter changed.
    ValueChanged(&'static str, ControlValue),
    /// A button was pressed.
    Clicked(&'static str),
}

/// Control panel widget: pacing, simulation parameters, and the
/// reset/quit actions.
pub struct ControlPanel {
    target_fps: f32,
    cooling: f32,
    pending: Vec<ControlEvent>,
}

impl ControlPanel {
    pub fn new(target_fps: f64) -> Self {
        Self {
            target_fps: target_fps as f32,
            cooling: 0.01,
            pending: Vec::new(),
        }
    }

    /// Drain events raised since the last frame.
    pub fn take_events(&mut self) -> Vec<ControlEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl Widget for &mut ControlPanel {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.heading("Simulation");
        ui.separator();

        if ui
            .add(Slider::new(&mut self.target_fps, 1.0..=60.0).text("Target fps"))
            .changed()
        {
            self.pending
                .push(ControlEvent::TargetFps(self.target_fps as f64));
        }

        if ui
            .add(
                Slider::new(&mut self.cooling, 1e-10..=10.0)
                    .logarithmic(true)
                    .text("Cooling"),
            )
            .changed()
        {
            self.pending.push(ControlEvent::ValueChanged(
                "cooling",
                ControlValue::Float(self.cooling as f64),
            ));
        }

        ui.add_space(10.0);
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Reset").clicked() {
                self.pending.push(ControlEvent::Clicked("reset"));
            }
            if ui.button("Reset tracers").clicked() {
                self.pending.push(ControlEvent::Clicked("reset_tracers"));
            }
        });
        if ui.button("Quit").clicked() {
            self.pending.push(ControlEvent::Clicked("quit"));
        }

        ui.response()
    }
}
