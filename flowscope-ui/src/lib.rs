mod control_panel;
mod density_view;

use control_panel::{ControlEvent, ControlPanel};
use density_view::{DensityView, PointerEvent};

use eframe::egui;
use log::error;

use flowscope_client::{ChannelProxy, DensityDisplay, IdlePump, Session};
use flowscope_messages::FrameRate;

/// Main application struct implementing the egui App trait.
///
/// eframe is the frame host: every `update` call presents one host
/// frame, so the session draws one budget tick per update and paces
/// itself inside the tick.
pub struct FlowscopeApp {
    session: Session<ChannelProxy>,
    view: DensityView,
    control_panel: ControlPanel,
    pump: IdlePump,
    closing: bool,
}

impl FlowscopeApp {
    fn new(mut session: Session<ChannelProxy>) -> Self {
        let mut view = DensityView::new();
        if let Some(grid) = session.grid() {
            view.set_grid_aspect(grid.nx, grid.ny);
        }
        let control_panel = ControlPanel::new(session.target_fps().as_fps());
        let pump = IdlePump::new(session.config().poll_interval);
        session.begin();
        Self {
            session,
            view,
            control_panel,
            pump,
            closing: false,
        }
    }
}

impl eframe::App for FlowscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Closing the window counts as quitting the session.
        if ctx.input(|i| i.viewport().close_requested()) {
            self.session.finish();
        }

        if self.session.should_continue() {
            if let Err(err) = self.session.host_tick(&mut self.view, &mut self.pump) {
                error!("session failed: {err:#}");
                self.view.set_status(&format!("session failed: {err:#}"));
                self.session.finish();
            }
        } else if !self.closing {
            self.session.finish();
            self.closing = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // Keep update calls coming; the session's own pacing sets the rate
        ctx.request_repaint();

        // Right side panel for controls
        egui::SidePanel::right("control_panel")
            .default_width(250.0)
            .show(ctx, |ui| {
                ui.add(&mut self.control_panel);
                ui.add_space(10.0);
                ui.separator();
                ui.label(self.view.status());
            });

        // Central panel for the density view
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add(&mut self.view);
        });

        for event in self.control_panel.take_events() {
            match event {
                ControlEvent::TargetFps(fps) => self.session.set_target_fps(FrameRate(fps)),
                ControlEvent::ValueChanged(name, value) => {
                    self.session.on_value_change(name, value);
                }
                ControlEvent::Clicked(name) => self.session.on_click(name),
            }
        }
        for event in self.view.take_pointer_events() {
            match event {
                PointerEvent::Down {
                    x,
                    y,
                    width,
                    height,
                } => self.session.pointer_down(x, y, width, height),
                PointerEvent::Moved {
                    x,
                    y,
                    width,
                    height,
                } => self.session.pointer_moved(x, y, width, height),
                PointerEvent::Up => self.session.pointer_up(),
            }
        }
    }
}

/// Entry point for the UI module.
///
/// Takes a connected session and runs the eframe application on the
/// main thread (blocking). The session is wound down before this
/// returns, whether the user quit or the frame budget ran out.
pub fn run(session: Session<ChannelProxy>) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 540.0])
            .with_title("Flowscope"),
        ..Default::default()
    };

    eframe::run_native(
        "Flowscope",
        options,
        Box::new(|_cc| Ok(Box::new(FlowscopeApp::new(session)))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
