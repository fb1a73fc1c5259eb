use eframe::egui::{
    ColorImage, Image, Response, Sense, TextureHandle, TextureOptions, Ui, Vec2, Widget,
};

use flowscope_client::{DensityDisplay, RgbaImage};

/// Pointer gestures reported by the density view, in view-local pixels.
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Down { x: f32, y: f32, width: f32, height: f32 },
    Moved { x: f32, y: f32, width: f32, height: f32 },
    Up,
}

/// Live density display widget.
///
/// Pixel data arrives through `DensityDisplay` between frames, not
/// during rendering. The `needs_gpu_upload` flag tracks whether the
/// texture must be re-uploaded, so frames without new data reuse the
/// cached handle.
pub struct DensityView {
    image: ColorImage,
    has_image: bool,
    needs_gpu_upload: bool,
    /// Cached texture handle to avoid re-uploading on every frame
    texture_handle: Option<TextureHandle>,
    status: String,
    aspect: f32,
    pending_events: Vec<PointerEvent>,
}

impl DensityView {
    pub fn new() -> Self {
        Self {
            image: ColorImage::default(),
            has_image: false,
            needs_gpu_upload: false,
            texture_handle: None,
            status: String::new(),
            aspect: 2.0,
            pending_events: Vec::new(),
        }
    }

    /// Match the widget's aspect ratio to the simulation grid.
    pub fn set_grid_aspect(&mut self, nx: usize, ny: usize) {
        if nx > 0 && ny > 0 {
            self.aspect = nx as f32 / ny as f32;
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Drain pointer gestures observed since the last frame.
    pub fn take_pointer_events(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

impl DensityDisplay for DensityView {
    fn set_image(&mut self, image: RgbaImage) {
        self.image =
            ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.pixels);
        self.has_image = true;
        self.needs_gpu_upload = true;
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}

impl Widget for &mut DensityView {
    fn ui(self, ui: &mut Ui) -> Response {
        if !self.has_image {
            ui.label("Waiting for density data...");
            return ui.response();
        }

        // Only upload the texture when a new frame arrived
        if self.needs_gpu_upload {
            let texture =
                ui.ctx()
                    .load_texture("density", self.image.clone(), TextureOptions::LINEAR);
            self.texture_handle = Some(texture);
            self.needs_gpu_upload = false;
        }

        let Some(texture_handle) = &self.texture_handle else {
            return ui.response();
        };

        // Fill the available width (at least 500 px), keeping the
        // grid's aspect ratio.
        let width = ui.available_size().x.max(500.0);
        let size = Vec2::new(width, width / self.aspect);

        let response = ui.add(
            Image::new(texture_handle)
                .fit_to_exact_size(size)
                .sense(Sense::click_and_drag()),
        );

        let rect = response.rect;
        if let Some(pos) = response.interact_pointer_pos() {
            let x = pos.x - rect.min.x;
            let y = pos.y - rect.min.y;
            let (width, height) = (rect.width(), rect.height());
            if response.drag_started() {
                self.pending_events.push(PointerEvent::Down { x, y, width, height });
            } else if response.dragged() {
                self.pending_events.push(PointerEvent::Moved { x, y, width, height });
            }
        }
        // Covers both lifting the finger and leaving the window: egui
        // keeps drag capture until the button goes up.
        if response.drag_stopped() {
            self.pending_events.push(PointerEvent::Up);
        }

        response
    }
}
