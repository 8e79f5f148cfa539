//! Application window: layout, file dialogs, and per-frame wiring.

use eframe::egui;
use egui::RichText;

use crate::controller::{AppController, NoticeLevel, Severity};
use crate::engine::EngineConfig;
use crate::task::TaskRunner;
use crate::theme;

/// Image formats offered by the file picker; the engine accepts more, this
/// is just the dialog filter.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "jp2", "bmp", "tif", "tiff"];

/// The main application window.
pub struct TextliftApp {
    controller: AppController,
    tasks: TaskRunner<AppController>,
    theme_applied: bool,
}

impl TextliftApp {
    pub fn new(cc: &eframe::CreationContext<'_>, engine_config: EngineConfig) -> Self {
        let mut tasks = TaskRunner::new();
        let ctx = cc.egui_ctx.clone();
        tasks.set_waker(move || ctx.request_repaint());

        let mut controller = AppController::new(engine_config);
        controller.start_engine_init(&tasks);

        Self {
            controller,
            tasks,
            theme_applied: false,
        }
    }

    /// Create eframe options for the main window.
    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([600.0, 400.0])
                .with_min_inner_size([520.0, 320.0])
                .with_title("Textlift"),
            ..Default::default()
        }
    }

    /// Show queued modal notifications as native dialogs.
    fn show_notices(&mut self) {
        while let Some(notice) = self.controller.take_notice() {
            let level = match notice.level {
                NoticeLevel::Info => rfd::MessageLevel::Info,
                NoticeLevel::Error => rfd::MessageLevel::Error,
            };
            rfd::MessageDialog::new()
                .set_level(level)
                .set_title(&notice.title)
                .set_description(&notice.body)
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
        }
    }

    fn browse_image(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image files", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.controller.image_path = path.display().to_string();
        }
    }

    fn browse_save_path(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Text files", &["txt"])
            .set_file_name("extracted.txt")
            .save_file()
        {
            self.controller.save_path = path.display().to_string();
        }
    }

    fn render_path_rows(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("path_rows")
            .num_columns(3)
            .spacing([8.0, 10.0])
            .show(ui, |ui| {
                ui.label("Image file:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.controller.image_path)
                        .desired_width(380.0),
                );
                if ui.button("Browse...").clicked() {
                    self.browse_image();
                }
                ui.end_row();

                ui.label("Save to:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.controller.save_path)
                        .desired_width(380.0),
                );
                if ui.button("Browse...").clicked() {
                    self.browse_save_path();
                }
                ui.end_row();
            });
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        let status = self.controller.status();
        ui.horizontal(|ui| {
            if status.severity == Severity::Working {
                ui.spinner();
            }
            ui.label(RichText::new(&status.text).color(theme::severity_color(status.severity)));
        });
    }
}

impl eframe::App for TextliftApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        // Apply results from worker threads before rendering this frame.
        self.tasks.poll(&mut self.controller);
        self.show_notices();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(24.0).show(ui, |ui| {
                ui.heading("Extract text from an image");
                ui.add_space(16.0);

                self.render_path_rows(ui);

                ui.add_space(12.0);
                self.render_status(ui);
                ui.add_space(16.0);

                ui.vertical_centered(|ui| {
                    let button = egui::Button::new(RichText::new("Start recognition").strong())
                        .min_size(egui::vec2(160.0, 32.0));
                    if ui.add_enabled(self.controller.can_run(), button).clicked() {
                        self.controller.request_run(&self.tasks);
                    }
                });
            });
        });
    }
}

/// Run the application window (blocking).
pub fn run(engine_config: EngineConfig) -> Result<(), eframe::Error> {
    eframe::run_native(
        "Textlift",
        TextliftApp::options(),
        Box::new(move |cc| Ok(Box::new(TextliftApp::new(cc, engine_config)))),
    )
}
