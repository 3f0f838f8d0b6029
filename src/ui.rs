//! Page rendering. Every function reads a [`UiState`] snapshot and reports
//! what the user did as [`UiAction`]s; none of them mutate state.

use eframe::egui::{self, Color32, RichText, TextureHandle};

use crate::controller::{DownloadView, UiAction, UiState};
use crate::model::{OutputFormat, QUALITY_OPTIONS, VideoInfo};

const ACCENT: Color32 = Color32::from_rgb(220, 38, 38);

/// Stable id of the URL field so focus survives layout changes
const URL_INPUT_ID: &str = "url_input";

pub fn render_page(ui: &mut egui::Ui, state: &UiState, thumbnail: Option<&TextureHandle>) -> Vec<UiAction> {
    let mut actions = Vec::new();

    ui.heading("Video Downloader");
    ui.add_space(8.0);
    render_search(ui, state, &mut actions);

    if state.loading {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Buscando video...");
        });
    }

    if let Some(error) = &state.error {
        render_error(ui, error);
    }

    if let Some(info) = &state.result {
        ui.separator();
        render_result(ui, info, thumbnail);
        render_options(ui, state, &mut actions);
        render_download(ui, state, &mut actions);
    }

    actions
}

fn render_search(ui: &mut egui::Ui, state: &UiState, actions: &mut Vec<UiAction>) {
    ui.label("Pega el enlace del video:");
    ui.horizontal(|ui| {
        let mut url = state.url_input.clone();
        let response = ui.add(
            egui::TextEdit::singleline(&mut url)
                .id(egui::Id::new(URL_INPUT_ID))
                .hint_text("https://...")
                .desired_width(420.0),
        );
        if response.changed() {
            actions.push(UiAction::UrlChanged(url));
        }
        // A single-line edit gives up focus on Enter
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("🔍 Buscar").clicked() || submitted {
            actions.push(UiAction::FetchInfo);
        }
    });
}

fn render_error(ui: &mut egui::Ui, error: &str) {
    egui::Frame::group(ui.style())
        .stroke(egui::Stroke::new(1.0, ACCENT))
        .show(ui, |ui| {
            ui.colored_label(ACCENT, error);
        });
}

fn render_result(ui: &mut egui::Ui, info: &VideoInfo, thumbnail: Option<&TextureHandle>) {
    ui.horizontal(|ui| {
        if let Some(tex) = thumbnail {
            ui.add(egui::Image::new(tex).max_width(240.0));
        }
        ui.vertical(|ui| {
            ui.label(RichText::new(info.title.as_deref().unwrap_or_default()).strong().size(16.0));
            ui.label(format!("🕑 {}", info.duration_label()));
            ui.label(RichText::new(info.platform_tag()).background_color(ui.visuals().faint_bg_color));
            if let Some(page) = &info.webpage_url {
                ui.hyperlink_to("Ver original", page);
            }
        });
    });
}

fn render_options(ui: &mut egui::Ui, state: &UiState, actions: &mut Vec<UiAction>) {
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        let mut format = state.format;
        ui.radio_value(&mut format, OutputFormat::Video, "Video (MP4)");
        ui.radio_value(&mut format, OutputFormat::Audio, "Audio (MP3)");
        if format != state.format {
            actions.push(UiAction::SelectFormat(format));
        }
    });

    if state.quality_visible {
        let mut quality = state.quality.clone();
        let selected = QUALITY_OPTIONS
            .iter()
            .find(|(id, _)| *id == quality)
            .map_or(quality.as_str(), |(_, label)| *label)
            .to_string();
        egui::ComboBox::from_label("Calidad")
            .selected_text(selected)
            .show_ui(ui, |ui| {
                for (id, label) in QUALITY_OPTIONS {
                    ui.selectable_value(&mut quality, id.to_string(), label);
                }
            });
        if quality != state.quality {
            actions.push(UiAction::SelectQuality(quality));
        }
    }

    ui.horizontal(|ui| {
        ui.label("Carpeta:");
        let mut dir = state.download_dir.display().to_string();
        if ui.text_edit_singleline(&mut dir).changed() {
            actions.push(UiAction::SetDownloadDir(dir.into()));
        }
        if ui.button("Browse…").clicked() {
            actions.push(UiAction::BrowseFolder);
        }
    });
}

fn render_download(ui: &mut egui::Ui, state: &UiState, actions: &mut Vec<UiAction>) {
    let view = &state.download;
    ui.add_space(8.0);
    let button = egui::Button::new(RichText::new("⬇ Descargar").color(Color32::WHITE))
        .fill(ACCENT.gamma_multiply(view.button_opacity));
    if ui.add_enabled(!view.in_progress, button).clicked() {
        actions.push(UiAction::Download);
    }

    if view.status_visible {
        render_status(ui, view);
    }

    if let Some(path) = &view.last_saved {
        ui.horizontal(|ui| {
            ui.label(format!("Guardado en {}", path.display()));
            if ui.button("Open Folder").clicked() {
                actions.push(UiAction::OpenFolder);
            }
        });
    }
}

fn render_status(ui: &mut egui::Ui, view: &DownloadView) {
    ui.group(|ui| {
        ui.label(RichText::new(view.message).strong());
        ui.label(RichText::new(view.detail).weak());
        ui.add(egui::ProgressBar::new(view.progress / 100.0).show_percentage());
    });
}
