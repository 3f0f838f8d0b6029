//! Desktop front end for the video download service

// HTTP client for /api/info and /api/download
mod api;
// Command-line and environment configuration
mod config;
// Page state, user intents and background events
mod controller;
// Typed service errors
mod error;
// Naming and placing saved files
mod filename;
// Tracing subscriber setup
mod logging;
// Wire types and duration formatting
mod model;
// One download from request to saved file
mod orchestrator;
// Simulated progress while the server works
mod progress;
// Thumbnail fetching and decoding
mod thumbnail;
// Rendering of the page
mod ui;

use api::ApiClient;
use clap::Parser;
use config::Args;
use controller::{DownloadPageController, UiAction};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{TextureHandle, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use std::{path::Path, sync::Arc};
use tokio::runtime::Runtime;
use tracing::{info, warn};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: reads configuration, starts the runtime and launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logger_once(&args.log_filter);

    // Create a new Tokio runtime and store it globally
    RUNTIME
        .set(Arc::new(Runtime::new()?))
        .map_err(|_| "runtime already initialised")?;
    let handle = RUNTIME
        .get()
        .map(|rt| rt.handle().clone())
        .ok_or("runtime not initialised")?;

    let api = ApiClient::new(args.server);
    let download_dir = args.download_dir;
    info!(server = %api.base_url(), download_dir = %download_dir.display(), "starting");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([760.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Video Downloader",
        options,
        Box::new(move |cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            let controller = DownloadPageController::new(api, handle, download_dir)
                .with_repaint(cc.egui_ctx.clone());
            Box::new(DownloadPageApp::new(controller))
        }),
    )?;
    Ok(())
}

/// Window state: the page controller plus GPU-side resources
struct DownloadPageApp {
    controller: DownloadPageController,
    /// Texture of the current result's thumbnail
    thumbnail: Option<TextureHandle>,
}

impl DownloadPageApp {
    fn new(controller: DownloadPageController) -> Self {
        Self {
            controller,
            thumbnail: None,
        }
    }

    fn dispatch(&mut self, action: UiAction) {
        match action {
            UiAction::BrowseFolder => {
                let current = self.controller.state().download_dir.clone();
                if let Some(folder) = FileDialog::new().set_directory(&current).pick_folder() {
                    self.controller.handle(UiAction::SetDownloadDir(folder));
                }
            }
            UiAction::OpenFolder => open_folder(&self.controller.state().download_dir),
            other => self.controller.handle(other),
        }
    }
}

/// GUI update loop: applies background events, then redraws from the state snapshot
impl App for DownloadPageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.controller.poll_events();

        if let Some(image) = self.controller.take_thumbnail() {
            self.thumbnail = Some(ctx.load_texture("thumbnail", image, TextureOptions::default()));
        }
        if self.controller.state().result.is_none() {
            self.thumbnail = None;
        }

        let actions = egui::CentralPanel::default()
            .show(ctx, |ui| {
                ui::render_page(ui, self.controller.state(), self.thumbnail.as_ref())
            })
            .inner;
        for action in actions {
            self.dispatch(action);
        }

        // Keep the progress bar animating while a download runs
        if self.controller.state().download.in_progress {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

/// Opens `folder` in the platform file manager
fn open_folder(folder: &Path) {
    let folder = folder.to_path_buf();
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        let result = std::process::Command::new("explorer").arg(&folder).spawn();
        #[cfg(target_os = "macos")]
        let result = std::process::Command::new("open").arg(&folder).spawn();
        #[cfg(all(unix, not(target_os = "macos")))]
        let result = std::process::Command::new("xdg-open").arg(&folder).spawn();
        if let Err(e) = result {
            warn!(folder = %folder.display(), "could not open folder: {e}");
        }
    });
}
