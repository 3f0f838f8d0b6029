//! State and operations of the download page.
//!
//! The controller is the only writer of [`UiState`]. Background tasks report
//! back through [`ControllerEvent`]s, which are applied on the UI thread by
//! [`DownloadPageController::poll_events`]. Every event carries the generation
//! of the request that produced it, so answers to superseded requests are
//! dropped.

use std::path::PathBuf;

use eframe::egui::{ColorImage, Context};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;

use crate::api::ApiClient;
use crate::model::{DownloadRequest, OutputFormat, QUALITY_OPTIONS, VideoInfo};
use crate::progress::{COMPLETE, STAGES, Stage};
use crate::{orchestrator, thumbnail};

/// Prefix of every download error shown to the user
pub const DOWNLOAD_ERROR_PREFIX: &str = "Error al descargar: ";
/// Opacity of the download button while a download runs
pub const BUSY_OPACITY: f32 = 0.7;

/// Status area and trigger button of the download section
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadView {
    /// Trigger is disabled while true
    pub in_progress: bool,
    /// [`BUSY_OPACITY`] while a download runs, 1.0 otherwise
    pub button_opacity: f32,
    pub status_visible: bool,
    /// Headline and detail line of the status area
    pub message: &'static str,
    pub detail: &'static str,
    /// 0 to 100
    pub progress: f32,
    /// Where the last finished download was written
    pub last_saved: Option<PathBuf>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            in_progress: false,
            button_opacity: 1.0,
            status_visible: false,
            message: STAGES[0].0,
            detail: STAGES[0].1,
            progress: 0.0,
            last_saved: None,
        }
    }
}

impl DownloadView {
    fn show_stage(&mut self, (message, detail): Stage) {
        self.message = message;
        self.detail = detail;
    }

    /// Re-enables the trigger; the status area stays as it is
    fn settle(&mut self) {
        self.in_progress = false;
        self.button_opacity = 1.0;
    }
}

/// Everything the page renders from
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub url_input: String,
    pub format: OutputFormat,
    /// Id from [`QUALITY_OPTIONS`]
    pub quality: String,
    /// False for audio, which has no quality choice
    pub quality_visible: bool,
    /// An info lookup is outstanding
    pub loading: bool,
    /// Metadata of the last successful lookup; the result panel shows while set
    pub result: Option<VideoInfo>,
    /// Shared error banner for lookups and downloads
    pub error: Option<String>,
    pub download: DownloadView,
    pub download_dir: PathBuf,
}

impl UiState {
    fn new(download_dir: PathBuf) -> Self {
        Self {
            url_input: String::new(),
            format: OutputFormat::Video,
            quality: QUALITY_OPTIONS[0].0.to_string(),
            quality_visible: true,
            loading: false,
            result: None,
            error: None,
            download: DownloadView::default(),
            download_dir,
        }
    }
}

/// User intents produced by the render functions
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    UrlChanged(String),
    FetchInfo,
    SelectFormat(OutputFormat),
    SelectQuality(String),
    Download,
    BrowseFolder,
    SetDownloadDir(PathBuf),
    OpenFolder,
}

/// Progress of one download, as reported by its background task
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadUpdate {
    /// Index into [`STAGES`]
    Stage(usize),
    /// Simulated or byte-based percentage
    Percent(f32),
    /// Body fully read
    Received,
    /// File written at this path
    Saved(PathBuf),
    /// Server or local error, without the display prefix
    Failed(String),
    /// Time to hide the status area
    StatusExpired,
}

/// Messages from background tasks to the UI thread
#[derive(Debug)]
pub enum ControllerEvent {
    InfoLoaded { generation: u64, info: VideoInfo },
    InfoFailed { generation: u64, message: String },
    ThumbnailLoaded { generation: u64, image: ColorImage },
    Download { generation: u64, update: DownloadUpdate },
}

/// Sending half used by background tasks; wakes the UI after each event
#[derive(Clone)]
pub struct EventSink {
    tx: UnboundedSender<ControllerEvent>,
    /// Set once the window exists; tests run without one
    repaint: Option<Context>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<ControllerEvent>) -> Self {
        Self { tx, repaint: None }
    }

    pub fn send(&self, event: ControllerEvent) {
        // A closed channel means the window is gone; nothing left to wake
        if self.tx.send(event).is_ok() {
            if let Some(ctx) = &self.repaint {
                ctx.request_repaint();
            }
        }
    }

    pub fn for_download(self, generation: u64) -> DownloadSink {
        DownloadSink {
            sink: self,
            generation,
        }
    }
}

/// [`EventSink`] bound to one download
#[derive(Clone)]
pub struct DownloadSink {
    sink: EventSink,
    generation: u64,
}

impl DownloadSink {
    pub fn emit(&self, update: DownloadUpdate) {
        self.sink.send(ControllerEvent::Download {
            generation: self.generation,
            update,
        });
    }
}

/// Owns the page state and starts the background work behind each action
pub struct DownloadPageController {
    state: UiState,
    api: ApiClient,
    /// Runtime background tasks are spawned on
    runtime: Handle,
    sink: EventSink,
    events: UnboundedReceiver<ControllerEvent>,
    /// Generation of the latest info lookup; older answers are dropped
    info_generation: u64,
    /// Generation of the latest download
    download_generation: u64,
    /// Decoded thumbnail waiting to be uploaded as a texture
    pending_thumbnail: Option<ColorImage>,
}

impl DownloadPageController {
    pub fn new(api: ApiClient, runtime: Handle, download_dir: PathBuf) -> Self {
        let (tx, events) = unbounded_channel();
        Self {
            state: UiState::new(download_dir),
            api,
            runtime,
            sink: EventSink::new(tx),
            events,
            info_generation: 0,
            download_generation: 0,
            pending_thumbnail: None,
        }
    }

    /// Repaints `ctx` whenever a background task reports
    pub fn with_repaint(mut self, ctx: Context) -> Self {
        self.sink.repaint = Some(ctx);
        self
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Thumbnail decoded since the last call, if any
    pub fn take_thumbnail(&mut self) -> Option<ColorImage> {
        self.pending_thumbnail.take()
    }

    /// Applies one user intent
    pub fn handle(&mut self, action: UiAction) {
        match action {
            UiAction::UrlChanged(url) => self.state.url_input = url,
            UiAction::FetchInfo => {
                self.fetch_video_info();
            }
            UiAction::SelectFormat(format) => self.select_format(format),
            UiAction::SelectQuality(quality) => self.state.quality = quality,
            UiAction::Download => {
                self.download_video();
            }
            UiAction::SetDownloadDir(dir) => self.state.download_dir = dir,
            // Dialogs and file managers belong to the window, not the page state.
            UiAction::BrowseFolder | UiAction::OpenFolder => {}
        }
    }

    /// Audio hides the quality selector, anything else shows it
    pub fn select_format(&mut self, format: OutputFormat) {
        self.state.format = format;
        self.state.quality_visible = format != OutputFormat::Audio;
    }

    /// Looks up metadata for the entered URL. Returns false, touching
    /// nothing, when the URL is blank.
    pub fn fetch_video_info(&mut self) -> bool {
        let url = self.state.url_input.trim().to_string();
        if url.is_empty() {
            return false;
        }

        // Supersede any lookup still in flight
        self.info_generation += 1;
        let generation = self.info_generation;
        self.state.loading = true;
        self.state.error = None;
        self.state.result = None;
        self.pending_thumbnail = None;

        let api = self.api.clone();
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            match api.fetch_info(&url).await {
                Ok(info) => {
                    // Show the text right away; the thumbnail follows when decoded
                    let thumbnail_url = info.thumbnail.clone();
                    sink.send(ControllerEvent::InfoLoaded { generation, info });
                    if let Some(thumbnail_url) = thumbnail_url {
                        // The thumbnail fetch uses the blocking client
                        let image = tokio::task::spawn_blocking(move || {
                            thumbnail::fetch_thumbnail(&thumbnail_url)
                        })
                        .await;
                        if let Ok(Some(image)) = image {
                            sink.send(ControllerEvent::ThumbnailLoaded { generation, image });
                        }
                    }
                }
                Err(e) => sink.send(ControllerEvent::InfoFailed {
                    generation,
                    message: e.to_string(),
                }),
            }
        });
        true
    }

    /// Starts downloading the entered URL in the selected format. Returns
    /// false, touching nothing, when the URL is blank or a download runs.
    pub fn download_video(&mut self) -> bool {
        let url = self.state.url_input.trim().to_string();
        if url.is_empty() || self.state.download.in_progress {
            return false;
        }

        let request = DownloadRequest {
            url,
            format: self.state.format,
            quality: self.state.quality.clone(),
        };

        // Lock the trigger and open the status area on the first stage
        self.download_generation += 1;
        let download = &mut self.state.download;
        download.in_progress = true;
        download.button_opacity = BUSY_OPACITY;
        download.status_visible = true;
        download.progress = 0.0;
        download.show_stage(STAGES[0]);
        self.state.error = None;

        let sink = self.sink.clone().for_download(self.download_generation);
        self.runtime.spawn(orchestrator::run(
            self.api.clone(),
            request,
            self.state.download_dir.clone(),
            sink,
        ));
        true
    }

    /// Applies every event reported since the last frame
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::InfoLoaded { generation, info } if generation == self.info_generation => {
                self.state.loading = false;
                self.state.result = Some(info);
            }
            ControllerEvent::InfoFailed { generation, message } if generation == self.info_generation => {
                self.state.loading = false;
                self.state.error = Some(message);
            }
            ControllerEvent::ThumbnailLoaded { generation, image } if generation == self.info_generation => {
                self.pending_thumbnail = Some(image);
            }
            ControllerEvent::Download { generation, update } if generation == self.download_generation => {
                self.apply_download(update);
            }
            _ => debug!("dropping event from superseded request"),
        }
    }

    fn apply_download(&mut self, update: DownloadUpdate) {
        let download = &mut self.state.download;
        match update {
            // Timer ticks only count while the download is still running
            DownloadUpdate::Stage(i) if download.in_progress => {
                if let Some(stage) = STAGES.get(i) {
                    download.show_stage(*stage);
                }
            }
            DownloadUpdate::Percent(p) if download.in_progress => {
                // The bar never moves backwards
                download.progress = download.progress.max(p.min(100.0));
            }
            DownloadUpdate::Received => {
                download.progress = 100.0;
                download.show_stage(COMPLETE);
            }
            DownloadUpdate::Saved(path) => {
                download.last_saved = Some(path);
                download.settle();
            }
            // Failure keeps the status area up so the bar reset is visible
            DownloadUpdate::Failed(message) => {
                download.progress = 0.0;
                download.settle();
                self.state.error = Some(format!("{DOWNLOAD_ERROR_PREFIX}{message}"));
            }
            DownloadUpdate::StatusExpired => {
                download.status_visible = false;
                download.progress = 0.0;
            }
            // Late ticks after settling
            DownloadUpdate::Stage(_) | DownloadUpdate::Percent(_) => {}
        }
    }
}
