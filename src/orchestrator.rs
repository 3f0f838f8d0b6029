//! Runs one download from request to saved file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::api::{ApiClient, PendingFile};
use crate::controller::{DownloadSink, DownloadUpdate};
use crate::error::Result;
use crate::filename;
use crate::model::DownloadRequest;
use crate::progress::{SimulatedProgress, Tick, byte_percent};

/// How long the finished status stays on screen
pub const STATUS_LINGER: Duration = Duration::from_millis(2000);

pub async fn run(api: ApiClient, request: DownloadRequest, download_dir: PathBuf, sink: DownloadSink) {
    let ticker_sink = sink.clone();
    let ticker = SimulatedProgress::start(move |tick| {
        ticker_sink.emit(match tick {
            Tick::Stage(i) => DownloadUpdate::Stage(i),
            Tick::Percent(p) => DownloadUpdate::Percent(p),
        })
    });

    let response = api.request_download(&request).await;
    ticker.stop().await;

    match receive(response, &request, &download_dir, &sink).await {
        Ok(path) => {
            sink.emit(DownloadUpdate::Saved(path));
            tokio::time::sleep(STATUS_LINGER).await;
            sink.emit(DownloadUpdate::StatusExpired);
        }
        Err(e) => {
            warn!(url = %request.url, status = ?e.status(), "download failed: {e}");
            sink.emit(DownloadUpdate::Failed(e.to_string()));
        }
    }
}

async fn receive(
    response: Result<PendingFile>,
    request: &DownloadRequest,
    download_dir: &Path,
    sink: &DownloadSink,
) -> Result<PathBuf> {
    let pending = response?;
    let total = pending.content_length;
    let name = filename::resolve(pending.content_disposition.as_deref(), request.format);

    tokio::fs::create_dir_all(download_dir).await?;
    let (path, mut file) = filename::create_unique(download_dir, &name).await?;

    let written = pending
        .write_to(&mut file, |received| {
            if let Some(p) = byte_percent(received, total) {
                sink.emit(DownloadUpdate::Percent(p));
            }
        })
        .await;
    drop(file);

    match written {
        Ok(bytes) => {
            sink.emit(DownloadUpdate::Received);
            info!(path = %path.display(), bytes, "saved download");
            Ok(path)
        }
        Err(e) => {
            // Half a file is worse than none
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), "could not remove partial file: {rm}");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server;
    use crate::controller::{ControllerEvent, EventSink};
    use crate::model::OutputFormat;
    use crate::progress::SIMULATED_CAP;
    use tokio::sync::mpsc::unbounded_channel;

    async fn run_collect(url: &str, format: OutputFormat) -> (Vec<DownloadUpdate>, tempfile::TempDir) {
        let (base, _) = test_server::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = unbounded_channel();
        let sink = EventSink::new(tx).for_download(7);
        run(
            ApiClient::new(base),
            DownloadRequest {
                url: url.into(),
                format,
                quality: "720p".into(),
            },
            dir.path().to_path_buf(),
            sink,
        )
        .await;

        let mut updates = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                ControllerEvent::Download { generation, update } => {
                    assert_eq!(generation, 7);
                    updates.push(update);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        (updates, dir)
    }

    #[tokio::test]
    async fn named_file_is_saved_under_header_name() {
        let (updates, dir) = run_collect("https://video.test/named", OutputFormat::Video).await;
        let saved = dir.path().join("clip.mp4");
        assert!(updates.contains(&DownloadUpdate::Saved(saved.clone())));
        assert_eq!(std::fs::read(saved).unwrap(), b"named-bytes");
        assert_eq!(updates.last(), Some(&DownloadUpdate::StatusExpired));
    }

    #[tokio::test]
    async fn anonymous_audio_gets_default_name() {
        let (updates, dir) = run_collect("https://video.test/anonymous", OutputFormat::Audio).await;
        let saved = dir.path().join("download.mp3");
        assert!(updates.contains(&DownloadUpdate::Saved(saved.clone())));
        assert_eq!(std::fs::read(saved).unwrap(), b"audio");
    }

    #[tokio::test]
    async fn server_error_is_reported_once() {
        let (updates, dir) = run_collect("https://video.test/gone", OutputFormat::Video).await;
        assert_eq!(
            updates.last(),
            Some(&DownloadUpdate::Failed("Video unavailable".into()))
        );
        assert!(!updates.iter().any(|u| matches!(u, DownloadUpdate::Saved(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn slow_server_sees_simulated_ticks_only_before_settling() {
        let (updates, _dir) = run_collect("https://video.test/slow", OutputFormat::Video).await;
        let received = updates
            .iter()
            .position(|u| *u == DownloadUpdate::Received)
            .unwrap();
        let simulated: Vec<f32> = updates[..received]
            .iter()
            .filter_map(|u| match u {
                DownloadUpdate::Percent(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(!simulated.is_empty());
        assert!(simulated.iter().any(|p| *p <= SIMULATED_CAP));
        assert!(!updates[received..].iter().any(|u| matches!(
            u,
            DownloadUpdate::Stage(_) | DownloadUpdate::Percent(_)
        )));
    }

    #[tokio::test]
    async fn existing_files_are_kept() {
        let (base, _) = test_server::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"old").unwrap();
        let (tx, _rx) = unbounded_channel();
        run(
            ApiClient::new(base),
            DownloadRequest {
                url: "https://video.test/named".into(),
                format: OutputFormat::Video,
                quality: "best".into(),
            },
            dir.path().to_path_buf(),
            EventSink::new(tx).for_download(1),
        )
        .await;
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"old");
        assert_eq!(std::fs::read(dir.path().join("clip (1).mp4")).unwrap(), b"named-bytes");
    }

    #[tokio::test]
    async fn truncated_huge_body_fails_and_leaves_no_file() {
        let base = test_server::spawn_raw(concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Length: 1099511627776\r\n",
            "Content-Disposition: attachment; filename=\"huge.mp4\"\r\n",
            "Connection: close\r\n\r\n",
            "abc",
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = unbounded_channel();
        run(
            ApiClient::new(base),
            DownloadRequest {
                url: "https://video.test/huge".into(),
                format: OutputFormat::Video,
                quality: "best".into(),
            },
            dir.path().to_path_buf(),
            EventSink::new(tx).for_download(1),
        )
        .await;

        let mut last = None;
        while let Ok(ControllerEvent::Download { update, .. }) = rx.try_recv() {
            last = Some(update);
        }
        assert!(matches!(last, Some(DownloadUpdate::Failed(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
