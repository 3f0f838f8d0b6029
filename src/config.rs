use std::path::PathBuf;

use clap::Parser;

/// Desktop client for the video download service.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the service exposing /api/info and /api/download
    #[arg(long, env = "VDP_SERVER", default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Folder downloaded files are saved into
    #[arg(long, env = "VDP_DOWNLOAD_DIR", default_value = "./downloads")]
    pub download_dir: PathBuf,

    /// Log filter, in `RUST_LOG` syntax
    #[arg(long, env = "VDP_LOG", default_value = "info")]
    pub log_filter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "video_download_page",
            "--server",
            "http://media.local:8080/",
            "--download-dir",
            "/tmp/videos",
            "--log-filter",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.server, "http://media.local:8080/");
        assert_eq!(args.download_dir, PathBuf::from("/tmp/videos"));
        assert_eq!(args.log_filter, "debug");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["video_download_page", "--retries", "3"]).is_err());
    }
}
