use serde::{Deserialize, Serialize};

/// Metadata returned by `/api/info`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoInfo {
    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Video title
    #[serde(default)]
    pub title: Option<String>,
    /// Length in seconds; missing or zero for live streams
    #[serde(default)]
    pub duration: Option<f64>,
    /// Source platform (e.g. "Youtube")
    #[serde(default)]
    pub extractor: Option<String>,
    /// Canonical page URL
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl VideoInfo {
    pub fn duration_label(&self) -> String {
        format_duration(self.duration)
    }

    pub fn platform_tag(&self) -> &str {
        self.extractor.as_deref().unwrap_or("Web")
    }
}

/// Output container requested from the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Video,
    Audio,
}

impl OutputFormat {
    /// Extension used when the server does not name the file
    pub fn default_extension(self) -> &'static str {
        match self {
            OutputFormat::Audio => "mp3",
            OutputFormat::Video => "mp4",
        }
    }
}

/// Quality ids understood by the server, with their labels
pub const QUALITY_OPTIONS: [(&str, &str); 4] = [
    ("best", "Best available"),
    ("1080p", "1080p"),
    ("720p", "720p"),
    ("480p", "480p"),
];

/// Body of `/api/download`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    pub format: OutputFormat,
    pub quality: String,
}

/// Body of `/api/info`
#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest<'a> {
    pub url: &'a str,
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Formats seconds as `m:ss`, or "Live/Unknown" when absent or zero
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s.is_finite() && s >= 1.0 => s as u64,
        _ => return "Live/Unknown".to_string(),
    };
    format!("{}:{:02}", total / 60, total % 60)
}
