//! `YouTube` video reference resolution.
//!
//! Turns whatever the user pasted into a video identifier, then asks the
//! YouTube Data API for the title, thumbnail and duration of that video.
//!
//! Extraction never fails loudly: [`extract_video_id`] returns `None` and the
//! caller decides how to tell the user. Fetching goes through the
//! [`VideoCatalog`] trait so the view can be tested without the network.
//! There is no caching and no retry; every call is one request.
//!
//! ```rust
//! use lyra_core::youtube::{extract_video_id, parse_duration};
//!
//! assert_eq!(
//!     extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
//!     Some("dQw4w9WgXcQ".to_string())
//! );
//! assert_eq!(parse_duration("PT1H2M3S"), 3723);
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::playlist::Track;

/// Length of a YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Default base endpoint of the YouTube Data API.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Resource parts requested for each video.
const VIDEO_PARTS: &str = "snippet,contentDetails";

static VIDEO_ID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^.*((youtu\.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*").ok()
});

static DURATION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").ok());

/// Descriptive metadata for a single video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Video identifier.
    pub id: String,
    /// Video title.
    pub title: String,
    /// Thumbnail URL.
    pub thumbnail_url: String,
    /// Duration in whole seconds.
    pub duration: u64,
}

impl VideoMetadata {
    /// Build the playlist track for this video.
    #[must_use]
    pub fn into_track(self) -> Track {
        Track::new(self.id, self.title, self.thumbnail_url, self.duration)
    }
}

/// Shape of a recognized video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VideoUrlType {
    /// `youtube.com/watch?v=...`
    Watch,
    /// `youtu.be/...`
    ShortUrl,
    /// Legacy `youtube.com/v/...`
    Legacy,
    /// `youtube.com/embed/...`
    Embed,
    /// Channel-page link `youtube.com/user/.../u/<n>/...`
    UserChannel,
    /// Nothing recognizable.
    #[default]
    Invalid,
}

/// Result of validating a pasted video URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUrlValidation {
    /// Whether a video id was found.
    pub is_valid: bool,
    /// The extracted video id (if valid).
    pub video_id: Option<String>,
    /// Canonical watch URL (if valid).
    pub normalized_url: Option<String>,
    /// Why validation failed.
    pub error_message: Option<String>,
    /// Which URL shape matched.
    pub url_type: VideoUrlType,
}

impl VideoUrlValidation {
    fn valid(video_id: String, url_type: VideoUrlType) -> Self {
        Self {
            normalized_url: Some(format!("https://www.youtube.com/watch?v={video_id}")),
            is_valid: true,
            video_id: Some(video_id),
            error_message: None,
            url_type,
        }
    }

    fn invalid(error_message: impl Into<String>, url_type: VideoUrlType) -> Self {
        Self {
            is_valid: false,
            video_id: None,
            normalized_url: None,
            error_message: Some(error_message.into()),
            url_type,
        }
    }
}

/// Validate a pasted URL and extract its video identifier.
///
/// Supports `watch?v=`, `youtu.be/`, `/v/`, `/embed/` and `/u/<n>/` links.
/// The token after the matched prefix must be exactly eleven characters.
#[must_use]
pub fn validate_video_url(url: &str) -> VideoUrlValidation {
    let Some(re) = VIDEO_ID_RE.as_ref() else {
        return VideoUrlValidation::invalid("URL pattern unavailable", VideoUrlType::Invalid);
    };

    let Some(caps) = re.captures(url) else {
        return VideoUrlValidation::invalid(
            "URL does not reference a YouTube video",
            VideoUrlType::Invalid,
        );
    };

    let url_type = if caps.get(2).is_some() {
        VideoUrlType::ShortUrl
    } else if caps.get(3).is_some() {
        VideoUrlType::Legacy
    } else if caps.get(4).is_some() {
        VideoUrlType::UserChannel
    } else if caps.get(5).is_some() {
        VideoUrlType::Embed
    } else {
        VideoUrlType::Watch
    };

    let token = caps.get(7).map_or("", |m| m.as_str());
    if token.chars().count() == VIDEO_ID_LEN {
        VideoUrlValidation::valid(token.to_string(), url_type)
    } else {
        VideoUrlValidation::invalid(
            format!("Video id must be {VIDEO_ID_LEN} characters, found '{token}'"),
            url_type,
        )
    }
}

/// Extract the 11-character video identifier from a URL.
///
/// Returns `None` when nothing matches or the matched token has the wrong
/// length. This is not an error: callers should show an "invalid URL" message.
#[must_use]
pub fn extract_video_id(url: &str) -> Option<String> {
    validate_video_url(url).video_id
}

/// Parse an ISO-8601 style `PT#H#M#S` duration into whole seconds.
///
/// Every component is optional and defaults to zero. A token without any
/// recognizable component yields zero.
#[must_use]
pub fn parse_duration(token: &str) -> u64 {
    let Some(caps) = DURATION_RE.as_ref().and_then(|re| re.captures(token)) else {
        return 0;
    };

    let component = |index: usize| -> u64 {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    component(1)
        .saturating_mul(3600)
        .saturating_add(component(2).saturating_mul(60))
        .saturating_add(component(3))
}

/// Default-quality thumbnail URL for a video.
///
/// Used when the catalog response carries no thumbnail.
#[must_use]
pub fn youtube_thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/default.jpg")
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Option<Vec<VideoItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: Snippet,
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

/// Parse a `videos.list` response body into metadata for `video_id`.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when `items` is absent or empty and
/// [`Error::Network`] when the body is not the expected JSON.
pub fn parse_video_response(video_id: &str, body: &str) -> Result<VideoMetadata> {
    let response: VideoListResponse = serde_json::from_str(body)
        .map_err(|e| Error::network_error(format!("Malformed catalog response: {e}")))?;

    let Some(item) = response.items.and_then(|items| items.into_iter().next()) else {
        return Err(Error::NotFound {
            video_id: video_id.to_string(),
        });
    };

    let thumbnail_url = item.snippet.thumbnails.default.map_or_else(
        || {
            warn!("No default thumbnail for {}, using fallback", video_id);
            youtube_thumbnail_url(video_id)
        },
        |t| t.url,
    );

    Ok(VideoMetadata {
        id: video_id.to_string(),
        title: item.snippet.title,
        thumbnail_url,
        duration: parse_duration(&item.content_details.duration),
    })
}

/// Source of video metadata, keyed by video identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Fetch title, thumbnail and duration for a video.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the catalog has no such video, or
    /// [`Error::Network`] on transport or parse failure.
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata>;
}

/// [`VideoCatalog`] backed by the YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YouTubeDataApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeDataApi {
    /// Create a client against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(&CatalogConfig {
            api_key: Some(api_key.into()),
            ..CatalogConfig::default()
        })
    }

    /// Create a client from catalog configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no API key is configured, or a
    /// network error if the HTTP client cannot be built.
    pub fn with_config(config: &CatalogConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("YouTube API key is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::network_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// The `videos` endpoint this client queries.
    #[must_use]
    pub fn videos_endpoint(&self) -> String {
        format!("{}/videos", self.base_url)
    }
}

#[async_trait]
impl VideoCatalog for YouTubeDataApi {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        debug!("Fetching metadata for video {}", video_id);

        let response = self
            .client
            .get(self.videos_endpoint())
            .query(&[
                ("part", VIDEO_PARTS),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::network_error(format!("Failed to reach catalog: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network_error(format!(
                "Catalog returned HTTP {status} for {video_id}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network_error(format!("Failed to read catalog response: {e}")))?;

        let metadata = parse_video_response(video_id, &body)?;
        info!(
            "Resolved video {} ({}, {}s)",
            metadata.id, metadata.title, metadata.duration
        );
        Ok(metadata)
    }
}

/// Resolve a pasted URL into a playlist track.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] without touching the catalog when no video id
/// can be extracted; otherwise whatever the catalog returns.
pub async fn resolve_track<C>(catalog: &C, url: &str) -> Result<Track>
where
    C: VideoCatalog + ?Sized,
{
    let video_id = extract_video_id(url).ok_or_else(|| Error::InvalidUrl {
        url: url.to_string(),
    })?;
    let metadata = catalog.fetch_metadata(&video_id).await?;
    Ok(metadata.into_track())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod extract_video_id_tests {
        use super::*;

        #[test]
        fn test_watch_url() {
            assert_eq!(
                extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_watch_url_with_extra_params() {
            assert_eq!(
                extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_short_url() {
            assert_eq!(
                extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_short_url_with_query() {
            assert_eq!(
                extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abcdef"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_legacy_v_url() {
            assert_eq!(
                extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_embed_url() {
            assert_eq!(
                extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_user_channel_url() {
            assert_eq!(
                extract_video_id("https://www.youtube.com/user/someone#p/u/1/dQw4w9WgXcQ"),
                Some("dQw4w9WgXcQ".to_string())
            );
        }

        #[test]
        fn test_not_a_url() {
            assert_eq!(extract_video_id("not a url"), None);
        }

        #[test]
        fn test_empty_string() {
            assert_eq!(extract_video_id(""), None);
        }

        #[test]
        fn test_wrong_length_token() {
            assert_eq!(extract_video_id("https://youtu.be/short"), None);
            assert_eq!(
                extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQX"),
                None
            );
        }
    }

    mod validate_video_url_tests {
        use super::*;

        #[test]
        fn test_detects_url_types() {
            let cases = [
                ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", VideoUrlType::Watch),
                ("https://youtu.be/dQw4w9WgXcQ", VideoUrlType::ShortUrl),
                ("https://www.youtube.com/v/dQw4w9WgXcQ", VideoUrlType::Legacy),
                ("https://www.youtube.com/embed/dQw4w9WgXcQ", VideoUrlType::Embed),
            ];
            for (url, expected) in cases {
                let result = validate_video_url(url);
                assert!(result.is_valid, "{url} should be valid");
                assert_eq!(result.url_type, expected, "{url}");
            }
        }

        #[test]
        fn test_normalized_url() {
            let result = validate_video_url("https://youtu.be/dQw4w9WgXcQ");
            assert_eq!(
                result.normalized_url,
                Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
            );
            assert!(result.error_message.is_none());
        }

        #[test]
        fn test_invalid_has_message() {
            let result = validate_video_url("https://example.com");
            assert!(!result.is_valid);
            assert!(result.error_message.is_some());
            assert_eq!(result.url_type, VideoUrlType::Invalid);
        }
    }

    mod parse_duration_tests {
        use super::*;

        #[test]
        fn test_full_duration() {
            assert_eq!(parse_duration("PT1H2M3S"), 3723);
        }

        #[test]
        fn test_minutes_only() {
            assert_eq!(parse_duration("PT5M"), 300);
        }

        #[test]
        fn test_empty_components() {
            assert_eq!(parse_duration("PT"), 0);
        }

        #[test]
        fn test_seconds_only() {
            assert_eq!(parse_duration("PT45S"), 45);
        }

        #[test]
        fn test_hours_and_seconds() {
            assert_eq!(parse_duration("PT2H5S"), 7205);
        }

        #[test]
        fn test_unrecognized_token() {
            assert_eq!(parse_duration("garbage"), 0);
            assert_eq!(parse_duration(""), 0);
        }
    }

    mod parse_video_response_tests {
        use super::*;

        const BODY: &str = r#"{
            "items": [{
                "snippet": {
                    "title": "Never Gonna Give You Up",
                    "thumbnails": { "default": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg" } }
                },
                "contentDetails": { "duration": "PT3M33S" }
            }]
        }"#;

        #[test]
        fn test_parses_item() {
            let metadata = parse_video_response("dQw4w9WgXcQ", BODY).unwrap();
            assert_eq!(metadata.id, "dQw4w9WgXcQ");
            assert_eq!(metadata.title, "Never Gonna Give You Up");
            assert_eq!(
                metadata.thumbnail_url,
                "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"
            );
            assert_eq!(metadata.duration, 213);
        }

        #[test]
        fn test_empty_items_is_not_found() {
            let err = parse_video_response("dQw4w9WgXcQ", r#"{"items": []}"#).unwrap_err();
            assert!(matches!(err, Error::NotFound { ref video_id } if video_id == "dQw4w9WgXcQ"));
        }

        #[test]
        fn test_missing_items_is_not_found() {
            let err = parse_video_response("dQw4w9WgXcQ", r#"{"kind": "youtube#videoListResponse"}"#)
                .unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
        }

        #[test]
        fn test_malformed_body_is_network_error() {
            let err = parse_video_response("dQw4w9WgXcQ", "<html>").unwrap_err();
            assert!(matches!(err, Error::Network { .. }));
        }

        #[test]
        fn test_item_without_content_details_is_network_error() {
            let body = r#"{"items": [{"snippet": {"title": "x"}}]}"#;
            let err = parse_video_response("dQw4w9WgXcQ", body).unwrap_err();
            assert!(matches!(err, Error::Network { .. }));
        }

        #[test]
        fn test_missing_thumbnail_falls_back() {
            let body = r#"{"items": [{"snippet": {"title": "x"}, "contentDetails": {"duration": "PT1S"}}]}"#;
            let metadata = parse_video_response("dQw4w9WgXcQ", body).unwrap();
            assert_eq!(
                metadata.thumbnail_url,
                "https://img.youtube.com/vi/dQw4w9WgXcQ/default.jpg"
            );
        }
    }

    #[test]
    fn test_data_api_requires_key() {
        let err = YouTubeDataApi::with_config(&CatalogConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_data_api_endpoint_trims_slash() {
        let config = CatalogConfig {
            base_url: "http://localhost:9999/youtube/v3/".to_string(),
            api_key: Some("key".to_string()),
            ..CatalogConfig::default()
        };
        let api = YouTubeDataApi::with_config(&config).unwrap();
        assert_eq!(api.videos_endpoint(), "http://localhost:9999/youtube/v3/videos");
    }

    #[tokio::test]
    async fn test_resolve_track_invalid_url_skips_catalog() {
        let mut catalog = MockVideoCatalog::new();
        catalog.expect_fetch_metadata().never();

        let err = resolve_track(&catalog, "not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_resolve_track_builds_track() {
        let mut catalog = MockVideoCatalog::new();
        catalog
            .expect_fetch_metadata()
            .withf(|id| id == "dQw4w9WgXcQ")
            .times(1)
            .returning(|id| {
                Ok(VideoMetadata {
                    id: id.to_string(),
                    title: "Song".to_string(),
                    thumbnail_url: "https://thumb".to_string(),
                    duration: 200,
                })
            });

        let track = resolve_track(&catalog, "https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(track.id, "dQw4w9WgXcQ");
        assert_eq!(track.title, "Song");
        assert_eq!(track.duration, 200);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_network_error() {
        let config = CatalogConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: Some("key".to_string()),
            request_timeout_secs: 2,
        };
        let api = YouTubeDataApi::with_config(&config).unwrap();
        let err = api.fetch_metadata("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }
}
