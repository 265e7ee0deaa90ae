//! Image source adapter: photo search, download, and the retry loop.
//!
//! One run needs exactly one photograph. Getting it is unreliable in
//! several independent ways — the search service errors, a page comes back
//! empty, the chosen candidate's tags hit the blocklist, or the image is
//! too small to crop. All of these are handled identically: throw the
//! candidate away and draw a completely fresh one (new keyword, new page,
//! new pick). A failed attempt has no side effects, so retrying is safe
//! and, by default, unbounded.
//!
//! The HTTP specifics live in [`FlickrService`]; the retry policy lives in
//! [`acquire`], which is generic over [`PhotoService`] so tests can script
//! failure sequences.

use crate::config::{PhotosConfig, RetryConfig};
use crate::params::ParamSource;
use image::DynamicImage;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("word list {0} is empty")]
    EmptyWordList(PathBuf),
    #[error("search returned no usable candidates")]
    NoResults,
    #[error("candidate rejected: tag '{0}' is blocklisted")]
    Blocklisted(String),
    #[error("candidate too small: {width}x{height}, need at least {min}x{min}")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("gave up fetching a source image after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// A search hit: downloadable URL plus the service's tags for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCandidate {
    pub url: String,
    pub tags: Vec<String>,
}

/// The photograph a run works on.
#[derive(Debug)]
pub struct SourceImage {
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Tags of the selected candidate, kept for the run report.
    pub tags: Vec<String>,
    /// Raw downloaded bytes, persisted into the workspace for diagnostics.
    pub bytes: Vec<u8>,
}

/// Photo search service seam.
pub trait PhotoService {
    /// Search for candidates matching `text` on the given result page.
    fn search(&self, text: &str, page: u32) -> Result<Vec<PhotoCandidate>, SourceError>;

    /// Download the raw bytes behind a candidate URL.
    fn download(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Flickr-style REST search client.
pub struct FlickrService {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    tags: String,
    per_page: u32,
}

impl FlickrService {
    pub fn new(config: &PhotosConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            tags: config.tags.join(","),
            per_page: config.per_page,
        }
    }
}

impl PhotoService for FlickrService {
    fn search(&self, text: &str, page: u32) -> Result<Vec<PhotoCandidate>, SourceError> {
        let query = [
            ("method", "flickr.photos.search".to_string()),
            ("api_key", self.api_key.clone()),
            ("text", text.to_string()),
            ("tags", self.tags.clone()),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
            ("extras", "url_l,tags".to_string()),
            ("safe_search", "2".to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ];
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()?
            .error_for_status()?;
        let body: SearchResponse = response.json()?;
        Ok(candidates_from(body))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: PhotoPage,
}

#[derive(Debug, Deserialize)]
struct PhotoPage {
    photo: Vec<PhotoEntry>,
}

#[derive(Debug, Deserialize)]
struct PhotoEntry {
    /// Large-size URL; absent when the owner restricts downloads.
    #[serde(default)]
    url_l: Option<String>,
    /// Space-separated tag string.
    #[serde(default)]
    tags: String,
}

/// Entries without a downloadable URL are dropped here rather than
/// surfacing as download failures later.
fn candidates_from(response: SearchResponse) -> Vec<PhotoCandidate> {
    response
        .photos
        .photo
        .into_iter()
        .filter_map(|entry| {
            let url = entry.url_l?;
            let tags = entry
                .tags
                .split_whitespace()
                .map(str::to_string)
                .collect();
            Some(PhotoCandidate { url, tags })
        })
        .collect()
}

/// First blocklist term any candidate tag matches, if any.
fn blocklisted_tag(tags: &[String], blocklist: &[String]) -> Option<String> {
    for tag in tags {
        let tag_lower = tag.to_lowercase();
        for term in blocklist {
            if tag_lower.contains(&term.to_lowercase()) {
                return Some(tag.clone());
            }
        }
    }
    None
}

/// Acquire one usable source image, retrying per the configured policy.
///
/// Every attempt draws a fresh keyword, page, and candidate; a rejected
/// candidate is never retried. With `source_max_attempts = 0` this loops
/// until it succeeds.
pub fn acquire(
    service: &impl PhotoService,
    params: &impl ParamSource,
    config: &PhotosConfig,
    retry: &RetryConfig,
    min_size: u32,
) -> Result<SourceImage, SourceError> {
    let words = load_words(&config.wordlist)?;

    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match fetch_once(service, params, config, &words, min_size) {
            Ok(source) => {
                info!(attempts, tags = source.tags.len(), "source image acquired");
                return Ok(source);
            }
            Err(reason) => {
                debug!(attempt = attempts, %reason, "source fetch failed, retrying");
                if retry.source_exhausted(attempts) {
                    return Err(SourceError::RetriesExhausted { attempts });
                }
            }
        }
    }
}

/// One complete attempt: search, select, filter, download, decode, check.
fn fetch_once(
    service: &impl PhotoService,
    params: &impl ParamSource,
    config: &PhotosConfig,
    words: &[String],
    min_size: u32,
) -> Result<SourceImage, SourceError> {
    let word = &words[params.index(words.len())];
    let page = 1 + params.index(config.max_pages as usize) as u32;

    let candidates = service.search(word, page)?;
    if candidates.is_empty() {
        return Err(SourceError::NoResults);
    }
    let candidate = &candidates[params.index(candidates.len())];

    if let Some(tag) = blocklisted_tag(&candidate.tags, &config.blocklist) {
        return Err(SourceError::Blocklisted(tag));
    }

    let bytes = service.download(&candidate.url)?;
    let image = image::load_from_memory(&bytes)?;

    // Undersized images cannot hold the crop window; reject like any
    // other bad candidate so the loop draws a fresh one.
    if image.width() < min_size || image.height() < min_size {
        return Err(SourceError::TooSmall {
            width: image.width(),
            height: image.height(),
            min: min_size,
        });
    }

    Ok(SourceImage {
        image,
        tags: candidate.tags.clone(),
        bytes,
    })
}

fn load_words(path: &Path) -> Result<Vec<String>, SourceError> {
    let content = std::fs::read_to_string(path)?;
    let words: Vec<String> = content.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return Err(SourceError::EmptyWordList(path.to_path_buf()));
    }
    Ok(words)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::params::tests::ScriptedParams;
    use std::sync::Mutex;

    /// Scripted photo service: search results pop front per call, downloads
    /// always return the configured bytes.
    #[derive(Default)]
    pub struct ScriptedPhotoService {
        pub searches: Mutex<Vec<Result<Vec<PhotoCandidate>, SourceError>>>,
        pub search_calls: Mutex<u32>,
        pub image_bytes: Vec<u8>,
    }

    impl ScriptedPhotoService {
        pub fn new(
            searches: Vec<Result<Vec<PhotoCandidate>, SourceError>>,
            image_bytes: Vec<u8>,
        ) -> Self {
            Self {
                searches: Mutex::new(searches),
                search_calls: Mutex::new(0),
                image_bytes,
            }
        }

        pub fn calls(&self) -> u32 {
            *self.search_calls.lock().unwrap()
        }
    }

    impl PhotoService for ScriptedPhotoService {
        fn search(&self, _text: &str, _page: u32) -> Result<Vec<PhotoCandidate>, SourceError> {
            *self.search_calls.lock().unwrap() += 1;
            let mut searches = self.searches.lock().unwrap();
            if searches.is_empty() {
                return Ok(Vec::new());
            }
            searches.remove(0)
        }

        fn download(&self, _url: &str) -> Result<Vec<u8>, SourceError> {
            Ok(self.image_bytes.clone())
        }
    }

    /// Encode a solid PNG of the given size for download mocking.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([40, 40, 60]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn test_config(tmp: &tempfile::TempDir) -> PhotosConfig {
        let wordlist = tmp.path().join("words.txt");
        std::fs::write(&wordlist, "neon circuit static").unwrap();
        PhotosConfig {
            api_key: "test".into(),
            wordlist,
            ..PhotosConfig::default()
        }
    }

    fn candidate(url: &str, tags: &[&str]) -> PhotoCandidate {
        PhotoCandidate {
            url: url.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn acquire_succeeds_on_kth_attempt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        // Two empty pages, then a hit: exactly three attempts, no more.
        let service = ScriptedPhotoService::new(
            vec![
                Ok(Vec::new()),
                Ok(Vec::new()),
                Ok(vec![candidate("https://p/1.png", &["neon"])]),
            ],
            png_bytes(600, 600),
        );
        let params = ScriptedParams::new();
        let retry = RetryConfig::default();

        let source = acquire(&service, &params, &config, &retry, 500).unwrap();
        assert_eq!(service.calls(), 3);
        assert_eq!(source.tags, vec!["neon"]);
        assert_eq!(source.image.width(), 600);
    }

    #[test]
    fn acquire_retries_past_search_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        let service = ScriptedPhotoService::new(
            vec![
                Err(SourceError::NoResults),
                Ok(vec![candidate("https://p/1.png", &[])]),
            ],
            png_bytes(600, 600),
        );
        let params = ScriptedParams::new();

        let source = acquire(&service, &params, &config, &RetryConfig::default(), 500).unwrap();
        assert_eq!(service.calls(), 2);
        assert!(source.tags.is_empty());
    }

    #[test]
    fn blocklisted_candidate_is_refetched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        let service = ScriptedPhotoService::new(
            vec![
                Ok(vec![candidate("https://p/1.png", &["streetfood", "neon"])]),
                Ok(vec![candidate("https://p/2.png", &["neon"])]),
            ],
            png_bytes(600, 600),
        );
        let params = ScriptedParams::new();

        let source = acquire(&service, &params, &config, &RetryConfig::default(), 500).unwrap();
        // First candidate's "streetfood" matches the default "food" term.
        assert_eq!(service.calls(), 2);
        assert_eq!(source.tags, vec!["neon"]);
    }

    #[test]
    fn undersized_candidate_is_refetched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        // Downloads always return a 100x100 image: too small for a 500
        // crop, so a bounded policy runs out of attempts.
        let service = ScriptedPhotoService::new(
            vec![
                Ok(vec![candidate("https://p/1.png", &["neon"])]),
                Ok(vec![candidate("https://p/2.png", &["neon"])]),
            ],
            png_bytes(100, 100),
        );
        let params = ScriptedParams::new();
        let retry = RetryConfig {
            source_max_attempts: 2,
        };

        let err = acquire(&service, &params, &config, &retry, 500).unwrap_err();
        assert!(matches!(err, SourceError::RetriesExhausted { attempts: 2 }));
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn bounded_retry_reports_exhaustion() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp);
        let service = ScriptedPhotoService::new(Vec::new(), Vec::new());
        let params = ScriptedParams::new();
        let retry = RetryConfig {
            source_max_attempts: 4,
        };

        let err = acquire(&service, &params, &config, &retry, 500).unwrap_err();
        assert!(matches!(err, SourceError::RetriesExhausted { attempts: 4 }));
        assert_eq!(service.calls(), 4);
    }

    #[test]
    fn empty_word_list_fails_before_any_fetch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let wordlist = tmp.path().join("words.txt");
        std::fs::write(&wordlist, "   \n").unwrap();
        let config = PhotosConfig {
            api_key: "test".into(),
            wordlist,
            ..PhotosConfig::default()
        };
        let service = ScriptedPhotoService::new(Vec::new(), Vec::new());
        let params = ScriptedParams::new();

        let err = acquire(&service, &params, &config, &RetryConfig::default(), 500).unwrap_err();
        assert!(matches!(err, SourceError::EmptyWordList(_)));
        assert_eq!(service.calls(), 0);
    }

    #[test]
    fn search_response_drops_entries_without_url() {
        let body: SearchResponse = serde_json::from_str(
            r#"{
                "photos": {
                    "photo": [
                        {"url_l": "https://p/1.jpg", "tags": "neon wiring"},
                        {"tags": "no url here"},
                        {"url_l": "https://p/2.jpg"}
                    ]
                }
            }"#,
        )
        .unwrap();

        let candidates = candidates_from(body);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].tags, vec!["neon", "wiring"]);
        assert!(candidates[1].tags.is_empty());
    }

    #[test]
    fn blocklist_matching_is_case_insensitive() {
        let tags = vec!["StreetFood".to_string()];
        assert_eq!(
            blocklisted_tag(&tags, &["food".to_string()]),
            Some("StreetFood".to_string())
        );
        assert_eq!(blocklisted_tag(&tags, &["noodle".to_string()]), None);
    }
}
