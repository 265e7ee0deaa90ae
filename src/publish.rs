//! Publishing stage: post the artifact to each configured platform.
//!
//! Both clients follow the same two-step contract: upload the media and
//! get back an opaque handle, then create a status/post referencing that
//! handle plus the caption text. Platforms are attempted independently —
//! one failing (bad token, instance down) never stops the other, and
//! neither stops the run from reaching cleanup. [`publish_all`] returns
//! the per-platform outcomes instead of an error for exactly that reason.

use crate::config::{BlueskyConfig, MastodonConfig};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{platform} rejected the request: {detail}")]
    Api {
        platform: &'static str,
        detail: String,
    },
}

/// Platform-specific post identifier (status id, record URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId(pub String);

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A social platform that can carry one media artifact plus text.
pub trait Platform {
    fn name(&self) -> &'static str;

    /// Upload the artifact and create the post. Returns the platform's
    /// post identifier.
    fn publish(&self, artifact: &Path, text: &str) -> Result<PostId, PublishError>;
}

/// Outcome of one platform's attempt.
pub struct PlatformOutcome {
    pub platform: &'static str,
    pub result: Result<PostId, PublishError>,
}

/// Attempt every platform, tolerating individual failures.
pub fn publish_all(
    platforms: &[Box<dyn Platform>],
    artifact: &Path,
    text: &str,
) -> Vec<PlatformOutcome> {
    platforms
        .iter()
        .map(|platform| {
            let result = platform.publish(artifact, text);
            match &result {
                Ok(id) => info!(platform = platform.name(), post = %id, "published"),
                Err(error) => {
                    warn!(platform = platform.name(), %error, "publish failed, continuing")
                }
            }
            PlatformOutcome {
                platform: platform.name(),
                result,
            }
        })
        .collect()
}

fn check_api(
    platform: &'static str,
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, PublishError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().unwrap_or_default();
    Err(PublishError::Api {
        platform,
        detail: format!("{status}: {body}"),
    })
}

#[derive(Debug, Deserialize)]
struct MastodonMedia {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MastodonStatus {
    id: String,
}

/// Mastodon client: media upload then status post.
pub struct MastodonClient {
    client: reqwest::blocking::Client,
    base_url: String,
    access_token: String,
    sensitive: bool,
}

impl MastodonClient {
    pub fn new(config: &MastodonConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            sensitive: config.sensitive,
        }
    }
}

impl Platform for MastodonClient {
    fn name(&self) -> &'static str {
        "mastodon"
    }

    fn publish(&self, artifact: &Path, text: &str) -> Result<PostId, PublishError> {
        let bytes = std::fs::read(artifact)?;
        let part = reqwest::blocking::multipart::Part::bytes(bytes)
            .file_name("loop.gif")
            .mime_str("image/gif")?;
        let form = reqwest::blocking::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/v1/media", self.base_url))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()?;
        let media: MastodonMedia = check_api(self.name(), response)?.json()?;

        let response = self
            .client
            .post(format!("{}/api/v1/statuses", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "status": text,
                "media_ids": [media.id],
                "sensitive": self.sensitive,
            }))
            .send()?;
        let status: MastodonStatus = check_api(self.name(), response)?.json()?;
        Ok(PostId(status.id))
    }
}

#[derive(Debug, Deserialize)]
struct BlueskySession {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct BlueskyBlob {
    blob: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BlueskyRecord {
    uri: String,
}

/// Bluesky client: session, blob upload, then post record.
pub struct BlueskyClient {
    client: reqwest::blocking::Client,
    service: String,
    identifier: String,
    app_password: String,
    sensitive: bool,
}

impl BlueskyClient {
    pub fn new(config: &BlueskyConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            service: config.service.trim_end_matches('/').to_string(),
            identifier: config.identifier.clone(),
            app_password: config.app_password.clone(),
            sensitive: config.sensitive,
        }
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service, method)
    }
}

/// The `app.bsky.feed.post` record body. Pure so tests can check the
/// shape without a network.
fn bluesky_record(
    text: &str,
    blob: serde_json::Value,
    created_at: &str,
    sensitive: bool,
) -> serde_json::Value {
    let mut record = json!({
        "$type": "app.bsky.feed.post",
        "text": text,
        "createdAt": created_at,
        "embed": {
            "$type": "app.bsky.embed.images",
            "images": [{"image": blob, "alt": text}],
        },
    });
    if sensitive {
        record["labels"] = json!({
            "$type": "com.atproto.label.defs#selfLabels",
            "values": [{"val": "graphic-media"}],
        });
    }
    record
}

impl Platform for BlueskyClient {
    fn name(&self) -> &'static str {
        "bluesky"
    }

    fn publish(&self, artifact: &Path, text: &str) -> Result<PostId, PublishError> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": self.identifier,
                "password": self.app_password,
            }))
            .send()?;
        let session: BlueskySession = check_api(self.name(), response)?.json()?;

        let bytes = std::fs::read(artifact)?;
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header("Content-Type", "image/gif")
            .body(bytes)
            .send()?;
        let upload: BlueskyBlob = check_api(self.name(), response)?.json()?;

        let created_at =
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let record = bluesky_record(text, upload.blob, &created_at, self.sensitive);
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()?;
        let created: BlueskyRecord = check_api(self.name(), response)?.json()?;
        Ok(PostId(created.uri))
    }
}
