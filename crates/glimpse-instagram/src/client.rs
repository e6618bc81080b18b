// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the private Instagram web API.
//!
//! Handles session-cookie login, user id resolution, the `reels_media`
//! story feed, and media downloads. The client is an explicitly constructed
//! collaborator injected into the pipeline, so tests swap in a fake.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glimpse_core::{ContentFetcher, FetchedStory, GlimpseError, MediaKind};
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::types::{LoginResponse, ProfileInfoResponse, ReelItem, ReelsMediaResponse};

const WEB_BASE_URL: &str = "https://www.instagram.com";
const API_BASE_URL: &str = "https://i.instagram.com/api/v1";

/// App id the web client sends; required by the `web_profile_info` endpoint.
const IG_APP_ID: &str = "936619743392459";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Authenticated Instagram client.
///
/// The reqwest cookie store carries the session; `login` must succeed once
/// before `fetch_stories` is useful. User ids are cached per handle for the
/// lifetime of the client.
pub struct InstagramClient {
    http: reqwest::Client,
    username: String,
    password: String,
    web_base: String,
    api_base: String,
    csrf_token: Mutex<Option<String>>,
    user_ids: Mutex<HashMap<String, String>>,
}

impl InstagramClient {
    pub fn new(username: String, password: String) -> Result<Self, GlimpseError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-ig-app-id", HeaderValue::from_static(IG_APP_ID));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GlimpseError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            username,
            password,
            web_base: WEB_BASE_URL.to_string(),
            api_base: API_BASE_URL.to_string(),
            csrf_token: Mutex::new(None),
            user_ids: Mutex::new(HashMap::new()),
        })
    }

    /// Overrides the base URLs (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_urls(mut self, web: String, api: String) -> Self {
        self.web_base = web;
        self.api_base = api;
        self
    }

    /// Establish an authenticated session.
    ///
    /// Primes the CSRF cookie from the login page, then posts the enc
    /// password form. The session cookie lands in the client's cookie store.
    pub async fn login(&self) -> Result<(), GlimpseError> {
        let login_page = format!("{}/accounts/login/", self.web_base);
        let response = self
            .http
            .get(&login_page)
            .send()
            .await
            .map_err(|e| self.auth_err("login page request failed", e))?;

        let csrf = extract_cookie(response.headers(), "csrftoken").ok_or_else(|| {
            GlimpseError::fetch(&self.username, "login page did not set a csrftoken cookie")
        })?;

        // Version 0 lets the server accept the plain password over TLS
        // without the client-side Nacl sealing the browser performs.
        let enc_password = format!(
            "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
            Utc::now().timestamp(),
            self.password
        );

        let response = self
            .http
            .post(format!("{}/accounts/login/ajax/", self.web_base))
            .header("x-csrftoken", &csrf)
            .header("referer", &login_page)
            .form(&[
                ("username", self.username.as_str()),
                ("enc_password", enc_password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.auth_err("login request failed", e))?;

        let status = response.status();
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| self.auth_err("malformed login response", e))?;

        if !body.authenticated {
            return Err(GlimpseError::fetch(
                &self.username,
                format!(
                    "authentication rejected ({status}): {}",
                    body.message.unwrap_or_else(|| "no detail".into())
                ),
            ));
        }

        *self.csrf_token.lock().await = Some(csrf);
        info!(username = %self.username, "Instagram login succeeded");
        Ok(())
    }

    /// Resolve (and cache) the numeric user id for a handle.
    async fn user_id_for(&self, handle: &str) -> Result<String, GlimpseError> {
        if let Some(id) = self.user_ids.lock().await.get(handle) {
            return Ok(id.clone());
        }

        let response = self
            .http
            .get(format!("{}/users/web_profile_info/", self.api_base))
            .query(&[("username", handle)])
            .send()
            .await
            .map_err(|e| fetch_err(handle, "profile lookup failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GlimpseError::fetch(
                handle,
                format!("profile lookup returned {status}"),
            ));
        }

        let body: ProfileInfoResponse = response
            .json()
            .await
            .map_err(|e| fetch_err(handle, "malformed profile response", e))?;
        let id = body
            .data
            .user
            .map(|u| u.id)
            .ok_or_else(|| GlimpseError::fetch(handle, "profile has no user (private or gone?)"))?;

        self.user_ids
            .lock()
            .await
            .insert(handle.to_string(), id.clone());
        Ok(id)
    }

    fn auth_err(&self, message: &str, e: reqwest::Error) -> GlimpseError {
        fetch_err(&self.username, message, e)
    }
}

#[async_trait]
impl ContentFetcher for InstagramClient {
    async fn fetch_stories(&self, handle: &str) -> Result<Vec<FetchedStory>, GlimpseError> {
        let user_id = self.user_id_for(handle).await?;

        let response = self
            .http
            .get(format!("{}/feed/reels_media/", self.api_base))
            .query(&[("reel_ids", user_id.as_str())])
            .send()
            .await
            .map_err(|e| fetch_err(handle, "reels request failed", e))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GlimpseError::fetch(
                handle,
                format!("session expired or unauthorized ({status})"),
            ));
        }
        if !status.is_success() {
            return Err(GlimpseError::fetch(
                handle,
                format!("reels request returned {status}"),
            ));
        }

        let body: ReelsMediaResponse = response
            .json()
            .await
            .map_err(|e| fetch_err(handle, "malformed reels response", e))?;

        let mut stories = Vec::new();
        for reel in body.reels_media {
            for item in reel.items {
                match to_fetched_story(handle, item) {
                    Some(story) => stories.push(story),
                    None => warn!(handle, "skipping story with unsupported shape"),
                }
            }
        }

        debug!(handle, count = stories.len(), "fetched live stories");
        Ok(stories)
    }

    async fn download(
        &self,
        handle: &str,
        story: &FetchedStory,
        dest_dir: &Path,
    ) -> Result<PathBuf, GlimpseError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| fetch_err(handle, "cannot create media dir", e))?;

        let ext = match story.kind {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        };
        let path = dest_dir.join(format!("{}.{ext}", story.remote_id));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        let response = self
            .http
            .get(&story.media_url)
            .send()
            .await
            .map_err(|e| fetch_err(handle, "media request failed", e))?;
        if !response.status().is_success() {
            return Err(GlimpseError::fetch(
                handle,
                format!("media request returned {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_err(handle, "media body read failed", e))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| fetch_err(handle, "media write failed", e))?;

        debug!(handle, remote_id = story.remote_id, size = bytes.len(), "media downloaded");
        Ok(path)
    }
}

/// Convert a reel item into the pipeline's story type.
///
/// Returns `None` for unsupported media types or items missing a usable
/// media URL.
fn to_fetched_story(handle: &str, item: ReelItem) -> Option<FetchedStory> {
    let kind = match item.media_type {
        1 => MediaKind::Image,
        2 => MediaKind::Video,
        other => {
            debug!(handle, media_type = other, "unsupported media type");
            return None;
        }
    };

    let media_url = match kind {
        MediaKind::Video => item.video_versions.as_ref()?.first()?.url.clone(),
        MediaKind::Image => item.image_versions2.as_ref()?.candidates.first()?.url.clone(),
    };

    let taken_at: DateTime<Utc> = DateTime::from_timestamp(item.taken_at, 0)?;

    Some(FetchedStory {
        remote_id: item.pk,
        taken_at,
        kind,
        video_duration: item.video_duration,
        media_url,
    })
}

fn fetch_err(
    handle: &str,
    message: &str,
    e: impl std::error::Error + Send + Sync + 'static,
) -> GlimpseError {
    GlimpseError::Fetch {
        handle: handle.to_string(),
        message: message.to_string(),
        source: Some(Box::new(e)),
    }
}

/// Pull a named cookie value out of Set-Cookie response headers.
fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(reqwest::header::SET_COOKIE) {
        let raw = value.to_str().ok()?;
        let pair = raw.split(';').next()?;
        if let Some((k, v)) = pair.split_once('=')
            && k.trim() == name
        {
            return Some(v.trim().to_string());
        }
    }
    None
}
