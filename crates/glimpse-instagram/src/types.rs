// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde models for the subset of the Instagram web API that Glimpse uses.
//!
//! Only the fields the fetcher reads are modeled; everything else in the
//! payloads is ignored.

use serde::{Deserialize, Deserializer};

/// Response of `POST /accounts/login/ajax/`.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /users/web_profile_info/?username=...`.
#[derive(Debug, Deserialize)]
pub struct ProfileInfoResponse {
    pub data: ProfileData,
}

#[derive(Debug, Deserialize)]
pub struct ProfileData {
    pub user: Option<ProfileUser>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUser {
    pub id: String,
}

/// Response of `GET /feed/reels_media/?reel_ids=...`.
#[derive(Debug, Deserialize)]
pub struct ReelsMediaResponse {
    #[serde(default)]
    pub reels_media: Vec<Reel>,
}

#[derive(Debug, Deserialize)]
pub struct Reel {
    #[serde(default)]
    pub items: Vec<ReelItem>,
}

/// One story item inside a reel tray.
#[derive(Debug, Deserialize)]
pub struct ReelItem {
    /// Remote id. The API serves this as either a number or a string
    /// depending on the endpoint generation.
    #[serde(deserialize_with = "string_or_i64")]
    pub pk: i64,
    /// Unix timestamp of when the story was posted.
    pub taken_at: i64,
    /// 1 = image, 2 = video; anything else is an unsupported type.
    pub media_type: u8,
    #[serde(default)]
    pub video_duration: Option<f64>,
    #[serde(default)]
    pub image_versions2: Option<ImageVersions>,
    #[serde(default)]
    pub video_versions: Option<Vec<VideoVersion>>,
}

#[derive(Debug, Deserialize)]
pub struct ImageVersions {
    #[serde(default)]
    pub candidates: Vec<ImageCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct ImageCandidate {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct VideoVersion {
    pub url: String,
}

fn string_or_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reel_item_accepts_string_and_numeric_pk() {
        let numeric: ReelItem = serde_json::from_str(
            r#"{"pk": 123, "taken_at": 1700000000, "media_type": 1}"#,
        )
        .unwrap();
        assert_eq!(numeric.pk, 123);

        let stringy: ReelItem = serde_json::from_str(
            r#"{"pk": "456", "taken_at": 1700000000, "media_type": 2}"#,
        )
        .unwrap();
        assert_eq!(stringy.pk, 456);
    }

    #[test]
    fn reels_media_defaults_to_empty() {
        let resp: ReelsMediaResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(resp.reels_media.is_empty());
    }
}
