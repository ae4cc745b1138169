//! Payload shapes written by the editor for collection entities.
//!
//! The store never depends on these; they exist so callers can build and read
//! payloads without hand-assembling JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::payload::Payload;

/// How a video is played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    Youtube,
    Vimeo,
    /// A direct file URL, typically from the upload collaborator.
    File,
}

impl VideoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Vimeo => "vimeo",
            Self::File => "file",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "youtube" => Ok(Self::Youtube),
            "vimeo" => Ok(Self::Vimeo),
            "file" => Ok(Self::File),
            _ => Err(CoreError::InvalidPayload(format!("unknown video kind: {s}"))),
        }
    }

    /// Guess the kind from a URL's host.
    pub fn detect(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        let rest = lower
            .strip_prefix("https://")
            .or_else(|| lower.strip_prefix("http://"))
            .unwrap_or(&lower);
        let host = rest.split(['/', '?', '#']).next().unwrap_or("");
        let host = host.strip_prefix("www.").unwrap_or(host);
        let host = host.strip_prefix("m.").unwrap_or(host);
        match host {
            "youtube.com" | "youtu.be" | "youtube-nocookie.com" => Self::Youtube,
            "vimeo.com" | "player.vimeo.com" => Self::Vimeo,
            _ => Self::File,
        }
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Payload, CoreError> {
    let json = serde_json::to_value(value).map_err(|e| CoreError::Serialization(e.to_string()))?;
    Payload::from_value(json)
}

fn from_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T, CoreError> {
    serde_json::from_value(payload.clone().into_value())
        .map_err(|e| CoreError::InvalidPayload(e.to_string()))
}

macro_rules! payload_shape {
    ($name:ident) => {
        impl $name {
            pub fn to_payload(&self) -> Result<Payload, CoreError> {
                to_payload(self)
            }

            pub fn from_payload(payload: &Payload) -> Result<Self, CoreError> {
                from_payload(payload)
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPayload {
    pub url: String,
    pub kind: VideoKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl VideoPayload {
    /// Build a video payload, detecting the kind from the URL.
    pub fn from_url(url: impl Into<String>, title: Option<String>) -> Self {
        let url = url.into();
        let kind = VideoKind::detect(&url);
        Self { url, kind, title }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMemberPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

payload_shape!(CasePayload);
payload_shape!(ImagePayload);
payload_shape!(VideoPayload);
payload_shape!(TeamMemberPayload);
