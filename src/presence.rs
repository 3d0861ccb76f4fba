//! Platform presence model
//!
//! The network probe that checks whether a handle exists on a platform is an
//! external collaborator. This module only defines what it returns: a
//! found / not-found / unknown tri-state per platform, plus the status code
//! mapping the probe is expected to apply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platforms checked by default, with their profile URL template.
///
/// Placeholder sites and sites whose profile URL needs a phone number are
/// not listed.
pub const PLATFORMS: &[(&str, &str)] = &[
    ("YouTube", "https://www.youtube.com/{user}"),
    ("Reddit", "https://www.reddit.com/user/{user}"),
    ("Facebook", "https://www.facebook.com/{user}"),
    ("Twitter", "https://www.twitter.com/{user}"),
    ("Twitch", "https://www.twitch.tv/{user}"),
    ("GitHub", "https://www.github.com/{user}"),
    ("Instagram", "https://www.instagram.com/{user}"),
    ("Pinterest", "https://www.pinterest.com/{user}"),
    ("Roblox", "https://www.roblox.com/user.aspx?username={user}"),
    ("Bluesky", "https://bsky.app/profile/{user}.bsky.social"),
    ("Telegram", "https://t.me/{user}"),
    ("TikTok", "https://www.tiktok.com/@{user}"),
    ("LinkedIn", "https://www.linkedin.com/in/{user}"),
    ("Medium", "https://medium.com/@{user}"),
    ("Imgur", "https://imgur.com/user/{user}"),
    ("Vimeo", "https://vimeo.com/{user}"),
    ("Spotify", "https://open.spotify.com/user/{user}"),
    ("Keybase", "https://keybase.io/{user}"),
    ("Snapchat", "https://www.snapchat.com/add/{user}"),
    ("SoundCloud", "https://soundcloud.com/{user}"),
    ("VK", "https://vk.com/{user}"),
];

/// Tri-state result of a presence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Found,
    NotFound,
    Unknown,
}

impl Presence {
    pub fn from_found(found: Option<bool>) -> Self {
        match found {
            Some(true) => Self::Found,
            Some(false) => Self::NotFound,
            None => Self::Unknown,
        }
    }
}

/// One platform's probe outcome. `found` is `null` when the probe could not tell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub found: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PresenceRecord {
    pub fn found() -> Self {
        Self {
            found: Some(true),
            ..Default::default()
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: Some(false),
            ..Default::default()
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    /// Build a record from an HTTP status code returned by a probe
    pub fn from_status(status: u16, url: Option<String>) -> Self {
        let found = presence_from_status(status);
        let error = match status {
            403 => Some("Forbidden".to_string()),
            429 => Some("Rate limited".to_string()),
            999 => Some("Blocked by platform".to_string()),
            _ if found.is_none() => Some("Unhandled response".to_string()),
            _ => None,
        };
        Self {
            found,
            status: Some(status),
            url,
            error,
        }
    }

    pub fn presence(&self) -> Presence {
        Presence::from_found(self.found)
    }
}

/// Platform name -> probe outcome, ordered by platform name
pub type PresenceMap = BTreeMap<String, PresenceRecord>;

/// Status code mapping: 200/301/302 exist, 404 does not, anything else is unknown
pub fn presence_from_status(status: u16) -> Option<bool> {
    match status {
        200 | 301 | 302 => Some(true),
        404 => Some(false),
        _ => None,
    }
}

/// Profile URL for a handle on a known platform
pub fn profile_url(platform: &str, username: &str) -> Option<String> {
    PLATFORMS
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, template)| template.replace("{user}", username))
}

/// Source of platform presence for a handle
pub trait PresenceProbe: Send + Sync {
    fn probe(&self, username: &str) -> PresenceMap;
}

/// Probe that performs no network access and reports every platform as unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProbe;

impl PresenceProbe for OfflineProbe {
    fn probe(&self, username: &str) -> PresenceMap {
        PLATFORMS
            .iter()
            .map(|(name, template)| {
                let record = PresenceRecord {
                    url: Some(template.replace("{user}", username)),
                    ..PresenceRecord::unknown()
                };
                (name.to_string(), record)
            })
            .collect()
    }
}

/// Probe backed by a fixed map, for replaying recorded results
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    results: BTreeMap<String, PresenceMap>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, username: &str, results: PresenceMap) -> Self {
        self.results.insert(username.to_string(), results);
        self
    }
}

impl PresenceProbe for StaticProbe {
    fn probe(&self, username: &str) -> PresenceMap {
        self.results.get(username).cloned().unwrap_or_default()
    }
}
