//! Identifier hygiene
//!
//! Input validation and sanitization, suspicious-pattern warnings, hashing
//! for audit trails, and a per-actor sliding-window rate limiter.

use dashmap::DashMap;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();
static SQLI_RE: OnceLock<Regex> = OnceLock::new();
static SCRIPT_RE: OnceLock<Regex> = OnceLock::new();
static UNSAFE_CHARS_RE: OnceLock<Regex> = OnceLock::new();
static CREDENTIAL_RE: OnceLock<Regex> = OnceLock::new();

fn username_re() -> &'static Regex {
    USERNAME_RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._-]{3,32}$").expect("valid regex"))
}

fn sqli_re() -> &'static Regex {
    SQLI_RE.get_or_init(|| {
        Regex::new(r"(?i)'|--|/\*|\*/|;|\b(OR|AND)\b").expect("valid regex")
    })
}

fn script_re() -> &'static Regex {
    SCRIPT_RE.get_or_init(|| Regex::new(r"(?is)<script.*?>.*?</script.*?>").expect("valid regex"))
}

fn unsafe_chars_re() -> &'static Regex {
    UNSAFE_CHARS_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("valid regex"))
}

fn credential_re() -> &'static Regex {
    CREDENTIAL_RE.get_or_init(|| Regex::new(r"password|passwd|login").expect("valid regex"))
}

/// 3 to 32 characters from `[a-zA-Z0-9._-]`
pub fn validate_username(username: &str) -> bool {
    username_re().is_match(username)
}

/// Returns the input unchanged unless it looks like an injection attempt,
/// in which case everything outside `[a-zA-Z0-9._-]` is stripped.
pub fn sanitize_input(text: &str) -> String {
    if sqli_re().is_match(text) || script_re().is_match(text) {
        tracing::warn!("suspicious input sanitized");
        unsafe_chars_re().replace_all(text, "").into_owned()
    } else {
        text.to_string()
    }
}

/// Security-oriented warnings about a handle
pub fn detect_suspicious_activity(username: &str) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if credential_re().is_match(&username.to_lowercase()) {
        warnings.push("Username contains credential-like keywords.");
    }
    if !username.is_empty() && username.chars().all(|c| c.is_ascii_digit()) {
        warnings.push("Username is numeric only, likely bot or spam.");
    }
    if username.chars().count() > 30 {
        warnings.push("Excessively long username, suspicious behavior.");
    }
    warnings
}

/// SHA-256 hex digest
pub fn hash_value(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Sliding-window limiter keyed by actor
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    requests: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: DashMap::new(),
        }
    }

    /// Record a request for `actor`. Returns false when the actor is over the limit.
    pub fn check(&self, actor: &str) -> bool {
        self.check_at(actor, Instant::now())
    }

    fn check_at(&self, actor: &str, now: Instant) -> bool {
        let mut entry = self.requests.entry(actor.to_string()).or_default();
        entry.retain(|&t| now.saturating_duration_since(t) < self.window);
        if entry.len() >= self.limit {
            let empty = entry.is_empty();
            drop(entry);
            if empty {
                self.requests.remove_if(actor, |_, v| v.is_empty());
            }
            tracing::debug!(actor, limit = self.limit, "rate limited");
            return false;
        }
        entry.push(now);
        true
    }

    /// Drop actors with no request left in the window
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    fn sweep_at(&self, now: Instant) {
        self.requests.retain(|_, times| {
            times.retain(|&t| now.saturating_duration_since(t) < self.window);
            !times.is_empty()
        });
    }

    /// Actors with tracked request state
    pub fn tracked_actors(&self) -> usize {
        self.requests.len()
    }

    /// Requests currently counted against `actor`
    pub fn in_window(&self, actor: &str) -> usize {
        self.requests.get(actor).map_or(0, |v| v.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}
