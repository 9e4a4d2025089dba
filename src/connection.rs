//! CRM connection string parsing
//!
//! Connection strings are `Key=Value` pairs separated by `;`, e.g.
//! `AuthType=OAuth;Url=https://contoso.crm.dynamics.com;AccessToken=eyJ0...`.
//! Keys are case-insensitive. Values may be wrapped in single or double quotes,
//! which lets them contain `;`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Web API version used when the connection string does not name one
pub const DEFAULT_API_VERSION: &str = "9.2";

/// Request timeout used when the connection string does not name one
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors that can occur while parsing a connection string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Connection string has no Url (or ServiceUri/Server) entry")]
    MissingUrl,

    #[error("Connection string Url must start with http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("Malformed connection string segment (expected Key=Value): {0}")]
    MalformedSegment(String),

    #[error("Invalid Timeout value (expected whole seconds): {0}")]
    InvalidTimeout(String),
}

/// Parsed CRM connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Organization root, without a trailing slash
    pub url: String,
    /// Bearer token sent with every request
    pub access_token: Option<String>,
    /// Web API version, e.g. "9.2"
    pub api_version: String,
    pub timeout: Duration,
    /// Every key as written (lowercased), including ones this crate ignores
    extra: HashMap<String, String>,
}

impl ConnectionString {
    /// Base URL of the Web API endpoint, e.g. `https://org/api/data/v9.2`
    pub fn api_base(&self) -> String {
        format!("{}/api/data/v{}", self.url, self.api_version)
    }

    /// Look up any entry by (case-insensitive) key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = HashMap::new();
        for segment in split_segments(s)? {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionError::MalformedSegment(segment.to_string()))?;
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(ConnectionError::MalformedSegment(segment.to_string()));
            }
            entries.insert(key, unquote(value.trim()).to_string());
        }

        let url = ["url", "serviceuri", "server"]
            .iter()
            .find_map(|k| entries.get(*k))
            .filter(|u| !u.is_empty())
            .ok_or(ConnectionError::MissingUrl)?;
        let trimmed = url.trim_end_matches('/');
        let host = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        if host.map_or(true, str::is_empty) {
            return Err(ConnectionError::InvalidUrl(url.clone()));
        }
        let url = trimmed.to_string();

        let access_token = ["accesstoken", "token"]
            .iter()
            .find_map(|k| entries.get(*k))
            .filter(|t| !t.is_empty())
            .cloned();

        let api_version = entries
            .get("apiversion")
            .map(|v| v.trim_start_matches(['v', 'V']).to_string())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let timeout = match entries.get("timeout") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConnectionError::InvalidTimeout(raw.clone()))?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            url,
            access_token,
            api_version,
            timeout,
            extra: entries,
        })
    }
}

// Keep the token out of logs and error output
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("url", &self.url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Url={};ApiVersion={}", self.url, self.api_version)
    }
}

/// Split on `;`, leaving separators inside a quoted value alone.
///
/// A quote only opens when it is the first non-blank character after a
/// segment's first `=`, so apostrophes inside bare values are literal.
fn split_segments(s: &str) -> Result<Vec<&str>, ConnectionError> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut seen_eq = false;
    let mut at_value_start = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            ';' => {
                segments.push(&s[start..i]);
                start = i + 1;
                seen_eq = false;
                at_value_start = false;
            }
            '=' if !seen_eq => {
                seen_eq = true;
                at_value_start = true;
            }
            '"' | '\'' if at_value_start => {
                quote = Some(c);
                at_value_start = false;
            }
            c if c.is_whitespace() => {}
            _ => at_value_start = false,
        }
    }

    if quote.is_some() {
        return Err(ConnectionError::MalformedSegment(s[start..].trim().to_string()));
    }
    segments.push(&s[start..]);
    Ok(segments)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
