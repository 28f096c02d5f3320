//! Web addresses of løysingar.

use std::fmt;
use std::str::FromStr;

use lreg_derive::lreg_error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[lreg_error]
pub enum NettadresseError {
    #[error("Missing url")]
    Blank {},

    #[error("Invalid url `{url}`: {reason}")]
    Invalid { url: String, reason: &'static str },
}

/// An absolute `http`/`https` URL.
///
/// Parsing prepends `https://` when the scheme is missing and requires a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nettadresse(String);

impl Nettadresse {
    /// # Errors
    ///
    /// [`NettadresseError`] for blank input, unsupported schemes or a missing host.
    pub fn parse(raw: &str) -> Result<Self, NettadresseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NettadresseError::Blank {});
        }

        let absolute = match scheme_len(trimmed) {
            Some(_) => trimmed.to_owned(),
            None if trimmed.contains("://") => {
                return Err(invalid(trimmed, "only http and https are supported"));
            }
            None => format!("https://{trimmed}"),
        };

        let adresse = Self(absolute);
        let host = adresse.host();
        if host.is_empty() {
            return Err(invalid(trimmed, "missing host"));
        }
        if host.chars().any(|c| c.is_whitespace() || "<>\"{}|\\^`".contains(c)) {
            return Err(invalid(trimmed, "illegal character in host"));
        }
        if adresse.0.chars().any(char::is_whitespace) {
            return Err(invalid(trimmed, "whitespace in url"));
        }
        Ok(adresse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host without user info or port.
    pub fn host(&self) -> &str {
        let authority = self.after_scheme().split(['/', '?', '#']).next().unwrap_or_default();
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        match host_port.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => host_port,
        }
    }

    /// Compares two addresses ignoring the scheme, a leading `www.`, host case and a
    /// trailing slash.
    pub fn same_url(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    fn after_scheme(&self) -> &str {
        scheme_len(&self.0).map_or(self.0.as_str(), |len| &self.0[len..])
    }

    fn normalized(&self) -> (String, &str) {
        let rest = self.after_scheme();
        let split = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, path) = rest.split_at(split);

        let mut host = authority.to_ascii_lowercase();
        if host.starts_with("www.") {
            host.drain(..4);
        }
        (host, path.trim_end_matches('/'))
    }
}

/// Length of a leading `http://` or `https://`, matched case-insensitively.
fn scheme_len(url: &str) -> Option<usize> {
    ["https://", "http://"].into_iter().find_map(|scheme| {
        url.get(..scheme.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .map(|_| scheme.len())
    })
}

fn invalid(url: &str, reason: &'static str) -> NettadresseError {
    NettadresseError::Invalid { url: url.to_owned(), reason }
}

impl FromStr for Nettadresse {
    type Err = NettadresseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Nettadresse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Nettadresse {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Nettadresse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Nettadresse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
