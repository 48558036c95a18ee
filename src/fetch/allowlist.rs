//! Host allowlist for outbound requests.

use std::collections::HashSet;

use url::Url;

use crate::fetch::FetchError;

/// Closed set of hostnames; anything not listed is denied.
///
/// Matching is exact and case-sensitive. There is no wildcard or subdomain
/// matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    hosts: HashSet<String>,
}

impl Allowlist {
    /// Parse a comma-separated list, trimming entries and dropping blanks.
    pub fn from_csv(raw: &str) -> Self {
        raw.split(',').collect()
    }

    pub fn permits(&self, host: &str) -> bool {
        !host.is_empty() && self.hosts.contains(host)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Allowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            hosts: iter
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }
}

/// Parse `url` and check its host against `allowlist` without any I/O.
pub fn check_policy(url: &str, allowlist: &Allowlist) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::BlockedByPolicy {
        host: String::new(),
    })?;
    let host = parsed.host_str().unwrap_or_default();
    if !allowlist.permits(host) {
        return Err(FetchError::BlockedByPolicy {
            host: host.to_string(),
        });
    }
    Ok(parsed)
}
