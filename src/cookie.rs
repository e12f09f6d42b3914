//! Cookie data model
//!
//! `Cookie` mirrors what a Chromium cookie store hands back; `WriteCandidate`
//! is the rewritten form that gets stored under the target domain.

use serde::Serialize;

/// The literal target name that opts out of the secure-cookie policy.
/// Local development servers rarely speak TLS.
pub const LOCAL_LOOPBACK: &str = "localhost";

/// Represents one host-stored cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
    pub session: bool,
    /// Raw host expiry timestamp, passed through unchanged
    pub expires: Option<i64>,
}

/// A cookie rewritten for the target domain, ready to be stored.
///
/// By construction a candidate carries no `host_only` or `session`
/// attribute; both are derived by the host and must not be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteCandidate {
    pub url: String,
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<i64>,
}

impl WriteCandidate {
    /// Build a candidate for `target_domain` from an origin cookie.
    ///
    /// The candidate's domain always equals the target domain, and the
    /// cookie is secure unless the target is exactly `localhost`.
    pub fn for_target(cookie: &Cookie, target_domain: &str) -> Self {
        WriteCandidate {
            url: target_url(target_domain),
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: target_domain.to_string(),
            path: cookie.path.clone(),
            secure: target_domain != LOCAL_LOOPBACK,
            http_only: cookie.http_only,
            expires: cookie.expires,
        }
    }

    /// Serialized form used in rejection reports.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| format!("{}={} for {}", self.name, self.value, self.domain))
    }
}

/// Derive the URL a candidate is stored under.
pub fn target_url(domain: &str) -> String {
    let scheme = if domain == LOCAL_LOOPBACK {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, domain)
}
