//! Cookie synchronization engine
//!
//! Reads every cookie the store knows about, keeps the ones whose domain and
//! name match the request, rewrites each one for the target domain, and
//! issues all writes before deciding the outcome. The engine reports exactly
//! once, as a single `SyncReport` aggregating every per-cookie result; the
//! only hard failure is the initial read.

use std::collections::HashSet;

use futures_util::future::join_all;

use crate::cookie::WriteCandidate;
use crate::error::Result;
use crate::store::CookieStore;

/// One sync invocation: which cookies to copy, from where, to where.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub names: HashSet<String>,
    pub origin_domain: String,
    pub target_domain: String,
}

impl SyncRequest {
    pub fn new<I, S>(names: I, origin_domain: &str, target_domain: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SyncRequest {
            names: names.into_iter().map(Into::into).collect(),
            origin_domain: origin_domain.to_string(),
            target_domain: target_domain.to_string(),
        }
    }
}

/// One write that did not stick.
#[derive(Debug)]
pub struct SyncFailure {
    /// Name of the cookie the write was for
    pub name: String,
    /// Descriptive message; for a declined write this is the serialized
    /// candidate the host refused
    pub message: String,
    /// The host's own error channel, when it reported one
    pub host_error: Option<String>,
}

/// Aggregated outcome of one sync invocation.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Cookies that matched the request's domain and name filter
    pub matched: usize,
    /// Writes the store accepted
    pub written: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// True when every matched cookie was written. An empty match is
    /// clean: syncing nothing trivially succeeds.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.written == self.matched
    }
}

/// Copy every matching cookie from the origin domain to the target domain.
///
/// Writes are issued concurrently with no ordering guarantee between them;
/// all outcomes are gathered before the report is built. A declined or
/// failed write never aborts the remaining writes. `Err` is reserved for
/// the read path: if the store cannot list cookies there is nothing to do.
pub async fn sync(store: &dyn CookieStore, request: &SyncRequest) -> Result<SyncReport> {
    let cookies = store.list_all().await?;

    let candidates: Vec<WriteCandidate> = cookies
        .iter()
        .filter(|cookie| {
            cookie.domain == request.origin_domain && request.names.contains(&cookie.name)
        })
        .map(|cookie| WriteCandidate::for_target(cookie, &request.target_domain))
        .collect();

    let mut report = SyncReport {
        matched: candidates.len(),
        ..SyncReport::default()
    };

    let writes = candidates.iter().map(|candidate| async move {
        let outcome = store.write(candidate).await;
        // Capture the host error before another write can overwrite it.
        let host_error = match &outcome {
            Ok(false) => store.last_error(),
            _ => None,
        };
        (candidate, outcome, host_error)
    });

    for (candidate, outcome, host_error) in join_all(writes).await {
        match outcome {
            Ok(true) => report.written += 1,
            Ok(false) => {
                log::warn!("store declined cookie {:?}", candidate.name);
                report.failures.push(SyncFailure {
                    name: candidate.name.clone(),
                    message: candidate.to_pretty_json(),
                    host_error,
                });
            }
            Err(err) => {
                log::warn!("write failed for cookie {:?}: {}", candidate.name, err);
                report.failures.push(SyncFailure {
                    name: candidate.name.clone(),
                    message: err.to_string(),
                    host_error: None,
                });
            }
        }
    }

    Ok(report)
}
