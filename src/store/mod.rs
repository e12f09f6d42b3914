//! Cookie store adapters
//!
//! The sync engine only ever talks to a `CookieStore`; the concrete backend
//! is a Chromium SQLite database in production and an in-process store in
//! tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cookie::{Cookie, WriteCandidate};
use crate::error::{RecookieError, Result};

pub mod chromium;

pub use chromium::ChromiumStore;

/// Host cookie store contract.
///
/// `write` distinguishes a host that declined the cookie (`Ok(false)`) from
/// one that failed outright (`Err`); after a decline, `last_error` exposes
/// the host's own diagnostic.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Every cookie visible to the host, regardless of domain.
    async fn list_all(&self) -> Result<Vec<Cookie>>;

    /// Attempt to store one cookie under the candidate's URL and domain.
    async fn write(&self, candidate: &WriteCandidate) -> Result<bool>;

    /// The host's diagnostic for the most recent declined write.
    fn last_error(&self) -> Option<String>;
}

/// In-process cookie store.
///
/// Serves as the reference implementation of the contract and as the test
/// double: individual cookie names can be configured to be declined or to
/// fail, and listing itself can be made to fail.
#[derive(Default)]
pub struct MemoryStore {
    cookies: Mutex<Vec<Cookie>>,
    declined: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    listing_fails: Mutex<bool>,
    written: Mutex<Vec<String>>,
    last_error: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        let store = Self::new();
        *store.cookies.lock().unwrap() = cookies;
        store
    }

    /// Decline writes for this cookie name, recording a host error.
    pub fn decline(&self, name: &str) {
        self.declined.lock().unwrap().insert(name.to_string());
    }

    /// Fail writes for this cookie name outright.
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Make `list_all` fail.
    pub fn fail_listing(&self) {
        *self.listing_fails.lock().unwrap() = true;
    }

    /// Names of cookies written since construction, in completion order.
    pub fn written_names(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    pub fn cookies_for_domain(&self, domain: &str) -> Vec<Cookie> {
        self.cookies
            .lock()
            .unwrap()
            .iter()
            .filter(|cookie| cookie.domain == domain)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CookieStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Cookie>> {
        if *self.listing_fails.lock().unwrap() {
            return Err(RecookieError::Store("cookie listing failed".to_string()));
        }
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn write(&self, candidate: &WriteCandidate) -> Result<bool> {
        if self.failing.lock().unwrap().contains(&candidate.name) {
            return Err(RecookieError::Store(format!(
                "write failed for {:?}",
                candidate.name
            )));
        }
        if self.declined.lock().unwrap().contains(&candidate.name) {
            *self.last_error.lock().unwrap() = Some(format!(
                "host declined cookie {:?} for {}",
                candidate.name, candidate.url
            ));
            return Ok(false);
        }

        let mut cookies = self.cookies.lock().unwrap();
        cookies.retain(|cookie| {
            !(cookie.domain == candidate.domain
                && cookie.name == candidate.name
                && cookie.path == candidate.path)
        });
        cookies.push(Cookie {
            name: candidate.name.clone(),
            value: candidate.value.clone(),
            domain: candidate.domain.clone(),
            path: candidate.path.clone(),
            secure: candidate.secure,
            http_only: candidate.http_only,
            host_only: false,
            session: candidate.expires.is_none(),
            expires: candidate.expires,
        });
        self.written.lock().unwrap().push(candidate.name.clone());
        Ok(true)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }
}
