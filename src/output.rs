//! Output formatting and display utilities

use std::collections::HashSet;

use crate::cookie::Cookie;
use crate::sync::SyncReport;

/// Console writer honoring verbose and silent modes
pub struct OutputWriter {
    verbose: bool,
    silent: bool,
}

impl OutputWriter {
    pub fn new(verbose: bool, silent: bool) -> Self {
        Self { verbose, silent }
    }

    /// Write a normal result line
    pub fn write(&self, content: &str) {
        if !self.silent {
            println!("{}", content);
        }
    }

    /// Write verbose information (if enabled)
    pub fn write_verbose(&self, message: &str) {
        if self.verbose && !self.silent {
            eprintln!("* {}", message);
        }
    }

    /// Write error message
    pub fn write_error(&self, message: &str) {
        if !self.silent {
            eprintln!("recookie: error: {}", message);
        }
    }

    /// Render the cookie list for a domain, marking selected names.
    pub fn write_cookie_list(&self, domain: &str, cookies: &[Cookie], selected: &HashSet<String>) {
        if cookies.is_empty() {
            self.write(&format!("No cookies for domain {}", domain));
            return;
        }
        for cookie in cookies {
            let marker = if selected.contains(&cookie.name) {
                "*"
            } else {
                " "
            };
            self.write(&format!("{} {}  ({})", marker, cookie.name, cookie.path));
        }
        if selected.is_empty() {
            self.write("Select the cookies you want to sync (recookie select <NAME>...)");
        }
    }

    /// Render a sync report, one line per failure.
    pub fn write_report(&self, report: &SyncReport) {
        for failure in &report.failures {
            self.write_error(&format!("failed to sync {:?}: {}", failure.name, failure.message));
            if let Some(host_error) = &failure.host_error {
                self.write_error(host_error);
            }
        }
        if report.is_clean() {
            if report.matched == 0 {
                self.write("No matching cookies; nothing to sync");
            } else {
                self.write(&format!("Synced {} cookies", report.written));
            }
        }
    }
}
