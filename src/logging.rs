//! Logging setup.
//!
//! Honors `RUST_LOG` when set; otherwise recookie's own modules log at
//! info level, which covers skipped-cookie and declined-write warnings.

use env_logger::Env;

pub fn init() {
    let env = Env::default().default_filter_or("recookie=info");
    env_logger::Builder::from_env(env).init();
}
