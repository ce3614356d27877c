//! Logging setup and leveled reporting helpers
//!
//! Everything logs through `tracing`. Without an installed subscriber the
//! macros are no-ops, so nothing here may influence control flow.

use crate::error::{RuntimeError, Severity};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Install the default fmt subscriber (filter from `RUST_LOG`, default `info`)
///
/// Returns `false` if a global subscriber was already set.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

pub fn critical(message: &str) {
    error!(critical = true, "{}", message);
}

/// Error paired with the calling thread's last OS error
pub fn win32_error(message: &str) {
    let os_error = std::io::Error::last_os_error();
    error!(os_error = %os_error, "{}", message);
}

pub fn com_error(message: &str, hresult: u32) {
    error!(hresult = %format_args!("{:#010x}", hresult), "{}", message);
}

/// Report a failed init step at the level its error kind calls for
pub fn report(message: &str, err: &RuntimeError) {
    match err.severity() {
        Severity::Critical => error!(critical = true, error = %err, "{}", message),
        Severity::Error => error!(error = %err, "{}", message),
    }
}
