//! Debug-build trace lines for the driver, queue and workers.
//!
//! Release builds compile the `log_dev!` calls down to nothing visible. Output
//! goes to stderr so stdout carries only the run report.

use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Print `message` tagged with wall-clock millis and the calling thread's name.
pub fn dev_log(message: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    let current = thread::current();
    let who = current.name().unwrap_or("unnamed");
    eprintln!("[{}ms][{who}] {message}", epoch_millis());
}

/// `format!`-style front end for [`dev_log`].
#[macro_export]
macro_rules! log_dev {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            $crate::logging::dev_log(&format!($($arg)*));
        }
    };
}
