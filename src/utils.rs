/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Clock helpers and logging setup shared by every component.

use std::any::Any;
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Level;

static INIT_LOGGER: Once = Once::new();

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
#[inline]
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Returns the current wall-clock time in nanoseconds since the Unix epoch.
///
/// Market updates carry nanosecond timestamps; this is the clock producers
/// are expected to stamp them with.
#[inline]
pub fn current_time_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Installs a `tracing` fmt subscriber.
///
/// The level is read from the `LOGLEVEL` environment variable (`TRACE`,
/// `DEBUG`, `INFO`, `WARN`, `ERROR`) and defaults to `INFO`. Calling this
/// more than once is harmless; only the first call installs the subscriber,
/// and an already-installed global subscriber is left untouched.
pub fn setup_logger() {
    INIT_LOGGER.call_once(|| {
        let level = std::env::var("LOGLEVEL")
            .map(|value| parse_level(&value))
            .unwrap_or(Level::INFO);

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_thread_names(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!("log level set to {level}");
        }
    });
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn parse_level(value: &str) -> Level {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}
