// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide `tracing` subscriber for synthesis runs.
//!
//! Events go to stderr through an `EnvFilter` (`RUST_LOG`, default `info`).
//! Setting `FLATSKY_TRACE_CHROME` to a path also records spans as a Chrome
//! trace; [`finish_tracing`] flushes it.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::{debug, warn};
use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable naming the Chrome trace output file.
pub const CHROME_TRACE_ENV: &str = "FLATSKY_TRACE_CHROME";

static INIT: OnceLock<Result<(), TelemetryError>> = OnceLock::new();
static CHROME_GUARD: Mutex<Option<FlushGuard>> = Mutex::new(None);

/// Errors raised while building the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to read {CHROME_TRACE_ENV}: {0}")]
    Env(std::env::VarError),
}

/// Installs the process-wide subscriber once; later calls are no-ops.
///
/// A subscriber installed elsewhere is accepted silently. Other failures are
/// reported through `warn!` and synthesis proceeds without logging.
pub fn init_tracing() {
    if let Err(err) = INIT.get_or_init(install) {
        warn!("failed to initialise tracing subscriber: {err}");
    }
}

/// Writes out any pending Chrome trace. Call before the process exits.
pub fn finish_tracing() {
    debug!("flushing chrome trace");
    let guard = CHROME_GUARD
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    drop(guard);
}

fn install() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    let (chrome_layer, guard) = match chrome_trace_path()? {
        Some(path) => {
            let (layer, guard) = ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer)
        .try_init();
    match installed {
        Ok(()) => {
            *CHROME_GUARD
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = guard;
        }
        Err(err) => debug!("keeping existing subscriber: {err}"),
    }
    Ok(())
}

fn chrome_trace_path() -> Result<Option<PathBuf>, TelemetryError> {
    match std::env::var(CHROME_TRACE_ENV) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(PathBuf::from(raw))),
        Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(TelemetryError::Env(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_harmless() {
        init_tracing();
        init_tracing();
        assert!(matches!(INIT.get(), Some(Ok(()))));
        tracing::info!("subscriber ready");
        finish_tracing();
        finish_tracing();
    }
}
