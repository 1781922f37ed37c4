//! Injected logger. Each component (core, database, model, routing) gets a clone tagged with its
//! name; the level is fixed when the logger is built.

use std::fmt::Display;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
pub struct Logger {
    component: &'static str,
    level: LevelFilter,
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new(LevelFilter::INFO)
    }
}

impl Logger {
    pub fn new(level: LevelFilter) -> Self {
        Logger {
            component: "core",
            level,
        }
    }

    /// Parse a level name ("debug", "info", ...); unknown names fall back to info.
    pub fn from_level_str(level: &str) -> Self {
        Logger::new(level.parse().unwrap_or(LevelFilter::INFO))
    }

    /// Same level, different component tag.
    pub fn component(&self, component: &'static str) -> Self {
        Logger {
            component,
            level: self.level,
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn debug(&self, message: impl Display) {
        if self.enabled(Level::DEBUG) {
            tracing::debug!(component = self.component, "{}", message);
        }
    }

    pub fn info(&self, message: impl Display) {
        if self.enabled(Level::INFO) {
            tracing::info!(component = self.component, "{}", message);
        }
    }

    pub fn warn(&self, message: impl Display) {
        if self.enabled(Level::WARN) {
            tracing::warn!(component = self.component, "{}", message);
        }
    }

    /// Startup-halting condition. Logged unconditionally; the caller returns the error.
    pub fn fatal(&self, message: impl Display) {
        tracing::error!(component = self.component, fatal = true, "{}", message);
    }
}

/// Install a fmt subscriber for binaries. `RUST_LOG` wins over `default_directive`.
pub fn init_subscriber(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
