//! Scheduler configuration.

use std::time::Duration;

/// Minimum severity that reaches the log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Recognized scheduler options.
///
/// The tick periods and retention window default to the engine's design
/// values; tests tighten them where it keeps the suite fast.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Initial concurrency ceiling (may be raised by the periodic adjust).
    pub max_concurrent_tasks: usize,

    /// Maximum retries beyond the first attempt.
    pub max_retries: u32,

    /// When false, any failure is terminal.
    pub enable_retry: bool,

    pub log_level: LogLevel,

    /// Dispatch loop period.
    pub dispatch_interval: Duration,

    /// Expiry sweep period.
    pub sweep_interval: Duration,

    /// Concurrency auto-adjust period.
    pub adjust_interval: Duration,

    /// Drain-completion check period during shutdown.
    pub drain_check_interval: Duration,

    /// Age past which Pending/Failed store entries are swept.
    pub retention: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            max_retries: 3,
            enable_retry: true,
            log_level: LogLevel::Info,
            dispatch_interval: Duration::from_millis(100),
            sweep_interval: Duration::from_secs(30),
            adjust_interval: Duration::from_secs(60),
            drain_check_interval: Duration::from_secs(1),
            retention: Duration::from_secs(3600),
        }
    }
}
