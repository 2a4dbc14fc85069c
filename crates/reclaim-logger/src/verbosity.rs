use crate::log::log;
use crate::severity::LogSeverity;
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// How chatty the reclaimer is. Each level includes everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off,
    Low,
    Medium,
    High,
    Extreme,
}

impl FromStr for DebugLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "false" | "none" => Ok(DebugLevel::Off),
            "low" => Ok(DebugLevel::Low),
            "medium" => Ok(DebugLevel::Medium),
            "high" => Ok(DebugLevel::High),
            "extreme" | "all" => Ok(DebugLevel::Extreme),
            other => Err(format!("Unknown debug level: {}", other)),
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DebugLevel::Off => "off",
            DebugLevel::Low => "low",
            DebugLevel::Medium => "medium",
            DebugLevel::High => "high",
            DebugLevel::Extreme => "extreme",
        };
        write!(f, "{}", name)
    }
}

// Process-wide gate, written on (re)load of the configuration.
static DEBUG_LEVEL: Lazy<RwLock<DebugLevel>> = Lazy::new(|| RwLock::new(DebugLevel::Off));

pub fn set_debug_level(level: DebugLevel) {
    if let Ok(mut current) = DEBUG_LEVEL.write() {
        *current = level;
    }
}

pub fn debug_level() -> DebugLevel {
    DEBUG_LEVEL
        .read()
        .map(|level| *level)
        .unwrap_or(DebugLevel::Off)
}

/// Whether messages at `level` are currently printed.
pub fn debug_enabled(level: DebugLevel) -> bool {
    debug_level() >= level
}

/// Logs the message built by `message` if `level` passes the gate. `Off` always prints.
pub fn debug<F: FnOnce() -> String>(level: DebugLevel, message: F) {
    if debug_enabled(level) {
        log(message(), LogSeverity::Debug);
    }
}
