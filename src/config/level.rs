//! Numeric severity levels.
//!
//! Documents spell levels either as integers (`10`, `20`, ...) or as names
//! (`"INFO"`, `"warning"`). Levels always serialize back as integers.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A numeric severity threshold. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(pub u32);

impl Level {
    pub const NOTSET: Level = Level(0);
    pub const TRACE: Level = Level(5);
    pub const DEBUG: Level = Level(10);
    pub const INFO: Level = Level(20);
    pub const WARNING: Level = Level(30);
    pub const ERROR: Level = Level(40);
    pub const CRITICAL: Level = Level(50);

    /// Look up a level by its conventional name, ignoring case.
    pub fn from_name(name: &str) -> Option<Level> {
        match name.trim().to_ascii_uppercase().as_str() {
            "NOTSET" => Some(Level::NOTSET),
            "TRACE" => Some(Level::TRACE),
            "DEBUG" => Some(Level::DEBUG),
            "INFO" => Some(Level::INFO),
            "WARN" | "WARNING" => Some(Level::WARNING),
            "ERROR" => Some(Level::ERROR),
            "FATAL" | "CRITICAL" => Some(Level::CRITICAL),
            _ => None,
        }
    }

    /// Name used in rendered records (`%(levelname)s`).
    pub fn name(&self) -> String {
        match *self {
            Level::NOTSET => "NOTSET".to_string(),
            Level::TRACE => "TRACE".to_string(),
            Level::DEBUG => "DEBUG".to_string(),
            Level::INFO => "INFO".to_string(),
            Level::WARNING => "WARNING".to_string(),
            Level::ERROR => "ERROR".to_string(),
            Level::CRITICAL => "CRITICAL".to_string(),
            Level(n) => format!("Level {}", n),
        }
    }

    pub fn is_set(&self) -> bool {
        *self != Level::NOTSET
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<u32> for Level {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::TRACE,
            tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARNING,
            tracing::Level::ERROR => Level::ERROR,
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

struct LevelVisitor;

impl<'de> Visitor<'de> for LevelVisitor {
    type Value = Level;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer level or a level name")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Level, E> {
        u32::try_from(v)
            .map(Level)
            .map_err(|_| E::custom(format!("level {} is out of range", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Level, E> {
        if v < 0 {
            return Err(E::custom(format!("level must not be negative, got {}", v)));
        }
        self.visit_u64(v as u64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Level, E> {
        if let Ok(n) = v.trim().parse::<u32>() {
            return Ok(Level(n));
        }
        Level::from_name(v).ok_or_else(|| E::custom(format!("unknown level name '{}'", v)))
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        deserializer.deserialize_any(LevelVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(Level::from_name("info"), Some(Level::INFO));
        assert_eq!(Level::from_name("Warn"), Some(Level::WARNING));
        assert_eq!(Level::from_name("verbose"), None);
        assert_eq!(Level(20).to_string(), "INFO");
        assert_eq!(Level(25).to_string(), "Level 25");
    }

    #[test]
    fn test_level_deserialize_number_or_name() {
        let n: Level = serde_json::from_str("10").unwrap();
        assert_eq!(n, Level::DEBUG);
        let s: Level = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(s, Level::CRITICAL);
        assert!(serde_json::from_str::<Level>("-5").is_err());
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(Level::from(&tracing::Level::WARN), Level::WARNING);
        assert_eq!(Level::from(&tracing::Level::TRACE), Level(5));
        assert!(Level::from(&tracing::Level::ERROR) > Level::INFO);
    }
}
