//! Per-component failure kinds. None of these is fatal to the device; the
//! control loop logs them and carries on.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    NotReady,
    Pin(String),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NotReady => write!(f, "load cell never signalled data ready"),
            SensorError::Pin(msg) => write!(f, "load cell pin error: {}", msg),
        }
    }
}

impl std::error::Error for SensorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    Bus(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Bus(msg) => write!(f, "display error: {}", msg),
        }
    }
}

impl std::error::Error for DisplayError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    Scan(String),
    Join(String),
    TimeSync(String),
    Listener(String),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityError::Scan(msg) => write!(f, "wifi scan failed: {}", msg),
            ConnectivityError::Join(msg) => write!(f, "wifi join failed: {}", msg),
            ConnectivityError::TimeSync(msg) => write!(f, "time sync failed: {}", msg),
            ConnectivityError::Listener(msg) => write!(f, "listener error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectivityError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    Transport(String),
    Status(u16),
    Decode(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Transport(msg) => write!(f, "transport error: {}", msg),
            LookupError::Status(code) => write!(f, "unexpected HTTP status {}", code),
            LookupError::Decode(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Mount(String),
    Io(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Mount(msg) => write!(f, "storage mount failed: {}", msg),
            StorageError::Io(msg) => write!(f, "storage I/O error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyRequest,
    MalformedRequestLine(String),
    MissingParameter(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyRequest => write!(f, "empty request"),
            ParseError::MalformedRequestLine(line) => {
                write!(f, "malformed request line: {:?}", line)
            }
            ParseError::MissingParameter(name) => write!(f, "missing query parameter `{}`", name),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub enum ConfigError {
    Toml(toml::de::Error),
    ZeroCalibrationFactor,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Toml(e) => write!(f, "invalid configuration: {}", e),
            ConfigError::ZeroCalibrationFactor => write!(f, "calibration_factor must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}
