use embassy_time::Instant;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkCredential {
    pub ssid: String,
    pub password: String,
}

/// One calibrated sample of the load cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub raw_magnitude: i32,
    pub weight_g: i64,
    pub captured_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub food_name: String,
    pub weight_g: i64,
    pub calories: i64,
}

impl LogEntry {
    /// `timestamp,food,weight,calories` terminated by a newline. Separators
    /// inside the free-text fields are blanked so a record stays one line.
    pub fn csv_line(&self) -> String {
        format!(
            "{},{},{},{}\n",
            csv_field(&self.timestamp),
            csv_field(&self.food_name),
            self.weight_g,
            self.calories
        )
    }
}

fn csv_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, ',' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// Most recent human-readable status shown on the web page and the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage(String);

impl ServerMessage {
    pub fn set(&mut self, message: impl Into<String>) {
        self.0 = message.into();
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix that fits in `max_chars` display columns.
    pub fn truncated(&self, max_chars: usize) -> &str {
        match self.0.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Default for ServerMessage {
    fn default() -> Self {
        Self(MSG_READY.to_string())
    }
}

pub const MSG_READY: &str = "Ready";
pub const MSG_NOT_FOUND: &str = "Food not found";
pub const MSG_LOOKUP_FAILED: &str = "Lookup failed";
pub const MSG_INPUT_ERROR: &str = "Input Error";

pub const SAMPLES_PER_READING: usize = 3;
pub const ACTIVITY_THRESHOLD_G: i64 = 2;
pub const LOG_FILE_NAME: &str = "food_log.csv";
pub const LOG_PLACEHOLDER: &str = "Date,Food,Weight,Calories\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_line_keeps_four_fields() {
        let entry = LogEntry {
            timestamp: "2024-03-01 12:30".to_string(),
            food_name: "Apple, raw".to_string(),
            weight_g: 10,
            calories: 52,
        };
        assert_eq!(entry.csv_line(), "2024-03-01 12:30,Apple  raw,10,52\n");
    }

    #[test]
    fn message_truncates_on_char_boundary() {
        let mut msg = ServerMessage::default();
        assert_eq!(msg.as_str(), "Ready");
        msg.set("Logged: Crème brûlée (300 kcal)");
        assert_eq!(msg.truncated(12), "Logged: Crèm");
        assert_eq!(msg.truncated(100), msg.as_str());
    }
}
