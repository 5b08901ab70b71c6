use crate::display_power::DisplayPower;
use crate::types::{ServerMessage, ACTIVITY_THRESHOLD_G};
use crate::wifi::manager::Link;
use embassy_time::{Duration, Instant};
use log::debug;

/// Everything that changes while the loop runs. Owned by the control loop
/// and lent to each step.
pub struct AppState {
    pub display: DisplayPower,
    pub message: ServerMessage,
    pub weight_g: i64,
    last_weight_g: Option<i64>,
    link: Option<Link>,
}

impl AppState {
    pub fn new(screen_timeout: Duration, link: Option<Link>, now: Instant) -> Self {
        Self {
            display: DisplayPower::new(screen_timeout, now),
            message: ServerMessage::default(),
            weight_g: 0,
            last_weight_g: None,
            link,
        }
    }

    /// Store a fresh reading; true when it moved more than the activity
    /// threshold since the previous one.
    pub fn update_weight(&mut self, weight_g: i64) -> bool {
        let moved = self
            .last_weight_g
            .map_or(false, |last| (weight_g - last).abs() > ACTIVITY_THRESHOLD_G);
        if moved {
            debug!("Weight moved {:?} -> {}g", self.last_weight_g, weight_g);
        }
        self.last_weight_g = Some(weight_g);
        self.weight_g = weight_g;
        moved
    }

    pub fn is_online(&self) -> bool {
        self.link.is_some()
    }

    /// Bottom line of the screen.
    pub fn link_label(&self) -> String {
        match &self.link {
            Some(link) => format!("IP: {}", link.address),
            None => "No network".to_string(),
        }
    }
}
