//! Best-effort NTP sync and local timestamp formatting

use crate::error::ConnectivityError;
use chrono::{DateTime, Utc};
use embedded_hal::blocking::delay::DelayMs;
use log::{info, warn};

pub const SYNC_WAIT_S: u32 = 10;

pub trait TimeSource {
    fn start(&mut self) -> Result<(), ConnectivityError>;
    fn is_synced(&self) -> bool;
}

/// Seconds since the Unix epoch according to the device clock, synced or not.
pub trait WallClock {
    fn unix_time(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    Unsynced,
}

/// One attempt, no retry. Blocks at most `max_wait_s` seconds.
pub fn sync_once<T: TimeSource, D: DelayMs<u32>>(
    source: &mut T,
    delay: &mut D,
    max_wait_s: u32,
) -> SyncOutcome {
    if let Err(e) = source.start() {
        warn!("⚠️ {} - keeping onboard clock", e);
        return SyncOutcome::Unsynced;
    }

    for _ in 0..max_wait_s {
        if source.is_synced() {
            info!("🕒 Time synced via NTP");
            return SyncOutcome::Synced;
        }
        delay.delay_ms(1000);
    }

    if source.is_synced() {
        info!("🕒 Time synced via NTP");
        return SyncOutcome::Synced;
    }

    warn!("⚠️ Time sync failed - timestamps use the unsynchronized clock");
    SyncOutcome::Unsynced
}

/// `YYYY-MM-DD HH:MM` at a fixed offset from UTC. Never fails: out-of-range
/// clocks fall back to the epoch.
pub fn local_timestamp(unix_secs: i64, gmt_offset_secs: i32) -> String {
    let local = unix_secs.saturating_add(gmt_offset_secs as i64);
    DateTime::<Utc>::from_timestamp(local, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn unix_time(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspSntpSource;

#[cfg(target_os = "espidf")]
mod esp {
    use super::TimeSource;
    use crate::error::ConnectivityError;
    use esp_idf_svc::sntp::{EspSntp, SyncStatus};

    /// Keeps the SNTP service alive for as long as it is held.
    #[derive(Default)]
    pub struct EspSntpSource {
        sntp: Option<EspSntp<'static>>,
    }

    impl TimeSource for EspSntpSource {
        fn start(&mut self) -> Result<(), ConnectivityError> {
            let sntp =
                EspSntp::new_default().map_err(|e| ConnectivityError::TimeSync(format!("{:?}", e)))?;
            self.sntp = Some(sntp);
            Ok(())
        }

        fn is_synced(&self) -> bool {
            self.sntp
                .as_ref()
                .map_or(false, |s| matches!(s.get_sync_status(), SyncStatus::Completed))
        }
    }
}
