use crate::error::SensorError;
use crate::types::Reading;
use embassy_time::Instant;
use log::{debug, info};

/// Source of averaged raw load-cell magnitudes.
pub trait LoadCell {
    fn read_average(&mut self, samples: usize) -> Result<i32, SensorError>;
}

/// Turns raw load-cell counts into whole, non-negative grams.
pub struct CalibratedScale<C> {
    cell: C,
    calibration_factor: i32,
    offset: i32,
}

impl<C: LoadCell> CalibratedScale<C> {
    /// `calibration_factor` must be non-zero; `Configuration` enforces it.
    pub fn new(cell: C, calibration_factor: i32) -> Self {
        Self {
            cell,
            calibration_factor,
            offset: 0,
        }
    }

    /// Record the current load as zero.
    pub fn tare(&mut self, samples: usize) -> Result<(), SensorError> {
        self.offset = self.cell.read_average(samples)?;
        info!("Scale tared, offset = {}", self.offset);
        Ok(())
    }

    pub fn sample(&mut self, samples: usize, now: Instant) -> Result<Reading, SensorError> {
        let raw = self.cell.read_average(samples.max(1))?;
        let raw_magnitude = raw.saturating_sub(self.offset);
        let weight_g = grams(raw_magnitude, self.calibration_factor);
        debug!("Scale raw={} weight={}g", raw_magnitude, weight_g);

        Ok(Reading {
            raw_magnitude,
            weight_g,
            captured_at: now,
        })
    }
}

/// `max(0, round(raw / factor))`
pub fn grams(raw_magnitude: i32, calibration_factor: i32) -> i64 {
    let weight = (raw_magnitude as f64 / calibration_factor as f64).round() as i64;
    weight.max(0)
}
