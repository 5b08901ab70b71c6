//! Bit-banged HX711 load-cell ADC, channel A at gain 128

use crate::error::SensorError;
use crate::scales::LoadCell;
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};

const DATA_BITS: u32 = 24;
// Pulses after the data bits select the next conversion: 1 => channel A, gain 128.
const GAIN_128_PULSES: u32 = 1;
const READY_POLL_US: u32 = 1_000;
// 10 SPS parts need up to 100ms; leave headroom.
const READY_TIMEOUT_POLLS: u32 = 500;

pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    DOUT::Error: core::fmt::Debug,
    SCK: OutputPin,
    SCK::Error: core::fmt::Debug,
    D: DelayUs<u32>,
{
    pub fn new(dout: DOUT, mut sck: SCK, delay: D) -> Result<Self, SensorError> {
        sck.set_low()
            .map_err(|e| SensorError::Pin(format!("SCK low: {:?}", e)))?;
        Ok(Self { dout, sck, delay })
    }

    fn wait_ready(&mut self) -> Result<(), SensorError> {
        for _ in 0..READY_TIMEOUT_POLLS {
            let busy = self
                .dout
                .is_high()
                .map_err(|e| SensorError::Pin(format!("DOUT read: {:?}", e)))?;
            if !busy {
                return Ok(());
            }
            self.delay.delay_us(READY_POLL_US);
        }
        Err(SensorError::NotReady)
    }

    fn clock_bit(&mut self) -> Result<bool, SensorError> {
        self.sck
            .set_high()
            .map_err(|e| SensorError::Pin(format!("SCK high: {:?}", e)))?;
        self.delay.delay_us(1);
        let bit = self
            .dout
            .is_high()
            .map_err(|e| SensorError::Pin(format!("DOUT read: {:?}", e)))?;
        self.sck
            .set_low()
            .map_err(|e| SensorError::Pin(format!("SCK low: {:?}", e)))?;
        self.delay.delay_us(1);
        Ok(bit)
    }

    pub fn read(&mut self) -> Result<i32, SensorError> {
        self.wait_ready()?;

        let mut value: u32 = 0;
        for _ in 0..DATA_BITS {
            value = (value << 1) | self.clock_bit()? as u32;
        }
        for _ in 0..GAIN_128_PULSES {
            self.clock_bit()?;
        }

        Ok(sign_extend_24(value))
    }
}

impl<DOUT, SCK, D> LoadCell for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    DOUT::Error: core::fmt::Debug,
    SCK: OutputPin,
    SCK::Error: core::fmt::Debug,
    D: DelayUs<u32>,
{
    fn read_average(&mut self, samples: usize) -> Result<i32, SensorError> {
        let samples = samples.max(1);
        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += self.read()? as i64;
        }
        Ok((sum / samples as i64) as i32)
    }
}

fn sign_extend_24(value: u32) -> i32 {
    ((value << 8) as i32) >> 8
}

#[cfg(target_os = "espidf")]
pub type EspHx711<'d, DoutPin, SckPin> = Hx711<
    esp_idf_svc::hal::gpio::PinDriver<'d, DoutPin, esp_idf_svc::hal::gpio::Input>,
    esp_idf_svc::hal::gpio::PinDriver<'d, SckPin, esp_idf_svc::hal::gpio::Output>,
    esp_idf_svc::hal::delay::Ets,
>;

#[cfg(target_os = "espidf")]
pub fn create_load_cell<'d, DoutPin, SckPin>(
    dout: impl esp_idf_svc::hal::peripheral::Peripheral<P = DoutPin> + 'd,
    sck: impl esp_idf_svc::hal::peripheral::Peripheral<P = SckPin> + 'd,
) -> anyhow::Result<EspHx711<'d, DoutPin, SckPin>>
where
    DoutPin: esp_idf_svc::hal::gpio::InputPin,
    SckPin: esp_idf_svc::hal::gpio::OutputPin,
{
    use esp_idf_svc::hal::gpio::PinDriver;

    let dout = PinDriver::input(dout)?;
    let sck = PinDriver::output(sck)?;
    Ok(Hx711::new(dout, sck, esp_idf_svc::hal::delay::Ets)?)
}
