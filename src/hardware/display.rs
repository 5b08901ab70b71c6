//! SH1106 OLED status screen
//! Rendered with embedded-graphics mono fonts

use crate::error::DisplayError;
use crate::wifi::manager::ConnectProgress;
use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use log::{debug, info, warn};
use sh1106::Builder;

/// Characters of FONT_6X10 that fit across the 128px panel.
pub const TEXT_COLUMNS: usize = 21;

/// What the control loop needs from the local screen.
pub trait Screen {
    fn power_on(&mut self) -> Result<(), DisplayError>;
    fn power_off(&mut self) -> Result<(), DisplayError>;
    /// Weight, status line, and network line (`IP: ...` or `No network`).
    fn show_status(&mut self, weight_g: i64, message: &str, link: &str)
        -> Result<(), DisplayError>;
    /// Plain text screen used during boot.
    fn show_lines(&mut self, lines: &[&str]) -> Result<(), DisplayError>;
}

pub struct DisplayController<I2C>
where
    I2C: embedded_hal::blocking::i2c::Write + embedded_hal::blocking::i2c::WriteRead,
{
    display: sh1106::mode::GraphicsMode<sh1106::interface::I2cInterface<I2C>>,
}

fn draw_err(e: impl core::fmt::Debug) -> DisplayError {
    DisplayError::Bus(format!("draw: {:?}", e))
}

fn flush_err(e: impl core::fmt::Debug) -> DisplayError {
    DisplayError::Bus(format!("flush: {:?}", e))
}

impl<I2C> DisplayController<I2C>
where
    I2C: embedded_hal::blocking::i2c::Write + embedded_hal::blocking::i2c::WriteRead,
    <I2C as embedded_hal::blocking::i2c::Write>::Error: core::fmt::Debug,
    <I2C as embedded_hal::blocking::i2c::WriteRead>::Error: core::fmt::Debug,
{
    pub fn new(i2c: I2C) -> Result<Self, DisplayError> {
        info!("Initializing SH1106 OLED display");

        let mut display: sh1106::mode::GraphicsMode<_> = Builder::new().connect_i2c(i2c).into();

        display
            .init()
            .map_err(|e| DisplayError::Bus(format!("init: {:?}", e)))?;
        display.clear();
        display.flush().map_err(flush_err)?;

        info!("✅ SH1106 display initialized successfully");

        Ok(Self { display })
    }
}

impl<I2C> Screen for DisplayController<I2C>
where
    I2C: embedded_hal::blocking::i2c::Write + embedded_hal::blocking::i2c::WriteRead,
    <I2C as embedded_hal::blocking::i2c::Write>::Error: core::fmt::Debug,
    <I2C as embedded_hal::blocking::i2c::WriteRead>::Error: core::fmt::Debug,
{
    /// Re-runs the panel init sequence, which ends with display-on.
    fn power_on(&mut self) -> Result<(), DisplayError> {
        self.display
            .init()
            .map_err(|e| DisplayError::Bus(format!("power on: {:?}", e)))
    }

    /// Blanks the panel; the next `show_status` redraws it.
    fn power_off(&mut self) -> Result<(), DisplayError> {
        self.display.clear();
        self.display.flush().map_err(flush_err)
    }

    fn show_status(
        &mut self,
        weight_g: i64,
        message: &str,
        link: &str,
    ) -> Result<(), DisplayError> {
        self.display.clear();

        let weight_style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        let weight_text = format!("{}g", weight_g);
        Text::with_baseline(&weight_text, Point::new(10, 6), weight_style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(draw_err)?;

        Text::with_baseline(message, Point::new(0, 34), text_style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(draw_err)?;

        Text::with_baseline(link, Point::new(0, 52), text_style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(draw_err)?;

        self.display.flush().map_err(flush_err)?;
        debug!("Display refresh completed");
        Ok(())
    }

    fn show_lines(&mut self, lines: &[&str]) -> Result<(), DisplayError> {
        self.display.clear();
        let text_style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        for (row, line) in lines.iter().enumerate() {
            Text::with_baseline(
                line,
                Point::new(0, row as i32 * 12),
                text_style,
                Baseline::Top,
            )
            .draw(&mut self.display)
            .map_err(draw_err)?;
        }

        self.display.flush().map_err(flush_err)
    }
}

/// Shows WiFi bring-up progress on the screen during boot.
pub struct BootScreen<'a, D> {
    screen: &'a mut D,
}

impl<'a, D: Screen> BootScreen<'a, D> {
    pub fn new(screen: &'a mut D) -> Self {
        Self { screen }
    }

    fn show(&mut self, lines: &[&str]) {
        if let Err(e) = self.screen.show_lines(lines) {
            warn!("⚠️ {}", e);
        }
    }
}

impl<D: Screen> ConnectProgress for BootScreen<'_, D> {
    fn scanning(&mut self) {
        self.show(&["Scanning WiFi..."]);
    }

    fn joining(&mut self, ssid: &str) {
        self.show(&["Joining", ssid]);
    }

    fn failed(&mut self) {
        self.show(&["No WiFi Found!"]);
    }
}

// Helper function to create display controller from ESP32 I2C pins
#[cfg(target_os = "espidf")]
pub fn create_display_controller(
    i2c: impl esp_idf_svc::hal::peripheral::Peripheral<P = impl esp_idf_svc::hal::i2c::I2c> + 'static,
    sda: impl esp_idf_svc::hal::peripheral::Peripheral<
            P = impl esp_idf_svc::hal::gpio::InputPin + esp_idf_svc::hal::gpio::OutputPin,
        > + 'static,
    scl: impl esp_idf_svc::hal::peripheral::Peripheral<
            P = impl esp_idf_svc::hal::gpio::InputPin + esp_idf_svc::hal::gpio::OutputPin,
        > + 'static,
) -> anyhow::Result<DisplayController<esp_idf_svc::hal::i2c::I2cDriver<'static>>> {
    use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_svc::hal::prelude::*;

    info!("Setting up I2C for SH1106 display");

    let config = I2cConfig::new().baudrate(400.kHz().into());
    let i2c = I2cDriver::new(i2c, sda, scl, &config)?;

    Ok(DisplayController::new(i2c)?)
}
