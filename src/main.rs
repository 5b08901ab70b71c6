#[cfg(target_os = "espidf")]
use calorie_scale::{
    cloud::{EspHttpFetch, NutritionLookup},
    controller::ControlLoop,
    hardware::{create_display_controller, create_load_cell, BootScreen, Screen},
    scales::CalibratedScale,
    server::{RequestRouter, TcpConnectionListener},
    state::AppState,
    storage::{mount_spiffs, FileLogStore, LogSink, MOUNT_POINT},
    system::Configuration,
    types::LOG_FILE_NAME,
    wifi::{sync_once, EspSntpSource, EspWifiRadio, NetworkConnector, SystemClock, SYNC_WAIT_S},
};
#[cfg(target_os = "espidf")]
use embassy_executor::Spawner;
#[cfg(target_os = "espidf")]
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
const TARE_SAMPLES: usize = 10;
#[cfg(target_os = "espidf")]
const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[cfg(target_os = "espidf")]
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting Calorie Scale");

    if let Err(e) = boot().await {
        error!("Boot failed: {:#}", e);
    }
}

#[cfg(target_os = "espidf")]
async fn boot() -> anyhow::Result<()> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::prelude::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    let config = Configuration::embedded()?;
    info!(
        "Config: factor={} offset={}s timeout={}s networks={}",
        config.calibration_factor,
        config.gmt_offset_seconds,
        config.screen_timeout_seconds,
        config.networks.len()
    );

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    let mut screen = create_display_controller(peripherals.i2c0, pins.gpio4, pins.gpio5)?;
    if let Err(e) = screen.show_lines(&["Calorie Scale", "Starting..."]) {
        warn!("⚠️ {}", e);
    }

    let load_cell = create_load_cell(pins.gpio16, pins.gpio17)?;
    let mut scale = CalibratedScale::new(load_cell, config.calibration_factor);
    if let Err(e) = scale.tare(TARE_SAMPLES) {
        warn!("⚠️ Tare failed, weights are uncorrected: {}", e);
    }

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let radio = EspWifiRadio::new(peripherals.modem, sys_loop, nvs)?;

    let mut connector = NetworkConnector::new(radio, FreeRtos);
    let link = connector.connect(&config.networks, &mut BootScreen::new(&mut screen));
    // The station link lives as long as the radio driver.
    let _radio = connector.into_radio();

    let mut sntp = EspSntpSource::default();
    if link.is_some() {
        sync_once(&mut sntp, &mut FreeRtos, SYNC_WAIT_S);
    }

    if let Err(e) = mount_spiffs() {
        warn!("⚠️ {} - log entries will not be saved locally", e);
    }

    let router = RequestRouter::new(
        NutritionLookup::new(config.nutrition_api_key.clone()),
        LogSink::new(
            FileLogStore::new(format!("{}/{}", MOUNT_POINT, LOG_FILE_NAME)),
            config.webhook_url.clone(),
        ),
        EspHttpFetch::new(HTTP_TIMEOUT),
        SystemClock,
        config.gmt_offset_seconds,
    );

    let listener: Option<TcpConnectionListener> = match &link {
        Some(_) => match TcpConnectionListener::bind("0.0.0.0:80") {
            Ok(listener) => Some(listener),
            Err(e) => {
                warn!("⚠️ Web server unavailable: {:#}", e);
                None
            }
        },
        None => {
            warn!("⚠️ Offline mode: web server disabled");
            None
        }
    };

    let state = AppState::new(config.screen_timeout(), link, embassy_time::Instant::now());
    let mut control = ControlLoop::new(scale, screen, listener, router, state);
    control.run().await
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    println!("calorie-scale runs on ESP32 (target_os = \"espidf\"); run `cargo test` for the host-side logic.");
}
