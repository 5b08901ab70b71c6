//! WiFi station bring-up against a prioritised list of known networks

use crate::error::ConnectivityError;
use crate::types::NetworkCredential;
use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, warn};

/// Seconds to wait for one candidate to associate and get an address.
pub const MAX_WAIT_PER_CANDIDATE_S: u32 = 15;

/// Station-mode radio primitives.
pub trait WifiRadio {
    fn scan(&mut self) -> Result<Vec<String>, ConnectivityError>;
    /// Start associating; does not wait for the link to come up.
    fn begin_join(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn is_connected(&mut self) -> bool;
    fn abort_join(&mut self);
    fn address(&mut self) -> Option<String>;
}

/// An established station link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub ssid: String,
    pub address: String,
}

/// Progress hooks, used to put boot messages on the screen.
pub trait ConnectProgress {
    fn scanning(&mut self) {}
    fn joining(&mut self, _ssid: &str) {}
    fn failed(&mut self) {}
}

impl ConnectProgress for () {}

pub struct NetworkConnector<R, D> {
    radio: R,
    delay: D,
    max_wait_s: u32,
}

impl<R: WifiRadio, D: DelayMs<u32>> NetworkConnector<R, D> {
    pub fn new(radio: R, delay: D) -> Self {
        Self {
            radio,
            delay,
            max_wait_s: MAX_WAIT_PER_CANDIDATE_S,
        }
    }

    pub fn with_max_wait(mut self, seconds: u32) -> Self {
        self.max_wait_s = seconds;
        self
    }

    /// Join the first visible candidate that comes up within the per-candidate
    /// wait. Worst case blocks `candidates.len() * max_wait` seconds.
    pub fn connect(
        &mut self,
        candidates: &[NetworkCredential],
        progress: &mut impl ConnectProgress,
    ) -> Option<Link> {
        progress.scanning();
        let visible = match self.radio.scan() {
            Ok(visible) => visible,
            Err(e) => {
                warn!("⚠️ {}", e);
                Vec::new()
            }
        };
        debug!("Visible networks: {:?}", visible);

        for candidate in candidates {
            if !visible.iter().any(|ssid| ssid == &candidate.ssid) {
                continue;
            }

            info!("📶 Joining {}", candidate.ssid);
            progress.joining(&candidate.ssid);

            if let Err(e) = self.radio.begin_join(&candidate.ssid, &candidate.password) {
                warn!("⚠️ {}", e);
                continue;
            }

            if let Some(link) = self.wait_for_link(&candidate.ssid) {
                info!("✅ Connected to {} as {}", link.ssid, link.address);
                return Some(link);
            }

            warn!(
                "❌ {} did not come up within {}s",
                candidate.ssid, self.max_wait_s
            );
            self.radio.abort_join();
        }

        warn!("No known WiFi network could be joined");
        progress.failed();
        None
    }

    fn wait_for_link(&mut self, ssid: &str) -> Option<Link> {
        for _ in 0..self.max_wait_s {
            if self.radio.is_connected() {
                let address = self.radio.address().unwrap_or_else(|| "0.0.0.0".to_string());
                return Some(Link {
                    ssid: ssid.to_string(),
                    address,
                });
            }
            self.delay.delay_ms(1000);
        }
        None
    }

    pub fn into_radio(self) -> R {
        self.radio
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspWifiRadio;

#[cfg(target_os = "espidf")]
mod esp {
    use super::WifiRadio;
    use crate::error::ConnectivityError;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{
        AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
    };
    use log::{info, warn};

    pub struct EspWifiRadio {
        wifi: BlockingWifi<EspWifi<'static>>,
    }

    impl EspWifiRadio {
        pub fn new(
            modem: Modem,
            sys_loop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
        ) -> anyhow::Result<Self> {
            info!("🌐 Initializing WiFi station");

            let wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
            let mut wifi = BlockingWifi::wrap(wifi, sys_loop)?;

            // Station mode with no network; candidates are configured on join.
            wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
            wifi.start()?;

            Ok(Self { wifi })
        }
    }

    impl WifiRadio for EspWifiRadio {
        fn scan(&mut self) -> Result<Vec<String>, ConnectivityError> {
            let access_points = self
                .wifi
                .scan()
                .map_err(|e| ConnectivityError::Scan(format!("{:?}", e)))?;
            Ok(access_points
                .into_iter()
                .map(|ap| ap.ssid.as_str().to_string())
                .collect())
        }

        fn begin_join(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
            let auth_method = if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };

            let config = ClientConfiguration {
                ssid: ssid
                    .try_into()
                    .map_err(|_| ConnectivityError::Join("ssid too long".to_string()))?,
                password: password
                    .try_into()
                    .map_err(|_| ConnectivityError::Join("password too long".to_string()))?,
                auth_method,
                ..Default::default()
            };

            self.wifi
                .set_configuration(&Configuration::Client(config))
                .map_err(|e| ConnectivityError::Join(format!("{:?}", e)))?;

            // Non-blocking connect; the caller polls `is_connected`.
            self.wifi
                .wifi_mut()
                .connect()
                .map_err(|e| ConnectivityError::Join(format!("{:?}", e)))
        }

        fn is_connected(&mut self) -> bool {
            self.wifi.is_up().unwrap_or(false)
        }

        fn abort_join(&mut self) {
            if let Err(e) = self.wifi.wifi_mut().disconnect() {
                warn!("Failed to disconnect: {:?}", e);
            }
        }

        fn address(&mut self) -> Option<String> {
            self.wifi
                .wifi()
                .sta_netif()
                .get_ip_info()
                .ok()
                .map(|info| info.ip.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeRadio {
        visible: Vec<&'static str>,
        /// SSIDs that come up after the given number of polls.
        joinable: Vec<(&'static str, u32)>,
        joining: Option<(String, u32)>,
        join_log: Vec<String>,
        aborts: u32,
        scan_fails: bool,
    }

    impl WifiRadio for FakeRadio {
        fn scan(&mut self) -> Result<Vec<String>, ConnectivityError> {
            if self.scan_fails {
                return Err(ConnectivityError::Scan("radio off".to_string()));
            }
            Ok(self.visible.iter().map(|s| s.to_string()).collect())
        }

        fn begin_join(&mut self, ssid: &str, _password: &str) -> Result<(), ConnectivityError> {
            self.join_log.push(ssid.to_string());
            self.joining = Some((ssid.to_string(), 0));
            Ok(())
        }

        fn is_connected(&mut self) -> bool {
            let Some((ssid, polls)) = self.joining.as_mut() else {
                return false;
            };
            *polls += 1;
            self.joinable
                .iter()
                .any(|(name, after)| *name == ssid.as_str() && *polls > *after)
        }

        fn abort_join(&mut self) {
            self.aborts += 1;
            self.joining = None;
        }

        fn address(&mut self) -> Option<String> {
            Some("192.168.1.42".to_string())
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u32,
    }

    impl DelayMs<u32> for CountingDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
        }
    }

    fn creds(ssids: &[&str]) -> Vec<NetworkCredential> {
        ssids
            .iter()
            .map(|s| NetworkCredential {
                ssid: s.to_string(),
                password: "pw".to_string(),
            })
            .collect()
    }

    #[test]
    fn first_visible_candidate_in_configured_order_wins() {
        let radio = FakeRadio {
            visible: vec!["office", "home"],
            joinable: vec![("home", 0), ("office", 0)],
            ..Default::default()
        };
        let mut connector = NetworkConnector::new(radio, CountingDelay::default());

        let link = connector
            .connect(&creds(&["hotspot", "home", "office"]), &mut ())
            .unwrap();

        assert_eq!(link.ssid, "home");
        assert_eq!(link.address, "192.168.1.42");
        assert_eq!(connector.into_radio().join_log, vec!["home"]);
    }

    #[test]
    fn moves_on_after_bounded_wait() {
        let radio = FakeRadio {
            visible: vec!["home", "office"],
            joinable: vec![("office", 2)],
            ..Default::default()
        };
        let mut connector =
            NetworkConnector::new(radio, CountingDelay::default()).with_max_wait(5);

        let link = connector.connect(&creds(&["home", "office"]), &mut ()).unwrap();

        assert_eq!(link.ssid, "office");
        assert_eq!(connector.delay.total_ms, 5_000 + 2_000);
        let radio = connector.into_radio();
        assert_eq!(radio.join_log, vec!["home", "office"]);
        assert_eq!(radio.aborts, 1);
    }

    #[test]
    fn none_visible_returns_none_without_waiting() {
        let radio = FakeRadio {
            visible: vec!["neighbour"],
            ..Default::default()
        };
        let mut connector = NetworkConnector::new(radio, CountingDelay::default());

        assert_eq!(connector.connect(&creds(&["home"]), &mut ()), None);
        assert_eq!(connector.delay.total_ms, 0);
        assert!(connector.into_radio().join_log.is_empty());
    }

    #[test]
    fn scan_failure_is_offline_not_fatal() {
        let radio = FakeRadio {
            scan_fails: true,
            ..Default::default()
        };
        let mut connector = NetworkConnector::new(radio, CountingDelay::default());
        assert_eq!(connector.connect(&creds(&["home"]), &mut ()), None);
    }

    #[test]
    fn total_wait_is_bounded_by_candidates_times_max_wait() {
        let radio = FakeRadio {
            visible: vec!["a", "b", "c"],
            ..Default::default()
        };
        let mut connector =
            NetworkConnector::new(radio, CountingDelay::default()).with_max_wait(3);

        assert_eq!(connector.connect(&creds(&["a", "b", "c"]), &mut ()), None);
        assert!(connector.delay.total_ms <= 3 * 3 * 1000);
    }
}
