use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use config_file::FromConfigFile;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::framerenderer::{Colors, Rgb};

/// One OLA universe carries 512 DMX channels, three per LED.
pub const LEDS_PER_UNIVERSE: usize = 170;

/// Longest notification hold accepted from a config file: one day.
pub const MAX_NOTIFY_HOLD_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strip: StripConfig,
    pub colors: ColorConfig,
    pub mqtt: MqttConfig,
    pub ola: OlaConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub length: usize,
    /// LEDs per color block in the waiting pattern.
    pub block_width: usize,
    pub tick_interval_ms: u64,
    pub notify_hold_ms: u64,
}

impl Default for StripConfig {
    fn default() -> Self {
        StripConfig {
            length: 100,
            block_width: 4,
            tick_interval_ms: 50,
            notify_hold_ms: 1000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    #[serde(deserialize_with = "deserialize_color")]
    pub waiting_primary: Rgb,
    #[serde(deserialize_with = "deserialize_color")]
    pub waiting_secondary: Rgb,
    #[serde(deserialize_with = "deserialize_color")]
    pub build_background: Rgb,
    #[serde(deserialize_with = "deserialize_color")]
    pub build_foreground: Rgb,
    #[serde(deserialize_with = "deserialize_color")]
    pub success: Rgb,
    #[serde(deserialize_with = "deserialize_color")]
    pub failure: Rgb,
}

impl Default for ColorConfig {
    fn default() -> Self {
        let colors = Colors::default();
        ColorConfig {
            waiting_primary: colors.waiting_primary,
            waiting_secondary: colors.waiting_secondary,
            build_background: colors.build_background,
            build_foreground: colors.build_foreground,
            success: colors.success,
            failure: colors.failure,
        }
    }
}

impl From<&ColorConfig> for Colors {
    fn from(config: &ColorConfig) -> Self {
        Colors {
            waiting_primary: config.waiting_primary,
            waiting_secondary: config.waiting_secondary,
            build_background: config.build_background,
            build_foreground: config.build_foreground,
            success: config.success,
            failure: config.failure,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Full server URI. Takes precedence over `endpoint`.
    pub url: Option<String>,
    /// Host name of a TLS broker such as an AWS IoT endpoint, connected to on port 8883.
    pub endpoint: Option<String>,
    pub client_id: String,
    pub topic: Option<String>,
    pub qos: i32,
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            url: None,
            endpoint: None,
            client_id: "buildlights".to_string(),
            topic: None,
            qos: 1,
            ca_cert: None,
            cert: None,
            private_key: None,
        }
    }
}

impl MqttConfig {
    pub fn server_uri(&self) -> Option<String> {
        match (&self.url, &self.endpoint) {
            (Some(url), _) => Some(url.clone()),
            (None, Some(endpoint)) => Some(format!("ssl://{endpoint}:8883")),
            (None, None) => None,
        }
    }

    pub fn uses_tls(&self) -> bool {
        self.ca_cert.is_some()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OlaConfig {
    pub address: SocketAddr,
    pub first_universe: u32,
}

impl Default for OlaConfig {
    fn default() -> Self {
        OlaConfig {
            address: SocketAddr::from(([127, 0, 0, 1], 7770)),
            first_universe: 0,
        }
    }
}

fn deserialize_color<'de, D>(deserializer: D) -> std::result::Result<Rgb, D::Error>
where
    D: Deserializer<'de>,
{
    let hex = String::deserialize(deserializer)?;
    parse_color(&hex).map_err(serde::de::Error::custom)
}

/// Parses `#rrggbb`, `rrggbb` or the three digit short forms.
pub fn parse_color(hex: &str) -> std::result::Result<Rgb, String> {
    Rgb::from_str(hex.trim()).map_err(|err| format!("invalid color {hex:?}: {err}"))
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let config = Config::from_config_file(path)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.strip.tick_interval_ms)
    }

    pub fn notify_hold(&self) -> Duration {
        Duration::from_millis(self.strip.notify_hold_ms)
    }

    /// Notification hold in whole ticks, rounded up.
    pub fn hold_ticks(&self) -> u32 {
        let tick = self.strip.tick_interval_ms.max(1);
        let ticks = self.strip.notify_hold_ms.div_ceil(tick);
        u32::try_from(ticks.max(1)).unwrap_or(u32::MAX)
    }

    /// Number of OLA universes the strip spans.
    pub fn universe_count(&self) -> usize {
        self.strip.length.div_ceil(LEDS_PER_UNIVERSE).max(1)
    }

    /// Checks everything the tick loop relies on. `with_mqtt` also requires a usable broker setup.
    pub fn validate(&self, with_mqtt: bool) -> Result<()> {
        if self.strip.length == 0 {
            return Err(Error::Configuration(
                "strip length must be at least 1".to_string(),
            ));
        }

        if self.strip.block_width == 0 {
            return Err(Error::Configuration(
                "block width must be at least 1".to_string(),
            ));
        }

        if self.strip.tick_interval_ms == 0 {
            return Err(Error::Configuration(
                "tick interval must be positive".to_string(),
            ));
        }

        if self.strip.notify_hold_ms == 0 {
            return Err(Error::Configuration(
                "notification hold must be positive".to_string(),
            ));
        }

        if self.strip.notify_hold_ms > MAX_NOTIFY_HOLD_MS {
            return Err(Error::Configuration(format!(
                "notification hold must be at most {MAX_NOTIFY_HOLD_MS} ms, got {}",
                self.strip.notify_hold_ms
            )));
        }

        let extra_universes = u32::try_from(self.universe_count() - 1).ok();
        if extra_universes
            .and_then(|extra| self.ola.first_universe.checked_add(extra))
            .is_none()
        {
            return Err(Error::Configuration(format!(
                "{} LEDs starting at universe {} run past the last OLA universe",
                self.strip.length, self.ola.first_universe
            )));
        }

        if !with_mqtt {
            return Ok(());
        }

        let mqtt = &self.mqtt;
        if mqtt.server_uri().is_none() {
            return Err(Error::Configuration(
                "an MQTT url or endpoint is required".to_string(),
            ));
        }

        match &mqtt.topic {
            Some(topic) if !topic.is_empty() => {}
            _ => {
                return Err(Error::Configuration(
                    "an MQTT topic is required".to_string(),
                ))
            }
        }

        if !(0..=2).contains(&mqtt.qos) {
            return Err(Error::Configuration(format!(
                "MQTT QoS must be 0, 1 or 2, got {}",
                mqtt.qos
            )));
        }

        let tls_files = [&mqtt.ca_cert, &mqtt.cert, &mqtt.private_key];
        let given = tls_files.iter().filter(|file| file.is_some()).count();
        if given != 0 && given != tls_files.len() {
            return Err(Error::Configuration(
                "ca_cert, cert and private_key must be given together".to_string(),
            ));
        }

        Ok(())
    }
}
