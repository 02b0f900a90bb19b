use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{MoodlightError, Result};

/// Top-level configuration structure for the application.
///
/// Read once at start-up and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub adapters: AdapterSettings,
}

impl AppConfig {
    /// Loads a JSON configuration file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Applies `DMX_*`, `ARTNET_*`, `KINET_*` and `ESP32_*` overrides from the
    /// process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides using an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.adapters.dmx.apply_overrides("DMX", &lookup)?;
        self.adapters.artnet.apply_overrides("ARTNET", &lookup)?;
        self.adapters.kinet.apply_overrides("KINET", &lookup)?;
        self.adapters.esp32.apply_overrides("ESP32", &lookup)?;
        Ok(())
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }
}

/// Configuration specific to the audio analysis subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    /// Time constant of the per-bin magnitude smoothing.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub tick_rate_hz: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 2048,
            smoothing: 0.75,
            min_decibels: -100.0,
            max_decibels: -30.0,
            tick_rate_hz: 60,
        }
    }
}

/// Per-protocol destinations.
///
/// Each section may be partial; absent keys keep that protocol's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialAdapterSettings")]
pub struct AdapterSettings {
    /// sACN (E1.31) output.
    pub dmx: AdapterConfig,
    pub artnet: AdapterConfig,
    pub kinet: AdapterConfig,
    /// JSON fixture protocol, typically an ESP32 controller.
    pub esp32: AdapterConfig,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            dmx: AdapterConfig::new(5568, Some(1)),
            artnet: AdapterConfig::new(6454, Some(0)),
            kinet: AdapterConfig::new(6038, None),
            esp32: AdapterConfig::new(4210, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialAdapterSettings {
    dmx: PartialAdapter,
    artnet: PartialAdapter,
    kinet: PartialAdapter,
    esp32: PartialAdapter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialAdapter {
    enabled: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
    universe: Option<u16>,
}

impl PartialAdapter {
    fn merge_into(self, mut base: AdapterConfig) -> AdapterConfig {
        if let Some(enabled) = self.enabled {
            base.enabled = enabled;
        }
        if let Some(host) = self.host {
            base.host = host;
        }
        if let Some(port) = self.port {
            base.port = port;
        }
        if self.universe.is_some() {
            base.universe = self.universe;
        }
        base
    }
}

impl From<PartialAdapterSettings> for AdapterSettings {
    fn from(partial: PartialAdapterSettings) -> Self {
        let defaults = AdapterSettings::default();
        Self {
            dmx: partial.dmx.merge_into(defaults.dmx),
            artnet: partial.artnet.merge_into(defaults.artnet),
            kinet: partial.kinet.merge_into(defaults.kinet),
            esp32: partial.esp32.merge_into(defaults.esp32),
        }
    }
}

impl AdapterConfig {
    fn new(port: u16, universe: Option<u16>) -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port,
            universe,
        }
    }

    /// `host:port` string suitable for socket address resolution.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn apply_overrides<F>(&mut self, prefix: &str, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(&format!("{prefix}_ENABLED")) {
            self.enabled = value.trim() == "1";
        }
        if let Some(value) = lookup(&format!("{prefix}_HOST")) {
            self.host = value;
        }
        if let Some(value) = lookup(&format!("{prefix}_PORT")) {
            self.port = parse_number(&format!("{prefix}_PORT"), &value)?;
        }
        if let Some(value) = lookup(&format!("{prefix}_UNIVERSE")) {
            self.universe = Some(parse_number(&format!("{prefix}_UNIVERSE"), &value)?);
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|err| MoodlightError::InvalidConfig(format!("{key}={value:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_stock_ports() {
        let config = AppConfig::default();
        assert_eq!(config.adapters.dmx.port, 5568);
        assert_eq!(config.adapters.dmx.universe, Some(1));
        assert_eq!(config.adapters.artnet.port, 6454);
        assert_eq!(config.adapters.artnet.universe, Some(0));
        assert_eq!(config.adapters.kinet.port, 6038);
        assert_eq!(config.adapters.esp32.port, 4210);
        assert!(!config.adapters.esp32.enabled);
        assert_eq!(config.audio.fft_size, 2048);
    }

    #[test]
    fn environment_overrides_adapters() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup(&[
                ("ARTNET_ENABLED", "1"),
                ("ARTNET_HOST", "10.0.0.5"),
                ("ARTNET_UNIVERSE", "3"),
                ("KINET_ENABLED", "yes"),
                ("ESP32_PORT", "9000"),
            ]))
            .unwrap();

        assert!(config.adapters.artnet.enabled);
        assert_eq!(config.adapters.artnet.target(), "10.0.0.5:6454");
        assert_eq!(config.adapters.artnet.universe, Some(3));
        assert!(!config.adapters.kinet.enabled);
        assert_eq!(config.adapters.esp32.port, 9000);
    }

    #[test]
    fn rejects_unparsable_ports() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(lookup(&[("DMX_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(format!("{err}").contains("DMX_PORT"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = r#"{"adapters":{"kinet":{"enabled":true,"host":"fixture.local"}}}"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert!(config.adapters.kinet.enabled);
        assert_eq!(config.adapters.kinet.host, "fixture.local");
        assert_eq!(config.adapters.kinet.port, 6038);
        assert_eq!(config.adapters.dmx.universe, Some(1));
        assert_eq!(config.audio.sample_rate, 48_000);
    }

    #[test]
    fn adapter_sections_only_need_the_keys_they_change() {
        let raw = r#"{"adapters":{"kinet":{"enabled":true},"dmx":{"port":7000},"esp32":{}}}"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();

        assert!(config.adapters.kinet.enabled);
        assert_eq!(config.adapters.kinet.target(), "127.0.0.1:6038");
        assert_eq!(config.adapters.dmx.port, 7000);
        assert_eq!(config.adapters.dmx.universe, Some(1));
        assert!(!config.adapters.dmx.enabled);
        assert_eq!(config.adapters.esp32, AdapterSettings::default().esp32);
    }

    #[test]
    fn printed_configuration_loads_back() {
        let mut config = AppConfig::default();
        config.adapters.artnet.enabled = true;
        config.adapters.artnet.universe = Some(4);
        let text = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
