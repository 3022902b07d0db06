use anyhow::{anyhow, Result};
use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chat::expiry::ExpiryHorizon;

/// Floor for intervals that re-arm themselves, so a zero in a hand-built
/// config cannot schedule work that is due again immediately.
pub const MIN_INTERVAL_MS: u64 = 1;

/// Every latency and policy knob used by the chat screens, in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// sending -> sent
    pub sending_delay_ms: u64,
    /// sent -> delivered
    pub delivered_delay_ms: u64,
    /// delivered -> read
    pub read_delay_ms: u64,
    /// Pause before the peer starts "typing" after a read, or after mount.
    pub typing_delay_ms: u64,
    pub typing_duration_ms: u64,
    /// Idle gap between typing bursts in the looping inbox preview.
    pub typing_idle_ms: u64,
    pub min_recording_ms: u64,
    pub expiry_sweep_interval_ms: u64,
    pub expiry_horizons: Vec<ExpiryHorizon>,
    pub auto_reply: bool,
    pub typing_on_mount: bool,
    pub inbox_typing_preview: bool,
    pub show_read_status: bool,
    pub replies: Vec<String>,
    pub reply_seed: Option<u64>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            sending_delay_ms: 500,
            delivered_delay_ms: 1000,
            read_delay_ms: 1500,
            typing_delay_ms: 1000,
            typing_duration_ms: 3000,
            typing_idle_ms: 5000,
            min_recording_ms: 1000,
            expiry_sweep_interval_ms: 10_000,
            expiry_horizons: vec![ExpiryHorizon::OneHour, ExpiryHorizon::OneDay, ExpiryHorizon::SevenDays],
            auto_reply: true,
            typing_on_mount: false,
            inbox_typing_preview: true,
            show_read_status: true,
            replies: vec![
                "Thanks, I'll take a look and get back to you.".to_string(),
                "Got it. I'll schedule maintenance for this week.".to_string(),
                "Could you send a photo of the issue?".to_string(),
                "The inspection is confirmed for tomorrow morning.".to_string(),
            ],
            reply_seed: None,
        }
    }
}

impl LifecycleConfig {
    pub fn sending_delay(&self) -> Duration {
        Duration::from_millis(self.sending_delay_ms)
    }

    pub fn delivered_delay(&self) -> Duration {
        Duration::from_millis(self.delivered_delay_ms)
    }

    pub fn read_delay(&self) -> Duration {
        Duration::from_millis(self.read_delay_ms)
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn typing_duration(&self) -> Duration {
        Duration::from_millis(self.typing_duration_ms.max(MIN_INTERVAL_MS))
    }

    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms.max(MIN_INTERVAL_MS))
    }

    pub fn min_recording(&self) -> Duration {
        Duration::from_millis(self.min_recording_ms)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_sweep_interval_ms.max(MIN_INTERVAL_MS))
    }

    /// Sum of the three delivery delays.
    pub fn full_delivery_time(&self) -> Duration {
        self.sending_delay() + self.delivered_delay() + self.read_delay()
    }

    pub fn validate(&self) -> Result<()> {
        let delays = [
            ("sending_delay_ms", self.sending_delay_ms),
            ("delivered_delay_ms", self.delivered_delay_ms),
            ("read_delay_ms", self.read_delay_ms),
            ("typing_duration_ms", self.typing_duration_ms),
            ("typing_idle_ms", self.typing_idle_ms),
            ("expiry_sweep_interval_ms", self.expiry_sweep_interval_ms),
        ];
        for (name, value) in delays {
            if value == 0 {
                return Err(anyhow!("{} must be greater than zero", name));
            }
        }
        if self.expiry_horizons.is_empty() {
            return Err(anyhow!("expiry_horizons must list at least one horizon"));
        }
        if self.auto_reply && self.replies.is_empty() {
            return Err(anyhow!("auto_reply is enabled but no replies are configured"));
        }
        Ok(())
    }
}

static CONFIG_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Point config loading at a specific file for the rest of the process.
/// Returns false if an override was already set.
pub fn set_config_path_override(path: PathBuf) -> bool {
    CONFIG_PATH_OVERRIDE.set(path).is_ok()
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("tenantline");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn get_config_path() -> Result<PathBuf> {
    if let Some(path) = CONFIG_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("config.json"))
}

/// Load the config from `path`, or the default location when `None`.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<LifecycleConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };

    if !config_path.exists() {
        info!("No config at {}, using defaults", config_path.display());
        return Ok(LifecycleConfig::default());
    }

    let mut file = File::open(&config_path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config: LifecycleConfig = serde_json::from_str(&contents)
        .map_err(|e| anyhow!("Invalid config {}: {}", config_path.display(), e))?;
    config.validate()?;
    info!("Loaded config from {}", config_path.display());

    Ok(config)
}

pub fn save_config(config: &LifecycleConfig, path: Option<&Path>) -> Result<()> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };
    let file = File::create(&config_path)?;
    serde_json::to_writer_pretty(file, config)?;

    info!("Config saved to {}", config_path.display());
    Ok(())
}
