//! Mission configuration – reads/writes `~/.scout/config.toml`.
//!
//! ```toml
//! [decision]
//! throttle_setting = 0.2
//! stop_threshold = 50
//!
//! [mission]
//! max_ticks = 2000
//! tick_hz = 0.0        # 0 runs unpaced
//! seed_samples = 6
//!
//! [logging]
//! format = "compact"   # or "json"
//! ```
//!
//! Every table and field is optional; missing ones take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scout_decision::DecisionConfig;
use scout_runtime::LogFormat;

/// Persisted user configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub decision: DecisionConfig,

    #[serde(default)]
    pub mission: MissionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How long the mission runs and what the simulated field holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Control rate.  `0` runs as fast as the host allows.
    #[serde(default)]
    pub tick_hz: f32,

    /// Rock samples scattered around the landing site.
    #[serde(default = "default_seed_samples")]
    pub seed_samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_max_ticks() -> u64 {
    2000
}
fn default_seed_samples() -> usize {
    6
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            tick_hz: 0.0,
            seed_samples: default_seed_samples(),
        }
    }
}

impl MissionConfig {
    /// Tick period, or `None` for an unpaced loop.
    ///
    /// Also `None` when the rate is so low its period overflows a
    /// [`Duration`]; [`Config::validate`] rejects such rates.
    pub fn period(&self) -> Option<Duration> {
        if self.tick_hz <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / f64::from(self.tick_hz)).ok()
    }
}

impl Config {
    /// Reject configurations the mission cannot start with.
    pub fn validate(&self) -> Result<(), String> {
        self.decision.validate().map_err(|e| e.to_string())?;
        if !self.mission.tick_hz.is_finite() || self.mission.tick_hz < 0.0 {
            return Err(format!(
                "mission.tick_hz must be a non-negative number, got {}",
                self.mission.tick_hz
            ));
        }
        if self.mission.tick_hz > 0.0 && self.mission.period().is_none() {
            return Err(format!(
                "mission.tick_hz {} is too low; its tick period does not fit a duration",
                self.mission.tick_hz
            ));
        }
        Ok(())
    }
}

/// Return the path to `~/.scout/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".scout").join("config.toml")
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// The effective configuration: file (or defaults), then `SCOUT_*`
/// overrides, then validation.
pub fn load_effective(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `SCOUT_*` environment variable overrides to `cfg`.
///
/// Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `SCOUT_MAX_TICKS` | `mission.max_ticks` |
/// | `SCOUT_TICK_HZ` | `mission.tick_hz` |
/// | `SCOUT_THROTTLE` | `decision.throttle_setting` |
/// | `SCOUT_MAX_VELOCITY` | `decision.max_velocity` |
/// | `SCOUT_LOG_FORMAT` | `logging.format` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SCOUT_MAX_TICKS")
        && let Ok(ticks) = v.parse::<u64>()
    {
        cfg.mission.max_ticks = ticks;
    }
    if let Ok(v) = std::env::var("SCOUT_TICK_HZ")
        && let Ok(hz) = v.parse::<f32>()
    {
        cfg.mission.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("SCOUT_THROTTLE")
        && let Ok(throttle) = v.parse::<f32>()
    {
        cfg.decision.throttle_setting = throttle;
    }
    if let Ok(v) = std::env::var("SCOUT_MAX_VELOCITY")
        && let Ok(velocity) = v.parse::<f32>()
    {
        cfg.decision.max_velocity = velocity;
    }
    if let Ok(v) = std::env::var("SCOUT_LOG_FORMAT")
        && let Ok(format) = v.parse::<LogFormat>()
    {
        cfg.logging.format = format;
    }
}

/// Save the config to `path`, creating parent directories if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = to_toml(cfg)?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

pub fn to_toml(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
        assert_eq!(loaded.mission.max_ticks, 2000);
        assert_eq!(loaded.decision.resume_threshold, 500);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("scout.toml");
        fs::write(
            &path,
            "[decision]\nbrake_setting = 8.0\n\n[mission]\nseed_samples = 2\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.decision.brake_setting, 8.0);
        assert_eq!(cfg.decision.stop_threshold, 50);
        assert_eq!(cfg.mission.seed_samples, 2);
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn config_path_points_to_scout_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".scout"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[mission]\nmax_ticks = \"lots\"\n").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn effective_config_rejects_invalid_decision_values() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("scout.toml");
        fs::write(&path, "[decision]\nmax_steer = -1.0\n").unwrap();
        let err = load_effective(&path).unwrap_err();
        assert!(err.contains("Invalid configuration"), "{err}");
    }

    #[test]
    fn negative_tick_rate_is_rejected() {
        let mut cfg = Config::default();
        cfg.mission.tick_hz = -5.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn period_follows_tick_rate() {
        let mut mission = MissionConfig::default();
        assert_eq!(mission.period(), None);
        mission.tick_hz = 20.0;
        assert_eq!(mission.period(), Some(Duration::from_millis(50)));
        mission.tick_hz = 0.5;
        assert_eq!(mission.period(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn vanishing_tick_rate_is_rejected_not_panicking() {
        let mut cfg = Config::default();
        cfg.mission.tick_hz = 1e-20;
        assert_eq!(cfg.mission.period(), None);
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("tick_hz"));

        cfg.mission.tick_hz = f32::from_bits(1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn apply_env_overrides_changes_max_ticks() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("SCOUT_MAX_TICKS", "42") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.mission.max_ticks, 42);
        unsafe { std::env::remove_var("SCOUT_MAX_TICKS") };
    }

    #[test]
    fn apply_env_overrides_changes_throttle() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("SCOUT_THROTTLE", "0.35") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.decision.throttle_setting, 0.35);
        unsafe { std::env::remove_var("SCOUT_THROTTLE") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_velocity() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("SCOUT_MAX_VELOCITY", "fast") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.decision.max_velocity, 2.0);
        unsafe { std::env::remove_var("SCOUT_MAX_VELOCITY") };
    }

    #[test]
    fn apply_env_overrides_changes_log_format() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("SCOUT_LOG_FORMAT", "json") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        unsafe { std::env::remove_var("SCOUT_LOG_FORMAT") };
    }
}
