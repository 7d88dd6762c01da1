//! Configuration resolution for `FieldAlert`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/fieldalert/settings.json)
//! 3. Project config (.fieldalert/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

/// Complete `FieldAlert` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service_area: ServiceAreaConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_area: ServiceAreaConfig::default(),
            location: LocationConfig::default(),
            media: MediaConfig::default(),
            remote: RemoteConfig::default(),
            queue: QueueConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// The circular service area a reporter must be inside to submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAreaConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    /// Confirmation radius around the center, in meters.
    pub radius_meters: f64,
    /// Case-insensitive token that confirms membership when present in the
    /// reverse-geocoded address.
    pub locality_token: String,
    /// Human name of the area, used in synthesized location strings.
    pub area_label: String,
}

impl ServiceAreaConfig {
    pub const fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_latitude, self.center_longitude)
    }
}

impl Default for ServiceAreaConfig {
    fn default() -> Self {
        Self {
            center_latitude: 14.2814,
            center_longitude: 121.4161,
            radius_meters: 5_000.0,
            locality_token: "Santa Cruz".to_string(),
            area_label: "Santa Cruz".to_string(),
        }
    }
}

/// Location fix acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Bounded wait for a single fix, in seconds.
    pub fix_timeout_secs: u64,
    /// Renewed attempts allowed after the first one times out.
    pub fix_renewals: u32,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fix_timeout_secs: 15,
            fix_renewals: 1,
        }
    }
}

/// Evidence media sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Target long-edge dimension in pixels.
    pub max_dimension: u32,
    /// Target encoded size in bytes (best effort).
    pub byte_budget: usize,
    pub quality_start: u8,
    pub quality_step: u8,
    pub quality_floor: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            byte_budget: 400 * 1024, // 400 KB
            quality_start: 75,
            quality_step: 10,
            quality_floor: 40,
        }
    }
}

/// Remote report store and station directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the JSON tree store. `None` disables remote features.
    pub base_url: Option<String>,
    /// Root node holding one child per responder station.
    pub station_root: String,
    /// Root node holding reporter profiles.
    pub profile_root: String,
    pub auth_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            station_root: "Stations".to_string(),
            profile_root: "Users".to_string(),
            auth_token: None,
        }
    }
}

/// Offline queue storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Reject settings the pipeline cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let area = &self.service_area;
        GeoPoint::checked(area.center_latitude, area.center_longitude)?;
        if !(area.radius_meters.is_finite() && area.radius_meters > 0.0) {
            return Err(Error::Config(format!(
                "service_area.radius_meters must be positive, got {}",
                area.radius_meters
            )));
        }
        if area.locality_token.trim().is_empty() {
            return Err(Error::Config(
                "service_area.locality_token must not be empty".into(),
            ));
        }

        let media = &self.media;
        if media.max_dimension == 0 {
            return Err(Error::Config("media.max_dimension must be non-zero".into()));
        }
        if media.quality_step == 0 {
            return Err(Error::Config("media.quality_step must be non-zero".into()));
        }
        if media.quality_floor > media.quality_start || media.quality_start > 100 {
            return Err(Error::Config(format!(
                "media quality must satisfy floor <= start <= 100, got floor {} start {}",
                media.quality_floor, media.quality_start
            )));
        }

        if self.location.fix_timeout_secs == 0 {
            return Err(Error::Config("location.fix_timeout_secs must be non-zero".into()));
        }
        Ok(())
    }
}

/// Load configuration with hierarchical resolution.
///
/// Each settings file overrides only the keys it contains.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut layered = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            merge_settings(&mut layered, read_settings(&global_path)?);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".fieldalert").join("settings.json");
        if project_path.exists() {
            merge_settings(&mut layered, read_settings(&project_path)?);
        }
    }

    let mut config: Config = serde_json::from_value(layered)
        .map_err(|e| Error::Config(format!("Invalid settings: {e}")))?;
    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// Load an explicitly chosen settings file in place of the global and
/// project files. Environment overrides still apply.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let mut config = load_config_file(path)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load a single settings file; missing keys keep their defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let mut layered = serde_json::to_value(Config::default())?;
    merge_settings(&mut layered, read_settings(path)?);
    serde_json::from_value(layered).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn read_settings(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("fieldalert").join("settings.json"))
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
}

/// Recursively overlay `overlay` onto `base`. Objects merge key by key;
/// `null` leaves the base value in place.
fn merge_settings(base: &mut serde_json::Value, overlay: serde_json::Value) {
    use serde_json::Value;

    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_settings(existing, value),
                    None => {
                        if !value.is_null() {
                            base.insert(key, value);
                        }
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("FIELDALERT_REMOTE_URL") {
        config.remote.base_url = Some(val);
    }
    if let Ok(val) = std::env::var("FIELDALERT_REMOTE_TOKEN") {
        config.remote.auth_token = Some(val);
    }
    if let Ok(val) = std::env::var("FIELDALERT_QUEUE_PATH") {
        config.queue.database_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("FIELDALERT_RADIUS_METERS") {
        if let Ok(n) = val.parse() {
            config.service_area.radius_meters = n;
        }
    }
    if let Ok(val) = std::env::var("FIELDALERT_LOCALITY") {
        config.service_area.locality_token = val;
    }
    if let Ok(val) = std::env::var("FIELDALERT_LOG_LEVEL") {
        config.log_level = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_media_budget_is_400_kb() {
        let media = MediaConfig::default();
        assert_eq!(media.byte_budget, 409_600);
        assert_eq!(
            (media.quality_start, media.quality_step, media.quality_floor),
            (75, 10, 40)
        );
    }

    #[test]
    fn zero_radius_is_rejected() {
        let mut config = Config::default();
        config.service_area.radius_meters = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn floor_above_start_is_rejected() {
        let mut config = Config::default();
        config.media.quality_floor = 80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"service_area": {"center_latitude": 10.0, "center_longitude": 120.0,
                "radius_meters": 800.0, "locality_token": "Poblacion", "area_label": "Poblacion"}}"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert!((config.service_area.radius_meters - 800.0).abs() < f64::EPSILON);
        assert_eq!(config.media.max_dimension, 1024);
        assert_eq!(config.remote.station_root, "Stations");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn explicit_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"service_area": {"radius_meters": 0.0}}"#).unwrap();
        assert!(matches!(load_config_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, r#"{"log_level": "warn"}"#).unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert!((config.service_area.radius_meters - 5_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overlay_without_remote_keeps_base_url() {
        let mut base = serde_json::to_value(Config::default()).unwrap();
        base["remote"]["base_url"] = "https://reports.example".into();
        merge_settings(&mut base, serde_json::json!({"log_level": "debug", "remote": {"base_url": null}}));
        let config: Config = serde_json::from_value(base).unwrap();
        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://reports.example")
        );
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn project_layer_overrides_only_its_own_keys() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.json");
        let project = dir.path().join("project.json");
        std::fs::write(
            &global,
            r#"{"service_area": {"radius_meters": 800.0, "locality_token": "Poblacion"},
                "media": {"byte_budget": 200000}}"#,
        )
        .unwrap();
        std::fs::write(
            &project,
            r#"{"remote": {"base_url": "https://reports.example"}, "media": {"quality_floor": 30}}"#,
        )
        .unwrap();

        let mut layered = serde_json::to_value(Config::default()).unwrap();
        merge_settings(&mut layered, read_settings(&global).unwrap());
        merge_settings(&mut layered, read_settings(&project).unwrap());
        let config: Config = serde_json::from_value(layered).unwrap();

        assert!((config.service_area.radius_meters - 800.0).abs() < f64::EPSILON);
        assert_eq!(config.service_area.locality_token, "Poblacion");
        assert_eq!(config.media.byte_budget, 200_000);
        assert_eq!(config.media.quality_floor, 30);
        assert_eq!(config.media.quality_start, 75);
        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://reports.example")
        );
        assert_eq!(config.remote.station_root, "Stations");
    }
}
