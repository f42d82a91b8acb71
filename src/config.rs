use std::time::Duration;

use anyhow::{Context, bail};
use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use serde::Deserialize;
use tracing::{error, info};

use campsite_navigation::map::ObstacleQuery;
use campsite_navigation::{DriverSettings, PathfinderSettings, WorldPoint};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const CONFIG_PATH_ENV: &str = "CAMPSITE_CONFIG";
const ENV_PREFIX: &str = "CAMPSITE";

/// Everything the simulation reads at startup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pathfinder: PathfinderSettings,
    pub driver: DriverSettings,
    pub world: WorldConfig,
    pub simulation: SimulationConfig,
}

/// Points of interest in the campsite and how obstacles are filtered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Where trucks leave from and return to.
    pub depot: WorldPoint,
    /// Delivery target.
    pub tent: WorldPoint,
    /// Sign from which shelter routes are previewed.
    pub sign: WorldPoint,
    /// Tag of colliders that become solid while it rains.
    pub rain_barrier_tag: Option<String>,
    pub obstacles: ObstacleQuery,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            depot: WorldPoint::new(1.0, 1.0),
            tent: WorldPoint::new(18.0, 10.5),
            sign: WorldPoint::new(10.0, 2.0),
            rain_barrier_tag: Some("Bridge".to_string()),
            obstacles: ObstacleQuery::default(),
        }
    }
}

/// Run length and weather schedule. Times are in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Orders placed before the simulation stops.
    pub deliveries: u32,
    /// Pause after a truck is back before the next order.
    pub order_interval_secs: f32,
    /// Give up on an order that takes longer than this.
    pub order_timeout_secs: f32,
    /// First rain starts this long after startup.
    pub rain_start_secs: f32,
    /// How long each shower lasts.
    pub rain_duration_secs: f32,
    /// Time between the starts of two showers.
    pub rain_period_secs: f32,
    /// How often a telemetry frame is published.
    pub telemetry_interval_secs: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            deliveries: 3,
            order_interval_secs: 2.0,
            order_timeout_secs: 120.0,
            rain_start_secs: 4.0,
            rain_duration_secs: 6.0,
            rain_period_secs: 30.0,
            telemetry_interval_secs: 1.0,
        }
    }
}

/// [`SimulationConfig`] with every time converted to a [`Duration`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub order_interval: Duration,
    pub order_timeout: Duration,
    pub rain_start: Duration,
    pub rain_duration: Duration,
    pub rain_period: Duration,
    pub telemetry_interval: Duration,
}

impl SimulationConfig {
    /// Converts the configured seconds to durations.
    ///
    /// # Errors
    ///
    /// Fails if any value is negative or not finite, if the telemetry
    /// interval or rain period is zero, or if a shower outlasts its period.
    pub fn timing(&self) -> anyhow::Result<Timing> {
        let timing = Timing {
            order_interval: secs(self.order_interval_secs, "order_interval_secs")?,
            order_timeout: secs(self.order_timeout_secs, "order_timeout_secs")?,
            rain_start: secs(self.rain_start_secs, "rain_start_secs")?,
            rain_duration: secs(self.rain_duration_secs, "rain_duration_secs")?,
            rain_period: secs(self.rain_period_secs, "rain_period_secs")?,
            telemetry_interval: secs(self.telemetry_interval_secs, "telemetry_interval_secs")?,
        };
        if timing.telemetry_interval.is_zero() || timing.rain_period.is_zero() {
            bail!("telemetry_interval_secs and rain_period_secs must be positive");
        }
        if timing.rain_duration >= timing.rain_period {
            bail!("rain_duration_secs must be shorter than rain_period_secs");
        }
        Ok(timing)
    }
}

fn secs(value: f32, name: &str) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f32(value).with_context(|| format!("simulation.{name} = {value} is not a valid duration"))
}

impl AppConfig {
    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid section with its name as context.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.pathfinder.validate().context("invalid [pathfinder] section")?;
        self.driver.validate().context("invalid [driver] section")?;
        self.simulation.timing().context("invalid [simulation] section")?;
        Ok(())
    }
}

/// Loads the configuration file plus `CAMPSITE__SECTION__KEY` overrides.
///
/// The file is `config/default.toml` unless `CAMPSITE_CONFIG` names another one.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!("Attempting to load configuration from {}", path);

    let settings = from_source(File::new(&path, FileFormat::Toml).required(true));

    match settings {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn from_source<S>(file: S) -> Result<AppConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        from_source(File::from_str(toml, FileFormat::Toml)).unwrap()
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = parse(include_str!("../config/default.toml"));
        config.validate().unwrap();
        assert_eq!(config.world.rain_barrier_tag.as_deref(), Some("Bridge"));
        assert!(config.world.obstacles.ignore_tags.iter().any(|t| t == "Shelter"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse("[driver]\nspeed = 5.0\n");
        assert_eq!(config.driver.speed, 5.0);
        assert_eq!(config.driver.arrive_distance, DriverSettings::default().arrive_distance);
        assert_eq!(config.pathfinder, PathfinderSettings::default());
        assert_eq!(config.simulation.deliveries, 3);
        assert_eq!(config.world.tent, WorldPoint::new(18.0, 10.5));
    }

    #[test]
    fn test_points_and_query_deserialize() {
        let config = parse(
            r#"
            [world]
            depot = { x = 2.0, y = 3.0 }
            [world.obstacles]
            ignore_tags = []
            ignore_colliders = [7]
            "#,
        );
        assert_eq!(config.world.depot, WorldPoint::new(2.0, 3.0));
        assert!(config.world.obstacles.ignore_tags.is_empty());
        assert_eq!(config.world.obstacles.ignore_colliders.len(), 1);
    }

    #[test]
    fn test_invalid_sections_are_rejected() {
        let config = parse("[pathfinder]\ncell_size = 0.0\n");
        assert!(config.validate().is_err());

        let config = parse("[simulation]\nrain_duration_secs = 40.0\nrain_period_secs = 30.0\n");
        assert!(config.validate().is_err());

        let config = parse("[simulation]\norder_interval_secs = -1.0\n");
        assert!(config.simulation.timing().is_err());
    }
}
