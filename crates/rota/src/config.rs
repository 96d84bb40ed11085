use directories::ProjectDirs;
use palette::Srgb;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, DurationMilliSeconds, SerializeDisplay, serde_as};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumIter, EnumString};
use thiserror::Error;

/// Fixed screen angle that the selected slice is rotated to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    SerializeDisplay,
    DeserializeFromStr,
    EnumString,
    EnumIter,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
pub enum Anchor {
    #[strum(serialize = "Right", serialize = "r", serialize = "0")]
    Right,
    #[default]
    #[strum(serialize = "Bottom", serialize = "b", serialize = "90")]
    Bottom,
    #[strum(serialize = "Left", serialize = "l", serialize = "180")]
    Left,
    #[strum(serialize = "Top", serialize = "t", serialize = "270")]
    Top,
}

impl Anchor {
    pub fn degrees(&self) -> f64 {
        match self {
            Self::Right => 0.0,
            Self::Bottom => 90.0,
            Self::Left => 180.0,
            Self::Top => 270.0,
        }
    }
}

/// `#rrggbb` color as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub struct HexColor(pub Srgb<u8>);

impl FromStr for HexColor {
    type Err = palette::rgb::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Srgb::from_str(s.trim()).map(Self)
    }
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0.red, self.0.green, self.0.blue)
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartConfig {
    pub anchor: Anchor,
    /// Velocity multiplier applied on every fling step; 1.0 never slows down.
    pub friction: f64,
    /// Pointer travel in pixels before a press becomes a drag.
    pub touch_slop: f64,
    /// Release speed in degrees per second needed to start a fling.
    pub min_fling_velocity: f64,
    /// Fling speed at which the chart is considered at rest.
    pub velocity_tolerance: f64,
    pub pixel_density: f64,
    /// Margin between the disc and the view edge, also the width of the
    /// background ring.
    pub chart_stroke: f64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub fling_step: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub snap_duration: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub toggle_duration: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub frame_interval: Duration,
    pub overshoot_tension: f64,
    pub background: HexColor,
    pub divider: HexColor,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            anchor: Anchor::Bottom,
            friction: 0.98,
            touch_slop: 8.0,
            min_fling_velocity: 50.0,
            velocity_tolerance: 40.0,
            pixel_density: 1.0,
            chart_stroke: 1.0,
            fling_step: Duration::from_millis(8),
            snap_duration: Duration::from_millis(300),
            toggle_duration: Duration::from_millis(400),
            frame_interval: Duration::from_millis(16),
            overshoot_tension: crate::animation::DEFAULT_OVERSHOOT_TENSION,
            background: HexColor(Srgb::new(0xff, 0xff, 0xff)),
            divider: HexColor(Srgb::new(0xff, 0xff, 0xff)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

pub fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("org", "rota", "rota").ok_or(ConfigError::ConfigDirNotFound)
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<ChartConfig, ConfigError> {
    let config_path = get_config_path()?;

    let s = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(config::Environment::with_prefix("ROTA"))
        .build()?;

    Ok(s.try_deserialize()?)
}

pub fn load_or_default() -> ChartConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Using default chart config: {}", e);
            ChartConfig::default()
        }
    }
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");
