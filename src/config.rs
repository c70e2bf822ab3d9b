use std::str::FromStr;
use std::time::Duration;

use crate::error::EditorError;

pub const DEFAULT_GRID_SIZE: usize = 64;
// every tile index and the white clear color must stay distinct in 24 bits
pub const MAX_GRID_SIZE: usize = 4095;
pub const DEFAULT_HEIGHT_STEP: f32 = 0.5;
pub const DEFAULT_PLANT_DENSITY: f64 = 0.05;
pub const DEFAULT_SEED: u64 = 0x7117_ed17;

/// World-space edge length of one tile.
pub const TILE_SIZE: f32 = 1.0;

pub const UPDATE_HZ: f64 = 60.0;
// Caps the catch-up loop after a long stall (window drag, breakpoint).
pub const MAX_UPDATE_STEPS: u32 = 5;

/// Road variants live on a square atlas with this many cells per side.
pub const ROAD_ATLAS_DIM: u32 = 4;

pub const WINDOW_TITLE: &str = "tile editor";

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub grid_size: usize,
    pub height_step: f32,
    pub plant_density: f64,
    pub seed: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            height_step: DEFAULT_HEIGHT_STEP,
            plant_density: DEFAULT_PLANT_DENSITY,
            seed: DEFAULT_SEED,
        }
    }
}

impl EditorSettings {
    /// Defaults overridden by `TILE_EDITOR_*` environment variables. Bad values are
    /// reported and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut settings = Self::default();

        override_with(&lookup, "TILE_EDITOR_GRID_SIZE", &mut settings.grid_size);
        override_with(&lookup, "TILE_EDITOR_HEIGHT_STEP", &mut settings.height_step);
        override_with(&lookup, "TILE_EDITOR_PLANT_DENSITY", &mut settings.plant_density);
        override_with(&lookup, "TILE_EDITOR_SEED", &mut settings.seed);

        if settings.grid_size == 0 || settings.grid_size > MAX_GRID_SIZE {
            log::warn!(
                "grid size of {} requested, using {}",
                settings.grid_size,
                DEFAULT_GRID_SIZE
            );
            settings.grid_size = DEFAULT_GRID_SIZE;
        }
        if !(0.0..=1.0).contains(&settings.plant_density) {
            log::warn!(
                "plant density {} is not a fraction, using {}",
                settings.plant_density,
                DEFAULT_PLANT_DENSITY
            );
            settings.plant_density = DEFAULT_PLANT_DENSITY;
        }

        settings
    }

    pub fn update_dt(&self) -> Duration {
        Duration::from_secs_f64(1.0 / UPDATE_HZ)
    }
}

fn override_with<F, T>(lookup: &F, key: &'static str, slot: &mut T)
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match parse_setting(key, &raw) {
            Ok(value) => *slot = value,
            Err(e) => log::warn!("{}, keeping default", e),
        }
    }
}

pub fn parse_setting<T: FromStr>(key: &'static str, raw: &str) -> Result<T, EditorError> {
    raw.trim()
        .parse()
        .map_err(|_| EditorError::InvalidSetting {
            key,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_applied() {
        let settings = EditorSettings::from_lookup(|key| match key {
            "TILE_EDITOR_GRID_SIZE" => Some("12".to_string()),
            "TILE_EDITOR_HEIGHT_STEP" => Some(" 0.25 ".to_string()),
            _ => None,
        });

        assert_eq!(settings.grid_size, 12);
        assert_eq!(settings.height_step, 0.25);
        assert_eq!(settings.seed, DEFAULT_SEED);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let settings = EditorSettings::from_lookup(|key| match key {
            "TILE_EDITOR_GRID_SIZE" => Some("0".to_string()),
            "TILE_EDITOR_HEIGHT_STEP" => Some("tall".to_string()),
            "TILE_EDITOR_PLANT_DENSITY" => Some("3.5".to_string()),
            _ => None,
        });

        assert_eq!(settings, EditorSettings::default());
    }

    #[test]
    fn parse_setting_reports_key() {
        let err = parse_setting::<usize>("TILE_EDITOR_GRID_SIZE", "-4").unwrap_err();
        assert_eq!(
            err,
            EditorError::InvalidSetting {
                key: "TILE_EDITOR_GRID_SIZE",
                value: "-4".to_string()
            }
        );
    }
}
