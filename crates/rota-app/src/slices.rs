use crate::events::AppEvent;
use async_channel::Sender;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rota::adapter::{self, SliceEntry};
use rota::colors::SlicePalette;
use rota::config::HexColor;
use rota::ChartError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SliceDef {
    pub label: Option<String>,
    pub weight: f64,
    /// Picked from the default palette when omitted.
    pub color: Option<HexColor>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SlicesFile {
    #[serde(default)]
    pub slices: Vec<SliceDef>,
}

#[derive(Error, Debug)]
pub enum SlicesError {
    #[error(transparent)]
    Paths(#[from] rota::config::ConfigError),
    #[error("Slices file error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid slices: {0}")]
    Invalid(#[from] ChartError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

impl SlicesFile {
    /// Adapter entries for these slices. Weights must sum to 1.0.
    pub fn entries(&self) -> Result<Vec<SliceEntry>, SlicesError> {
        adapter::validate_weights(self.slices.iter().map(|s| s.weight))?;

        let mut palette = SlicePalette::new();
        Ok(self
            .slices
            .iter()
            .map(|def| {
                let fallback = palette.next_color();
                SliceEntry {
                    weight: def.weight,
                    color: def.color.map_or(fallback, |c| c.0),
                }
            })
            .collect())
    }

    pub fn labels(&self) -> Vec<String> {
        self.slices
            .iter()
            .enumerate()
            .map(|(i, def)| {
                def.label
                    .clone()
                    .unwrap_or_else(|| format!("Slice {}", i + 1))
            })
            .collect()
    }
}

pub fn get_slices_path() -> Result<PathBuf, SlicesError> {
    Ok(rota::config::project_dirs()?
        .config_dir()
        .join("slices.toml"))
}

pub fn load_slices() -> Result<SlicesFile, SlicesError> {
    let s = config::Config::builder()
        .add_source(config::File::from(get_slices_path()?).required(false))
        .build()?;

    Ok(s.try_deserialize()?)
}

fn default_slices() -> Result<SlicesFile, SlicesError> {
    let s = config::Config::builder()
        .add_source(config::File::from_str(
            DEFAULT_SLICES,
            config::FileFormat::Toml,
        ))
        .build()?;

    Ok(s.try_deserialize()?)
}

/// Slices from the user's file, or the bundled set when the file is missing,
/// empty or invalid.
pub fn load_or_default() -> SlicesFile {
    match load_slices().and_then(|file| file.entries().map(|_| file)) {
        Ok(file) if !file.slices.is_empty() => file,
        Ok(_) => default_slices().unwrap_or_default(),
        Err(e) => {
            log::warn!("Using bundled slices: {}", e);
            default_slices().unwrap_or_default()
        }
    }
}

pub fn write_default_slices() -> std::io::Result<PathBuf> {
    let path =
        get_slices_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_SLICES)?;
    }
    Ok(path)
}

const DEFAULT_SLICES: &str = include_str!("default_slices.toml");

fn create_watcher(
    bridge_tx: Sender<notify::Result<notify::Event>>,
    dir: &std::path::Path,
) -> Result<RecommendedWatcher, SlicesError> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let slices_path = match get_slices_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Slices watcher error: {}", e);
            return;
        }
    };
    let Some(slices_dir) = slices_path.parent().map(|p| p.to_path_buf()) else {
        return;
    };

    if let Err(e) = fs_err::create_dir_all(&slices_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    // dropping the watcher stops it, so it lives for the whole loop
    let _watcher = match create_watcher(bridge_tx, &slices_dir) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to watch slices file: {}", e);
            return;
        }
    };

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let meaningful_event = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if meaningful_event
                    && event.paths.iter().any(|p| p == &slices_path)
                    && tx.send(AppEvent::SlicesReload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_slices_are_valid() {
        let file = default_slices().unwrap();
        assert!(!file.slices.is_empty());

        let entries = file.entries().unwrap();
        assert_eq!(entries.len(), file.slices.len());
        assert_eq!(file.labels().len(), entries.len());
    }

    #[test]
    fn test_missing_colors_come_from_palette() {
        let file: SlicesFile = serde_json::from_str(
            r##"{"slices": [
                {"label": "a", "weight": 0.5, "color": "#102030"},
                {"weight": 0.5}
            ]}"##,
        )
        .unwrap();

        let entries = file.entries().unwrap();
        assert_eq!(entries[0].color, palette::Srgb::new(0x10, 0x20, 0x30));
        assert_eq!(entries[1].color, SlicePalette::new().take(2)[1]);
        assert_eq!(file.labels(), vec!["a".to_string(), "Slice 2".to_string()]);
    }

    #[test]
    fn test_bad_weights_are_rejected() {
        let file: SlicesFile =
            serde_json::from_str(r#"{"slices": [{"weight": 0.5}, {"weight": 0.2}]}"#).unwrap();
        assert!(matches!(file.entries(), Err(SlicesError::Invalid(_))));
    }
}
