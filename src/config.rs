use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::SettingsError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldSettings {
    pub seed: u32,
    #[serde(default)]
    pub streaming: StreamingSettings,
    #[serde(default)]
    pub workers: WorkerSettings,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 1337,
            streaming: StreamingSettings::default(),
            workers: WorkerSettings::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StreamingSettings {
    /// Chebyshev radius, in chunks, of the loaded square.
    pub render_distance: i32,
    /// Chunk-widths of slack past the square's corners before unloading.
    pub unload_margin: i32,
    pub update_distance_threshold: f32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            render_distance: RENDER_DISTANCE,
            unload_margin: UNLOAD_MARGIN,
            update_distance_threshold: UPDATE_DISTANCE_THRESHOLD,
        }
    }
}

impl StreamingSettings {
    /// World-unit radius past which a loaded column is dropped. Always covers the
    /// corners of the load square, so nothing loaded is immediately unloaded.
    pub fn unload_radius(&self) -> f32 {
        let corner = self.render_distance as f32 * std::f32::consts::SQRT_2;
        (corner + self.unload_margin as f32) * CHUNK_SIZE as f32
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WorkerSettings {
    /// 0 picks a count from the number of cores.
    pub generation_threads: usize,
    pub mesh_threads: usize,
    pub generation_queue_capacity: usize,
    pub mesh_queue_capacity: usize,
    pub poll_interval_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            generation_threads: 0,
            mesh_threads: 0,
            generation_queue_capacity: GENERATION_QUEUE_CAPACITY,
            mesh_queue_capacity: MESH_QUEUE_CAPACITY,
            poll_interval_ms: POLL_INTERVAL_MILLIS,
        }
    }
}

impl WorkerSettings {
    pub fn generation_thread_count(&self) -> usize {
        resolve_threads(self.generation_threads)
    }

    pub fn mesh_thread_count(&self) -> usize {
        resolve_threads(self.mesh_threads)
    }
}

fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        (num_cpus::get() / 2).max(1)
    }
}

impl WorldSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: WorldSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Falls back to defaults when the file is missing or unusable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.streaming.render_distance < 1 {
            return Err(SettingsError::Invalid(format!(
                "render_distance must be at least 1, got {}",
                self.streaming.render_distance
            )));
        }
        if self.streaming.unload_margin < 1 {
            return Err(SettingsError::Invalid(format!(
                "unload_margin must be at least 1, got {}",
                self.streaming.unload_margin
            )));
        }
        if self.streaming.update_distance_threshold <= 0.0 {
            return Err(SettingsError::Invalid(
                "update_distance_threshold must be positive".to_string(),
            ));
        }
        if self.workers.generation_queue_capacity == 0 || self.workers.mesh_queue_capacity == 0 {
            return Err(SettingsError::Invalid(
                "queue capacities must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: WorldSettings =
            serde_json::from_str(r#"{ "seed": 9, "streaming": { "render_distance": 4 } }"#)
                .unwrap();
        assert_eq!(settings.seed, 9);
        assert_eq!(settings.streaming.render_distance, 4);
        assert_eq!(settings.streaming.unload_margin, UNLOAD_MARGIN);
        assert_eq!(settings.workers, WorkerSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unload_radius_clears_load_square_corners() {
        let streaming = StreamingSettings {
            render_distance: 2,
            ..Default::default()
        };
        // farthest loaded column center sits at (2.5, 2.5) chunks from a viewpoint at a corner
        let corner = 2.5 * std::f32::consts::SQRT_2 * CHUNK_SIZE as f32;
        assert!(streaming.unload_radius() > corner);
    }

    #[test]
    fn invalid_render_distance_is_rejected() {
        let mut settings = WorldSettings::default();
        settings.streaming.render_distance = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("minestream-missing-settings.json");
        let _ = fs::remove_file(&path);
        assert_eq!(WorldSettings::load_or_default(&path), WorldSettings::default());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "minestream-settings-{}.json",
            std::process::id()
        ));
        let mut settings = WorldSettings::default();
        settings.seed = 77;
        settings.workers.mesh_threads = 3;
        settings.save(&path).unwrap();
        assert_eq!(WorldSettings::load(&path).unwrap(), settings);
        let _ = fs::remove_file(&path);
    }
}
