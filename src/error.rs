//! Error types shared across the streaming pipeline.

use glam::IVec3;
use thiserror::Error;

use crate::core::chunk::ColumnKey;

/// Errors returned by public voxel accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Local coordinate outside `[0,16)x[0,384)x[0,16)`.
    #[error("local position {0} is outside the chunk bounds")]
    OutOfBounds(IVec3),

    /// No loaded chunk covers the requested world position.
    #[error("no loaded chunk covers world position {0}")]
    NotLoaded(IVec3),
}

/// Failures of a single generation task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("chunk {0:?} was already generated")]
    AlreadyGenerated(ColumnKey),

    #[error("chunk {0:?} was disposed before generation finished")]
    Disposed(ColumnKey),
}

/// Failures of a single mesh task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("chunk {0:?} has not been generated")]
    NotGenerated(ColumnKey),

    #[error("neighbor {neighbor:?} of chunk {chunk:?} has not been generated")]
    NeighborNotGenerated { chunk: ColumnKey, neighbor: ColumnKey },

    #[error("chunk {0:?} was disposed before meshing")]
    Disposed(ColumnKey),
}

/// Failures while loading settings from disk.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
