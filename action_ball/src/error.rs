//! Error types for the action-ball engine.
//!
//! The per-frame core (recording, classification, trails) is total and never
//! fails. Errors only come from configuration and from the collaborators the
//! pipeline drives: the detector and the drawing surface.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error raised by an external collaborator.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("detector failed on frame {frame}: {source}")]
    Detector {
        frame: u64,
        #[source]
        source: CollaboratorError,
    },

    #[error("could not load font {}: {reason}", path.display())]
    Font { path: PathBuf, reason: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("annotation failed on frame {frame}: {source}")]
    Annotate {
        frame: u64,
        #[source]
        source: CollaboratorError,
    },
}
