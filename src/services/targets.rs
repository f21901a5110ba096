//! Linking targets and target resolution.
//!
//! A [`MediaTarget`] is a source/target path pair plus a linking behavior.
//! The resolver renders the target path and decides whether linking may
//! happen at all; the targets only ever execute a decision that was already
//! made. Forcing a link onto an occupied path is a contract violation, not
//! an IO error, and gets its own error type.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use super::media::ParsedMediaItem;
use super::movies::Movie;
use super::naming::NameFormatter;

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    // `source` is a reserved field name for thiserror, hence `source_path`.
    #[error("target {} already exists, refusing to link {}", .target.display(), .source_path.display())]
    TargetExists {
        source_path: PathBuf,
        target: PathBuf,
    },
}

/// Linking behavior, selected by config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Dry-run: log what would happen, touch nothing.
    Noop,
    /// Hard-link the source into the library.
    HardLink,
}

impl TargetKind {
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "noop" => Ok(TargetKind::Noop),
            "hardlink" => Ok(TargetKind::HardLink),
            other => bail!("unknown media target '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MediaTarget {
    Noop {
        source: PathBuf,
        target: PathBuf,
    },
    HardLink {
        source: PathBuf,
        target: PathBuf,
    },
    /// The target path is already taken. Produced by the resolver so
    /// callers can skip cleanly; linking through it is a hard error.
    Occupied {
        source: PathBuf,
        target: PathBuf,
    },
}

impl MediaTarget {
    pub fn new(kind: TargetKind, source: PathBuf, target: PathBuf) -> Self {
        match kind {
            TargetKind::Noop => MediaTarget::Noop { source, target },
            TargetKind::HardLink => MediaTarget::HardLink { source, target },
        }
    }

    pub fn target(&self) -> &Path {
        match self {
            MediaTarget::Noop { target, .. }
            | MediaTarget::HardLink { target, .. }
            | MediaTarget::Occupied { target, .. } => target,
        }
    }

    pub fn source(&self) -> &Path {
        match self {
            MediaTarget::Noop { source, .. }
            | MediaTarget::HardLink { source, .. }
            | MediaTarget::Occupied { source, .. } => source,
        }
    }

    /// Whether a file already sits at the target path. A dry-run target
    /// never reports occupancy: it must behave as if linking were possible.
    pub fn already_exist(&self) -> bool {
        match self {
            MediaTarget::Noop { .. } => false,
            MediaTarget::HardLink { target, .. } => target.is_file(),
            MediaTarget::Occupied { .. } => true,
        }
    }

    pub fn can_link(&self) -> bool {
        match self {
            MediaTarget::Noop { .. } => true,
            MediaTarget::HardLink { .. } => !self.already_exist(),
            MediaTarget::Occupied { .. } => false,
        }
    }

    /// Execute the link. The caller is expected to have checked
    /// `can_link()`; linking an occupied target fails loudly.
    pub fn do_link(&self) -> Result<()> {
        match self {
            MediaTarget::Noop { source, target } => {
                info!(
                    source = %source.display(),
                    target = %target.display(),
                    "dry-run: would hard-link"
                );
                Ok(())
            }
            MediaTarget::HardLink { source, target } => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create target directory {}", parent.display())
                    })?;
                }
                fs::hard_link(source, target).with_context(|| {
                    format!(
                        "failed to hard-link {} -> {}",
                        source.display(),
                        target.display()
                    )
                })?;
                info!(
                    source = %source.display(),
                    target = %target.display(),
                    "hard-linked media item"
                );
                Ok(())
            }
            MediaTarget::Occupied { source, target } => Err(TargetError::TargetExists {
                source_path: source.clone(),
                target: target.clone(),
            }
            .into()),
        }
    }

    /// Replace a previous link: remove the superseded file, then link anew.
    /// Used by fix-match when a mis-linked item moves to its correct movie.
    pub fn do_relink(&self, previous: Option<&Path>) -> Result<()> {
        if let Some(previous) = previous
            && previous.is_file()
        {
            fs::remove_file(previous).with_context(|| {
                format!("failed to remove superseded link {}", previous.display())
            })?;
            info!(previous = %previous.display(), "removed superseded link");
        }
        self.do_link()
    }
}

/// Renders target paths and applies the skip-existing policy: an occupied
/// target path means the item was organized before, so it is skipped
/// without touching the item's target fields.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    kind: TargetKind,
    formatter: NameFormatter,
}

impl TargetResolver {
    pub fn new(kind: TargetKind, formatter: NameFormatter) -> Self {
        Self { kind, formatter }
    }

    pub fn resolve(&self, media: &mut ParsedMediaItem, movie: &Movie) -> MediaTarget {
        let target_path = self.formatter.format(movie, media);
        let source = media.absolute_path();
        let target = MediaTarget::new(self.kind, source.clone(), target_path.clone());
        if target.already_exist() {
            info!(
                target = %target_path.display(),
                filename = %media.filename,
                "target already exists, skipping"
            );
            return MediaTarget::Occupied {
                source,
                target: target_path,
            };
        }
        media.set_target_absolute_path(&target_path);
        target
    }
}
