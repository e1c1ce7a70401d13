use std::io;
use std::path::{Path, PathBuf};

use crate::core::config::SecurityConfig;

/// Errors that can occur while validating a deploy working directory
#[derive(Debug, thiserror::Error)]
pub enum PathSecurityError {
    #[error("Path '{path}' is outside the allowed root directory '{root}'")]
    OutsideRootDirectory { path: PathBuf, root: PathBuf },

    #[error("Symlink '{path}' points outside the allowed root directory")]
    SymlinkOutsideRoot { path: PathBuf },

    #[error("Cannot canonicalize path '{path}': {error}")]
    CannotCanonicalize { path: PathBuf, error: io::Error },

    #[error("Path does not exist: '{path}'")]
    PathNotFound { path: PathBuf },

    #[error("Path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    #[error("Path must be absolute: '{path}'")]
    NotAbsolute { path: PathBuf },

    #[error("IO error for path '{path}': {error}")]
    IoError { path: PathBuf, error: io::Error },
}

/// Validates a deploy working directory against the configured boundaries.
///
/// The path must be absolute (the server's own cwd means nothing to a
/// remote caller), exist, be a directory, and, when a root is configured,
/// resolve inside that root. Symlinks are handled per `allow_symlinks`.
///
/// Returns the canonicalized directory.
///
/// ```rust,ignore
/// let dir = validate_path("/home/user/app", &config.security)?;
/// ```
pub fn validate_path(input_path: &str, security: &SecurityConfig) -> Result<PathBuf, PathSecurityError> {
    let path = Path::new(input_path);

    if !path.is_absolute() {
        return Err(PathSecurityError::NotAbsolute {
            path: path.to_path_buf(),
        });
    }

    let canonical_path = match security.root_path {
        None => canonicalize_path(path)?,
        Some(ref root) => validate_within_root(path, root, security.allow_symlinks)?,
    };

    if !canonical_path.is_dir() {
        return Err(PathSecurityError::NotADirectory {
            path: canonical_path,
        });
    }

    Ok(canonical_path)
}

fn validate_within_root(
    path: &Path,
    root: &Path,
    allow_symlinks: bool,
) -> Result<PathBuf, PathSecurityError> {
    let canonical_root = root.canonicalize().map_err(|e| PathSecurityError::IoError {
        path: root.to_path_buf(),
        error: e,
    })?;

    if !path.exists() {
        return Err(PathSecurityError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    if path.is_symlink() && !allow_symlinks {
        let target = path.read_link().map_err(|e| PathSecurityError::IoError {
            path: path.to_path_buf(),
            error: e,
        })?;

        // Relative link targets resolve against the link's parent
        let target = match path.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target,
        };

        let canonical_target =
            canonicalize_path(&target).map_err(|_| PathSecurityError::SymlinkOutsideRoot {
                path: path.to_path_buf(),
            })?;

        if !canonical_target.starts_with(&canonical_root) {
            return Err(PathSecurityError::SymlinkOutsideRoot {
                path: path.to_path_buf(),
            });
        }
    }

    let canonical_path = canonicalize_path(path)?;

    if !canonical_path.starts_with(&canonical_root) {
        // A link that escapes the root is reported as such
        if path.is_symlink() {
            return Err(PathSecurityError::SymlinkOutsideRoot {
                path: path.to_path_buf(),
            });
        }
        return Err(PathSecurityError::OutsideRootDirectory {
            path: canonical_path,
            root: canonical_root,
        });
    }

    Ok(canonical_path)
}

fn canonicalize_path(path: &Path) -> Result<PathBuf, PathSecurityError> {
    path.canonicalize().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PathSecurityError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PathSecurityError::CannotCanonicalize {
                path: path.to_path_buf(),
                error: e,
            }
        }
    })
}
