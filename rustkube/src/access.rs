//! Locating, loading and persisting the kube config.

use std::{
    env,
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use log::debug;

use crate::clean::KubeConfig;
use crate::direct;
use crate::error::{ConfigFileError, SwitchError};

/// Environment variable holding the list of kube config files.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";
pub const RECOMMENDED_FILE_NAME: &str = "config";

/// Writes the changes between two versions of a loaded config.
pub trait ConfigStore {
    fn persist(&self, starting: &KubeConfig, updated: &KubeConfig) -> Result<(), SwitchError>;
}

/// The ordered list of files a kube config is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOptions {
    precedence: Vec<PathBuf>,
}

impl PathOptions {
    /// Builds the precedence from a `KUBECONFIG` style path list, falling back
    /// to `<kube_dir>/config` when the list is unset or empty.
    pub fn new(env_value: Option<&OsStr>, kube_dir: Option<&Path>) -> Self {
        let mut precedence: Vec<PathBuf> = Vec::new();
        if let Some(value) = env_value {
            for path in env::split_paths(value) {
                if path.as_os_str().is_empty() || precedence.contains(&path) {
                    continue;
                }
                precedence.push(path);
            }
        }
        if precedence.is_empty() {
            if let Some(dir) = kube_dir {
                precedence.push(dir.join(RECOMMENDED_FILE_NAME));
            }
        }
        Self { precedence }
    }

    /// Points at exactly one file.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            precedence: vec![path.into()],
        }
    }

    pub fn precedence(&self) -> &[PathBuf] {
        &self.precedence
    }

    pub fn first(&self) -> Option<&Path> {
        self.precedence.first().map(PathBuf::as_path)
    }

    /// Where a brand new config would be written.
    pub fn default_filename(&self) -> Option<&Path> {
        match self.precedence.as_slice() {
            [] => None,
            [only] => Some(only.as_path()),
            all => all
                .iter()
                .find(|path| path.exists())
                .or_else(|| all.last())
                .map(PathBuf::as_path),
        }
    }

    /// The file a changed current context is written to.
    fn current_context_target(&self) -> Option<&Path> {
        self.precedence
            .iter()
            .find(|path| path.exists())
            .map(PathBuf::as_path)
            .or_else(|| self.default_filename())
    }

    /// Reads and merges every existing file in precedence order.
    pub fn load(&self) -> Result<KubeConfig, SwitchError> {
        let mut merged: Option<KubeConfig> = None;
        for path in &self.precedence {
            if !path.exists() {
                debug!("Skipping missing kube config {}", path.display());
                continue;
            }
            debug!("Loading kube config {}", path.display());
            let kc = direct::KubeConfig::read_from(path).map_err(|source| {
                SwitchError::LoadError {
                    path: path.clone(),
                    source,
                }
            })?;
            let kc = KubeConfig::from(kc);
            match merged.as_mut() {
                Some(merged) => merged.merge(kc),
                None => merged = Some(kc),
            }
        }
        Ok(merged.unwrap_or_default())
    }

    fn write_current_context(&self, name: &str) -> Result<(), SwitchError> {
        let Some(path) = self.current_context_target() else {
            return Err(SwitchError::PersistError {
                path: PathBuf::new(),
                source: ConfigFileError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no kube config location",
                )),
            });
        };
        let persist_error = |source| SwitchError::PersistError {
            path: path.to_path_buf(),
            source,
        };

        let on_disk = if path.exists() {
            direct::KubeConfig::read_from(path).map_err(persist_error)?
        } else {
            direct::KubeConfig::default()
        };
        let updated = direct::KubeConfig {
            current_context: name.to_string(),
            ..on_disk
        };

        debug!("Writing current context '{}' to {}", name, path.display());
        updated.write_to(path).map_err(persist_error)
    }
}

impl ConfigStore for PathOptions {
    /// Only the current context is ever changed by a switch, so that is all
    /// this writes; the rest of each file stays as it was.
    fn persist(&self, starting: &KubeConfig, updated: &KubeConfig) -> Result<(), SwitchError> {
        if starting.current_context != updated.current_context {
            self.write_current_context(&updated.current_context)?;
        }
        Ok(())
    }
}
