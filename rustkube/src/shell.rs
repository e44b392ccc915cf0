//! A subshell bound to a private copy of the kube config.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use log::{debug, warn};

use crate::access::{PathOptions, KUBECONFIG_ENV};
use crate::direct::write_private;
use crate::error::SwitchError;

pub const DEFAULT_SHELL: &str = "bash";

/// Which shell to start. Built from `$SHELL` by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOptions {
    shell: Option<String>,
}

impl ShellOptions {
    pub fn new(shell: Option<String>) -> Self {
        Self {
            shell: shell.filter(|s| !s.is_empty()),
        }
    }

    pub fn program(&self) -> &str {
        self.shell.as_deref().unwrap_or(DEFAULT_SHELL)
    }
}

/// A byte for byte copy of the first kube config file, removed on drop.
///
/// Everything done through [`TempKubeConfig::path_options`] affects only the
/// copy, so the original file stays untouched.
#[derive(Debug)]
pub struct TempKubeConfig {
    path: PathBuf,
    removed: bool,
}

impl TempKubeConfig {
    /// Copies the first file of `source` to `<tmp_dir>/kube-config-<pid>`.
    pub fn create(source: &PathOptions, tmp_dir: &Path) -> Result<Self, SwitchError> {
        let path = tmp_dir.join(format!("kube-config-{}", std::process::id()));
        let Some(original) = source.first() else {
            return Err(SwitchError::TempConfigError {
                path,
                source: io::Error::new(io::ErrorKind::NotFound, "no kube config location"),
            });
        };

        let data = fs::read(original).map_err(|source| SwitchError::TempConfigError {
            path: original.to_path_buf(),
            source,
        })?;
        write_private(&path, &data).map_err(|source| SwitchError::TempConfigError {
            path: path.clone(),
            source,
        })?;
        debug!(
            "Copied kube config {} to {}",
            original.display(),
            path.display()
        );

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loading precedence that only sees the copy.
    pub fn path_options(&self) -> PathOptions {
        PathOptions::single(&self.path)
    }

    /// Deletes the copy now. Failure is logged, not returned.
    pub fn cleanup(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary kube config {}", self.path.display()),
            Err(err) => warn!(
                "Failed to remove temporary kube config {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

impl Drop for TempKubeConfig {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Runs an interactive shell on the current terminal with `KUBECONFIG` set
/// to `kubeconfig`, and waits for it to exit.
pub fn launch_shell(options: &ShellOptions, kubeconfig: &Path) -> Result<ExitStatus, SwitchError> {
    let program = options.program();
    debug!(
        "Starting {} with {}={}",
        program,
        KUBECONFIG_ENV,
        kubeconfig.display()
    );

    let status = Command::new(program)
        .env(KUBECONFIG_ENV, kubeconfig)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| SwitchError::ShellError {
            shell: program.to_string(),
            source,
        })?;

    debug!("{} exited with {}", program, status);
    Ok(status)
}
