pub mod access;
pub mod clean;
pub mod direct;
pub mod error;
pub mod shell;
pub mod switch;

use std::path::PathBuf;

pub use access::{ConfigStore, PathOptions, KUBECONFIG_ENV};
pub use clean::*;
pub use error::SwitchError;

/// `~/.kube`, when a home directory can be found.
pub fn kube_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kube"))
}
