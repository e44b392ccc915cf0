use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure reading or writing a single kube config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("couldn't access the file")]
    Io(#[from] io::Error),
    #[error("couldn't parse the file")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("couldn't load kube config {}", .path.display())]
    LoadError {
        path: PathBuf,
        #[source]
        source: ConfigFileError,
    },
    #[error("no Kubernetes contexts available! Try create or connect to cluster")]
    NoContextsAvailable,
    #[error("invalid argument: {value}. Possible values: {}", .valid.join(", "))]
    InvalidArgument { value: String, valid: Vec<String> },
    #[error("could not find Kubernetes context {0}")]
    ContextNotFound(String),
    #[error("failed to update the kube config {}", .path.display())]
    PersistError {
        path: PathBuf,
        #[source]
        source: ConfigFileError,
    },
    #[error("--batch mode is incompatible with --shell")]
    IncompatibleFlags,
    #[error("couldn't prepare the temporary kube config {}", .path.display())]
    TempConfigError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't pick a context")]
    PromptError(#[source] dialoguer::Error),
    #[error("couldn't start shell '{shell}'")]
    ShellError {
        shell: String,
        #[source]
        source: io::Error,
    },
}
