//! The kube config exactly as it is laid out on disk: lists of named entries.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::*;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::ConfigFileError;

/// kubectl writes `null` for empty lists, so treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_mapping() -> YamlValue {
    YamlValue::Mapping(Mapping::new())
}

// region: Context
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ContextSpec {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
    #[serde(flatten)]
    pub other: BTreeMap<String, YamlValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub context: Option<ContextSpec>,
}
// endregion

// region: Cluster
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSpec {
    #[serde(default)]
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
    #[serde(flatten)]
    pub other: BTreeMap<String, YamlValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub cluster: ClusterSpec,
}
// endregion

// region: User
/// Credentials are carried through untouched; switching never looks inside them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub user: YamlValue,
}
// endregion

// region: Common
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Kind {
    #[default]
    Config,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default)]
    pub api_version: ApiVersion,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<Cluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<Context>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_context: String,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default = "empty_mapping")]
    pub preferences: YamlValue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
    #[serde(flatten)]
    pub other: BTreeMap<String, YamlValue>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::V1,
            clusters: Vec::new(),
            contexts: Vec::new(),
            current_context: String::new(),
            kind: Kind::Config,
            preferences: empty_mapping(),
            users: Vec::new(),
            extensions: None,
            other: BTreeMap::new(),
        }
    }
}

impl KubeConfig {
    pub fn read_from(path: impl AsRef<Path>) -> Result<KubeConfig, ConfigFileError> {
        let data = fs::read(path)?;
        Self::from_slice(&data)
    }

    /// An empty document parses as an empty config.
    pub fn from_slice(data: &[u8]) -> Result<KubeConfig, ConfigFileError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(KubeConfig::default());
        }
        Ok(serde_yaml::from_slice(data)?)
    }

    /// Replaces `path` atomically: the document goes to a uniquely named
    /// sibling first and is renamed over the target, so readers never see a
    /// partial write and concurrent writers never share a scratch file.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let data = serde_yaml::to_string(self)?;

        // Write through symlinks instead of replacing them.
        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let replaces = fs::metadata(&target).ok();
        let mut staged = tempfile::Builder::new()
            .prefix(".kubeconfig-")
            .suffix(".tmp")
            .tempfile_in(&parent)?;
        staged.write_all(data.as_bytes())?;
        staged.as_file().sync_all()?;
        if let Some(meta) = replaces {
            fs::set_permissions(staged.path(), meta.permissions())?;
        }
        staged.persist(&target).map_err(|err| err.error)?;
        Ok(())
    }
}

/// Creates `path` with owner-only access.
pub(crate) fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
// endregion
