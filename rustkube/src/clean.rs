use std::collections::BTreeMap;

use serde_yaml::Value as YamlValue;

use crate::direct;
pub use crate::direct::{ApiVersion, Cluster, ClusterSpec, Context, ContextSpec, Kind, User};

/// Namespace reported for a context that doesn't name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The kube config keyed by entry name.
#[derive(Debug, Clone, PartialEq)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, Option<ContextSpec>>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub preferences: YamlValue,
    pub users: BTreeMap<String, YamlValue>,
    pub extensions: Option<YamlValue>,
    pub other: BTreeMap<String, YamlValue>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        direct::KubeConfig::default().into()
    }
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        // The first entry with a given name wins, same as across files.
        let mut contexts = BTreeMap::new();
        for ctx in kc.contexts {
            contexts.entry(ctx.name).or_insert(ctx.context);
        }
        let mut clusters = BTreeMap::new();
        for cls in kc.clusters {
            clusters.entry(cls.name).or_insert(cls.cluster);
        }
        let mut users = BTreeMap::new();
        for usr in kc.users {
            users.entry(usr.name).or_insert(usr.user);
        }

        Self {
            contexts,
            current_context: kc.current_context,
            clusters,
            preferences: kc.preferences,
            users,
            extensions: kc.extensions,
            other: kc.other,
        }
    }
}

impl From<KubeConfig> for direct::KubeConfig {
    fn from(kc: KubeConfig) -> Self {
        direct::KubeConfig {
            api_version: ApiVersion::V1,
            kind: Kind::Config,
            preferences: kc.preferences,
            current_context: kc.current_context,
            extensions: kc.extensions,
            other: kc.other,

            clusters: kc
                .clusters
                .into_iter()
                .map(|(name, cluster)| Cluster { name, cluster })
                .collect(),
            contexts: kc
                .contexts
                .into_iter()
                .map(|(name, context)| Context { name, context })
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|(name, user)| User { name, user })
                .collect(),
        }
    }
}

impl KubeConfig {
    /// Folds `later` into `self`. Entries already present win, and the
    /// current context is only taken when none is set yet.
    pub fn merge(&mut self, later: KubeConfig) {
        for (name, ctx) in later.contexts {
            self.contexts.entry(name).or_insert(ctx);
        }
        for (name, cluster) in later.clusters {
            self.clusters.entry(name).or_insert(cluster);
        }
        for (name, user) in later.users {
            self.users.entry(name).or_insert(user);
        }
        if self.current_context.is_empty() {
            self.current_context = later.current_context;
        }
    }

    /// Looks up a context, treating a `null` entry as missing.
    pub fn context(&self, name: &str) -> Option<&ContextSpec> {
        self.contexts.get(name).and_then(Option::as_ref)
    }

    pub fn current(&self) -> Option<&ContextSpec> {
        self.context(&self.current_context)
    }

    /// The server of the cluster `ctx` points at, empty when that cluster isn't defined.
    pub fn server(&self, ctx: &ContextSpec) -> &str {
        self.clusters
            .get(&ctx.cluster)
            .map(|cluster| cluster.server.as_str())
            .unwrap_or_default()
    }

    pub fn current_namespace(&self) -> &str {
        self.current().map(namespace).unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn current_server(&self) -> &str {
        self.current().map(|ctx| self.server(ctx)).unwrap_or_default()
    }

    /// A copy of this config with `name` as the current context.
    pub fn with_current_context(&self, name: &str) -> KubeConfig {
        KubeConfig {
            current_context: name.to_string(),
            ..self.clone()
        }
    }
}

pub fn namespace(ctx: &ContextSpec) -> &str {
    match ctx.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => ns,
        _ => DEFAULT_NAMESPACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(cluster: &str, namespace: Option<&str>) -> Option<ContextSpec> {
        Some(ContextSpec {
            cluster: cluster.to_string(),
            user: "admin".to_string(),
            namespace: namespace.map(str::to_string),
            ..Default::default()
        })
    }

    fn cluster(server: &str) -> ClusterSpec {
        ClusterSpec {
            server: server.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_names_keep_the_first_entry() {
        let kc = direct::KubeConfig {
            contexts: vec![
                Context {
                    name: "dev".to_string(),
                    context: context("first", None),
                },
                Context {
                    name: "dev".to_string(),
                    context: context("second", None),
                },
            ],
            ..Default::default()
        };
        let kc = KubeConfig::from(kc);
        assert_eq!(kc.context("dev").unwrap().cluster, "first");
    }

    #[test]
    fn merge_prefers_existing_entries() {
        let mut first = KubeConfig::default();
        first.contexts.insert("dev".to_string(), context("a", None));

        let mut second = KubeConfig::default();
        second.contexts.insert("dev".to_string(), context("b", None));
        second.contexts.insert("prod".to_string(), context("c", None));
        second.current_context = "prod".to_string();

        first.merge(second);
        assert_eq!(first.context("dev").unwrap().cluster, "a");
        assert_eq!(first.context("prod").unwrap().cluster, "c");
        assert_eq!(first.current_context, "prod");
    }

    #[test]
    fn merge_keeps_current_context_already_set() {
        let mut first = KubeConfig::default();
        first.current_context = "dev".to_string();
        let mut second = KubeConfig::default();
        second.current_context = "prod".to_string();

        first.merge(second);
        assert_eq!(first.current_context, "dev");
    }

    #[test]
    fn current_values_resolve_through_cluster() {
        let mut kc = KubeConfig::default();
        kc.contexts
            .insert("dev".to_string(), context("dev-cluster", Some("apps")));
        kc.clusters
            .insert("dev-cluster".to_string(), cluster("https://dev:6443"));
        kc.current_context = "dev".to_string();

        assert_eq!(kc.current_namespace(), "apps");
        assert_eq!(kc.current_server(), "https://dev:6443");
    }

    #[test]
    fn missing_pieces_fall_back() {
        let mut kc = KubeConfig::default();
        kc.contexts.insert("dev".to_string(), context("gone", None));
        kc.current_context = "dev".to_string();
        assert_eq!(kc.current_namespace(), DEFAULT_NAMESPACE);
        assert_eq!(kc.current_server(), "");

        kc.current_context = "unknown".to_string();
        assert_eq!(kc.current_namespace(), DEFAULT_NAMESPACE);
        assert_eq!(kc.current_server(), "");
    }

    #[test]
    fn with_current_context_leaves_original_alone() {
        let mut kc = KubeConfig::default();
        kc.current_context = "dev".to_string();
        let switched = kc.with_current_context("prod");
        assert_eq!(kc.current_context, "dev");
        assert_eq!(switched.current_context, "prod");
    }

    #[test]
    fn conversion_is_lossless() {
        let mut kc = KubeConfig::default();
        kc.contexts.insert("dev".to_string(), context("c", Some("ns")));
        kc.contexts.insert("null".to_string(), None);
        kc.clusters.insert("c".to_string(), cluster("https://c"));
        kc.users
            .insert("admin".to_string(), YamlValue::from("opaque"));
        kc.current_context = "dev".to_string();

        let on_disk: direct::KubeConfig = kc.clone().into();
        assert_eq!(KubeConfig::from(on_disk), kc);
    }
}
