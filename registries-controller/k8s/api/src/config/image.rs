use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cluster-wide image configuration. Only the `cluster` instance is honored.
#[derive(Clone, Debug, Default, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(group = "config.openshift.io", version = "v1", kind = "Image")]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    #[serde(default)]
    pub registry_sources: RegistrySources,
}

/// Registries that image pulls may, or may not, be served from.
///
/// `blockedRegistries` and `allowedRegistries` are mutually exclusive. Entries are registry hosts
/// or repositories (`quay.io`, `quay.io/ns/repo`), or wildcard hosts (`*.example.com`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySources {
    /// Registries that are contacted without TLS verification.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_registries: Vec<String>,

    /// When set, every registry not listed here is rejected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_registries: Vec<String>,

    /// Registries searched, in order, when an image is referenced by short name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_runtime_search_registries: Vec<String>,
}
