use crate::{
    core::MirrorSets,
    k8s::{
        Image, ImageContentSourcePolicy, ImageDigestMirrorSet, ImageTagMirrorSet,
        RegistrySources, Resource, ResourceExt, TypeMeta,
    },
};
use anyhow::{ensure, Context, Result};
use serde::{de::DeserializeOwned, Deserialize};
use serde_yaml::Value;
use tracing::{debug, warn};

/// The name of the only `Image` resource that is honored.
pub const CLUSTER_IMAGE: &str = "cluster";

/// The cluster resources a compilation reads.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub image: Option<Image>,
    pub content_source_policies: Vec<ImageContentSourcePolicy>,
    pub digest_mirror_sets: Vec<ImageDigestMirrorSet>,
    pub tag_mirror_sets: Vec<ImageTagMirrorSet>,
}

// === impl Snapshot ===

impl Snapshot {
    /// Adds every resource in a (possibly multi-document) YAML stream.
    ///
    /// `List` documents are unwrapped. Documents of any other kind are ignored.
    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<()> {
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            let value = Value::deserialize(doc).context("invalid YAML document")?;
            self.insert(value)?;
        }
        Ok(())
    }

    /// Orders mirror-rule resources by name so that compilation does not depend on the order in
    /// which they were listed.
    pub fn sort(&mut self) {
        self.content_source_policies.sort_by_key(|r| r.name_any());
        self.digest_mirror_sets.sort_by_key(|r| r.name_any());
        self.tag_mirror_sets.sort_by_key(|r| r.name_any());
    }

    pub fn registry_sources(&self) -> RegistrySources {
        self.image
            .as_ref()
            .map(|image| image.spec.registry_sources.clone())
            .unwrap_or_default()
    }

    pub fn mirror_sets(&self) -> MirrorSets<'_> {
        MirrorSets {
            content_source_policies: &self.content_source_policies,
            digest_mirror_sets: &self.digest_mirror_sets,
            tag_mirror_sets: &self.tag_mirror_sets,
        }
    }

    fn insert(&mut self, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        let tm = serde_yaml::from_value::<TypeMeta>(value.clone())
            .context("resource must set apiVersion and kind")?;
        ensure!(
            !tm.api_version.is_empty() && !tm.kind.is_empty(),
            "resource must set apiVersion and kind"
        );

        if tm.kind == "List" {
            let items = match value {
                Value::Mapping(mut list) => list.remove("items"),
                _ => None,
            };
            if let Some(Value::Sequence(items)) = items {
                for item in items {
                    self.insert(item)?;
                }
            }
            return Ok(());
        }

        if is_kind::<Image>(&tm) {
            let image = decode::<Image>(value)?;
            if image.name_any() != CLUSTER_IMAGE {
                warn!(name = %image.name_any(), "Ignoring Image resource");
                return Ok(());
            }
            self.image = Some(image);
        } else if is_kind::<ImageContentSourcePolicy>(&tm) {
            self.content_source_policies.push(decode(value)?);
        } else if is_kind::<ImageDigestMirrorSet>(&tm) {
            self.digest_mirror_sets.push(decode(value)?);
        } else if is_kind::<ImageTagMirrorSet>(&tm) {
            self.tag_mirror_sets.push(decode(value)?);
        } else {
            warn!(api_version = %tm.api_version, kind = %tm.kind, "Ignoring unsupported resource");
            return Ok(());
        }

        debug!(api_version = %tm.api_version, kind = %tm.kind, "Loaded resource");
        Ok(())
    }
}

fn is_kind<K: Resource<DynamicType = ()>>(tm: &TypeMeta) -> bool {
    tm.api_version == K::api_version(&()) && tm.kind == K::kind(&())
}

fn decode<K>(value: Value) -> Result<K>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    serde_yaml::from_value(value).with_context(|| format!("invalid {} resource", K::kind(&())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::MirrorSourcePolicy;

    fn parse(yaml: &str) -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.extend_from_yaml(yaml).expect("snapshot must parse");
        snapshot.sort();
        snapshot
    }

    #[test]
    fn multi_document() {
        let snapshot = parse(
            r#"
apiVersion: config.openshift.io/v1
kind: Image
metadata:
  name: cluster
spec:
  registrySources:
    blockedRegistries: [block.io]
    insecureRegistries: [insecure.io]
    containerRuntimeSearchRegistries: [search.io]
---
apiVersion: operator.openshift.io/v1alpha1
kind: ImageContentSourcePolicy
metadata:
  name: icsp
spec:
  repositoryDigestMirrors:
    - source: quay.io/ns
      mirrors: [mirror.io/ns]
---
apiVersion: config.openshift.io/v1
kind: ImageTagMirrorSet
metadata:
  name: itms
spec:
  imageTagMirrors:
    - source: registry.io/app
      mirrors: [mirror.io/app]
      mirrorSourcePolicy: NeverContactSource
---
"#,
        );

        let sources = snapshot.registry_sources();
        assert_eq!(sources.blocked_registries, vec!["block.io".to_string()]);
        assert_eq!(sources.insecure_registries, vec!["insecure.io".to_string()]);
        assert_eq!(
            sources.container_runtime_search_registries,
            vec!["search.io".to_string()]
        );
        assert!(sources.allowed_registries.is_empty());

        assert_eq!(snapshot.content_source_policies.len(), 1);
        assert!(snapshot.digest_mirror_sets.is_empty());
        assert_eq!(
            snapshot.tag_mirror_sets[0].spec.image_tag_mirrors[0].mirror_source_policy,
            Some(MirrorSourcePolicy::NeverContactSource)
        );
        assert_eq!(snapshot.mirror_sets().records().count(), 2);
    }

    #[test]
    fn list_items_are_sorted() {
        let snapshot = parse(
            r#"
apiVersion: v1
kind: List
items:
  - apiVersion: config.openshift.io/v1
    kind: ImageDigestMirrorSet
    metadata:
      name: zz
    spec:
      imageDigestMirrors:
        - source: b.io
          mirrors: [mirror-b.io]
  - apiVersion: config.openshift.io/v1
    kind: ImageDigestMirrorSet
    metadata:
      name: aa
    spec:
      imageDigestMirrors:
        - source: a.io
          mirrors: [mirror-a.io]
"#,
        );
        let names = snapshot
            .digest_mirror_sets
            .iter()
            .map(|r| r.name_any())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["aa", "zz"]);
    }

    #[test]
    fn unsupported_and_foreign_resources_are_ignored() {
        let snapshot = parse(
            r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: registries
data: {}
---
apiVersion: config.openshift.io/v1
kind: Image
metadata:
  name: other
spec:
  registrySources:
    blockedRegistries: [block.io]
"#,
        );
        assert!(snapshot.image.is_none());
        assert_eq!(snapshot.registry_sources(), RegistrySources::default());
        assert!(snapshot.mirror_sets().is_empty());
    }

    #[test]
    fn invalid_resource() {
        let mut snapshot = Snapshot::default();
        let err = snapshot
            .extend_from_yaml(
                r#"
apiVersion: config.openshift.io/v1
kind: ImageDigestMirrorSet
metadata:
  name: idms
spec:
  imageDigestMirrors:
    - mirrors: [mirror.io]
"#,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid ImageDigestMirrorSet resource");
    }

    #[test]
    fn missing_type_meta() {
        let mut snapshot = Snapshot::default();
        assert!(snapshot.extend_from_yaml("metadata: {name: x}").is_err());
    }
}
