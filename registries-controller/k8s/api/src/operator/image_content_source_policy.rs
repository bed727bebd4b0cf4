use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The legacy form of [`ImageDigestMirrorSet`](crate::ImageDigestMirrorSet). Its mirrors only
/// serve pulls by digest and it has no source policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operator.openshift.io",
    version = "v1alpha1",
    kind = "ImageContentSourcePolicy"
)]
#[serde(rename_all = "camelCase")]
pub struct ImageContentSourcePolicySpec {
    #[serde(default)]
    pub repository_digest_mirrors: Vec<RepositoryDigestMirrors>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDigestMirrors {
    pub source: String,

    #[serde(default)]
    pub mirrors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn parses_manifest() {
        let icsp: ImageContentSourcePolicy = serde_yaml::from_str(
            r#"
apiVersion: operator.openshift.io/v1alpha1
kind: ImageContentSourcePolicy
metadata:
  name: release
spec:
  repositoryDigestMirrors:
  - source: quay.io/openshift-release-dev/ocp-release
    mirrors:
    - mirror.example.com/ocp/release
"#,
        )
        .expect("manifest must parse");
        assert_eq!(
            icsp.spec.repository_digest_mirrors,
            vec![RepositoryDigestMirrors {
                source: "quay.io/openshift-release-dev/ocp-release".to_string(),
                mirrors: vec!["mirror.example.com/ocp/release".to_string()],
            }]
        );
        assert_eq!(
            ImageContentSourcePolicy::api_version(&()),
            "operator.openshift.io/v1alpha1"
        );
    }
}
