//! Ensures the release payload stays pullable under the blocked registries.

use crate::{
    error::Error,
    mirrors::{self, MirrorSets, PullMode},
    scope,
};
use tracing::{debug, info};

/// The registry lists each compiler should use once the payload has been accounted for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolved {
    /// Blocked entries for the registry-mirror compiler.
    pub registries_blocked: Vec<String>,

    /// Blocked entries for the signature-policy compiler.
    pub policy_blocked: Vec<String>,

    /// Scopes that must be accepted so the payload remains verifiable.
    pub allowed: Vec<String>,
}

/// Resolves the blocked registries against the payload image.
///
/// A blocked payload is only tolerated if a mirror rule for its pull mode rewrites it onto a
/// location that is not blocked; the payload repository is then granted as an allowed exception.
pub fn resolve<S: AsRef<str>>(
    payload: &str,
    blocked: &[S],
    sets: &MirrorSets<'_>,
) -> Result<Resolved, Error> {
    let repository = scope::repository(payload);
    let blocked = blocked
        .iter()
        .map(|reg| reg.as_ref().to_string())
        .collect::<Vec<_>>();

    if !scope::matches_any(repository, &blocked) {
        return Ok(Resolved {
            registries_blocked: blocked.clone(),
            policy_blocked: blocked,
            allowed: Vec::new(),
        });
    }

    let pull_mode = if scope::is_digest_reference(payload) {
        PullMode::DigestOnly
    } else {
        PullMode::TagOnly
    };
    let pruned_blocked = || {
        blocked
            .iter()
            .filter(|reg| !scope::matches(repository, reg))
            .cloned()
            .collect::<Vec<_>>()
    };

    let locations = mirrors::normalize(sets)
        .into_iter()
        .filter(|d| d.pull_mode == pull_mode)
        .filter_map(|d| scope::rewrite(repository, d.source, d.mirror))
        .collect::<Vec<_>>();
    if locations.is_empty() {
        return Err(Error::PayloadBlocked {
            payload: payload.to_string(),
            pruned_blocked: pruned_blocked(),
        });
    }

    match locations
        .iter()
        .find(|location| !scope::matches_any(location, &blocked))
    {
        Some(location) => {
            info!(%repository, %location, "Blocked payload is reachable through a mirror");
            Ok(Resolved {
                registries_blocked: blocked.clone(),
                policy_blocked: blocked,
                allowed: vec![repository.to_string()],
            })
        }
        None => {
            debug!(%repository, ?locations, "Every payload mirror is blocked");
            Err(Error::PayloadMirrorBlocked {
                payload: payload.to_string(),
                pruned_blocked: pruned_blocked(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirrors::tests::{mk_icsp, mk_idms, mk_itms};
    use pretty_assertions::assert_eq;

    const PAYLOAD: &str = "payload-reg.io/release-image@sha256:4207ba569ff014931f1b5d125fe3751936a768e119546683c899eb09f3cdceb0";
    const QUAY_PAYLOAD: &str = "quay.io/openshift-release-dev@sha256:4207ba569ff014931f1b5d125fe3751936a768e119546683c899eb09f3cdceb0";

    fn unblocked(blocked: &[&str]) -> Resolved {
        Resolved {
            registries_blocked: blocked.iter().map(|s| s.to_string()).collect(),
            policy_blocked: blocked.iter().map(|s| s.to_string()).collect(),
            allowed: Vec::new(),
        }
    }

    #[test]
    fn blocked_without_mirror_rules() {
        let blocked = ["block.io", "block-2.io"];
        let got = resolve(PAYLOAD, &blocked, &MirrorSets::default()).unwrap();
        assert_eq!(got, unblocked(&blocked));
    }

    #[test]
    fn blocked_with_unrelated_mirror_rules() {
        let icsp = [mk_icsp(&[(
            "src.io/payload",
            &["mirror-1.io/payload", "mirror-2.io/payload"],
        )])];
        let sets = MirrorSets {
            content_source_policies: &icsp,
            ..Default::default()
        };
        let blocked = ["block.io", "block-2.io"];
        let got = resolve(PAYLOAD, &blocked, &sets).unwrap();
        assert_eq!(got, unblocked(&blocked));
    }

    #[test]
    fn blocked_payload_without_mirror() {
        let icsp = [mk_icsp(&[(
            "src.io/payload",
            &["mirror-1.io/payload", "mirror-2.io/payload"],
        )])];
        let sets = MirrorSets {
            content_source_policies: &icsp,
            ..Default::default()
        };
        let err = resolve(PAYLOAD, &["block.io", "payload-reg.io", "block-2.io"], &sets)
            .unwrap_err();
        assert!(matches!(err, Error::PayloadBlocked { .. }), "{err}");
        assert_eq!(
            err.pruned_blocked(),
            Some(&["block.io".to_string(), "block-2.io".to_string()][..])
        );
    }

    #[test]
    fn blocked_payload_with_mirror() {
        let icsp = [mk_icsp(&[(
            "payload-reg.io/release-image",
            &["mirror-1.io/payload", "mirror-2.io/payload"],
        )])];
        let sets = MirrorSets {
            content_source_policies: &icsp,
            ..Default::default()
        };
        let blocked = ["block.io", "payload-reg.io", "block-2.io"];
        let got = resolve(PAYLOAD, &blocked, &sets).unwrap();
        assert_eq!(
            got,
            Resolved {
                allowed: vec!["payload-reg.io/release-image".to_string()],
                ..unblocked(&blocked)
            }
        );
    }

    #[test]
    fn blocked_payload_mirror_is_blocked() {
        // quay.io/openshift-release-dev -> block.io/openshift-release-dev
        let icsp = [mk_icsp(&[("quay.io", &["block.io"])])];
        let sets = MirrorSets {
            content_source_policies: &icsp,
            ..Default::default()
        };
        let err = resolve(
            QUAY_PAYLOAD,
            &["quay.io", "block.io/openshift-release-dev"],
            &sets,
        )
        .unwrap_err();
        assert!(matches!(err, Error::PayloadMirrorBlocked { .. }), "{err}");
        assert_eq!(
            err.pruned_blocked(),
            Some(&["block.io/openshift-release-dev".to_string()][..])
        );
    }

    #[test]
    fn blocked_payload_mirror_parent_is_blocked() {
        let icsp = [mk_icsp(&[(
            "quay.io/openshift-release-dev",
            &["block.io/openshift-release-dev"],
        )])];
        let sets = MirrorSets {
            content_source_policies: &icsp,
            ..Default::default()
        };
        let err = resolve(QUAY_PAYLOAD, &["quay.io", "block.io"], &sets).unwrap_err();
        assert!(matches!(err, Error::PayloadMirrorBlocked { .. }), "{err}");
        assert_eq!(err.pruned_blocked(), Some(&["block.io".to_string()][..]));
    }

    #[test]
    fn any_unblocked_mirror_suffices() {
        let idms = [mk_idms(&[(
            "quay.io",
            &["block.io", "mirror.io/quay"],
            None,
        )])];
        let sets = MirrorSets {
            digest_mirror_sets: &idms,
            ..Default::default()
        };
        let got = resolve(QUAY_PAYLOAD, &["quay.io", "block.io"], &sets).unwrap();
        assert_eq!(got.allowed, vec!["quay.io/openshift-release-dev".to_string()]);
    }

    #[test]
    fn mirror_pull_mode_must_match_payload_reference() {
        let itms = [mk_itms(&[("quay.io", &["mirror.io/quay"], None)])];
        let sets = MirrorSets {
            tag_mirror_sets: &itms,
            ..Default::default()
        };

        // A tag-only mirror cannot serve a payload pinned by digest.
        let err = resolve(QUAY_PAYLOAD, &["quay.io"], &sets).unwrap_err();
        assert!(matches!(err, Error::PayloadBlocked { .. }), "{err}");
        assert_eq!(err.pruned_blocked(), Some(&[][..]));

        let got = resolve("quay.io/openshift-release-dev:4.14", &["quay.io"], &sets).unwrap();
        assert_eq!(got.allowed, vec!["quay.io/openshift-release-dev".to_string()]);
    }

    #[test]
    fn wildcard_blocked_payload() {
        let icsp = [mk_icsp(&[("payload-reg.io", &["mirror.example.com/payload"])])];
        let sets = MirrorSets {
            content_source_policies: &icsp,
            ..Default::default()
        };
        let err = resolve(PAYLOAD, &["*.io", "*.example.com"], &sets).unwrap_err();
        assert!(matches!(err, Error::PayloadMirrorBlocked { .. }), "{err}");
        assert_eq!(
            err.pruned_blocked(),
            Some(&["*.example.com".to_string()][..])
        );
    }
}
