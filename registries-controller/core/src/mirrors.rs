use registries_controller_k8s_api::{
    ImageContentSourcePolicy, ImageDigestMirrorSet, ImageTagMirrorSet, MirrorSourcePolicy,
};

/// A snapshot of every mirror-rule resource in the cluster.
#[derive(Copy, Clone, Debug, Default)]
pub struct MirrorSets<'a> {
    pub content_source_policies: &'a [ImageContentSourcePolicy],
    pub digest_mirror_sets: &'a [ImageDigestMirrorSet],
    pub tag_mirror_sets: &'a [ImageTagMirrorSet],
}

/// The kinds of pulls a mirror may serve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PullMode {
    DigestOnly,
    TagOnly,
}

/// Whether a source may be contacted directly once mirrors are configured for it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Exclusivity {
    #[default]
    Unset,
    AllowContact,
    NeverContact,
}

/// One entry of a mirror-rule resource, independent of the resource's kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Record<'a> {
    pub source: &'a str,
    pub mirrors: &'a [String],
    pub exclusivity: Exclusivity,
    pub pull_mode: PullMode,
}

/// A single `source -> mirror` routing rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MirrorDirective<'a> {
    pub source: &'a str,
    pub mirror: &'a str,
    pub pull_mode: PullMode,
}

// === impl MirrorSets ===

impl<'a> MirrorSets<'a> {
    /// Iterates over every record, in resource order and then record order.
    ///
    /// Digest-scoped records, legacy and current, are yielded before tag-scoped records. Legacy
    /// records carry no exclusivity and are always [`Exclusivity::Unset`].
    pub fn records(&self) -> impl Iterator<Item = Record<'a>> {
        let Self {
            content_source_policies,
            digest_mirror_sets,
            tag_mirror_sets,
        } = *self;

        let legacy = content_source_policies
            .iter()
            .flat_map(|icsp| icsp.spec.repository_digest_mirrors.iter())
            .map(|rdm| Record {
                source: &rdm.source,
                mirrors: &rdm.mirrors,
                exclusivity: Exclusivity::Unset,
                pull_mode: PullMode::DigestOnly,
            });

        let digest = digest_mirror_sets
            .iter()
            .flat_map(|idms| idms.spec.image_digest_mirrors.iter())
            .map(|idm| Record {
                source: &idm.source,
                mirrors: &idm.mirrors,
                exclusivity: idm.mirror_source_policy.into(),
                pull_mode: PullMode::DigestOnly,
            });

        let tag = tag_mirror_sets
            .iter()
            .flat_map(|itms| itms.spec.image_tag_mirrors.iter())
            .map(|itm| Record {
                source: &itm.source,
                mirrors: &itm.mirrors,
                exclusivity: itm.mirror_source_policy.into(),
                pull_mode: PullMode::TagOnly,
            });

        legacy.chain(digest).chain(tag)
    }

    /// Returns true if no resource declares any record.
    pub fn is_empty(&self) -> bool {
        self.records().next().is_none()
    }
}

/// Flattens every record into directives, preserving resource, record and mirror order.
///
/// Duplicates are kept; consumers decide whether to collapse them.
pub fn normalize<'a>(sets: &MirrorSets<'a>) -> Vec<MirrorDirective<'a>> {
    sets.records()
        .flat_map(|record| {
            record.mirrors.iter().map(move |mirror| MirrorDirective {
                source: record.source,
                mirror,
                pull_mode: record.pull_mode,
            })
        })
        .collect()
}

// === impl Exclusivity ===

impl From<Option<MirrorSourcePolicy>> for Exclusivity {
    fn from(policy: Option<MirrorSourcePolicy>) -> Self {
        match policy {
            None => Self::Unset,
            Some(MirrorSourcePolicy::AllowContactingSource) => Self::AllowContact,
            Some(MirrorSourcePolicy::NeverContactSource) => Self::NeverContact,
        }
    }
}
