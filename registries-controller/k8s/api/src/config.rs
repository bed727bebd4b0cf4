//! Resources in the `config.openshift.io` group.

pub mod image;
pub mod image_digest_mirror_set;
pub mod image_tag_mirror_set;

pub use self::{
    image::{Image, ImageSpec, RegistrySources},
    image_digest_mirror_set::{ImageDigestMirrorSet, ImageDigestMirrorSetSpec, ImageDigestMirrors},
    image_tag_mirror_set::{ImageTagMirrorSet, ImageTagMirrorSetSpec, ImageTagMirrors},
};

/// Whether a source may still be pulled from directly once mirrors are configured for it.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize, schemars::JsonSchema,
)]
pub enum MirrorSourcePolicy {
    /// Only the mirrors are contacted; the source is never pulled from.
    NeverContactSource,

    /// The source is tried after every mirror has failed.
    AllowContactingSource,
}
