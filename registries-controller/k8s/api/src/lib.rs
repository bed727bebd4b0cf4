#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod config;
pub mod operator;

pub use self::{
    config::{
        Image, ImageDigestMirrorSet, ImageDigestMirrorSetSpec, ImageDigestMirrors, ImageSpec,
        ImageTagMirrorSet, ImageTagMirrorSetSpec, ImageTagMirrors, MirrorSourcePolicy,
        RegistrySources,
    },
    operator::{
        ImageContentSourcePolicy, ImageContentSourcePolicySpec, RepositoryDigestMirrors,
    },
};
pub use kube::{
    core::{ObjectMeta, TypeMeta},
    Resource, ResourceExt,
};
