pub mod image_content_source_policy;

pub use self::image_content_source_policy::{
    ImageContentSourcePolicy, ImageContentSourcePolicySpec, RepositoryDigestMirrors,
};
