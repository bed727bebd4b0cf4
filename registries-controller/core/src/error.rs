use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid entry for {0} registries \"\"")]
    EmptyRegistry(RegistryList),

    #[error("invalid empty entry for source configuration")]
    EmptySource,

    #[error("invalid empty entry for mirror configuration")]
    EmptyMirror,

    #[error(
        "cannot set mirrorSourcePolicy: NeverContactSource if the source {0:?} is one of the mirrors"
    )]
    SourceMirrorsItself(String),

    #[error(
        "conflicting mirrorSourcePolicy is set for the same source {0:?} in imagedigestmirrorsets \
         and imagetagmirrorsets"
    )]
    ConflictingSourcePolicy(String),

    /// The payload's registry is blocked and no mirror rule covers the payload.
    #[error("payload image {payload:?} is blocked and no mirror rule offers another source for it")]
    PayloadBlocked {
        payload: String,
        pruned_blocked: Vec<String>,
    },

    /// Every mirror that could serve the payload is blocked as well.
    #[error("payload image {payload:?} is blocked and every mirror of it is blocked as well")]
    PayloadMirrorBlocked {
        payload: String,
        pruned_blocked: Vec<String>,
    },

    /// The allowed registries would reject the payload.
    #[error("payload image {payload:?} is not covered by any allowed registry and would be unpullable")]
    PayloadNotAllowed { payload: String },

    #[error("template is not valid UTF-8: {0}")]
    TemplateEncoding(#[from] std::str::Utf8Error),

    #[error("failed to parse registries configuration: {0}")]
    ParseRegistries(#[from] toml::de::Error),

    #[error("failed to encode registries configuration: {0}")]
    EncodeRegistries(#[from] toml::ser::Error),

    #[error("failed to process signature policy: {0}")]
    Policy(#[from] serde_json::Error),
}

/// Names the operator-supplied registry list an entry belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegistryList {
    Insecure,
    Blocked,
    Allowed,
}

// === impl Error ===

impl Error {
    /// For payload reachability failures, the blocked registries without the entries that block
    /// the payload.
    pub fn pruned_blocked(&self) -> Option<&[String]> {
        match self {
            Self::PayloadBlocked { pruned_blocked, .. }
            | Self::PayloadMirrorBlocked { pruned_blocked, .. } => Some(pruned_blocked.as_slice()),
            _ => None,
        }
    }
}

// === impl RegistryList ===

impl fmt::Display for RegistryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insecure => "insecure".fmt(f),
            Self::Blocked => "blocked".fmt(f),
            Self::Allowed => "allowed".fmt(f),
        }
    }
}
