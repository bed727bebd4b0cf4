#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod error;
pub mod mirrors;
pub mod payload;
pub mod registries;
pub mod scope;
pub mod signature;
pub mod validation;

pub use self::{
    error::{Error, RegistryList},
    mirrors::{MirrorDirective, MirrorSets, PullMode},
    payload::Resolved,
};
use tracing::{debug, info};

/// Everything a single compilation reads.
#[derive(Copy, Clone, Debug)]
pub struct Inputs<'a> {
    pub insecure: &'a [String],
    pub blocked: &'a [String],
    pub allowed: &'a [String],
    pub search: &'a [String],
    pub mirror_sets: MirrorSets<'a>,

    /// The release payload image reference.
    pub release_image: &'a str,

    /// The `registries.conf` base document.
    pub registries_template: &'a [u8],

    /// The `policy.json` base document.
    pub policy_template: &'a [u8],
}

/// The compiled runtime configuration documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compiled {
    pub registries: Vec<u8>,
    pub policy: Vec<u8>,

    /// Only produced when search registries are configured.
    pub search_registries: Option<Vec<u8>>,
}

/// Validates the inputs, resolves the payload against the blocked registries and compiles every
/// document. Nothing is produced unless every step succeeds.
pub fn compile(inputs: &Inputs<'_>) -> Result<Compiled, Error> {
    let Inputs {
        insecure,
        blocked,
        allowed,
        search,
        ref mirror_sets,
        release_image,
        registries_template,
        policy_template,
    } = *inputs;

    validation::validate(insecure, blocked, allowed, mirror_sets)?;
    debug!(
        insecure = insecure.len(),
        blocked = blocked.len(),
        allowed = allowed.len(),
        directives = mirrors::normalize(mirror_sets).len(),
        "Validated registry sources"
    );

    let resolved = payload::resolve(release_image, blocked, mirror_sets)?;
    let mut allowed = allowed.to_vec();
    for scope in resolved.allowed {
        if !allowed.contains(&scope) {
            allowed.push(scope);
        }
    }

    let registries = registries::compile(
        registries_template,
        insecure,
        &resolved.registries_blocked,
        mirror_sets,
    )?;
    let policy = signature::compile(
        policy_template,
        &resolved.policy_blocked,
        &allowed,
        release_image,
    )?;
    let search_registries = registries::search_registries(search)?;

    info!(
        registries = registries.len(),
        policy = policy.len(),
        search_registries = search_registries.is_some(),
        "Compiled registry configuration"
    );
    Ok(Compiled {
        registries,
        policy,
        search_registries,
    })
}
