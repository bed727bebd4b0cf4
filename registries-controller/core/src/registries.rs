//! Compiles mirror rules and registry sources into a containers `registries.conf` (v2) document.

use crate::{
    error::Error,
    mirrors::{self, Exclusivity, MirrorSets, PullMode},
    scope, validation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// The top-level `registries.conf` document.
///
/// Fields this compiler does not manage (e.g. `short-name-mode`, `aliases`) are carried through
/// from the template unchanged.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistriesConf {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unqualified_search_registries: Vec<String>,

    #[serde(default, rename = "registry", skip_serializing_if = "Vec::is_empty")]
    pub registries: Vec<Registry>,

    #[serde(flatten)]
    pub other: toml::Table,
}

/// A `[[registry]]` entry, keyed by its `prefix` if set and by its `location` otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Registry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    #[serde(default)]
    pub location: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub mirror_by_digest_only: bool,

    #[serde(default, rename = "mirror", skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<Endpoint>,
}

/// A `[[registry.mirror]]` entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Endpoint {
    pub location: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_from_mirror: Option<PullFromMirror>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullFromMirror {
    All,
    DigestOnly,
    TagOnly,
}

/// Compiles the registries configuration from a `registries.conf` template.
///
/// Every mirrored source, blocked registry and insecure registry ends up in exactly one entry
/// whose flags are the union of everything that applies to it. Entries are emitted in key order.
/// Inputs are expected to have passed [`validation::validate`]; the only failures are template
/// parse and encode errors.
pub fn compile<S: AsRef<str>>(
    template: &[u8],
    insecure: &[S],
    blocked: &[S],
    sets: &MirrorSets<'_>,
) -> Result<Vec<u8>, Error> {
    let mut conf: RegistriesConf = toml::from_str(std::str::from_utf8(template)?)?;
    let mut entries = conf
        .registries
        .drain(..)
        .map(|reg| (reg.key().to_string(), reg))
        .collect::<BTreeMap<_, _>>();

    // Conflicts were rejected during validation; an unvalidated conflict leaves sources contactable.
    let policies = validation::source_policies(sets).unwrap_or_default();

    for directive in mirrors::normalize(sets) {
        let source = directive.source;
        let entry = entries
            .entry(source.to_string())
            .or_insert_with(|| Registry::from_key(source));
        entry.insecure |= scope::matches_any(source, insecure);

        // Wildcard sources have no mirrors to fall back on, so NeverContact does not apply.
        if scope::is_wildcard(source) {
            entry.blocked |= scope::matches_any(source, blocked);
            warn!(%source, mirror = %directive.mirror, "Ignoring mirror of wildcard source");
            continue;
        }
        entry.blocked |= scope::matches_any(source, blocked)
            || policies.get(source) == Some(&Exclusivity::NeverContact);

        let endpoint = Endpoint {
            location: directive.mirror.to_string(),
            insecure: scope::matches_any(directive.mirror, insecure),
            pull_from_mirror: Some(directive.pull_mode.into()),
        };
        if !entry.mirrors.contains(&endpoint) {
            entry.mirrors.push(endpoint);
        }
    }

    for reg in blocked.iter().map(AsRef::as_ref) {
        if let Some(entry) = entries.get_mut(reg) {
            entry.blocked = true;
            entry.insecure |= scope::matches_any(reg, insecure);
            continue;
        }

        let is_insecure = scope::matches_any(reg, insecure);
        let covered = blocked.iter().map(AsRef::as_ref).any(|wildcard| {
            wildcard != reg
                && scope::is_wildcard(wildcard)
                && scope::matches(reg, wildcard)
                && scope::matches_any(wildcard, insecure) == is_insecure
        });
        if covered {
            trace!(registry = %reg, "Blocked by a wildcard entry");
            continue;
        }

        entries.insert(
            reg.to_string(),
            Registry {
                blocked: true,
                insecure: is_insecure,
                ..Registry::from_key(reg)
            },
        );
    }

    for reg in insecure.iter().map(AsRef::as_ref) {
        let entry = entries.entry(reg.to_string()).or_insert_with(|| Registry {
            blocked: scope::matches_any(reg, blocked),
            ..Registry::from_key(reg)
        });
        entry.insecure = true;
    }

    // Template entries are subject to the same lists as generated ones.
    for (key, entry) in &mut entries {
        entry.blocked |= scope::matches_any(key, blocked);
        entry.insecure |= scope::matches_any(key, insecure);
        for mirror in &mut entry.mirrors {
            mirror.insecure |= scope::matches_any(&mirror.location, insecure);
        }
    }

    conf.registries = entries.into_values().collect();
    debug!(registries = conf.registries.len(), "Compiled registries configuration");
    Ok(toml::to_string(&conf)?.into_bytes())
}

/// Compiles a drop-in that overrides the unqualified search registries.
///
/// Returns `None` when no search registries are configured, in which case the template's list
/// applies.
pub fn search_registries<S: AsRef<str>>(registries: &[S]) -> Result<Option<Vec<u8>>, Error> {
    if registries.is_empty() {
        return Ok(None);
    }

    let conf = RegistriesConf {
        unqualified_search_registries: registries.iter().map(|r| r.as_ref().to_string()).collect(),
        ..Default::default()
    };
    Ok(Some(toml::to_string(&conf)?.into_bytes()))
}

fn is_false(b: &bool) -> bool {
    !*b
}

// === impl Registry ===

impl Registry {
    /// Creates an empty entry for a location, or for a prefix if `key` is a wildcard.
    pub fn from_key(key: &str) -> Self {
        if scope::is_wildcard(key) {
            Self {
                prefix: key.to_string(),
                ..Self::default()
            }
        } else {
            Self {
                location: key.to_string(),
                ..Self::default()
            }
        }
    }

    pub fn key(&self) -> &str {
        if self.prefix.is_empty() {
            &self.location
        } else {
            &self.prefix
        }
    }
}

// === impl PullFromMirror ===

impl From<PullMode> for PullFromMirror {
    fn from(mode: PullMode) -> Self {
        match mode {
            PullMode::DigestOnly => Self::DigestOnly,
            PullMode::TagOnly => Self::TagOnly,
        }
    }
}
