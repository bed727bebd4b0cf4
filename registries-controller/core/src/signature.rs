//! Compiles registry sources into a containers signature verification policy (`policy.json`).

use crate::{error::Error, scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The transports whose scopes are managed by this compiler. Others, notably `docker-daemon`, are
/// inherited from the template.
pub const MANAGED_TRANSPORTS: [&str; 2] = ["atomic", "docker"];

/// The top-level `policy.json` document.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Policy {
    pub default: Vec<Requirement>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transports: BTreeMap<String, TransportScopes>,
}

pub type TransportScopes = BTreeMap<String, Vec<Requirement>>;

/// A policy requirement.
///
/// Only the verdicts this compiler writes are modeled; any other requirement (`signedBy`,
/// `sigstoreSigned`, ...) is preserved verbatim.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Requirement {
    Verdict(Verdict),
    Other(serde_json::Map<String, serde_json::Value>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Verdict {
    #[serde(rename = "reject")]
    Reject,

    #[serde(rename = "insecureAcceptAnything")]
    AcceptAny,
}

/// Compiles the signature policy from a `policy.json` template.
///
/// An allow-list on its own rejects everything by default and accepts only the allowed scopes.
/// Otherwise the template's default applies, blocked scopes are rejected, and any allowed scopes
/// are accepted as exceptions to the blocks. Either way the payload repository must remain
/// pullable: it must be covered by the allowed scopes when there are any, and if a blocked scope
/// covers it, the payload repository itself is accepted.
pub fn compile<S: AsRef<str>>(
    template: &[u8],
    blocked: &[S],
    allowed: &[S],
    payload: &str,
) -> Result<Vec<u8>, Error> {
    let mut policy: Policy = serde_json::from_slice(template)?;
    let payload = scope::repository(payload);

    if !allowed.is_empty() && !scope::matches_any(payload, allowed) {
        return Err(Error::PayloadNotAllowed {
            payload: payload.to_string(),
        });
    }

    let mut scopes = BTreeMap::new();
    if blocked.is_empty() && !allowed.is_empty() {
        policy.default = vec![Verdict::Reject.into()];
    }
    for reg in blocked {
        scopes.insert(reg.as_ref(), Verdict::Reject);
    }
    for reg in allowed {
        scopes.insert(reg.as_ref(), Verdict::AcceptAny);
    }
    if scope::matches_any(payload, blocked) {
        debug!(%payload, "Accepting blocked payload repository");
        scopes.insert(payload, Verdict::AcceptAny);
    }

    for transport in MANAGED_TRANSPORTS {
        let transport_scopes = policy.transports.entry(transport.to_string()).or_default();
        for (scope, verdict) in &scopes {
            transport_scopes.insert(scope.to_string(), vec![(*verdict).into()]);
        }
        if transport_scopes.is_empty() {
            policy.transports.remove(transport);
        }
    }

    Ok(serde_json::to_vec(&policy)?)
}

// === impl Policy ===

impl Policy {
    /// The verdict a transport scope carries, if it is a plain verdict.
    pub fn verdict(&self, transport: &str, scope: &str) -> Option<Verdict> {
        match self.transports.get(transport)?.get(scope)?.as_slice() {
            [Requirement::Verdict(verdict)] => Some(*verdict),
            _ => None,
        }
    }

    /// The default verdict, if it is a plain verdict.
    pub fn default_verdict(&self) -> Option<Verdict> {
        match self.default.as_slice() {
            [Requirement::Verdict(verdict)] => Some(*verdict),
            _ => None,
        }
    }
}

// === impl Requirement ===

impl From<Verdict> for Requirement {
    fn from(verdict: Verdict) -> Self {
        Self::Verdict(verdict)
    }
}
