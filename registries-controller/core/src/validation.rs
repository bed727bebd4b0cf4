use crate::{
    error::{Error, RegistryList},
    mirrors::{Exclusivity, MirrorSets},
};
use ahash::AHashMap as HashMap;

/// Rejects registry sources and mirror rules that cannot be compiled.
///
/// Checks run in a fixed order and the first failure is returned: empty list entries, empty
/// sources and mirrors, a never-contacted source that mirrors itself, and finally a source whose
/// exclusivity differs between rule sets.
pub fn validate<S: AsRef<str>>(
    insecure: &[S],
    blocked: &[S],
    allowed: &[S],
    sets: &MirrorSets<'_>,
) -> Result<(), Error> {
    for (list, entries) in [
        (RegistryList::Insecure, insecure),
        (RegistryList::Blocked, blocked),
        (RegistryList::Allowed, allowed),
    ] {
        if entries.iter().any(|e| e.as_ref().is_empty()) {
            return Err(Error::EmptyRegistry(list));
        }
    }

    if sets.records().any(|r| r.source.is_empty()) {
        return Err(Error::EmptySource);
    }

    if sets
        .records()
        .any(|r| r.mirrors.iter().any(|m| m.is_empty()))
    {
        return Err(Error::EmptyMirror);
    }

    for record in sets.records() {
        if record.exclusivity == Exclusivity::NeverContact
            && record.mirrors.iter().any(|m| m == record.source)
        {
            return Err(Error::SourceMirrorsItself(record.source.to_string()));
        }
    }

    source_policies(sets)?;
    Ok(())
}

/// Collects the declared exclusivity of every source.
///
/// Sources without a declared exclusivity are omitted. Fails if two records declare different
/// exclusivities for the same source, in the same kind of rule set or across kinds.
pub fn source_policies<'a>(sets: &MirrorSets<'a>) -> Result<HashMap<&'a str, Exclusivity>, Error> {
    let mut policies = HashMap::new();
    for record in sets.records() {
        if record.exclusivity == Exclusivity::Unset {
            continue;
        }

        match policies.insert(record.source, record.exclusivity) {
            Some(prior) if prior != record.exclusivity => {
                return Err(Error::ConflictingSourcePolicy(record.source.to_string()));
            }
            _ => {}
        }
    }
    Ok(policies)
}
