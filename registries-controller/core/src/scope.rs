//! Matching of image references against registry scopes.
//!
//! A scope is either exact (`quay.io`, `quay.io/ns/repo`), covering itself and every repository
//! nested under it, or a wildcard host (`*.example.com`), covering every reference whose registry
//! host ends with `.example.com`.

/// Returns true if `scope` is a wildcard host scope (`*.suffix`).
#[inline]
pub fn is_wildcard(scope: &str) -> bool {
    scope.starts_with("*.")
}

/// Returns true if `candidate` falls within `scope`.
///
/// Wildcards only inspect the candidate's registry host, so `foo.example.com/ns` is covered by
/// `*.example.com` while `example.com` is not. A wildcard candidate is covered by a broader
/// wildcard: `*.a.example.com` falls within `*.example.com`.
pub fn matches(candidate: &str, scope: &str) -> bool {
    if let Some(suffix) = scope.strip_prefix('*') {
        return is_wildcard(scope) && host(candidate).ends_with(suffix);
    }

    match candidate.strip_prefix(scope) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Returns true if `candidate` falls within any of `scopes`.
pub fn matches_any<S: AsRef<str>>(candidate: &str, scopes: &[S]) -> bool {
    scopes.iter().any(|s| matches(candidate, s.as_ref()))
}

/// The registry host of a reference: everything before the first `/`.
pub fn host(reference: &str) -> &str {
    reference
        .split_once('/')
        .map_or(reference, |(host, _)| host)
}

/// Strips the digest or tag from an image reference, leaving its repository.
///
/// A `:` in the registry host introduces a port, not a tag, so `localhost:5000/app` and
/// `localhost:5000` are returned unchanged.
pub fn repository(image: &str) -> &str {
    let image = image.split_once('@').map_or(image, |(repo, _)| repo);
    let Some((name, tag)) = image.rsplit_once(':') else {
        return image;
    };
    if tag.contains('/') || (!name.contains('/') && is_port(tag)) {
        return image;
    }
    name
}

fn is_port(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Returns true if the image is referenced by digest rather than by tag.
#[inline]
pub fn is_digest_reference(image: &str) -> bool {
    image.contains('@')
}

/// Rewrites `repository` onto `mirror` when it is covered by the exact scope `source`.
///
/// `quay.io/ns/repo` with source `quay.io` and mirror `mirror.io/quay` becomes
/// `mirror.io/quay/ns/repo`. Wildcard sources never rewrite.
pub fn rewrite(repository: &str, source: &str, mirror: &str) -> Option<String> {
    if is_wildcard(source) {
        return None;
    }

    let rest = repository.strip_prefix(source)?;
    if rest.is_empty() {
        return Some(mirror.to_string());
    }
    rest.strip_prefix('/').map(|path| format!("{mirror}/{path}"))
}
