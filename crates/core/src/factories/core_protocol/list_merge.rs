use modproxy_api::*;
use std::collections::HashSet;

/// List the versions of a module, merging what storage holds with what
/// upstream knows.
///
/// Both sources are queried concurrently and both are awaited.
///
/// | storage   | upstream       | result                 |
/// |-----------|----------------|------------------------|
/// | ok        | ok             | union of both          |
/// | ok        | not found      | storage list           |
/// | not found | ok             | upstream list          |
/// | not found | not found      | not found              |
/// | any       | other error    | upstream error         |
/// | other err | any            | storage error          |
///
/// Upstream failures other than not found are never papered over with
/// the storage list alone.
pub async fn list_merge(
    storage: &dyn Storage,
    lister: &dyn VersionLister,
    module: &str,
) -> ProxyResult<Vec<String>> {
    let (stored, upstream) =
        futures::join!(storage.list(module), lister.list(module));

    match (stored, upstream) {
        (Err(err), _) if !err.is_not_found() => {
            Err(err.with_ctx(format!("list storage: {module}")))
        }
        (_, Err(err)) if !err.is_not_found() => {
            Err(err.with_ctx(format!("list upstream: {module}")))
        }
        (Ok(stored), Ok((_, upstream))) => Ok(union(stored, upstream)),
        (Ok(stored), Err(_)) => Ok(stored),
        (Err(_), Ok((_, upstream))) => Ok(upstream),
        (Err(_), Err(_)) => {
            Err(ProxyError::not_found(format!("list: {module}")))
        }
    }
}

/// Concatenate `a` and `b`, keeping only the first occurrence of each
/// version.
pub fn union(a: Vec<String>, b: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(a.len() + b.len());
    a.into_iter()
        .chain(b)
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
