use percent_encoding::percent_decode_str;

use crate::error::CanonicalizeError;
use crate::variables::{SortedArgs, Variable};

pub const CACHE_KEY_PREFIX: &str = "sorted-args:cache";

/// Build a fully canonical cache key:
/// - normalize path (trim, collapse slashes, remove trailing slash)
/// - percent-decode path
/// - append the sorted, filtered arguments when any survive
/// - namespace prefix lowercased
pub fn canonical_cache_key(path: &str, args: &SortedArgs, ns: &str) -> Result<String, CanonicalizeError> {
    let mut path = path.trim().to_string();
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    if path.ends_with('/') && path != "/" {
        path.pop();
    }

    let path = percent_decode_str(&path).decode_utf8_lossy();

    let is_args = args.variable(Variable::IsArgs)?;
    let sorted = args.variable(Variable::Args)?;

    Ok(format!(
        "{}:{}:{}{}{}",
        CACHE_KEY_PREFIX,
        ns.to_lowercase(),
        path,
        is_args,
        sorted
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ParameterFilterSet;
    use crate::scope::Scope;

    #[test]
    fn key_uses_sorted_args() {
        let args = SortedArgs::unfiltered("b=2&a=1");
        let key = canonical_cache_key("/items//list/", &args, "API").expect("key");

        assert_eq!(key, "sorted-args:cache:api:/items/list?a=1&b=2");
    }

    #[test]
    fn key_drops_question_mark_when_everything_is_filtered() {
        let scope = Scope::new("main").with_filter(ParameterFilterSet::build(["utm_source"]));
        let args = SortedArgs::new("utm_source=mail", scope);

        let key = canonical_cache_key("/caf%C3%A9", &args, "default").expect("key");
        assert_eq!(key, "sorted-args:cache:default:/café");
    }

    #[test]
    fn reordered_queries_share_a_key() {
        let one = SortedArgs::unfiltered("page=2&sort=asc");
        let two = SortedArgs::unfiltered("sort=asc&page=2");

        assert_eq!(
            canonical_cache_key("/", &one, "default").expect("key"),
            canonical_cache_key("/", &two, "default").expect("key")
        );
    }
}
