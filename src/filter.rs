/// Parameter names removed from the canonical argument string.
///
/// Built once per configuration scope and shared read-only (usually behind an
/// `Arc`) by every request resolved to that scope. Names compare ASCII
/// case-insensitively; the spelling of the first occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterFilterSet {
    names: Vec<String>,
}

impl ParameterFilterSet {
    pub fn build<I, S>(tokens: I) -> ParameterFilterSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            if !names.iter().any(|name| name.eq_ignore_ascii_case(token)) {
                names.push(token.to_string());
            }
        }

        ParameterFilterSet { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ParameterFilterSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        ParameterFilterSet::build(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_deduplicates_case_insensitively() {
        let set = ParameterFilterSet::build(["utm_source", "UTM_SOURCE", "utm_medium"]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["utm_source", "utm_medium"]);
    }

    #[test]
    fn first_spelling_wins() {
        let set = ParameterFilterSet::build(["Token", "TOKEN", "token"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Token"]);
    }

    #[test]
    fn contains_ignores_case() {
        let set: ParameterFilterSet = ["fbclid", "gclid"].into_iter().collect();

        assert!(set.contains("FBCLID"));
        assert!(set.contains("gClId"));
        assert!(!set.contains("gcl"));
        assert!(!set.contains("gclid2"));
        assert!(!set.contains(""));
    }

    #[test]
    fn empty_set_filters_nothing() {
        let set = ParameterFilterSet::build(Vec::<String>::new());

        assert!(set.is_empty());
        assert!(!set.contains("a"));
    }
}
