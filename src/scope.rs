use std::sync::Arc;

use crate::canonical::SortOrder;
use crate::error::ConfigError;
use crate::filter::ParameterFilterSet;

/// Settings that apply to every request resolved to one location.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    name: Arc<str>,
    filter: Option<Arc<ParameterFilterSet>>,
    order: SortOrder,
}

impl Scope {
    pub fn new(name: impl Into<Arc<str>>) -> Scope {
        Scope {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: ParameterFilterSet) -> Scope {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Scope {
        self.order = order;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> Option<&ParameterFilterSet> {
        self.filter.as_deref()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}

/// Directive state for one scope while configuration is read.
///
/// Unset values are inherited from the parent when the scope is merged.
#[derive(Debug, Clone)]
pub struct ScopeBuilder {
    name: String,
    filter: Option<ParameterFilterSet>,
    order: Option<SortOrder>,
}

impl ScopeBuilder {
    pub fn new(name: impl Into<String>) -> ScopeBuilder {
        ScopeBuilder {
            name: name.into(),
            filter: None,
            order: None,
        }
    }

    /// Applies a `sorted_args_filter` directive. It may appear once per scope
    /// and needs one or more names.
    pub fn filter<I, S>(&mut self, tokens: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.filter.is_some() {
            return Err(ConfigError::Duplicate(self.name.clone()));
        }

        let set = ParameterFilterSet::build(tokens);
        if set.is_empty() {
            return Err(ConfigError::Empty(self.name.clone()));
        }

        self.filter = Some(set);
        Ok(self)
    }

    pub fn order(&mut self, order: SortOrder) -> &mut Self {
        self.order = Some(order);
        self
    }

    /// Resolves the scope, taking unset values from `parent`.
    pub fn merge(self, parent: Option<&Scope>) -> Scope {
        Scope {
            name: self.name.into(),
            filter: match self.filter {
                Some(filter) => Some(Arc::new(filter)),
                None => parent.and_then(|p| p.filter.clone()),
            },
            order: self
                .order
                .or_else(|| parent.map(|p| p.order))
                .unwrap_or_default(),
        }
    }
}

/// Maps request paths to scopes by longest location prefix.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    main: Scope,
    // sorted by descending prefix length
    locations: Vec<(String, Scope)>,
}

impl ScopeTable {
    pub fn new(main: Scope) -> ScopeTable {
        ScopeTable {
            main,
            locations: Vec::new(),
        }
    }

    pub fn insert(&mut self, prefix: impl Into<String>, scope: Scope) -> Result<&mut Self, ConfigError> {
        let prefix = prefix.into();

        if !prefix.starts_with('/') {
            return Err(ConfigError::InvalidPrefix(prefix));
        }
        if self.locations.iter().any(|(p, _)| *p == prefix) {
            return Err(ConfigError::DuplicateLocation(prefix));
        }

        let at = self
            .locations
            .iter()
            .position(|(p, _)| p.len() < prefix.len())
            .unwrap_or(self.locations.len());
        self.locations.insert(at, (prefix, scope));

        Ok(self)
    }

    pub fn main(&self) -> &Scope {
        &self.main
    }

    pub fn resolve(&self, path: &str) -> &Scope {
        self.locations
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, scope)| scope)
            .unwrap_or(&self.main)
    }
}
