use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::canonical::{canonicalize, CanonicalResult};
use crate::error::CanonicalizeError;
use crate::scope::Scope;

/// Marker rendered for a true presence flag.
pub const PRESENT: &str = "?";
/// Separator that continues an existing argument list.
pub const CONTINUE: &str = "&";

/// Variables exposed to templates and handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// `$sorted_args`: the canonical argument string
    Args,
    /// `$sorted_is_args`: `?` when any argument survived filtering
    IsArgs,
    /// `$sorted_has_args`: `&` when arguments survived, `?` otherwise
    HasArgs,
}

impl Variable {
    pub const ALL: [Variable; 3] = [Variable::Args, Variable::IsArgs, Variable::HasArgs];

    pub fn name(self) -> &'static str {
        match self {
            Variable::Args => "sorted_args",
            Variable::IsArgs => "sorted_is_args",
            Variable::HasArgs => "sorted_has_args",
        }
    }

    pub fn from_name(name: &str) -> Option<Variable> {
        Variable::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

struct Inner {
    query: String,
    scope: Scope,
    result: OnceLock<CanonicalResult>,
}

/// Sorted arguments of one request.
///
/// Nothing is parsed until a fact is first read; the result is then kept for
/// the lifetime of the request. Clones share the cached result.
#[derive(Clone)]
pub struct SortedArgs(Arc<Inner>);

impl SortedArgs {
    pub fn new(query: impl Into<String>, scope: Scope) -> SortedArgs {
        SortedArgs(Arc::new(Inner {
            query: query.into(),
            scope,
            result: OnceLock::new(),
        }))
    }

    pub fn unfiltered(query: impl Into<String>) -> SortedArgs {
        SortedArgs::new(query, Scope::default())
    }

    pub fn query(&self) -> &str {
        &self.0.query
    }

    pub fn scope(&self) -> &Scope {
        &self.0.scope
    }

    pub fn result(&self) -> Result<&CanonicalResult, CanonicalizeError> {
        if let Some(result) = self.0.result.get() {
            return Ok(result);
        }

        let inner = &*self.0;
        let result = canonicalize(&inner.query, inner.scope.filter(), inner.scope.order())?;

        debug!(
            scope = inner.scope.name(),
            is_args = result.is_args(),
            sorted_args = result.canonical(),
            "sorted query arguments"
        );

        Ok(inner.result.get_or_init(|| result))
    }

    /// The raw query string was non-empty. Never needs the canonical pass.
    pub fn has_args(&self) -> bool {
        !self.0.query.is_empty()
    }

    pub fn is_args(&self) -> Result<bool, CanonicalizeError> {
        Ok(self.result()?.is_args())
    }

    pub fn canonical(&self) -> Result<&str, CanonicalizeError> {
        Ok(self.result()?.canonical())
    }

    pub fn variable(&self, variable: Variable) -> Result<Cow<'_, str>, CanonicalizeError> {
        if !self.has_args() {
            return Ok(match variable {
                Variable::HasArgs => Cow::Borrowed(PRESENT),
                _ => Cow::Borrowed(""),
            });
        }

        let result = self.result()?;

        let value = match variable {
            Variable::Args => result.canonical(),
            Variable::IsArgs if result.is_args() => PRESENT,
            Variable::IsArgs => "",
            Variable::HasArgs if result.is_args() => CONTINUE,
            Variable::HasArgs => PRESENT,
        };

        Ok(Cow::Borrowed(value))
    }
}

impl fmt::Debug for SortedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedArgs")
            .field("query", &self.0.query)
            .field("scope", &self.0.scope.name())
            .field("result", &self.0.result.get())
            .finish()
    }
}
