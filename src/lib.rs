use std::time::Duration;

pub mod cache_key;
pub mod canonical;
pub mod config;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod scope;
pub mod server;
pub mod variables;

pub use self::{
    cache_key::canonical_cache_key,
    canonical::{canonicalize, CanonicalResult, Parameter, SortOrder},
    config::{validate_config, AppConfig, CacheKeyConfig, LocationConfig, ServerConfig, UpstreamConfig},
    error::{CanonicalizeError, ConfigError},
    filter::ParameterFilterSet,
    middleware::sorted_args_layer,
    scope::{Scope, ScopeBuilder, ScopeTable},
    server::ProxyServer,
    variables::{SortedArgs, Variable},
};

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
