use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::scope::ScopeTable;
use crate::variables::SortedArgs;

/// Attaches a lazily evaluated [`SortedArgs`] for the request's scope.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn sorted_args_layer(
    State(scopes): State<Arc<ScopeTable>>,
    mut req: Request,
    next: Next,
) -> Response {
    let scope = scopes.resolve(req.uri().path()).clone();
    let query = req.uri().query().unwrap_or("").to_string();

    trace!(scope = scope.name(), path = req.uri().path(), "attached sorted args");

    req.extensions_mut().insert(SortedArgs::new(query, scope));
    next.run(req).await
}

impl<S> FromRequestParts<S> for SortedArgs
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(args) = parts.extensions.get::<SortedArgs>() {
            return Ok(args.clone());
        }

        // No layer in front of this route: nothing is filtered.
        let args = SortedArgs::unfiltered(parts.uri.query().unwrap_or(""));
        parts.extensions.insert(args.clone());
        Ok(args)
    }
}
