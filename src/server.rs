use std::{sync::Arc, time::SystemTime};

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache_key::canonical_cache_key;
use crate::config::{validate_config, AppConfig};
use crate::middleware::sorted_args_layer;
use crate::scope::ScopeTable;
use crate::variables::{SortedArgs, Variable};

pub const CACHE_KEY_HEADER: &str = "x-cache-key";

// Hop-by-hop headers are not relayed from upstream.
const SKIPPED_HEADERS: &[&str] = &["connection", "keep-alive", "transfer-encoding", "upgrade"];

#[derive(Debug, Serialize)]
struct Facts<'a> {
    path: &'a str,
    scope: &'a str,
    has_args: bool,
    is_args: bool,
    sorted_args: &'a str,
    sorted_is_args: &'a str,
    sorted_has_args: &'a str,
    cache_key: &'a str,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    timestamp: SystemTime,
    locations: usize,
}

struct Upstream {
    base_url: String,
    client: reqwest::Client,
}

// Server State
pub struct ProxyServer {
    config: AppConfig,
    scopes: Arc<ScopeTable>,
    upstream: Option<Upstream>,
}

impl ProxyServer {
    pub fn new(config: AppConfig) -> Result<Arc<Self>> {
        validate_config(&config)?;

        let scopes = Arc::new(config.scopes()?);

        let upstream = match &config.upstream {
            Some(upstream) => Some(Upstream {
                base_url: upstream.base_url.trim_end_matches('/').to_string(),
                client: reqwest::Client::builder()
                    .timeout(upstream.timeout()?)
                    .build()?,
            }),
            None => None,
        };

        Ok(Arc::new(Self {
            config,
            scopes,
            upstream,
        }))
    }

    pub fn scopes(&self) -> Arc<ScopeTable> {
        self.scopes.clone()
    }

    /// Routes with the sorted-args layer applied to every request.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/health", get(ProxyServer::handle_health))
            .fallback(ProxyServer::handle_request)
            .layer(middleware::from_fn_with_state(self.scopes(), sorted_args_layer))
            .with_state(self.clone())
    }

    pub async fn handle_request(
        State(server): State<Arc<ProxyServer>>,
        args: SortedArgs,
        req: Request,
    ) -> Result<Response, StatusCode> {
        let path = req.uri().path().to_string();

        let cache_key = canonical_cache_key(&path, &args, &server.config.cache_key.namespace)
            .map_err(|err| {
                error!("failed to build cache key: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

        let mut response = match &server.upstream {
            Some(upstream) => {
                if req.method() != Method::GET {
                    return Err(StatusCode::METHOD_NOT_ALLOWED);
                }
                server.forward(upstream, &path, &args).await?
            }
            None => Self::describe(&path, &args, &cache_key)?,
        };

        match HeaderValue::from_str(&cache_key) {
            Ok(value) => {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(CACHE_KEY_HEADER), value);
            }
            Err(_) => warn!("cache key for {} is not a valid header value", path),
        }

        Ok(response)
    }

    fn describe(path: &str, args: &SortedArgs, cache_key: &str) -> Result<Response, StatusCode> {
        let render = move |variable| {
            args.variable(variable).map_err(|err| {
                error!("failed to sort query arguments: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            })
        };

        let sorted_args = render(Variable::Args)?;
        let sorted_is_args = render(Variable::IsArgs)?;
        let sorted_has_args = render(Variable::HasArgs)?;

        let facts = Facts {
            path,
            scope: args.scope().name(),
            has_args: args.has_args(),
            is_args: !sorted_is_args.is_empty(),
            sorted_args: &sorted_args,
            sorted_is_args: &sorted_is_args,
            sorted_has_args: &sorted_has_args,
            cache_key,
        };

        Ok(Json(facts).into_response())
    }

    async fn forward(&self, upstream: &Upstream, path: &str, args: &SortedArgs) -> Result<Response, StatusCode> {
        let is_args = args.variable(Variable::IsArgs).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let sorted = args.variable(Variable::Args).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let url = format!("{}{}{}{}", upstream.base_url, path, is_args, sorted);
        debug!("forwarding to {}", url);

        let resp = upstream.client.get(&url).send().await.map_err(|err| {
            warn!("upstream request failed: {}", err);
            StatusCode::BAD_GATEWAY
        })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter(|(k, _)| !SKIPPED_HEADERS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str().to_string(), v.as_bytes().to_vec()))
            .collect::<Vec<_>>();

        let body = resp.bytes().await.map_err(|err| {
            warn!("failed to read upstream body: {}", err);
            StatusCode::BAD_GATEWAY
        })?;

        let mut builder = Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(k, v);
        }

        builder.body(Body::from(body)).map_err(|err| {
            error!("invalid upstream response: {}", err);
            StatusCode::BAD_GATEWAY
        })
    }

    pub async fn handle_health(State(server): State<Arc<ProxyServer>>) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            timestamp: SystemTime::now(),
            locations: server.config.sorted_args.locations.len(),
        };

        (StatusCode::OK, Json(status))
    }
}
