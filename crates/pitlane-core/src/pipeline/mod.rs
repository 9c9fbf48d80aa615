//! Ordered request pipeline.
//!
//! Cross-cutting concerns run as an explicit ordered list of stages, each
//! mapping request state to Continue or ShortCircuit(response). The
//! canonical order is fixed: method check, rate limit, auth resolution.
//! A [`RoutePolicy`] assembles the list per route group and is applied as
//! one axum middleware via [`run_policy`].

pub mod respond;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::json;

use pitlane_types::{AppError, ErrorKind, Identity};

use crate::rate_limit::{KeyScope, RateLimitDecision, RateLimiter};
use crate::session::{SessionState, SessionStore};
use crate::util::generate_trace_id;

/// Per-request correlation id, injected as an extension for handlers.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

/// Admission bookkeeping carried from the rate-limit stage to the
/// response path (headers + post-hoc outcome recording).
pub struct RateLimitOutcome {
    pub limiter: Arc<RateLimiter>,
    pub key: String,
    pub decision: RateLimitDecision,
}

/// Mutable state threaded through the stages of one request.
pub struct RequestContext {
    pub trace_id: String,
    pub identity: Option<Identity>,
    pub rate_limit: Option<RateLimitOutcome>,
}

impl RequestContext {
    fn new() -> Self {
        Self { trace_id: generate_trace_id(), identity: None, rate_limit: None }
    }
}

pub enum StageOutcome {
    Continue,
    ShortCircuit(Response),
}

/// One pipeline stage.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, ctx: &mut RequestContext, request: &Request) -> StageOutcome;
}

/// Rejects methods outside the configured set with 405 + `Allow`.
struct MethodStage {
    allowed: Vec<Method>,
}

impl Stage for MethodStage {
    fn name(&self) -> &'static str {
        "method"
    }

    fn apply(&self, ctx: &mut RequestContext, request: &Request) -> StageOutcome {
        if self.allowed.contains(request.method()) {
            return StageOutcome::Continue;
        }
        let allowed: Vec<&str> = self.allowed.iter().map(Method::as_str).collect();
        let err = AppError::new(
            ErrorKind::MethodNotAllowed,
            format!("method {} is not allowed here", request.method()),
        )
        .with_details(json!({ "allowed_methods": allowed }))
        .with_trace(ctx.trace_id.clone());

        let mut response = respond::error_response(&err);
        if let Ok(value) = allowed.join(", ").parse() {
            response.headers_mut().insert(header::ALLOW, value);
        }
        StageOutcome::ShortCircuit(response)
    }
}

/// Admits or rejects against a limiter; rejection returns 429 before the
/// handler is ever invoked.
struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn apply(&self, ctx: &mut RequestContext, request: &Request) -> StageOutcome {
        let key = match self.limiter.config().scope {
            KeyScope::Address => client_key(request),
            // identity is only resolved by a later stage; fall back to the
            // address key when a user-scoped limiter runs in the pipeline
            KeyScope::User => ctx
                .identity
                .as_ref()
                .map(|id| id.user_id.to_string())
                .unwrap_or_else(|| client_key(request)),
        };

        let decision = self.limiter.check(&key);
        if !decision.allowed {
            tracing::warn!("[{}] rate limited key={}", ctx.trace_id, key);
            return StageOutcome::ShortCircuit(respond::too_many_requests(
                &decision,
                self.limiter.config().message.as_deref(),
                self.limiter.config().window,
                &ctx.trace_id,
            ));
        }

        ctx.rate_limit =
            Some(RateLimitOutcome { limiter: self.limiter.clone(), key, decision });
        StageOutcome::Continue
    }
}

/// Resolves the caller's identity from the session cookie.
struct AuthStage {
    sessions: Arc<SessionStore>,
    require_auth: bool,
}

impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn apply(&self, ctx: &mut RequestContext, request: &Request) -> StageOutcome {
        let cookie = request.headers().get(header::COOKIE).and_then(|h| h.to_str().ok());
        match self.sessions.resolve_header(cookie) {
            SessionState::Valid(identity) => {
                ctx.identity = Some(identity);
                StageOutcome::Continue
            }
            SessionState::Expired if self.require_auth => {
                let err = AppError::new(ErrorKind::SessionExpired, "session has expired")
                    .with_trace(ctx.trace_id.clone());
                StageOutcome::ShortCircuit(respond::error_response(&err))
            }
            SessionState::Missing if self.require_auth => {
                let err = AppError::unauthorized("authentication required")
                    .with_trace(ctx.trace_id.clone());
                StageOutcome::ShortCircuit(respond::error_response(&err))
            }
            _ => StageOutcome::Continue,
        }
    }
}

/// Ordered stage list for one route group.
#[derive(Clone)]
pub struct RoutePolicy {
    stages: Arc<Vec<Box<dyn Stage>>>,
}

impl RoutePolicy {
    pub fn builder() -> RoutePolicyBuilder {
        RoutePolicyBuilder::default()
    }

    pub fn apply(&self, ctx: &mut RequestContext, request: &Request) -> Option<Response> {
        for stage in self.stages.iter() {
            if let StageOutcome::ShortCircuit(response) = stage.apply(ctx, request) {
                tracing::debug!("[{}] short-circuited at stage {}", ctx.trace_id, stage.name());
                return Some(response);
            }
        }
        None
    }
}

#[derive(Default)]
pub struct RoutePolicyBuilder {
    allowed_methods: Option<Vec<Method>>,
    limiter: Option<Arc<RateLimiter>>,
    sessions: Option<Arc<SessionStore>>,
    require_auth: bool,
}

impl RoutePolicyBuilder {
    pub fn allow_methods(mut self, methods: &[Method]) -> Self {
        self.allowed_methods = Some(methods.to_vec());
        self
    }

    pub fn rate_limit(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Resolve identity when present, without demanding it.
    pub fn resolve_identity(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self.require_auth = false;
        self
    }

    /// Resolve identity and reject anonymous callers.
    pub fn require_auth(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self.require_auth = true;
        self
    }

    /// Assemble the stage list. Order is fixed here and nowhere else:
    /// method check, then rate limit, then auth.
    pub fn build(self) -> RoutePolicy {
        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if let Some(allowed) = self.allowed_methods {
            stages.push(Box::new(MethodStage { allowed }));
        }
        if let Some(limiter) = self.limiter {
            stages.push(Box::new(RateLimitStage { limiter }));
        }
        if let Some(sessions) = self.sessions {
            stages.push(Box::new(AuthStage { sessions, require_auth: self.require_auth }));
        }
        RoutePolicy { stages: Arc::new(stages) }
    }
}

/// Axum middleware running a [`RoutePolicy`].
///
/// Generates a fresh trace id per invocation, injects it (and the
/// resolved identity) as request extensions, and finishes the rate-limit
/// bookkeeping on the way out.
pub async fn run_policy(
    State(policy): State<RoutePolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut ctx = RequestContext::new();
    tracing::info!("[{}] {} {}", ctx.trace_id, request.method(), request.uri().path());

    if let Some(response) = policy.apply(&mut ctx, &request) {
        return response;
    }

    request.extensions_mut().insert(TraceId(ctx.trace_id.clone()));
    if let Some(identity) = ctx.identity.clone() {
        request.extensions_mut().insert(identity);
    }

    let mut response = next.run(request).await;

    if let Some(outcome) = &ctx.rate_limit {
        respond::attach_rate_limit_headers(
            &mut response,
            &outcome.decision,
            outcome.limiter.config().window,
        );
        let success = response.status().as_u16() < 400;
        outcome.limiter.record_outcome(&outcome.key, success);
    }
    response
}

/// Limiter key for an anonymous caller: first forwarded-for hop, then
/// `x-real-ip`, then the connection address.
pub fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
