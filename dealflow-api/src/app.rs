//! Application state and router builder.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dealflow_api::{app::{build_router, AppState}, config::Config};
//! use dealflow_shared::{db, store::PgStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = db::create_pool(&config.database.url, config.database.max_connections).await?;
//! let state = AppState::new(Arc::new(PgStore::new(pool)), config);
//! let app = build_router(state);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use dealflow_shared::auth::jwt::TokenService;
use dealflow_shared::services::analytics::AnalyticsCache;
use dealflow_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::routes;

/// Shared application state.
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Token issuance and validation
    pub tokens: Arc<TokenService>,

    /// Analytics query cache
    pub analytics: Arc<AnalyticsCache>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates application state over a store, deriving the token service
    /// and analytics cache from configuration.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let tokens = TokenService::new(
            &config.jwt.secret,
            chrono::Duration::minutes(config.jwt.access_ttl_minutes),
            chrono::Duration::days(config.jwt.refresh_ttl_days),
        );
        let analytics = AnalyticsCache::new(
            Duration::from_secs(config.analytics.cache_ttl_seconds),
            config.analytics.cache_capacity,
        );
        Self {
            store,
            tokens: Arc::new(tokens),
            analytics: Arc::new(analytics),
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router.
///
/// ```text
/// /
/// ├── /health                                # Health check (public)
/// └── /api/v1/
///     ├── /auth/
///     │   ├── POST /register                 # (public)
///     │   ├── POST /login                    # (public)
///     │   ├── POST /refresh                  # (public)
///     │   └── GET  /me                       # Current user
///     ├── /organizations/
///     │   ├── GET  /                         # Caller's organizations
///     │   ├── POST /                         # Create organization
///     │   ├── GET  /:id                      # One organization (members only)
///     │   ├── GET  /:id/members              # List members
///     │   └── POST /:id/members              # Add member
///     ├── /contacts[/:id]                    # Contact CRUD
///     ├── /deals[/:id]                       # Deal CRUD
///     │   └── POST /:id/close                # Close deal
///     ├── /tasks[/:id]                       # Task CRUD
///     │   └── POST /:id/complete             # Complete task
///     ├── /activities[?deal_id=]             # Activity log / deal trail
///     └── /analytics/deals/{summary,funnel}  # Deal analytics
/// ```
///
/// Everything under `/api/v1` except `/auth/{register,login,refresh}`
/// requires a bearer access token. Tenant-scoped routes additionally take
/// the organization from the `X-Organization-Id` header.
pub fn build_router(state: AppState) -> Router {
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let protected = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/organizations",
            get(routes::organizations::list_organizations)
                .post(routes::organizations::create_organization),
        )
        .route(
            "/organizations/:id",
            get(routes::organizations::get_organization),
        )
        .route(
            "/organizations/:id/members",
            get(routes::organizations::list_members).post(routes::organizations::add_member),
        )
        .route(
            "/contacts",
            get(routes::contacts::list_contacts).post(routes::contacts::create_contact),
        )
        .route(
            "/contacts/:id",
            get(routes::contacts::get_contact)
                .patch(routes::contacts::update_contact)
                .delete(routes::contacts::delete_contact),
        )
        .route(
            "/deals",
            get(routes::deals::list_deals).post(routes::deals::create_deal),
        )
        .route(
            "/deals/:id",
            get(routes::deals::get_deal)
                .patch(routes::deals::update_deal)
                .delete(routes::deals::delete_deal),
        )
        .route("/deals/:id/close", post(routes::deals::close_deal))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/complete", post(routes::tasks::complete_task))
        .route("/activities", get(routes::activities::list_activities))
        .route("/analytics/deals/summary", get(routes::analytics::summary))
        .route("/analytics/deals/funnel", get(routes::analytics::funnel))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth,
        ));

    let v1 = Router::new().nest("/auth", auth_public).merge(protected);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", v1)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bearer-token middleware: validates the access token, resolves its
/// subject to a live user, and injects [`CurrentUser`] into request
/// extensions.
async fn bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let user_id = state
        .tokens
        .validate_access(token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    // A valid token for a since-deleted user is still a 401.
    let user = state
        .store
        .user_by_id(user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
