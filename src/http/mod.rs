//! HTTP surface.
//!
//! Everything lives under `/v1`. Reads require a session; every mutating
//! route additionally requires a step-up token in `x-crib-step-up` (see
//! [`crib_auth::HEADER_STEP_UP`]). Login and the health probe are the only
//! unauthenticated routes.

mod auth;
mod catalog;
mod employees;
mod error;
mod events;
mod loans;
mod reports;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use crib_auth::{AuthConfig, AuthState};
use crib_store::{ChangeEvent, MemoryStore};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    catalog::Catalog, dashboard::Dashboard, ledger::HistoryLedger, registry::UnitRegistry,
    workflow::IssueReturnWorkflow,
};

/// Shared application state behind every handler.
pub struct AppState {
    pub catalog: Catalog,
    pub registry: Arc<UnitRegistry>,
    pub workflow: IssueReturnWorkflow,
    pub ledger: Arc<HistoryLedger>,
    pub dashboard: Dashboard,
    pub auth: Arc<AuthState>,
    pub changes: broadcast::Sender<ChangeEvent>,
}

impl AppState {
    /// Wires every service onto one in-memory store.
    pub fn new(store: Arc<MemoryStore>, auth_config: AuthConfig) -> Self {
        let registry = Arc::new(UnitRegistry::new(store.clone(), store.clone()));
        let ledger = Arc::new(HistoryLedger::new(store.clone()));
        let catalog = Catalog::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            registry.clone(),
        );
        let workflow = IssueReturnWorkflow::new(
            store.clone(),
            store.clone(),
            store.clone(),
            ledger.clone(),
        );
        let dashboard = Dashboard::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        let changes = store.change_feed();
        Self {
            catalog,
            registry,
            workflow,
            ledger,
            dashboard,
            auth: Arc::new(AuthState::new(auth_config)),
            changes,
        }
    }
}

/// True for every mutating route; those require a live step-up token on top
/// of the session. The auth routes themselves are exempt: step-up
/// confirmation is how a token is obtained in the first place.
fn requires_step_up(method: &Method, path: &str) -> bool {
    if path.starts_with("/auth") {
        return false;
    }
    matches!(*method, Method::POST | Method::PUT | Method::DELETE)
}

/// Applies step-up enforcement only to the routes [`requires_step_up`]
/// selects; everything else passes straight through to the handler.
async fn step_up_gate(
    state: State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if requires_step_up(request.method(), request.uri().path()) {
        crib_auth::step_up_middleware(state, request, next).await
    } else {
        next.run(request).await
    }
}

/// Session enforcement for everything under `/v1` except the login route,
/// which is how a session is obtained.
async fn session_gate(
    state: State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/auth/login" {
        next.run(request).await
    } else {
        crib_auth::session_middleware(state, request, next).await
    }
}

/// Builds the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_state = state.auth.clone();

    let v1 = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/step-up", post(auth::step_up))
        .route("/auth/step-up/audit", get(auth::step_up_audit))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route(
            "/employees",
            get(employees::list_employees).post(employees::create_employee),
        )
        .route(
            "/employees/{id}",
            put(employees::update_employee).delete(employees::delete_employee),
        )
        .route("/tools", get(catalog::list_tools).post(catalog::create_tool))
        .route(
            "/tools/{id}",
            get(catalog::tool_detail)
                .put(catalog::update_tool)
                .delete(catalog::delete_tool),
        )
        .route("/tools/{id}/units", get(catalog::list_tool_units))
        .route("/units", get(catalog::list_units))
        .route(
            "/units/{id}/maintenance",
            post(catalog::mark_maintenance).delete(catalog::clear_maintenance),
        )
        .route("/outward", get(loans::list_loans).post(loans::issue))
        .route("/inward", post(loans::process_return))
        .route("/history", get(reports::history))
        .route("/dashboard", get(reports::dashboard))
        .route("/events", get(events::stream))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            step_up_gate,
        ))
        .layer(middleware::from_fn_with_state(auth_state, session_gate));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
