use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use creatorshield_backend::{
    config::Config,
    db::connection::create_pool,
    docs::ApiDoc,
    handlers, middleware as auth_middleware,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "creatorshield_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        token_secret = %mask_secret(&config.token_secret),
        token_expiration_hours = config.token_expiration_hours,
        session_ttl_days = config.session_ttl_days,
        suspension_hours = config.suspension_hours,
        similar_device_window_days = config.similar_device_window_days,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState::new(pool, config);

    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/account/reactivation",
            post(handlers::account::submit_reactivation),
        );

    // Subject-protected routes (token + live session + suspension gate)
    let subject_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/sessions", get(handlers::sessions::list_sessions))
        .route(
            "/api/sessions/heartbeat",
            post(handlers::sessions::heartbeat),
        )
        .route(
            "/api/sessions/{id}/confirm",
            post(handlers::sessions::confirm_session),
        )
        .route(
            "/api/sessions/{id}",
            delete(handlers::sessions::revoke_session),
        )
        .route(
            "/api/sessions",
            delete(handlers::sessions::revoke_other_sessions),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth,
        ));

    // The suspension surface skips the gate so a suspended subject can read
    // their remaining cooldown.
    let status_routes = Router::new()
        .route(
            "/api/account/status",
            get(handlers::account::account_status),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth_ungated,
        ));

    // Admin-protected routes (auth + admin role)
    let admin_routes = Router::new()
        .route(
            "/api/admin/subjects/{id}/suspend",
            post(handlers::admin::suspend_subject),
        )
        .route(
            "/api/admin/subjects/{id}/deactivate",
            post(handlers::admin::deactivate_subject),
        )
        .route(
            "/api/admin/subjects/{id}/reactivation",
            put(handlers::admin::resolve_reactivation),
        )
        .route(
            "/api/admin/subjects/{id}/sessions",
            get(handlers::admin::list_subject_sessions)
                .delete(handlers::admin::force_logout_subject),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::auth_admin,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .merge(public_routes)
        .merge(subject_routes)
        .merge(status_routes)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(auth_middleware::request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
