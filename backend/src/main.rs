use axum::{http::Method, middleware as axum_middleware, Router};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use lifeline_backend::{
    config::Config,
    docs::ApiDoc,
    handlers,
    middleware::{logging, rate_limit, request_id},
    repositories::InMemorySessionRepository,
    services::{notification::NotificationDispatcher, sms},
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
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifeline_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        bind_address = %config.bind_address,
        public_base_url = %config.public_base_url,
        session_ttl_hours = config.session_ttl_hours,
        time_zone = %config.time_zone,
        sms_account_sid = %mask_secret(&config.sms.account_sid),
        sms_auth_token = %mask_secret(&config.sms.auth_token),
        sms_skip_send = config.sms.skip_send,
        sms_request_timeout_seconds = config.sms.request_timeout_seconds,
        "Loaded configuration from environment/.env"
    );

    let sender = sms::sender_from_config(&config.sms)?;
    let (dispatcher, notification_worker) =
        NotificationDispatcher::spawn(sender, config.notification_queue_capacity);
    let state = AppState::new(
        Arc::new(InMemorySessionRepository::new()),
        dispatcher,
        &config,
    );

    let start_routes =
        handlers::start_router().layer(rate_limit::create_start_rate_limiter(&config)?);

    let app = Router::new()
        .merge(start_routes)
        .merge(handlers::router())
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(request_id::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(logging::log_error_responses))
                .layer(cors_layer(&config)),
        )
        .with_state(state);

    tracing::info!("Server listening on {}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router (and with it every dispatcher handle) is gone; let queued alerts finish.
    if let Err(err) = notification_worker.await {
        tracing::warn!(error = %err, "Notification worker ended abnormally");
    }

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = if config.cors_allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_allow_origins
                .iter()
                .filter_map(|origin| origin.parse().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
