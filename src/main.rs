use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use careerconnect_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, cors::cors_layer, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    if app_state.notification_service.push_enabled() {
        info!("Push delivery enabled");
    } else {
        info!("Push delivery disabled (PUSH_ENDPOINT / PUSH_SERVER_KEY not configured)");
    }

    let public_api = Router::new()
        .route("/api/jobs", get(routes::jobs::search_jobs))
        .route("/api/jobs/:id", get(routes::jobs::get_job))
        .layer(from_fn_with_state(
            rate_limit::RpsLimit::new(config.public_rps),
            rate_limit::limit_rps,
        ));

    let profile_api = Router::new()
        .route(
            "/api/profiles/me",
            get(routes::profiles::get_my_profile)
                .post(routes::profiles::create_my_profile)
                .put(routes::profiles::update_my_profile),
        )
        .route_layer(from_fn(auth::require_bearer_auth));

    let recruiter_jobs_api = Router::new()
        .route("/api/jobs", post(routes::jobs::create_job))
        .route(
            "/api/jobs/:id",
            put(routes::jobs::update_job).delete(routes::jobs::delete_job),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_recruiter,
        ));

    let cv_api = Router::new()
        .route(
            "/api/cvs",
            get(routes::cvs::list_cvs).post(routes::cvs::create_cv),
        )
        .route(
            "/api/cvs/:id",
            put(routes::cvs::update_cv).delete(routes::cvs::delete_cv),
        )
        .route("/api/cvs/:id/download", get(routes::cvs::download_cv))
        .route_layer(from_fn_with_state(app_state.clone(), auth::require_profile));

    let seeker_applications_api = Router::new()
        .route(
            "/api/applications",
            post(routes::applications::submit_application),
        )
        .route(
            "/api/applications/me",
            get(routes::applications::my_applications),
        )
        .route(
            "/api/applications/:id/withdraw",
            post(routes::applications::withdraw_application),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_job_seeker,
        ));

    let recruiter_applications_api = Router::new()
        .route(
            "/api/applications/recruiter",
            get(routes::applications::recruiter_applications),
        )
        .route(
            "/api/applications/:id/status",
            patch(routes::applications::update_application_status),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            auth::require_recruiter,
        ));

    let saved_jobs_api = Router::new()
        .route(
            "/api/saved",
            get(routes::saved_jobs::list_saved_jobs).post(routes::saved_jobs::save_job),
        )
        .route("/api/saved/:job_id", delete(routes::saved_jobs::unsave_job))
        .route(
            "/api/saved/check/:job_id",
            get(routes::saved_jobs::check_saved),
        )
        .route_layer(from_fn(auth::require_bearer_auth));

    let notifications_api = Router::new()
        .route(
            "/api/notifications",
            get(routes::notifications::list_notifications),
        )
        .route(
            "/api/notifications/:id/read",
            patch(routes::notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/mark-all-read",
            patch(routes::notifications::mark_all_notifications_read),
        )
        .route(
            "/api/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route(
            "/api/notifications/push/tokens",
            get(routes::notifications::list_device_tokens)
                .post(routes::notifications::register_device_token),
        )
        .route(
            "/api/notifications/push/tokens/:token",
            delete(routes::notifications::deactivate_device_token),
        )
        .route_layer(from_fn(auth::require_bearer_auth));

    let authed_api = profile_api
        .merge(recruiter_jobs_api)
        .merge(cv_api)
        .merge(seeker_applications_api)
        .merge(recruiter_applications_api)
        .merge(saved_jobs_api)
        .merge(notifications_api)
        .layer(from_fn_with_state(
            rate_limit::RpsLimit::new(config.api_rps),
            rate_limit::limit_rps,
        ));

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .merge(public_api)
        .merge(authed_api)
        .with_state(app_state)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
