use http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use crate::config::Config;

/// Restrict origins when ALLOWED_ORIGINS is configured, otherwise stay
/// permissive for local development.
pub fn cors_layer(config: &Config) -> CorsLayer {
    match &config.allowed_origins {
        Some(raw) => {
            let origins: Vec<HeaderValue> = raw
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        }
        None => CorsLayer::permissive(),
    }
}
