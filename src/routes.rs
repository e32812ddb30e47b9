use crate::{
    api::{self, employee, extractor_error, time_off},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        // per_ms and burst are both non-zero
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Extractor configs so malformed JSON, query strings and paths share the error body.
pub fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, req| extractor_error(err, req)))
        .app_data(web::QueryConfig::default().error_handler(|err, req| extractor_error(err, req)))
        .app_data(web::PathConfig::default().error_handler(|err, req| extractor_error(err, req)));
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    extractor_configs(cfg);

    // Public routes
    cfg.service(api::health);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/time-offs")
                    // /time-offs
                    .service(
                        web::resource("")
                            .route(web::post().to(time_off::create_time_off))
                            .route(web::get().to(time_off::list_time_offs)),
                    )
                    // /time-offs/stats, registered before /{id}
                    .service(web::resource("/stats").route(web::get().to(time_off::time_off_stats)))
                    // /time-offs/{id}
                    .service(web::resource("/{id}").route(web::get().to(time_off::get_time_off)))
                    // /time-offs/{id}/review
                    .service(
                        web::resource("/{id}/review")
                            .route(web::patch().to(time_off::review_time_off)),
                    )
                    // /time-offs/{id}/cancel
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::patch().to(time_off::cancel_time_off)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees/{ref}/leave-balance
                    .service(
                        web::resource("/{employee_ref}/leave-balance")
                            .route(web::get().to(employee::get_leave_balance))
                            .route(web::patch().to(employee::adjust_leave_balance)),
                    ),
            ),
    );
}
