use crate::{
    api::{
        evaluation,
        response::{json_config, path_config, query_config, rate_limit_envelope},
    },
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(
                rate = requests_per_min,
                "Invalid rate limit configuration, using governor defaults"
            );
            GovernorConfig::default()
        });
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .wrap(from_fn(rate_limit_envelope)) // 429 as JSON
            .service(
                web::scope("/evaluations")
                    // /evaluations
                    .service(
                        web::resource("")
                            .route(web::get().to(evaluation::list_evaluations))
                            .route(web::post().to(evaluation::upsert_evaluation)),
                    )
                    // /evaluations/calculate
                    .service(
                        web::resource("/calculate").route(web::get().to(evaluation::calculate)),
                    )
                    // /evaluations/ranking
                    .service(web::resource("/ranking").route(web::get().to(evaluation::ranking)))
                    // /evaluations/final/{bulan}/{tahun}
                    .service(
                        web::resource("/final/{bulan}/{tahun}")
                            .route(web::delete().to(evaluation::purge_finals)),
                    )
                    // /evaluations/{id}
                    .service(
                        web::resource("/{id}").route(web::delete().to(evaluation::delete_evaluation)),
                    )
                    // /evaluations/{id}/reset
                    .service(
                        web::resource("/{id}/reset")
                            .route(web::put().to(evaluation::reset_to_draft)),
                    ),
            ),
    );
}
