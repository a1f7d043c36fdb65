use crate::{
    api::{admin, attendance, person},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let public_limiter = Arc::new(build_limiter(config.rate_public_per_min));
    let mark_limiter = Arc::new(build_limiter(config.rate_mark_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/people")
                    .wrap(public_limiter.clone())
                    // /people
                    .service(
                        web::resource("")
                            .route(web::post().to(person::create_person))
                            .route(web::get().to(person::list_people)),
                    )
                    // /people/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(person::get_person))
                            .route(web::put().to(person::update_person))
                            .route(web::delete().to(person::delete_person)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .wrap(public_limiter.clone())
                            .route(web::get().to(attendance::today_roster)),
                    )
                    // /attendance/mark
                    .service(
                        web::resource("/mark")
                            .wrap(mark_limiter.clone())
                            .route(web::post().to(attendance::mark)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .wrap(admin_limiter)
                    // /admin/dashboard
                    .service(web::resource("/dashboard").route(web::get().to(admin::dashboard)))
                    // /admin/people/{id}
                    .service(
                        web::resource("/people/{id}").route(web::get().to(admin::person_detail)),
                    )
                    // /admin/people/{id}/backfill
                    .service(
                        web::resource("/people/{id}/backfill")
                            .route(web::post().to(admin::backfill_attendance)),
                    ),
            ),
    );
}
