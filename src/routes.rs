use crate::{
    api::{attendance, punch, schedule, shift},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    governor::clock::QuantaInstant, governor::middleware::NoOpMiddleware, Governor,
    GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter config
    fn build_limiter(
        requests_per_min: u32,
    ) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    let login_limiter = build_limiter(config.rate_login_per_min);
    let kiosk_limiter = build_limiter(config.rate_kiosk_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&refresh_limiter))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Kiosk punch carries its own credentials; no bearer token on the device.
    cfg.service(
        web::resource("/punch/kiosk")
            .wrap(Governor::new(&kiosk_limiter))
            .route(web::post().to(punch::submit_kiosk_punch)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&protected_limiter)) // rate limiting
            .service(
                web::scope("/punch")
                    .service(web::resource("").route(web::post().to(punch::submit_punch)))
                    .service(web::resource("/status").route(web::get().to(punch::punch_status))),
            )
            .service(
                web::scope("/shifts")
                    .service(
                        web::resource("")
                            .route(web::post().to(shift::create_shift))
                            .route(web::get().to(shift::list_shifts)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(shift::get_shift))
                            .route(web::put().to(shift::update_shift))
                            .route(web::delete().to(shift::delete_shift)),
                    ),
            )
            .service(
                web::scope("/patterns")
                    .service(
                        web::resource("")
                            .route(web::post().to(schedule::create_pattern))
                            .route(web::get().to(schedule::list_patterns)),
                    )
                    .service(
                        web::resource("/assignments")
                            .route(web::post().to(schedule::create_assignment)),
                    ),
            )
            .service(web::resource("/overrides").route(web::put().to(schedule::put_override)))
            .service(
                web::scope("/attendance")
                    .service(web::resource("").route(web::get().to(attendance::get_attendance)))
                    .service(
                        web::resource("/recompute").route(web::post().to(attendance::recompute)),
                    )
                    .service(web::resource("/lock").route(web::post().to(attendance::lock_days))),
            ),
    );
}
