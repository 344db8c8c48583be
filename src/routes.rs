use crate::{
    api::{attendance, members, notulensi, piket, sessions},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
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

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Scheduler callback, guarded by a shared secret instead of a login.
    // Registered before the protected scope so the auth middleware never
    // sees it.
    cfg.service(
        web::resource(format!("{}/cron/piket-reminder", config.api_prefix))
            .route(web::post().to(piket::cron_piket_reminder)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/profile")
                    .service(web::resource("").route(web::get().to(handlers::me)))
                    .service(
                        web::resource("/change-password")
                            .route(web::post().to(handlers::change_password)),
                    ),
            )
            .service(
                web::scope("/sessions")
                    // /sessions
                    .service(
                        web::resource("")
                            .route(web::get().to(sessions::list_sessions))
                            .route(web::post().to(sessions::create_session)),
                    )
                    // /sessions/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(sessions::delete_session)),
                    )
                    .service(
                        web::resource("/{id}/lock")
                            .route(web::post().to(sessions::lock_session)),
                    )
                    .service(
                        web::resource("/{id}/status")
                            .route(web::get().to(sessions::session_status)),
                    )
                    .service(
                        web::resource("/{id}/attendance")
                            .route(web::get().to(sessions::session_attendance)),
                    )
                    .service(
                        web::resource("/{id}/pic").route(web::put().to(sessions::assign_pic)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("").route(web::post().to(attendance::mark_attendance)),
                    )
                    .service(
                        web::resource("/core")
                            .route(web::post().to(attendance::mark_core_attendance)),
                    )
                    .service(
                        web::resource("/history").route(web::get().to(attendance::my_history)),
                    )
                    .service(
                        web::resource("/history/all")
                            .route(web::get().to(attendance::history_all)),
                    )
                    .service(
                        web::resource("/history/{user_id}")
                            .route(web::get().to(attendance::history_for_user)),
                    ),
            )
            .service(
                web::scope("/piket")
                    .service(
                        web::resource("")
                            .route(web::get().to(piket::view_piket))
                            .route(web::post().to(piket::update_piket)),
                    )
                    .service(web::resource("/logs").route(web::get().to(piket::piket_logs)))
                    .service(
                        web::resource("/test-reminder")
                            .route(web::post().to(piket::test_piket_reminder)),
                    )
                    .service(
                        web::resource("/{day_of_week}")
                            .route(web::delete().to(piket::clear_piket)),
                    ),
            )
            .service(
                web::scope("/members")
                    .service(
                        web::resource("")
                            .route(web::get().to(members::list_members))
                            .route(web::post().to(members::create_member)),
                    )
                    .service(
                        web::resource("/batch-delete")
                            .route(web::post().to(members::batch_delete_members)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(members::update_member))
                            .route(web::delete().to(members::delete_member)),
                    ),
            )
            .service(
                web::scope("/notulensi")
                    .service(web::resource("").route(web::get().to(notulensi::overview)))
                    .service(
                        web::resource("/session/{session_id}")
                            .route(web::get().to(notulensi::get_for_session))
                            .route(web::put().to(notulensi::upsert)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(notulensi::delete)),
                    ),
            ),
    );
}
