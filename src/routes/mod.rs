use actix_web::web;

pub mod backend_health;
pub mod matches;

use crate::handlers::matches::live_match_handler;
use crate::middleware::admin::AdminMiddleware;
use crate::middleware::auth::AuthMiddleware;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    // Match routes (require authentication)
    cfg.service(
        web::scope("/matches")
            .wrap(AuthMiddleware)
            .service(matches::get_live_match)
            .service(matches::start_match)
            .service(matches::end_first_half)
            .service(matches::start_second_half)
            .service(matches::end_match)
            .service(matches::record_event),
    );

    // Admin routes (JWT plus role check inside the middleware)
    cfg.service(
        web::scope("/admin")
            .wrap(AdminMiddleware)
            .service(
                web::resource("/matches/{match_id}/settle")
                    .route(web::post().to(live_match_handler::settle_match)),
            ),
    );
}
