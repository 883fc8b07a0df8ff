// src/routes/matches.rs
use actix_web::{get, post, web, HttpResponse, Result};
use uuid::Uuid;

use crate::handlers::matches::live_match_handler;
use crate::middleware::auth::Claims;
use crate::models::match_record::RecordEventRequest;
use crate::services::LiveMatchService;

/// Get the full live-match payload: match, timeline, rosters and clock
#[get("/{match_id}/live")]
async fn get_live_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    live_match_handler::get_live_match(service, path, claims).await
}

/// Kick off: scheduled -> live, half 1
#[post("/{match_id}/start")]
async fn start_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    live_match_handler::start_match(service, path, claims).await
}

/// End the first half early: live -> halftime
#[post("/{match_id}/halftime")]
async fn end_first_half(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    live_match_handler::end_first_half(service, path, claims).await
}

/// Start the second half before the break timer fires: halftime -> live
#[post("/{match_id}/second-half")]
async fn start_second_half(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    live_match_handler::start_second_half(service, path, claims).await
}

/// Full time: live -> finished, then settlement
#[post("/{match_id}/end")]
async fn end_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    live_match_handler::end_match(service, path, claims).await
}

/// Append an event to a live match's ledger
#[post("/{match_id}/events")]
async fn record_event(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    request: web::Json<RecordEventRequest>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    live_match_handler::record_event(service, path, request, claims).await
}
