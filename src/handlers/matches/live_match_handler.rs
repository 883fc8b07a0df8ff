use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::error::MatchError;
use crate::middleware::auth::Claims;
use crate::models::match_record::{Match, MatchEvent, RecordEventRequest};
use crate::services::LiveMatchService;

#[derive(Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub data: Match,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub data: MatchEvent,
    pub home_score: i32,
    pub away_score: i32,
}

/// Map domain errors to HTTP responses. Database failures stay opaque to
/// the caller; everything else carries the domain message. The `retryable`
/// flag tells the operator UI whether resubmitting the same action can
/// succeed.
fn error_response(e: MatchError) -> HttpResponse {
    let retryable = e.is_retryable();
    let body = |error: String| {
        serde_json::json!({ "success": false, "error": error, "retryable": retryable })
    };
    match &e {
        MatchError::Validation(_) => HttpResponse::BadRequest().json(body(e.to_string())),
        MatchError::Forbidden => HttpResponse::Forbidden().json(body(e.to_string())),
        MatchError::MatchNotFound(_) => HttpResponse::NotFound().json(body(e.to_string())),
        MatchError::InvalidTransition { .. }
        | MatchError::NotFinished(_)
        | MatchError::AlreadySettled(_) => HttpResponse::Conflict().json(body(e.to_string())),
        MatchError::TeamRecordMissing(_) => {
            tracing::error!("Team base record missing: {}", e);
            HttpResponse::InternalServerError().json(body(e.to_string()))
        }
        MatchError::Database(inner) => {
            tracing::error!("Database error: {}", inner);
            HttpResponse::InternalServerError().json(body("Internal server error".to_string()))
        }
    }
}

pub async fn get_live_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    _claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.get_live_match(match_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn start_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.start_match(&claims, match_id).await {
        Ok(updated) => Ok(HttpResponse::Ok().json(MatchResponse {
            success: true,
            data: updated,
        })),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn end_first_half(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.end_first_half(&claims, match_id).await {
        Ok(updated) => Ok(HttpResponse::Ok().json(MatchResponse {
            success: true,
            data: updated,
        })),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn start_second_half(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.start_second_half(&claims, match_id).await {
        Ok(updated) => Ok(HttpResponse::Ok().json(MatchResponse {
            success: true,
            data: updated,
        })),
        Err(e) => Ok(error_response(e)),
    }
}

/// Full time. A settlement failure does not fail the request; the response
/// carries the error so the operator knows a retry is needed.
pub async fn end_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.end_match(&claims, match_id).await {
        Ok(completion) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": completion
        }))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn record_event(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
    request: web::Json<RecordEventRequest>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service
        .record_event(&claims, match_id, request.into_inner())
        .await
    {
        Ok((updated, event)) => Ok(HttpResponse::Ok().json(EventResponse {
            success: true,
            home_score: updated.home_score,
            away_score: updated.away_score,
            data: event,
        })),
        Err(e) => Ok(error_response(e)),
    }
}

/// Admin-only settlement retry for a finished match whose first attempt
/// failed.
pub async fn settle_match(
    service: web::Data<LiveMatchService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.settle_match(match_id).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(error_response(e)),
    }
}
