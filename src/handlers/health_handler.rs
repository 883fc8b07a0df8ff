use actix_web::HttpResponse;

pub async fn backend_health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "matchday-backend"
    }))
}
