//! API router with Swagger UI

use std::sync::Arc;

use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::modules::health::HealthState;
use super::modules::metrics::{http_metrics_middleware, MetricsState};
use super::modules::{
    availability, bookings, health, metrics, payments, pricing, refunds, scheduler,
};
use crate::application::{
    AvailabilityService, BookingService, PricingService, RefundService, StayScheduler,
};
use crate::domain::StatusCodeTable;

/// Everything the handlers reach for. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub availability: Arc<AvailabilityService>,
    pub pricing: Arc<PricingService>,
    pub refunds: Arc<RefundService>,
    pub scheduler: Arc<StayScheduler>,
    pub status_codes: Arc<StatusCodeTable>,
    pub health: HealthState,
    pub metrics: MetricsState,
}

impl FromRef<AppState> for HealthState {
    fn from_ref(s: &AppState) -> Self {
        s.health.clone()
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(s: &AppState) -> Self {
        s.metrics.clone()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Bookings
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::list_stay_statuses,
        bookings::cancel_booking,
        bookings::cancel_booking_item,
        bookings::change_room,
        bookings::check_in,
        bookings::check_out,
        bookings::add_incident_charge,
        // Payments
        payments::confirm_payment,
        // Availability
        availability::check_room,
        availability::search_rooms,
        // Pricing
        pricing::quote,
        pricing::apply_discount,
        // Refunds
        refunds::open_refund,
        refunds::list_refunds,
        refunds::get_refund,
        refunds::approve_refund,
        refunds::reject_refund,
        refunds::complete_refund,
        // Scheduler
        scheduler::scheduler_status,
    ),
    components(
        schemas(
            bookings::BookingDto,
            bookings::BookingItemDto,
            bookings::StayStatusDto,
            refunds::RefundDto,
            pricing::QuoteDto,
            availability::AvailableRoomDto,
            scheduler::SweepReportDto,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database reachability"),
        (name = "Bookings", description = "Booking lifecycle: create, cancel, move, check in and out"),
        (name = "Payments", description = "Payment confirmations from the gateway adapter"),
        (name = "Availability", description = "Room availability for date ranges"),
        (name = "Pricing", description = "Quotes and discount codes"),
        (name = "Refunds", description = "Refund request workflow"),
        (name = "Scheduler", description = "Deadline sweep status"),
    ),
    info(
        title = "Stayline Booking API",
        version = "1.0.0",
        description = "Hotel booking lifecycle and room availability",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

pub fn create_api_router(state: AppState) -> Router {
    let booking_routes = Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/statuses", get(bookings::list_stay_statuses))
        .route("/{id}", get(bookings::get_booking))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .route(
            "/{id}/items/{item_id}/cancel",
            post(bookings::cancel_booking_item),
        )
        .route(
            "/{id}/items/{item_id}/change-room",
            post(bookings::change_room),
        )
        .route("/{id}/check-in", post(bookings::check_in))
        .route("/{id}/check-out", post(bookings::check_out))
        .route("/{id}/incidents", post(bookings::add_incident_charge));

    let refund_routes = Router::new()
        .route("/", get(refunds::list_refunds).post(refunds::open_refund))
        .route("/{id}", get(refunds::get_refund))
        .route("/{id}/approve", post(refunds::approve_refund))
        .route("/{id}/reject", post(refunds::reject_refund))
        .route("/{id}/complete", post(refunds::complete_refund));

    let api_routes = Router::new()
        .nest("/bookings", booking_routes)
        .nest("/refunds", refund_routes)
        .route("/payments/confirmations", post(payments::confirm_payment))
        .route("/rooms/{room_id}/availability", get(availability::check_room))
        .route("/availability", get(availability::search_rooms))
        .route("/quotes", post(pricing::quote))
        .route("/discounts/apply", post(pricing::apply_discount))
        .route("/scheduler", get(scheduler::scheduler_status));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::TimeZone;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::application::services::testing::Harness;
    use crate::infrastructure::database::seed::{ROOM_101, ROOM_102};

    fn app(h: &Harness) -> Router {
        let scheduler = Arc::new(h.scheduler());
        let state = AppState {
            bookings: h.bookings.clone(),
            availability: Arc::new(h.availability()),
            pricing: Arc::new(h.pricing()),
            refunds: Arc::new(h.refunds()),
            scheduler: scheduler.clone(),
            status_codes: Arc::new(StatusCodeTable::default()),
            health: HealthState {
                db: h.db.clone(),
                scheduler,
                started_at: Arc::new(Instant::now()),
            },
            metrics: MetricsState {
                handle: PrometheusBuilder::new().build_recorder().handle(),
            },
        };
        create_api_router(state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        actor: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header("x-actor", actor);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn new_booking(room_id: i32, check_in: &str, check_out: &str) -> Value {
        json!({
            "customer_id": 1,
            "items": [{
                "room_id": room_id,
                "check_in": check_in,
                "check_out": check_out,
                "adults": 2
            }]
        })
    }

    async fn create_paid(app: &Router, room_id: i32, check_in: &str, check_out: &str) -> Value {
        let (status, created) = send(
            app,
            "POST",
            "/api/v1/bookings",
            Some(new_booking(room_id, check_in, check_out)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        let booking = &created["data"];
        let (status, paid) = send(
            app,
            "POST",
            "/api/v1/payments/confirmations",
            Some(json!({
                "booking_id": booking["id"],
                "method": "vnpay",
                "amount": booking["total_price"]
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{paid}");
        paid["data"].clone()
    }

    #[tokio::test]
    async fn create_then_fetch_booking() {
        let h = Harness::new().await;
        let app = app(&h);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/bookings",
            Some(new_booking(ROOM_101, "2025-06-01", "2025-06-03")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["stay_status"], "pending");
        assert_eq!(body["data"]["status_code"], 0);
        assert_eq!(body["data"]["total_price"], 2_000_000);

        let id = body["data"]["id"].as_i64().unwrap();
        let (status, fetched) = send(&app, "GET", &format!("/api/v1/bookings/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["items"][0]["nights"], 2);
    }

    #[tokio::test]
    async fn overlapping_booking_is_409() {
        let h = Harness::new().await;
        let app = app(&h);
        create_paid(&app, ROOM_101, "2025-06-01", "2025-06-03").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/bookings",
            Some(new_booking(ROOM_101, "2025-06-02", "2025-06-05")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not available"));
    }

    #[tokio::test]
    async fn request_errors_map_to_status_codes() {
        let h = Harness::new().await;
        let app = app(&h);

        let empty_items = json!({"customer_id": 1, "items": []});
        let (status, _) = send(&app, "POST", "/api/v1/bookings", Some(empty_items), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/bookings",
            Some(new_booking(999, "2025-06-01", "2025-06-03")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/v1/bookings/4242", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stay_from_payment_to_check_out() {
        let h = Harness::new().await;
        let app = app(&h);
        let booking = create_paid(&app, ROOM_102, "2025-05-21", "2025-05-23").await;
        assert_eq!(booking["stay_status"], "reserved");
        let id = booking["id"].as_i64().unwrap();

        // 15:00 hotel time on arrival day
        h.clock.set(chrono::Utc.with_ymd_and_hms(2025, 5, 21, 8, 0, 0).unwrap());
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/bookings/{id}/check-in"),
            None,
            Some("staff:linh"),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["stay_status"], "checked_in");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/bookings/{id}/incidents"),
            Some(json!({"description": "minibar", "amount": 120000})),
            Some("staff:linh"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/bookings/{id}/check-out"),
            Some(json!({"inspection_passed": true})),
            Some("staff:linh"),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["stay_status"], "checked_out");
        assert_eq!(body["data"]["incidents"][0]["settled"], true);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/bookings/{id}/check-in"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn cancel_and_refund_through_the_api() {
        let h = Harness::new().await;
        let app = app(&h);
        let booking = create_paid(&app, ROOM_101, "2025-06-10", "2025-06-12").await;
        let id = booking["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/bookings/{id}/cancel"),
            Some(json!({"reason": "plans changed"})),
            Some("customer:1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["booking"]["stay_status"], "cancelled");
        assert_eq!(body["data"]["refund_due"], 1_600_000);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/refunds",
            Some(json!({
                "booking_id": id,
                "bank_name": "Vietcombank",
                "account_number": "0071000123456",
                "account_holder": "NGUYEN VAN A"
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let refund_id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["amount"], 1_600_000);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/refunds/{refund_id}/approve"),
            Some(json!({})),
            Some("staff:admin"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/refunds/{refund_id}/complete"),
            Some(json!({})),
            Some("staff:admin"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/refunds/{refund_id}/complete"),
            Some(json!({"receipt_ref": "FT2506100001"})),
            Some("staff:admin"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "completed");

        let (_, fetched) = send(&app, "GET", &format!("/api/v1/bookings/{id}"), None, None).await;
        assert_eq!(fetched["data"]["payment_status"], "refunded");

        let (status, listed) = send(&app, "GET", "/api/v1/refunds?status=completed", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn availability_endpoints() {
        let h = Harness::new().await;
        let app = app(&h);
        create_paid(&app, ROOM_101, "2025-06-01", "2025-06-03").await;

        let uri = format!("/api/v1/rooms/{ROOM_101}/availability?check_in=2025-06-02&check_out=2025-06-04");
        let (status, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["available"], false);

        let uri = format!("/api/v1/rooms/{ROOM_101}/availability?check_in=2025-06-03&check_out=2025-06-05");
        let (_, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(body["data"]["available"], true);

        let uri = format!("/api/v1/rooms/{ROOM_101}/availability?check_in=2025-06-05&check_out=2025-06-05");
        let (status, _) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/availability?check_in=2025-06-02&check_out=2025-06-04&adults=2",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rooms = body["data"].as_array().unwrap();
        assert_eq!(rooms.len(), 3);
        assert_eq!(rooms[0]["room_number"], "102");
    }

    #[tokio::test]
    async fn quote_and_discount() {
        let h = Harness::new().await;
        let app = app(&h);

        let mut request = new_booking(ROOM_101, "2025-06-01", "2025-06-03");
        request["discount_code"] = json!("SUMMER20");
        let (status, body) = send(&app, "POST", "/api/v1/quotes", Some(request), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["subtotal"], 2_000_000);
        assert_eq!(body["data"]["discount_amount"], 400_000);
        assert_eq!(body["data"]["total"], 1_600_000);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/discounts/apply",
            Some(json!({"code": "NOPE", "subtotal": 1000000})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("unknown_code"));
    }

    #[tokio::test]
    async fn list_filters_by_status_name_or_code() {
        let h = Harness::new().await;
        let app = app(&h);
        create_paid(&app, ROOM_101, "2025-06-01", "2025-06-03").await;
        send(
            &app,
            "POST",
            "/api/v1/bookings",
            Some(new_booking(ROOM_102, "2025-06-01", "2025-06-03")),
            None,
        )
        .await;

        let (_, by_name) = send(&app, "GET", "/api/v1/bookings?status=reserved", None, None).await;
        assert_eq!(by_name["data"]["total"], 1);
        let (_, by_code) = send(&app, "GET", "/api/v1/bookings?status=0", None, None).await;
        assert_eq!(by_code["data"]["total"], 1);
        assert_eq!(by_code["data"]["items"][0]["stay_status"], "pending");

        let (status, _) = send(&app, "GET", "/api/v1/bookings?status=lost", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn status_registry_lists_every_status() {
        let h = Harness::new().await;
        let (status, body) = send(&app(&h), "GET", "/api/v1/bookings/statuses", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let statuses = body["data"].as_array().unwrap();
        assert_eq!(statuses.len(), 6);
        assert!(statuses
            .iter()
            .any(|s| s["status"] == "checked_out" && s["terminal"] == true));
    }

    #[tokio::test]
    async fn actor_header_is_checked() {
        let h = Harness::new().await;
        let app = app(&h);
        let booking = create_paid(&app, ROOM_101, "2025-06-01", "2025-06-03").await;
        let uri = format!("/api/v1/bookings/{}/cancel", booking["id"]);
        let reason = json!({"reason": "test"});

        let (status, _) = send(&app, "POST", &uri, Some(reason.clone()), Some("system")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&app, "POST", &uri, Some(reason), Some("robot:7")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn change_room_needs_both_dates() {
        let h = Harness::new().await;
        let app = app(&h);
        let booking = create_paid(&app, ROOM_101, "2025-06-01", "2025-06-03").await;
        let uri = format!(
            "/api/v1/bookings/{}/items/{}/change-room",
            booking["id"], booking["items"][0]["id"]
        );

        let (status, _) = send(
            &app,
            "POST",
            &uri,
            Some(json!({"new_room_id": ROOM_102, "check_in": "2025-06-02"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(&app, "POST", &uri, Some(json!({"new_room_id": ROOM_102})), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["items"][0]["room_id"], ROOM_102);
    }

    #[tokio::test]
    async fn health_scheduler_and_docs() {
        let h = Harness::new().await;
        let app = app(&h);

        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"]["reachable"], true);
        assert!(body["scheduler"]["last_sweep_at"].is_null());

        let (status, body) = send(&app, "GET", "/api/v1/scheduler", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["enabled"], true);
        assert!(body["data"]["last_sweep"].is_null());

        let (status, spec) = send(&app, "GET", "/api-doc/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(spec["paths"]["/api/v1/bookings"].is_object());
    }
}
