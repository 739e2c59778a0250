use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domains::DomainStatus;
use crate::models::tenant::Model as TenantModel;
use crate::plans::PlanTier;
use crate::server::{AppState, create_app};

const TOKEN: &str = "test-operator-token";

async fn setup() -> (Router, AppState) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let config = AppConfig {
        operator_tokens: vec![TOKEN.to_string()],
        base_domain: "example.com".to_string(),
        ..Default::default()
    };
    let state = AppState::new(config, db).unwrap();
    (create_app(state.clone()), state)
}

async fn tenant(state: &AppState, tier: PlanTier, subdomain: Option<&str>) -> TenantModel {
    let tenant = state
        .tenants
        .create(Some("Tech Talks".to_string()), tier)
        .await
        .unwrap();
    match subdomain {
        Some(label) => state.tenants.bind_subdomain(tenant.id, label).await.unwrap(),
        None => tenant,
    }
}

async fn get_host(app: &Router, host: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn operator(
    app: &Router,
    method: Method,
    uri: &str,
    tenant_id: Option<Uuid>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    if let Some(id) = tenant_id {
        builder = builder.header("X-Tenant-Id", id.to_string());
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn platform_hosts_get_service_info() {
    let (app, _) = setup().await;

    for host in ["example.com", "www.example.com", "localhost:8080", "api.example.com"] {
        let response = get_host(&app, host).await;
        assert_eq!(response.status(), StatusCode::OK, "host {host}");
        let body = json_body(response).await;
        assert_eq!(body["service"], "sponsorship-proposals");
    }
}

#[tokio::test]
async fn unknown_hosts_redirect_to_platform() {
    let (app, _) = setup().await;

    for host in ["ghost.example.com", "unbound.customer.org", "bad_host!"] {
        let response = get_host(&app, host).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "host {host}");
        assert_eq!(response.headers()[header::LOCATION], "https://example.com/");
    }
}

#[tokio::test]
async fn subdomain_serves_public_page_and_counts_views() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Free, Some("techtalks")).await;
    let proposal = state
        .proposals
        .create(tenant.id, "DevConf 2026".to_string(), None)
        .await
        .unwrap();
    let gold = state
        .proposals
        .add_tier(tenant.id, proposal.id, "Gold".to_string(), Some(500_000), Some(1))
        .await
        .unwrap();
    state
        .proposals
        .add_tier(tenant.id, proposal.id, "Platinum".to_string(), None, Some(0))
        .await
        .unwrap();
    state
        .proposals
        .add_benefit(tenant.id, gold.id, "Booth".to_string(), None)
        .await
        .unwrap();

    let response = get_host(&app, "TechTalks.Example.com").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["tenant_id"], tenant.id.to_string());
    assert_eq!(body["matched_by"], "subdomain");
    assert_eq!(body["show_branding"], true);
    let tiers = body["proposals"][0]["tiers"].as_array().unwrap();
    assert_eq!(tiers[0]["name"], "Platinum");
    assert_eq!(tiers[1]["name"], "Gold");
    assert_eq!(tiers[1]["benefits"], json!(["Booth"]));

    get_host(&app, "techtalks.example.com").await;
    let reloaded = state.tenants.get(tenant.id).await.unwrap().unwrap();
    assert_eq!(reloaded.view_count, 2);
}

#[tokio::test]
async fn operator_api_requires_bearer_token() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/plans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("x-trace-id"));

    let response = operator(&app, Method::GET, "/api/v1/plans", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["plans"].as_array().unwrap().len(), 3);
    assert_eq!(body["plans"][2]["max_proposals"], -1);
}

#[tokio::test]
async fn create_tenant_with_subdomain() {
    let (app, _) = setup().await;

    let response = operator(
        &app,
        Method::POST,
        "/api/v1/tenants",
        None,
        Some(json!({ "name": "Tech Talks", "plan_tier": "pro", "subdomain": "TechTalks" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["subdomain"], "techtalks");
    assert_eq!(body["subdomain_host"], "techtalks.example.com");
    assert_eq!(body["plan_tier"], "pro");

    let taken = operator(
        &app,
        Method::POST,
        "/api/v1/tenants",
        None,
        Some(json!({ "subdomain": "techtalks" })),
    )
    .await;
    assert_eq!(taken.status(), StatusCode::CONFLICT);

    let reserved = operator(
        &app,
        Method::POST,
        "/api/v1/tenants",
        None,
        Some(json!({ "subdomain": "admin" })),
    )
    .await;
    assert_eq!(reserved.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(reserved).await["code"], "RESERVED_SUBDOMAIN");
}

#[tokio::test]
async fn free_plan_allows_a_single_proposal() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Free, None).await;
    let payload = json!({ "title": "DevConf 2026" });

    let first = operator(&app, Method::POST, "/api/v1/proposals", Some(tenant.id), Some(payload.clone())).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = operator(&app, Method::POST, "/api/v1/proposals", Some(tenant.id), Some(payload)).await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
    let body = json_body(second).await;
    assert_eq!(body["code"], "PLAN_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["limit"], 1);
    assert_eq!(body["details"]["current"], 1);

    let limit = operator(&app, Method::GET, "/api/v1/limits/proposals", Some(tenant.id), None).await;
    let body = json_body(limit).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["remaining"], 0);
    assert_eq!(body["tier"], "free");
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
    let (app, _) = setup().await;
    let response = operator(&app, Method::GET, "/api/v1/proposals", Some(Uuid::new_v4()), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn limit_and_feature_keys_are_validated() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Pro, None).await;

    let response = operator(&app, Method::GET, "/api/v1/limits/widgets", Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = operator(&app, Method::GET, "/api/v1/features/maxProposals", Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = operator(&app, Method::GET, "/api/v1/features/analytics", Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["feature"], "analytics");
    assert_eq!(body["enabled"], true);

    let response = operator(&app, Method::GET, "/api/v1/limits/apiKeys", Some(tenant.id), None).await;
    let body = json_body(response).await;
    assert_eq!(body["resource"], "apiKeys");
    assert_eq!(body["limit"], 5);
    assert_eq!(body["remaining"], 5);
}

#[tokio::test]
async fn free_plan_cannot_bind_custom_domain() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Free, None).await;

    let response = operator(
        &app,
        Method::PUT,
        "/api/v1/domains/custom",
        Some(tenant.id),
        Some(json!({ "hostname": "sponsors.techtalks.io" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "PLAN_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn custom_domain_serves_only_once_verified() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Pro, None).await;
    let host = "sponsors.techtalks.io";

    let response = operator(
        &app,
        Method::PUT,
        "/api/v1/domains/custom",
        Some(tenant.id),
        Some(json!({ "hostname": "Sponsors.TechTalks.io" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["custom_domain"], host);
    assert_eq!(body["domain_status"], "pending");

    assert_eq!(get_host(&app, host).await.status(), StatusCode::TEMPORARY_REDIRECT);

    for status in ["verifying", "verified"] {
        let response = operator(
            &app,
            Method::PUT,
            "/api/v1/domains/custom/status",
            Some(tenant.id),
            Some(json!({ "status": status })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = get_host(&app, host).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["matched_by"], "custom_domain");

    let back = operator(
        &app,
        Method::PUT,
        "/api/v1/domains/custom/status",
        Some(tenant.id),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(back.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(back).await["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn custom_domain_cannot_shadow_platform() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Enterprise, None).await;

    for hostname in ["example.com", "evil.example.com", "localhost", "nodots", "127.0.0.1"] {
        let response = operator(
            &app,
            Method::PUT,
            "/api/v1/domains/custom",
            Some(tenant.id),
            Some(json!({ "hostname": hostname })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "hostname {hostname}");
    }
}

#[tokio::test]
async fn new_subdomain_binding_is_served_immediately() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Free, None).await;

    assert_eq!(
        get_host(&app, "techtalks.example.com").await.status(),
        StatusCode::TEMPORARY_REDIRECT
    );

    let response = operator(
        &app,
        Method::PUT,
        "/api/v1/domains/subdomain",
        Some(tenant.id),
        Some(json!({ "subdomain": "techtalks" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(get_host(&app, "techtalks.example.com").await.status(), StatusCode::OK);

    let response = operator(&app, Method::DELETE, "/api/v1/domains/subdomain", Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_host(&app, "techtalks.example.com").await.status(),
        StatusCode::TEMPORARY_REDIRECT
    );
}

#[tokio::test]
async fn deleting_last_proposal_releases_domains() {
    let (app, state) = setup().await;
    let tenant = tenant(&state, PlanTier::Pro, Some("techtalks")).await;
    let host = "sponsors.techtalks.io";
    state
        .tenants
        .bind_custom_domain(tenant.id, state.resolver.domain_resolver(), host)
        .await
        .unwrap();
    for status in [DomainStatus::Verifying, DomainStatus::Verified] {
        state.tenants.update_domain_status(tenant.id, status).await.unwrap();
    }
    let first = state
        .proposals
        .create(tenant.id, "DevConf 2026".to_string(), None)
        .await
        .unwrap();
    let second = state
        .proposals
        .create(tenant.id, "RustFest 2026".to_string(), None)
        .await
        .unwrap();

    let uri = format!("/api/v1/proposals/{}", first.id);
    let response = operator(&app, Method::DELETE, &uri, Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(get_host(&app, "techtalks.example.com").await.status(), StatusCode::OK);
    assert_eq!(get_host(&app, host).await.status(), StatusCode::OK);

    let uri = format!("/api/v1/proposals/{}", second.id);
    let response = operator(&app, Method::DELETE, &uri, Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    for host in ["techtalks.example.com", host] {
        assert_eq!(
            get_host(&app, host).await.status(),
            StatusCode::TEMPORARY_REDIRECT,
            "host {host}"
        );
    }

    let released = state.tenants.get(tenant.id).await.unwrap().unwrap();
    assert!(released.subdomain.is_none());
    assert!(released.custom_domain.is_none());
    assert!(released.domain_status.is_none());

    let response = operator(&app, Method::DELETE, &uri, Some(tenant.id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_requires_plan_feature() {
    let (app, state) = setup().await;
    let free = tenant(&state, PlanTier::Free, Some("freebie")).await;
    let pro = tenant(&state, PlanTier::Pro, Some("techtalks")).await;

    let response = operator(&app, Method::GET, "/api/v1/analytics", Some(free.id), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "FEATURE_NOT_AVAILABLE");
    assert_eq!(body["details"]["feature"], "analytics");

    state
        .proposals
        .create(pro.id, "DevConf 2026".to_string(), None)
        .await
        .unwrap();
    for _ in 0..2 {
        assert_eq!(get_host(&app, "techtalks.example.com").await.status(), StatusCode::OK);
    }

    let response = operator(&app, Method::GET, "/api/v1/analytics", Some(pro.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["view_count"], 2);
    assert_eq!(body["proposals"], 1);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _) = setup().await;
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}
