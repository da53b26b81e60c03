/// Router tests that never reach the database
///
/// The app runs over a lazily-connected pool, so every request here must be
/// answered by the gate or by validation. Avoid `/health` and any request
/// that would pass validation.

mod common;

use axum::http::{header, StatusCode};
use chrono::Duration;
use common::*;
use serde_json::json;
use sliqinvoice_shared::{auth::gate::SESSION_COOKIE, models::user::UserRole};

fn location(response: &axum::http::Response<axum::body::Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_protected_api_without_cookie_is_401() {
    let app = lazy_app();

    let response = send(&app, get("/api/customers", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn test_protected_api_with_bad_cookie_is_401() {
    let app = lazy_app();

    let cookie = format!("{}=not-a-jwt", SESSION_COOKIE);
    let response = send(&app, get("/api/modules", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let app = lazy_app();

    let token = token_with(UserRole::SuperAdmin, Duration::hours(-2));
    let cookie = format!("{}={}", SESSION_COOKIE, token);
    let response = send(&app, get("/api/users", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_me_requires_session() {
    let app = lazy_app();

    let response = send(&app, get("/api/auth/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let app = lazy_app();

    let response = send(&app, get("/dashboard", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(session_set_cookie(&response).is_none());
}

#[tokio::test]
async fn test_bad_cookie_on_page_is_cleared() {
    let app = lazy_app();

    let cookie = format!("{}=garbage", SESSION_COOKIE);
    let response = send(&app, get("/dashboard/customers", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));

    let set_cookie = session_set_cookie(&response).expect("stale cookie should be removed");
    assert!(set_cookie.contains("Max-Age=0"), "{}", set_cookie);
}

#[tokio::test]
async fn test_signed_in_visitor_leaves_auth_pages() {
    let app = lazy_app();
    let cookie = admin_cookie();

    for page in ["/login", "/admin/login", "/register"] {
        let response = send(&app, get(page, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", page);
        assert_eq!(location(&response), Some("/dashboard"), "{}", page);
    }
}

#[tokio::test]
async fn test_public_page_passes_without_session() {
    let app = lazy_app();

    // No STATIC_DIR configured, so the fallback answers
    let response = send(&app, get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = lazy_app();

    let response = send(&app, json_request("POST", "/api/auth/logout", None, json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = session_set_cookie(&response).expect("logout should clear the cookie");
    assert!(set_cookie.contains("Max-Age=0"), "{}", set_cookie);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(&app, get("/api/invoices", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_malformed_id_is_400() {
    let app = lazy_app();
    let cookie = admin_cookie();

    for uri in ["/api/users/123", "/api/customers/not-a-uuid", "/api/modules/zzz"] {
        let response = send(&app, get(uri, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_bulk_delete_validates_before_deleting() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request("POST", "/api/modules/bulk-delete", Some(&cookie), json!({ "ids": [] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "No IDs provided");

    let response = send(
        &app,
        json_request(
            "DELETE",
            "/api/customers/bulk-delete",
            Some(&cookie),
            json!({ "ids": [uuid::Uuid::new_v4().to_string(), "bogus"] }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid ID: bogus");
}

#[tokio::test]
async fn test_create_customer_validation() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/customers",
            Some(&cookie),
            json!({ "company_name": "Acme", "contact_email": "not-an-email", "password": "secret1" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "contact_email");
}

#[tokio::test]
async fn test_create_customer_short_password() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/customers",
            Some(&cookie),
            json!({ "company_name": "Acme", "contact_email": "a@acme.com", "password": "12345" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_create_module_bad_key() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request("POST", "/api/modules", Some(&cookie), json!({ "key": "9lives", "name": "Cats" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["details"][0]["field"], "key");
}

#[tokio::test]
async fn test_create_user_bad_role() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/users",
            Some(&cookie),
            json!({ "name": "Ops", "email": "ops@sliqinvoice.com", "password": "secret1", "role": "owner" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid role: owner");
}

#[tokio::test]
async fn test_register_and_login_validation() {
    let app = lazy_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "name": "Wile", "email": "wile@acme.com", "password": "123" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request("POST", "/api/auth/login", None, json!({ "email": "nope", "password": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_without_file_field() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let request = multipart_request("/api/modules/import", &cookie, "attachment", "modules.xlsx", b"data");
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "No file uploaded");
}

#[tokio::test]
async fn test_import_rejects_unreadable_file() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let request = multipart_request(
        "/api/customers/import",
        &cookie,
        "file",
        "customers.xlsx",
        b"this is not a workbook",
    );
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/customers",
            Some(&cookie),
            json!({ "company_name": 5, "contact_email": "a@acme.com", "password": "secret1" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_unparseable_and_untyped_bodies_are_400() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/modules/bulk-delete")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"ids\": ["))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(axum::body::Body::from("email=a@b.co"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_import_without_multipart_body_is_400() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request("POST", "/api/users/import", Some(&cookie), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().starts_with("Invalid upload"));
}

#[tokio::test]
async fn test_whitespace_company_name_is_rejected() {
    let app = lazy_app();
    let cookie = admin_cookie();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/customers",
            Some(&cookie),
            json!({ "company_name": "   ", "contact_email": "a@acme.com", "password": "secret1" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "company_name");
}
