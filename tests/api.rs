//! End-to-end tests: the full router over an in-memory SQLite database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use car_rest::{
    config::AppConfig,
    db,
    models::user::NewUser,
    pagination::{PaginationConfig, PaginationStyle},
    serializers::review::ReviewConfig,
    state::AppState,
    throttle::{Rate, ThrottleConfig},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "sqlite::memory:".into(),
        pagination: PaginationConfig::default(),
        throttle: ThrottleConfig::default(),
        reviews: ReviewConfig::default(),
    }
}

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    async fn start() -> Self {
        Self::with_config(config()).await
    }

    async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::connect(&cfg.database_url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let state = AppState::new(pool, &cfg);
        Self {
            router: car_rest::app(state.clone()),
            state,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/login/",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        self.state
            .accounts
            .create_admin(&NewUser {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: "admin-pw".into(),
            })
            .await
            .unwrap();
        self.login("admin", "admin-pw").await
    }

    async fn user(&self, name: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/register/",
                None,
                Some(json!({
                    "username": name,
                    "email": format!("{name}@example.com"),
                    "password": "pw-123456",
                    "password_confirmation": "pw-123456",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        self.login(name, "pw-123456").await
    }

    async fn car(&self, admin: &str, name: &str, showroom: Option<i64>) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/list",
                Some(admin),
                Some(json!({
                    "car_name": name,
                    "car_decstr": format!("{name} description"),
                    "price": 30000,
                    "showroom": showroom,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_endpoints_answer() {
    let app = TestApp::start().await;
    let (status, body) = app.send("GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send("GET", "/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
}

#[tokio::test]
async fn create_car_computes_discount() {
    let app = TestApp::start().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({
                "car_name": "Civic",
                "car_decstr": "Compact sedan",
                "active": true,
                "car_number": "ABC123",
                "price": 25000,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["discount_price"].as_f64(), Some(20000.0));
    assert_eq!(body["price"].as_f64(), Some(25000.0));
    assert_eq!(body["reiviews"], json!([]));

    let id = body["id"].as_i64().unwrap();
    let (status, body) = app.send("GET", &format!("/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["car_name"], "Civic");
}

#[tokio::test]
async fn car_validation_errors_are_keyed_by_field() {
    let app = TestApp::start().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "Same", "car_decstr": "Same", "price": 25000 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array(), "{body}");

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "A", "car_decstr": "B", "price": 20000 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["price"].is_array(), "{body}");

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "A", "car_decstr": "B", "price": 25000, "car_number": "AB-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["car_number"].is_array(), "{body}");

    let (status, _) = app.send("GET", "/list", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_showroom_is_a_field_error() {
    let app = TestApp::start().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "A", "car_decstr": "B", "price": 25000, "showroom": 99 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["showroom"].is_array(), "{body}");
}

#[tokio::test]
async fn catalogue_writes_need_staff() {
    let app = TestApp::start().await;
    let alice = app.user("alice").await;
    let car = json!({ "car_name": "A", "car_decstr": "B", "price": 25000 });

    let (status, _) = app.send("POST", "/list", None, Some(car.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("POST", "/list", Some(&alice), Some(car)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "POST",
            "/showroom",
            Some(&alice),
            Some(json!({ "name": "N", "location": "L", "website": "https://n.example" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn patch_keeps_omitted_fields() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let id = app.car(&admin, "Golf", None).await;

    let (status, body) = app
        .send("PATCH", &format!("/{id}"), Some(&admin), Some(json!({ "price": 40000 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["car_name"], "Golf");
    assert_eq!(body["discount_price"].as_f64(), Some(35000.0));

    let (status, body) = app
        .send("PUT", &format!("/{id}"), Some(&admin), Some(json!({ "price": 40000 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["car_name"].is_array(), "{body}");
}

#[tokio::test]
async fn missing_car_is_404() {
    let app = TestApp::start().await;
    let (status, body) = app.send("GET", "/4242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn showroom_lists_its_cars_and_cascades() {
    let app = TestApp::start().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            "POST",
            "/showroom",
            Some(&admin),
            Some(json!({ "name": "North", "location": "Oslo", "website": "https://north.example" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let showroom = body["id"].as_i64().unwrap();

    let a = app.car(&admin, "A", Some(showroom)).await;
    let b = app.car(&admin, "B", Some(showroom)).await;

    let (_, body) = app
        .send("GET", &format!("/showroom/{showroom}"), None, None)
        .await;
    assert_eq!(body["showrooms"], json!([format!("/{a}"), format!("/{b}")]));

    let (status, _) = app
        .send("DELETE", &format!("/showroom/{showroom}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for id in [a, b] {
        let (status, _) = app.send("GET", &format!("/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn invalid_website_is_rejected() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let (status, body) = app
        .send(
            "POST",
            "/showroom",
            Some(&admin),
            Some(json!({ "name": "N", "location": "L", "website": "not a url" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["website"].is_array(), "{body}");
}

#[tokio::test]
async fn one_review_per_user_per_car() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let alice = app.user("alice").await;
    let car = app.car(&admin, "A", None).await;

    let review = json!({ "rating": 4, "comment": "Solid." });
    let (status, body) = app
        .send("POST", &format!("/{car}/reiview"), Some(&alice), Some(review.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["apiUser"], "alice");

    let (status, body) = app
        .send("POST", &format!("/reiview?car={car}"), Some(&alice), Some(review))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array(), "{body}");

    let (_, body) = app.send("GET", &format!("/{car}"), None, None).await;
    assert_eq!(body["reiviews"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn review_rules() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let alice = app.user("alice").await;
    let car = app.car(&admin, "A", None).await;

    let (status, _) = app
        .send("POST", &format!("/{car}/reiview"), None, Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send("POST", &format!("/{car}/reiview"), Some(&alice), Some(json!({ "rating": 9 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["rating"].is_array(), "{body}");

    let (status, _) = app
        .send("POST", "/999/reiview", Some(&alice), Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send("POST", "/reiview", Some(&alice), Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["car"].is_array(), "{body}");
}

#[tokio::test]
async fn only_the_author_may_change_a_review() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let car = app.car(&admin, "A", None).await;

    let (_, body) = app
        .send("POST", &format!("/{car}/reiview"), Some(&alice), Some(json!({ "rating": 4 })))
        .await;
    let review = body["id"].as_i64().unwrap();
    let uri = format!("/reiview/{review}");

    let (status, _) = app.send("GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send("PUT", &uri, Some(&bob), Some(json!({ "rating": 1 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send("PATCH", &uri, Some(&alice), Some(json!({ "comment": "Changed my mind." })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rating"], 4);
    assert_eq!(body["comment"], "Changed my mind.");

    let (status, _) = app.send("DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deleting_a_car_deletes_its_reviews() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let alice = app.user("alice").await;
    let car = app.car(&admin, "A", None).await;

    let (_, body) = app
        .send("POST", &format!("/{car}/reiview"), Some(&alice), Some(json!({ "rating": 5 })))
        .await;
    let review = body["id"].as_i64().unwrap();

    let (status, _) = app.send("DELETE", &format!("/{car}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send("GET", &format!("/reiview/{review}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_list_filters_by_car_and_paginates() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let a = app.car(&admin, "A", None).await;
    let b = app.car(&admin, "B", None).await;

    for name in ["u1", "u2", "u3", "u4"] {
        let token = app.user(name).await;
        app.send("POST", &format!("/{a}/reiview"), Some(&token), Some(json!({ "rating": 3 })))
            .await;
    }
    let u5 = app.user("u5").await;
    app.send("POST", &format!("/{b}/reiview"), Some(&u5), Some(json!({ "rating": 2 })))
        .await;

    let (status, body) = app.send("GET", &format!("/reiview?car={a}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(body["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["next"], format!("?pa=2&car={a}"));

    let (_, body) = app.send("GET", "/reiview", None, None).await;
    assert_eq!(body["count"], 5);

    let (_, body) = app.send("GET", &format!("/{b}/reiview"), None, None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["apiUser"], "u5");

    let (status, _) = app.send("GET", "/reiview?car=999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cursor_pagination_walks_forward() {
    let mut cfg = config();
    cfg.pagination.style = PaginationStyle::Cursor;
    let app = TestApp::with_config(cfg).await;
    let admin = app.admin().await;
    for name in ["A", "B", "C", "D"] {
        app.car(&admin, name, None).await;
    }

    let (_, first) = app.send("GET", "/list", None, None).await;
    assert!(first.get("count").is_none());
    assert_eq!(first["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(first["previous"], Value::Null);

    let next = first["next"].as_str().unwrap();
    let (_, second) = app.send("GET", &format!("/list{next}"), None, None).await;
    assert_eq!(second["results"][0]["car_name"], "D");
    assert_eq!(second["next"], Value::Null);

    let (status, _) = app.send("GET", "/list?cursor=garbage", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn page_out_of_range_is_404() {
    let app = TestApp::start().await;
    let (status, body) = app.send("GET", "/list?pa=7", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Invalid page.");
}

#[tokio::test]
async fn registration_rules() {
    let app = TestApp::start().await;

    let (status, body) = app
        .send(
            "POST",
            "/register/",
            None,
            Some(json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "one",
                "password_confirmation": "two",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["password_confirmation"].is_array(), "{body}");

    let (status, body) = app
        .send(
            "POST",
            "/register/",
            None,
            Some(json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "secret-pw",
                "password_confirmation": "secret-pw",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "username": "carol", "email": "carol@example.com" }));

    let (status, body) = app
        .send(
            "POST",
            "/register/",
            None,
            Some(json!({
                "username": "carol2",
                "email": "carol@example.com",
                "password": "secret-pw",
                "password_confirmation": "secret-pw",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array(), "{body}");
}

#[tokio::test]
async fn login_reuses_token_and_logout_revokes_it() {
    let app = TestApp::start().await;
    let token = app.user("dave").await;
    assert_eq!(app.login("dave", "pw-123456").await, token);

    let (status, body) = app
        .send(
            "POST",
            "/login/",
            None,
            Some(json!({ "username": "dave", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array(), "{body}");

    let (status, _) = app.send("POST", "/logout/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("POST", "/logout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send("POST", "/logout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid token.");

    assert_ne!(app.login("dave", "pw-123456").await, token);
}

#[tokio::test]
async fn review_list_is_throttled_per_user() {
    let mut cfg = config();
    cfg.throttle.review_list = Some(Rate {
        num_requests: 2,
        period: Duration::from_secs(60),
    });
    let app = TestApp::with_config(cfg).await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    for _ in 0..2 {
        let (status, _) = app.send("GET", "/reiview", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.send("GET", "/reiview", Some(&alice), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], 429);

    let (status, _) = app.send("GET", "/reiview", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/reiview", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn padded_text_is_trimmed_before_comparison() {
    let app = TestApp::start().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "X", "car_decstr": "X ", "price": 30000 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array(), "{body}");

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": " Golf ", "car_decstr": "Hatchback", "price": 30000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["car_name"], "Golf");
}

#[tokio::test]
async fn wrongly_typed_values_are_keyed_by_field() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let alice = app.user("alice").await;

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "A", "car_decstr": "B", "price": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "price": ["A valid number is required."] }));

    let car = app.car(&admin, "C", None).await;
    let (status, body) = app
        .send(
            "POST",
            &format!("/{car}/reiview"),
            Some(&alice),
            Some(json!({ "rating": "five" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "rating": ["A valid integer is required."] }));
}

#[tokio::test]
async fn price_precision_is_limited() {
    let app = TestApp::start().await;
    let admin = app.admin().await;

    for price in [json!("25000.123456789"), json!(1234567890)] {
        let (status, body) = app
            .send(
                "POST",
                "/list",
                Some(&admin),
                Some(json!({ "car_name": "A", "car_decstr": "B", "price": price })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{price}");
        assert!(body["price"].is_array(), "{body}");
    }

    let (status, body) = app
        .send(
            "POST",
            "/list",
            Some(&admin),
            Some(json!({ "car_name": "A", "car_decstr": "B", "price": "25000.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["price"].as_f64(), Some(25000.5));
}

#[tokio::test]
async fn patch_with_null_clears_showroom_and_comment() {
    let app = TestApp::start().await;
    let admin = app.admin().await;
    let alice = app.user("alice").await;

    let (_, body) = app
        .send(
            "POST",
            "/showroom",
            Some(&admin),
            Some(json!({ "name": "North", "location": "Oslo", "website": "https://north.example" })),
        )
        .await;
    let showroom = body["id"].as_i64().unwrap();
    let car = app.car(&admin, "A", Some(showroom)).await;

    let (status, body) = app
        .send("PATCH", &format!("/{car}"), Some(&admin), Some(json!({ "showroom": null })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["showroom"], Value::Null);
    assert_eq!(body["car_name"], "A");

    let (_, body) = app
        .send(
            "POST",
            &format!("/{car}/reiview"),
            Some(&alice),
            Some(json!({ "rating": 4, "comment": "Nice." })),
        )
        .await;
    let review = body["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/reiview/{review}"),
            Some(&alice),
            Some(json!({ "comment": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["comment"], Value::Null);
    assert_eq!(body["rating"], 4);
}

#[tokio::test]
async fn huge_offset_returns_an_empty_page() {
    let mut cfg = config();
    cfg.pagination.style = PaginationStyle::LimitOffset;
    let app = TestApp::with_config(cfg).await;

    let (status, body) = app
        .send("GET", &format!("/list?offset={}", i64::MAX), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["next"], Value::Null);
}
