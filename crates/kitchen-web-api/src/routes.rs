

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{
    config::{AuthConfig, Config},
    session::{AdminCredentials, CookiePolicy, SessionCodec},
};

use self::data::DishCatalog;

mod auth;
mod data;
mod dishes;
mod error;
mod helpers;
mod menus;
use helpers::*;

pub use error::ApiError;

#[derive(Clone, FromRef)]
struct AppState {
    catalog: DishCatalog,
    codec: SessionCodec,
    cookies: CookiePolicy,
    admin: AdminCredentials,
}

impl AppState {
    async fn new(config: &Config) -> Self {
        let db = if let Some(db) = &config.db {
            tracing::info!("connecting to db");
            let v = connect_db(db).await;
            tracing::info!("connected to db");
            v
        } else {
            tracing::info!("no db specified");
            None
        };

        let catalog = match &db {
            Some(db) => DishCatalog::mongo(db),
            None => {
                #[cfg(not(debug_assertions))]
                tracing::warn!("running with an in-memory catalog, dishes are lost on restart");
                DishCatalog::in_memory()
            },
        };

        Self::with_catalog(&config.auth, catalog)
    }

    fn with_catalog(auth: &AuthConfig, catalog: DishCatalog) -> Self {
        Self {
            catalog,
            codec: SessionCodec::new(&auth.secret),
            cookies: CookiePolicy::from_config(auth),
            admin: AdminCredentials::new(&auth.admin_email, &auth.admin_password),
        }
    }
}

pub async fn make_router(config: &Config) -> Router {
    router(AppState::new(config).await)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/dishes", get(dishes::list).post(dishes::create))
        .route("/dishes/:id", patch(dishes::update).delete(dishes::delete))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/session", get(auth::session).delete(auth::end_session))
        .route("/menus/pdf", post(menus::pdf))
        .route("/menus/:date", get(menus::published).put(menus::publish))
        .layer(middleware::map_response(no_store))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
            Method, Request, StatusCode,
        },
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::session::COOKIE_NAME;

    const EMAIL: &str = "bucatarie@example.org";
    const PASSWORD: &str = "parola-buna";

    fn auth_config() -> AuthConfig {
        AuthConfig {
            admin_email: EMAIL.into(),
            admin_password: PASSWORD.into(),
            secret: "test-secret".into(),
            cookie_domain: Some("meniu.example.org".into()),
            ..AuthConfig::default()
        }
    }

    fn app() -> Router {
        router(AppState::with_catalog(&auth_config(), DishCatalog::in_memory()))
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(res: &Response) -> Option<String> {
        res.headers().get(SET_COOKIE).map(|v| v.to_str().unwrap().to_string())
    }

    fn login_request(email: &str, password: &str) -> Request<Body> {
        Request::post("/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("email={email}&password={password}")))
        .unwrap()
    }

    /// logs in and returns the `Cookie` header value for later requests
    async fn login(app: &Router) -> String {
        let res = send(app, login_request(EMAIL, PASSWORD)).await;
        let cookie = set_cookie(&res).expect("session cookie");
        cookie.split(';').next().unwrap().to_string()
    }

    fn json_request(method: Method, uri: &str, cookie: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, cookie)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
        .unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, cookie);
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn wrong_password_sets_no_cookie() {
        let app = app();

        let res = send(&app, login_request(EMAIL, "gresit")).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/admin/login?e=1");
        assert_eq!(set_cookie(&res), None);

        let res = send(&app, get_request("/session", None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");
        assert_eq!(body_json(res).await, json!({ "ok": false }));
    }

    #[tokio::test]
    async fn login_opens_a_session() {
        let app = app();

        let res = send(&app, login_request(EMAIL, PASSWORD)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/admin/dishes");

        let set = set_cookie(&res).unwrap();
        for attr in [COOKIE_NAME, "HttpOnly", "SameSite=Lax", "Path=/", "Domain=meniu.example.org"] {
            assert!(set.contains(attr), "{attr} missing in {set}");
        }

        let cookie = set.split(';').next().unwrap();
        let res = send(&app, get_request("/session", Some(cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");
        let body = body_json(res).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["email"], EMAIL);
        assert!(body["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn forged_cookie_is_unauthenticated() {
        let app = app();
        let cookie = login(&app).await;
        // flip the last hex digit of the signature
        let (head, last) = cookie.split_at(cookie.len() - 1);
        let forged = format!("{head}{}", if last == "0" { "1" } else { "0" });

        let res = send(&app, get_request("/session", Some(&forged))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(&app, get_request("/dishes", Some(&format!("{COOKIE_NAME}=garbage")))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_with_the_same_attributes() {
        let app = app();
        let cookie = login(&app).await;

        let res = send(&app, get_request("/logout", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/admin/login");

        let set = set_cookie(&res).unwrap();
        let cleared = format!("{COOKIE_NAME}=;");
        for attr in [cleared.as_str(), "Path=/", "Domain=meniu.example.org", "Max-Age=0"] {
            assert!(set.contains(attr), "{attr} missing in {set}");
        }

        let res = send(&app, Request::delete("/session").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(set_cookie(&res).unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn catalog_requires_a_session() {
        let app = app();

        let res = send(&app, get_request("/dishes", None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(&app, json_request(Method::POST, "/dishes", "", json!({
            "name": "Supă de pui", "quantity": 300,
        }))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");

        let res = send(&app, json_request(Method::DELETE, "/dishes/1", "", json!({}))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn dish_lifecycle() {
        let app = app();
        let cookie = login(&app).await;

        for (name, quantity) in [("Piure de cartofi", 200), ("Ciorbă de legume", 250)] {
            let res = send(&app, json_request(Method::POST, "/dishes", &cookie, json!({
                "name": name, "quantity": quantity,
            }))).await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = send(&app, json_request(Method::POST, "/dishes", &cookie, json!({
            "name": "Supă de pui", "quantity": 300, "unit": "GRAM",
        }))).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");
        let soup = body_json(res).await;
        let id = soup["id"].as_i64().unwrap();
        assert_eq!(soup["unit"], "GRAM");

        let res = send(&app, get_request("/dishes", Some(&cookie))).await;
        let names: Vec<_> = body_json(res).await.as_array().unwrap().iter()
            .map(|v| v["name"].as_str().unwrap().to_string())
        .collect();
        assert_eq!(names, ["Ciorbă de legume", "Piure de cartofi", "Supă de pui"]);

        let res = send(&app, json_request(Method::PATCH, &format!("/dishes/{id}"), &cookie, json!({
            "quantity": 350,
        }))).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, get_request("/dishes?q=supa", Some(&cookie))).await;
        let found = body_json(res).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["name"], "Supă de pui");
        assert_eq!(found[0]["quantity"], 350);

        let res = send(&app, json_request(Method::DELETE, &format!("/dishes/{id}"), &cookie, json!({}))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");

        let res = send(&app, get_request("/dishes", Some(&cookie))).await;
        let all = body_json(res).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert!(all.as_array().unwrap().iter().all(|v| v["id"] != id));
    }

    #[tokio::test]
    async fn validation_errors() {
        let app = app();
        let cookie = login(&app).await;

        let res = send(&app, json_request(Method::POST, "/dishes", &cookie, json!({
            "name": "Supă", "quantity": 300, "unit": "xyz",
        }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({
            "error": "Invalid unit",
            "allowed": ["GRAM", "MILLILITER", "PIECE"],
        }));

        let res = send(&app, json_request(Method::POST, "/dishes", &cookie, json!({
            "name": "Supă", "quantity": "-1",
        }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, json_request(Method::POST, "/dishes", &cookie, json!({
            "name": "Supă", "quantity": "12,6", "unit": "buc",
        }))).await;
        let dish = body_json(res).await;
        assert_eq!(dish["quantity"], 13);
        assert_eq!(dish["unit"], "PIECE");

        let res = send(&app, json_request(Method::PATCH, "/dishes/1", &cookie, json!({}))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "No fields to update" }));

        let res = send(&app, json_request(Method::PATCH, "/dishes/abc", &cookie, json!({ "quantity": 1 }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn badly_typed_bodies_are_validation_errors() {
        let app = app();
        let cookie = login(&app).await;

        for (body, expected) in [
            (json!({ "name": 5, "quantity": 300 }), json!({ "error": "Invalid name" })),
            (json!({ "name": "Supa", "quantity": true }), json!({ "error": "Invalid quantity" })),
            (json!({ "name": "Supa", "quantity": 300, "unit": 3 }), json!({
                "error": "Invalid unit",
                "allowed": ["GRAM", "MILLILITER", "PIECE"],
            })),
        ] {
            let res = send(&app, json_request(Method::POST, "/dishes", &cookie, body.clone())).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(body_json(res).await, expected, "{body}");
        }

        let res = send(&app, Request::post("/dishes")
            .header(COOKIE, &cookie)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
        .unwrap()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Malformed JSON" }));

        let res = send(&app, json_request(Method::PUT, "/menus/2025-10-08", &cookie, json!({
            "normal": { "lunch": "supa" },
        }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Invalid body" }));

        // nothing was created along the way
        let res = send(&app, get_request("/dishes", Some(&cookie))).await;
        assert_eq!(body_json(res).await, json!([]));
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let app = app();
        let cookie = login(&app).await;

        let res = send(&app, json_request(Method::PATCH, "/dishes/42", &cookie, json!({ "quantity": 1 }))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(&app, json_request(Method::DELETE, "/dishes/42", &cookie, json!({}))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    async fn create(app: &Router, cookie: &str, name: &str) -> i64 {
        let res = send(app, json_request(Method::POST, "/dishes", cookie, json!({
            "name": name, "quantity": 100,
        }))).await;
        body_json(res).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn deleting_a_dish_unlinks_published_menus() {
        let app = app();
        let cookie = login(&app).await;
        let soup = create(&app, &cookie, "Supă de pui").await;
        let bread = create(&app, &cookie, "Pâine").await;

        let res = send(&app, json_request(Method::PUT, "/menus/2025-10-08", &cookie, json!({
            "normal": { "lunch": [soup, bread, soup] },
            "diabetic": { "dinner": [soup] },
        }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let published = body_json(res).await;
        assert_eq!(published["menu"]["normal"]["lunch"].as_array().unwrap().len(), 2);

        let res = send(&app, json_request(Method::DELETE, &format!("/dishes/{soup}"), &cookie, json!({}))).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(&app, get_request("/menus/2025-10-08", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let menu = body_json(res).await["menu"].clone();
        assert_eq!(menu["normal"]["lunch"][0]["id"], bread);
        assert_eq!(menu["normal"]["lunch"].as_array().unwrap().len(), 1);
        assert_eq!(menu["diabetic"]["dinner"], json!([]));
    }

    #[tokio::test]
    async fn publishing_unknown_dishes_fails() {
        let app = app();
        let cookie = login(&app).await;

        let res = send(&app, json_request(Method::PUT, "/menus/2025-10-08", &cookie, json!({
            "normal": { "lunch": [99] },
        }))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, json_request(Method::PUT, "/menus/maine", &cookie, json!({}))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pdf_export() {
        let app = app();
        let cookie = login(&app).await;
        let soup = create(&app, &cookie, "Supă de pui").await;

        let res = send(&app, json_request(Method::POST, "/menus/pdf", &cookie, json!({
            "date": "8 Octombrie 2025",
            "menu": { "hepato_gastro": { "mic_dejun": [soup] } },
        }))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            res.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"Meniuri_8 Octombrie 2025.pdf\"",
        );

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
