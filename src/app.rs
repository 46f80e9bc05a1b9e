use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{articles, auth, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(articles::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;

    fn test_state() -> AppState {
        AppState::in_memory(Arc::new(AppConfig::for_tests()))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&b).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res: Response = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn article_body() -> Value {
        json!({
            "title": "Hello",
            "description": "first post",
            "content": "hello world",
            "category": "life"
        })
    }

    #[tokio::test]
    async fn health() {
        let app = build_app(test_state());
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_and_ownership_scenario() {
        let state = test_state();
        let app = build_app(state.clone());

        let creds = json!({"username": "alice", "password": "secret1"});
        let (status, body) =
            send(&app, Method::POST, "/api/user/register", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert!(body["data"]["userId"].as_i64().is_some());

        let (status, body) = send(&app, Method::POST, "/api/user/register", None, Some(creds)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "username already exists");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/user/login",
            None,
            Some(json!({"username": "alice", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);

        let alice = login(&app, "alice", "secret1").await;

        let (status, body) = send(&app, Method::GET, "/api/article/detail?id=424242", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/article/publish",
            Some(&alice),
            Some(article_body()),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let article_id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({"username": "bob", "password": "hunter22"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let bob = login(&app, "bob", "hunter22").await;

        let uri = format!("/api/article/delete?id={article_id}");
        let (status, body) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 403);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);

        assert!(state.articles.find_by_id(article_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        let app = build_app(test_state());

        let (status, body) =
            send(&app, Method::POST, "/api/article/publish", None, Some(article_body())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "missing Authorization header");

        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/article/myPosts")
            .header(header::AUTHORIZATION, "bearer abc")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&app, Method::GET, "/api/user/info", Some("not.a.token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "invalid or expired token");
    }

    #[tokio::test]
    async fn public_reads_edit_and_search() {
        let app = build_app(test_state());
        send(
            &app,
            Method::POST,
            "/api/user/register",
            None,
            Some(json!({"username": "carol", "password": "secret1"})),
        )
        .await;
        let carol = login(&app, "carol", "secret1").await;

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/article/publish",
            Some(&carol),
            Some(article_body()),
        )
        .await;
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/article/edit",
            Some(&carol),
            Some(json!({
                "id": id,
                "title": "Rust notes",
                "description": "borrowing",
                "content": "lifetimes",
                "category": "tech"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["id"], id);

        let (status, body) =
            send(&app, Method::GET, "/api/article/list?category=tech&page=1&pageSize=5", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["pageSize"], 5);
        assert_eq!(body["data"]["list"][0]["author"], "carol");

        let (_, body) = send(&app, Method::GET, "/api/article/list?category=food", None, None).await;
        assert_eq!(body["data"]["total"], 0);

        let (status, body) =
            send(&app, Method::GET, &format!("/api/article/detail?id={id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["viewCount"], 1);
        assert_eq!(body["data"]["category"], "tech");

        let (status, body) = send(&app, Method::GET, "/api/search/article?keyword=RUST", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);

        let (status, _) = send(&app, Method::GET, "/api/search/article", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/api/article/list?page=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);

        let (status, body) = send(&app, Method::GET, "/api/article/myPosts", Some(&carol), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);

        let (status, body) = send(&app, Method::GET, "/api/user/info", Some(&carol), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "carol");

        let (status, _) = send(&app, Method::POST, "/api/user/logout", Some(&carol), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
