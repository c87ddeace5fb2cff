use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{auth, comments, posts};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(comments::router())
        .route("/health", get(|| async { "ok" }))
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
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::state::FakeStore;

    fn app_with_users() -> (Router, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        store.insert("alice", "correct-pw");
        store.insert("bob", "bobs-password");
        let app = build_app(AppState::fake_with(store.clone()));
        (app, store)
    }

    fn login_request(username: &str, password: &str) -> Request<Body> {
        Request::post("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap()
    }

    fn me_request(token: Option<&str>) -> Request<Body> {
        let mut req = Request::get("/users/me");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::empty()).unwrap()
    }

    fn authed(method: &str, uri: &str, token: &str, body: Option<&str>) -> Request<Body> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_owned()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        }
    }

    async fn json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn token_for(app: &Router, username: &str, password: &str) -> String {
        let res = app
            .clone()
            .oneshot(login_request(username, password))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        json(res).await["access_token"]
            .as_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app_with_users();
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_issues_bearer_token_usable_on_me() {
        let (app, _) = app_with_users();
        let res = app
            .clone()
            .oneshot(login_request("alice", "correct-pw"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res).await;
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_owned();

        let res = app.oneshot(me_request(Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let me = json(res).await;
        assert_eq!(me["username"], "alice");
        assert_eq!(me["disabled"], false);
        assert!(me.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn failed_logins_are_indistinguishable() {
        let (app, _) = app_with_users();
        let wrong = app
            .clone()
            .oneshot(login_request("alice", "wrong-pw"))
            .await
            .unwrap();
        let unknown = app
            .oneshot(login_request("nobody", "anything"))
            .await
            .unwrap();

        for res in [&wrong, &unknown] {
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
        }
        let wrong = json(wrong).await;
        let unknown = json(unknown).await;
        assert_eq!(wrong, unknown);
        assert_eq!(wrong["detail"], "Incorrect username or password");
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_challenged() {
        let (app, _) = app_with_users();
        for token in [None, Some("garbage")] {
            let res = app.clone().oneshot(me_request(token)).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
            assert_eq!(json(res).await["detail"], "Could not validate credentials");
        }
    }

    #[tokio::test]
    async fn disabled_user_gets_inactive_error() {
        let (app, store) = app_with_users();
        let token = token_for(&app, "alice", "correct-pw").await;

        store.disable("alice");
        let res = app.clone().oneshot(me_request(Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(res).await["detail"], "Inactive user");

        // logging in again still works; the fresh token is refused the same way
        let fresh = token_for(&app, "alice", "correct-pw").await;
        let res = app.oneshot(me_request(Some(&fresh))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_then_duplicate_conflicts() {
        let (app, store) = app_with_users();
        let register = || {
            Request::post("/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"username":"carol","dob":"1999-12-31","password":"long-enough"}"#,
                ))
                .unwrap()
        };

        let res = app.clone().oneshot(register()).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let stored = store.get("carol").expect("carol stored");
        assert_ne!(stored.password_hash, "long-enough");

        let res = app.clone().oneshot(register()).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = app
            .oneshot(login_request("carol", "long-enough"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (app, _) = app_with_users();
        for body in [
            r#"{"username":"x y","dob":"1999-12-31","password":"long-enough"}"#,
            r#"{"username":"dave","dob":"1999-12-31","password":"short"}"#,
        ] {
            let req = Request::post("/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap();
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn update_me_replaces_password() {
        let (app, _) = app_with_users();
        let res = app
            .clone()
            .oneshot(login_request("alice", "correct-pw"))
            .await
            .unwrap();
        let token = json(res).await["access_token"]
            .as_str()
            .unwrap()
            .to_owned();

        let req = Request::put("/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"dob":"1990-02-03","password":"new-password"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let old = app
            .clone()
            .oneshot(login_request("alice", "correct-pw"))
            .await
            .unwrap();
        assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
        let new = app
            .oneshot(login_request("alice", "new-password"))
            .await
            .unwrap();
        assert_eq!(new.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mutations_require_a_token() {
        let (app, _) = app_with_users();
        let post_id = uuid::Uuid::new_v4();
        for (method, uri) in [
            ("PUT", format!("/posts/{post_id}")),
            ("DELETE", format!("/posts/{post_id}")),
            ("PUT", format!("/comments/{post_id}")),
            ("DELETE", format!("/comments/{post_id}")),
        ] {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"t","comment":"c"}"#))
                .unwrap();
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn post_mutations_are_owner_only() {
        let (app, store) = app_with_users();
        let token = token_for(&app, "alice", "correct-pw").await;
        let alices = store.add_post("alice", "alice's post");
        let bobs = store.add_post("bob", "bob's post");
        let title = Some(r#"{"title":"renamed"}"#);

        let res = app
            .clone()
            .oneshot(authed("PUT", &format!("/posts/{alices}"), &token, title))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["post_title"], "renamed");

        let foreign = app
            .clone()
            .oneshot(authed("PUT", &format!("/posts/{bobs}"), &token, title))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        let missing = app
            .clone()
            .oneshot(authed(
                "PUT",
                &format!("/posts/{}", uuid::Uuid::new_v4()),
                &token,
                title,
            ))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let foreign = json(foreign).await;
        assert_eq!(foreign["detail"], "Post not found");
        assert_eq!(foreign, json(missing).await);
        assert_eq!(store.post(bobs).unwrap().title, "bob's post");

        let res = app
            .clone()
            .oneshot(authed("DELETE", &format!("/posts/{bobs}"), &token, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(store.post(bobs).is_some());

        let res = app
            .oneshot(authed("DELETE", &format!("/posts/{alices}"), &token, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["msg"], "Post deleted.");
        assert!(store.post(alices).is_none());
    }

    #[tokio::test]
    async fn comment_mutations_are_owner_only() {
        let (app, store) = app_with_users();
        let token = token_for(&app, "alice", "correct-pw").await;
        let post_id = store.add_post("bob", "bob's post");
        let alices = store.add_comment("alice", post_id, "hello");
        let bobs = store.add_comment("bob", post_id, "welcome");
        let body = Some(r#"{"comment":"edited"}"#);

        let res = app
            .clone()
            .oneshot(authed("PUT", &format!("/comments/{alices}"), &token, body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["comment"], "edited");

        let foreign = app
            .clone()
            .oneshot(authed("PUT", &format!("/comments/{bobs}"), &token, body))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        let missing = app
            .clone()
            .oneshot(authed(
                "DELETE",
                &format!("/comments/{}", uuid::Uuid::new_v4()),
                &token,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let foreign = json(foreign).await;
        assert_eq!(foreign["detail"], "Comment not found");
        assert_eq!(foreign, json(missing).await);
        assert_eq!(store.comment(bobs).unwrap().body, "welcome");

        let res = app
            .oneshot(authed("DELETE", &format!("/comments/{alices}"), &token, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(store.comment(alices).is_none());
        assert!(store.comment(bobs).is_some());
    }

    #[tokio::test]
    async fn delete_me_without_content_deletes_the_account() {
        let (app, store) = app_with_users();
        let token = token_for(&app, "alice", "correct-pw").await;

        let res = app
            .clone()
            .oneshot(authed("DELETE", "/users/me", &token, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["msg"], "User deleted.");
        assert!(store.get("alice").is_none());

        let res = app.oneshot(me_request(Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_me_with_content_deactivates_instead() {
        let (app, store) = app_with_users();
        let token = token_for(&app, "alice", "correct-pw").await;
        let bobs = store.add_post("bob", "bob's post");
        store.add_comment("alice", bobs, "still here");

        let res = app
            .clone()
            .oneshot(authed("DELETE", "/users/me", &token, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["msg"], "User deactivated.");
        assert!(store.get("alice").expect("row kept").disabled);

        let res = app.oneshot(me_request(Some(&token))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(res).await["detail"], "Inactive user");
    }
}
