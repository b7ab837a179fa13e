use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Results, RunList, TestResult, TestRun};
use tower::ServiceExt;

const AUTH: &str = "Basic dXNlcjpwYXNz";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .body(String::new())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn get_runs_without_auth_returns_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/get_runs/1").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- get_runs ---

#[tokio::test]
async fn get_runs_empty() {
    let resp = app().oneshot(get_request("/get_runs/1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let list: RunList = body_json(resp).await;
    assert!(list.runs.is_empty());
}

// --- add_run ---

#[tokio::test]
async fn add_run_returns_created_run() {
    let resp = app()
        .oneshot(json_request("/add_run/1", r#"{"name":"Nightly","include_all":true}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let run: TestRun = body_json(resp).await;
    assert_eq!(run.id, 1);
    assert_eq!(run.name, "Nightly");
    assert!(run.include_all);
}

#[tokio::test]
async fn add_run_missing_name_is_rejected() {
    let resp = app()
        .oneshot(json_request("/add_run/1", r#"{"include_all":true}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn add_run_malformed_json_returns_400() {
    let resp = app()
        .oneshot(json_request("/add_run/1", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update_run ---

#[tokio::test]
async fn update_run_not_found() {
    let resp = app()
        .oneshot(json_request("/update_run/99", r#"{"name":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_run_bad_id_returns_400() {
    let resp = app()
        .oneshot(json_request("/update_run/abc", r#"{"name":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- add_results_for_cases ---

#[tokio::test]
async fn add_results_for_unknown_run_returns_404() {
    let resp = app()
        .oneshot(json_request(
            "/add_results_for_cases/5",
            r#"{"results":[{"case_id":1,"status_id":1}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_request() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/echo/users/7?active=true")
                .header("x-trace", "abc")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PATCH");
    assert_eq!(echo.path, "/echo/users/7");
    assert_eq!(echo.query.as_deref(), Some("active=true"));
    assert_eq!(echo.headers.get("x-trace").map(String::as_str), Some("abc"));
    assert_eq!(echo.body, "payload");
}

#[tokio::test]
async fn echo_joins_repeated_headers() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo/x")
                .header("accept", "a/b")
                .header("accept", "c/d")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.headers.get("accept").map(String::as_str), Some("a/b, c/d"));
}

// --- full reporting lifecycle ---

#[tokio::test]
async fn reporting_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/add_run/1", r#"{"name":"Regression"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: TestRun = body_json(resp).await;
    let id = created.id;

    // list: should contain the one run
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/get_runs/1"))
        .await
        .unwrap();
    let list: RunList = body_json(resp).await;
    assert_eq!(list.runs.len(), 1);
    assert_eq!(list.runs[0].id, id);

    // other projects do not see it
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/get_runs/2"))
        .await
        .unwrap();
    let list: RunList = body_json(resp).await;
    assert!(list.runs.is_empty());

    // update: only the description
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            &format!("/update_run/{id}"),
            r#"{"description":"weekly"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: TestRun = body_json(resp).await;
    assert_eq!(updated.name, "Regression"); // unchanged
    assert_eq!(updated.description.as_deref(), Some("weekly"));

    // add results
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            &format!("/add_results_for_cases/{id}"),
            r#"{"results":[{"case_id":1,"status_id":1,"comment":"ok"},{"case_id":2,"status_id":5}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let stored: Vec<TestResult> = body_json(resp).await;
    assert_eq!(stored.len(), 2);

    // read them back
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/get_results_for_run/{id}")))
        .await
        .unwrap();
    let results: Results = body_json(resp).await;
    assert_eq!(results.results.len(), 2);
    assert_eq!(results.results[1].status_id, 5);

    // unknown run has no results endpoint
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/get_results_for_run/42"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}
