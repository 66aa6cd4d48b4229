use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use wt::api::{ApiMuxConfig, api_mux};
use wt::middleware::{BoxedMiddleware, logger};
use wt::shutdown::{self, ShutdownListener, ShutdownReason};
use wt::store::{ProductStore, UserStore};
use wt::{App, FatalError, HandlerResult, Request, Response, Scope, Server};

fn app() -> (App, ShutdownListener) {
    let (shutdown, listener) = shutdown::channel();
    let app = api_mux(ApiMuxConfig {
        shutdown,
        users: Arc::new(UserStore::new()),
        products: Arc::new(ProductStore::new()),
    })
    .unwrap();
    (app, listener)
}

async fn call(app: &App, method: Method, target: &str, body: Option<Value>) -> Response {
    let mut req = Request::new(method, target);
    if let Some(body) = body {
        req = req.with_body(body.to_string());
    }
    app.serve_request(Scope::background(), req).await
}

fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

fn new_user() -> Value {
    json!({ "name": "Fii", "email": "fii@fii.com", "roles": ["ADMIN"] })
}

#[tokio::test]
async fn user_lifecycle() {
    let (app, mut listener) = app();

    let res = call(&app, Method::POST, "/v1/users", Some(new_user())).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let created = json_body(&res);
    let id = created["id"].as_str().unwrap().to_owned();
    assert_eq!(created["roles"], json!(["ADMIN"]));

    let res = call(&app, Method::GET, &format!("/v1/users/{id}"), None).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(json_body(&res), created);

    let rename = json!({ "name": "Updated" });
    let res = call(&app, Method::PUT, &format!("/v1/users/{id}"), Some(rename)).await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
    assert!(res.body().is_empty());

    let res = call(&app, Method::GET, "/v1/users", None).await;
    let list = json_body(&res);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Updated");

    let res = call(&app, Method::DELETE, &format!("/v1/users/{id}"), None).await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);

    let res = call(&app, Method::GET, &format!("/v1/users/{id}"), None).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    assert_eq!(listener.try_recv(), None);
}

#[tokio::test]
async fn client_errors_do_not_stop_the_service() {
    let (app, mut listener) = app();

    let res = call(&app, Method::POST, "/v1/users", Some(json!({ "name": "Fii" }))).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert!(json_body(&res)["error"].as_str().unwrap().contains("email"));

    let bad = json!({ "name": "Fii", "email": "nope", "roles": [] });
    let res = call(&app, Method::POST, "/v1/users", Some(bad)).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let doc = json_body(&res);
    assert_eq!(doc["error"], "data validation error");
    assert!(doc["fields"]["email"].is_string());
    assert!(doc["fields"]["roles"].is_string());

    let res = call(&app, Method::GET, "/v1/users/42", None).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = call(&app, Method::GET, "/v1/users/0b0c5a4e-0c2f-4b57-9d3c-1f0e2a7b9c11", None).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let res = call(&app, Method::GET, "/v1/users?page=zero", None).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = call(&app, Method::PATCH, "/v1/users", None).await;
    assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("GET, POST"));

    assert_eq!(listener.try_recv(), None);
}

#[tokio::test]
async fn product_pages() {
    let (app, _listener) = app();

    for i in 0..3 {
        let body = json!({ "name": format!("Item {i}"), "cost": 10, "quantity": 1 });
        let res = call(&app, Method::POST, "/v1/products", Some(body)).await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
    }

    let res = call(&app, Method::GET, "/v1/products?page=2&rows=2", None).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(json_body(&res).as_array().unwrap().len(), 1);

    let negative = json!({ "name": "x", "cost": -1, "quantity": 1 });
    let res = call(&app, Method::POST, "/v1/products", Some(negative)).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

async fn boom(_: Scope, _: Request) -> HandlerResult {
    Err(FatalError::internal("database connection lost").into())
}

#[tokio::test]
async fn fatal_error_requests_exactly_one_shutdown() {
    let (shutdown, mut listener) = shutdown::channel();
    let global: Vec<BoxedMiddleware> = vec![Arc::new(logger())];
    let mut app = App::new(shutdown, global);
    app.handle(Method::GET, "v1", "/users/:id", boom, &[]).unwrap();

    for id in ["1", "2", "3"] {
        let res = call(&app, Method::GET, &format!("/v1/users/{id}"), None).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body().is_empty());
    }

    assert!(matches!(listener.try_recv(), Some(ShutdownReason::Fault { trace_id: Some(_) })));
    assert_eq!(listener.try_recv(), None);
}

#[tokio::test]
async fn fatal_error_stops_the_server_gracefully() {
    let (mut app, mut listener) = app();
    app.handle(Method::GET, "v1", "/boom", boom, &[]).unwrap();

    let server = Server::bind("127.0.0.1:0")
        .await
        .unwrap()
        .shutdown_timeout(Duration::from_secs(5));
    let addr = server.local_addr();
    let running = tokio::spawn(server.serve(app, async move {
        listener.recv().await;
    }));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /v1/boom HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut res = String::new();
    stream.read_to_string(&mut res).await.unwrap();
    assert!(res.starts_with("HTTP/1.1 500"), "{res}");

    let outcome = tokio::time::timeout(Duration::from_secs(5), running).await.unwrap();
    outcome.unwrap().unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
