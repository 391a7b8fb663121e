use indoc::indoc;
use nano_http::connection::HttpConnection;
use nano_http::protocol::HttpError;
use nano_web::router::RouteGroup;
use nano_web::{DispatchConfig, Dispatcher, RequestBody, RequestContext, ResponseContext, handler_fn, middleware_fn};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

#[derive(Debug, Clone)]
struct User(&'static str);

fn dispatcher() -> Dispatcher {
    dispatcher_with(DispatchConfig::default())
}

fn dispatcher_with(config: DispatchConfig) -> Dispatcher {
    let mut builder = Dispatcher::builder();
    builder
        .config(config)
        .use_middleware(middleware_fn(|req, _res, next| {
            req.extensions_mut().insert(User("mart"));
            next.proceed()
        }))
        .use_middleware(middleware_fn(|req, _res, next| {
            if req.headers().contains_key("x-reject") { next.fail("rejected by header") } else { next.proceed() }
        }))
        .get(
            "/",
            handler_fn(|req: RequestContext, res: ResponseContext| async move {
                let user = req.extensions().get::<User>().map(|user| user.0);
                res.code(401).send(&json!({ "data": { "user": user }, "query": req.query().get("page") }))
            }),
        )
        .unwrap()
        .post(
            "/",
            handler_fn(|req: RequestContext, res: ResponseContext| async move {
                match req.into_body() {
                    RequestBody::Json(value) => res.code(201).send(&json!({ "Created": value })),
                    RequestBody::Text(text) => res.send(&json!({ "text": text })),
                }
            }),
        )
        .unwrap()
        .delete(
            "/",
            handler_fn(|req: RequestContext, res: ResponseContext| async move {
                res.send(&json!({ "Deleted": req.body().as_json() }))
            }),
        )
        .unwrap()
        .register_group(RouteGroup::new("user", |routes| {
            routes.get(
                "/:id",
                handler_fn(|req: RequestContext, res: ResponseContext| async move { res.send(&json!({ "id": req.param("id") })) }),
            )?;
            Ok(())
        }))
        .unwrap();
    builder.build()
}

async fn exchange(request: &[u8]) -> (String, Result<(), HttpError>) {
    let (client, server) = duplex(64 * 1024);
    let (server_reader, server_writer) = tokio::io::split(server);
    let connection = tokio::spawn(HttpConnection::new(server_reader, server_writer).process(Arc::new(dispatcher())));

    let (mut client_reader, mut client_writer) = tokio::io::split(client);
    client_writer.write_all(request).await.unwrap();
    client_writer.shutdown().await.unwrap();

    let mut response = String::new();
    client_reader.read_to_string(&mut response).await.unwrap();
    (response, connection.await.unwrap())
}

#[tokio::test]
async fn get_with_middleware_data_and_query() {
    let request = indoc! {"
        GET /?page=2 HTTP/1.1
        Host: 127.0.0.1:3000

    "};
    let (response, result) = exchange(request.as_bytes()).await;

    result.unwrap();
    assert!(response.starts_with("HTTP/1.1 401 Unauthorized\r\n"), "{response}");
    assert!(response.contains("content-type: application/json\r\n"));
    assert!(response.ends_with(r#"{"data":{"user":"mart"},"query":"2"}"#));
}

#[tokio::test]
async fn post_json_body() {
    let body = r#"{"name":"mart"}"#;
    let request = format!("POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}", body.len());
    let (response, result) = exchange(request.as_bytes()).await;

    result.unwrap();
    assert!(response.starts_with("HTTP/1.1 201 Created\r\n"), "{response}");
    assert!(response.ends_with(r#"{"Created":{"name":"mart"}}"#));
}

#[tokio::test]
async fn chunked_text_body() {
    let request = b"POST / HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
    let (response, result) = exchange(request).await;

    result.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with(r#"{"text":"hello world"}"#));
}

#[tokio::test]
async fn grouped_route_and_keep_alive() {
    let request = indoc! {"
        GET /user/42 HTTP/1.1
        Host: localhost

        GET /user/7 HTTP/1.1
        Host: localhost

    "};
    let (response, result) = exchange(request.as_bytes()).await;

    result.unwrap();
    assert_eq!(response.matches("HTTP/1.1 200 OK\r\n").count(), 2, "{response}");
    let first = response.find(r#"{"id":"42"}"#).unwrap();
    let second = response.find(r#"{"id":"7"}"#).unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn unknown_route() {
    let request = indoc! {"
        DELETE /Nothing/Here HTTP/1.1
        Host: localhost

    "};
    let (response, result) = exchange(request.as_bytes()).await;

    result.unwrap();
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
    assert!(response.ends_with(r#"{"url":"/Nothing/Here","method":"DELETE","msg":"Route not found","statusCode":404}"#));
}

#[tokio::test]
async fn middleware_failure() {
    let request = indoc! {"
        GET / HTTP/1.1
        Host: localhost
        X-Reject: 1

    "};
    let (response, result) = exchange(request.as_bytes()).await;

    result.unwrap();
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");
    assert!(response.contains("content-type: text/plain\r\n"));
    assert!(response.ends_with("\r\n\r\nSomething went wrong"));
}

#[tokio::test]
async fn expect_continue() {
    let request = b"POST / HTTP/1.1\r\nHost: localhost\r\nExpect: 100-continue\r\nContent-Length: 4\r\n\r\n[42]";
    let (response, result) = exchange(request).await;

    result.unwrap();
    assert!(response.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\n"), "{response}");
    assert!(response.ends_with(r#"{"Created":[42]}"#));
}

#[tokio::test]
async fn malformed_request() {
    let (response, result) = exchange(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
    assert!(result.is_err());
}

#[tokio::test]
async fn truncated_body() {
    let (response, result) = exchange(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\n{\"a\"").await;

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");
    assert!(result.is_err());
}

#[tokio::test]
async fn delete_with_json_body() {
    let request = indoc! {r#"
        DELETE / HTTP/1.1
        Host: localhost
        Content-Length: 8

        {"id":7}GET /user/1 HTTP/1.1
        Host: localhost

    "#};
    let (response, result) = exchange(request.as_bytes()).await;

    result.unwrap();
    assert_eq!(response.matches("HTTP/1.1 200 OK\r\n").count(), 2, "{response}");
    assert!(response.contains(r#"{"Deleted":{"id":7}}"#), "{response}");
    assert!(response.ends_with(r#"{"id":"1"}"#));
}

#[tokio::test(start_paused = true)]
async fn stalled_body_times_out() {
    let config = DispatchConfig { body_timeout: Some(Duration::from_millis(100)), ..DispatchConfig::default() };
    let (client, server) = duplex(64 * 1024);
    let (server_reader, server_writer) = tokio::io::split(server);
    let connection = tokio::spawn(HttpConnection::new(server_reader, server_writer).process(Arc::new(dispatcher_with(config))));

    // the body announces 10 bytes, only 2 arrive and the client keeps the stream open
    let (mut client_reader, mut client_writer) = tokio::io::split(client);
    client_writer.write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\n{\"").await.unwrap();

    let mut response = String::new();
    client_reader.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"), "{response}");
    assert!(response.contains("connection: close\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nRequest Timeout"));
    connection.await.unwrap().unwrap();
    drop(client_writer);
}
