//! Wire-level tests for the Clipdrop HTTP client against an in-process responder

mod common;

use clipdrop_batch::{
    ApiKey, ClipdropClient, Endpoints, ErrorKind, ImageFile, OutputFormat, RemoteEditClient,
    UpscaleFactor,
};
use common::{png_bytes, FakeResponse, FakeServer};
use std::path::Path;
use std::time::Duration;

fn client_for(server: &FakeServer, timeout: Duration) -> ClipdropClient {
    ClipdropClient::new(
        ApiKey::new("test-secret"),
        Endpoints::with_base_url(&server.base_url),
        timeout,
    )
    .unwrap()
}

fn cat_image() -> ImageFile {
    ImageFile::new(Path::new("/photos/cat.png"), png_bytes(4, 4, [10, 20, 30, 255]))
}

#[tokio::test]
async fn test_upscale_sends_factor_and_accept_header() {
    let result_bytes = png_bytes(8, 8, [1, 2, 3, 255]);
    let expected = result_bytes.clone();
    let server = FakeServer::start(move |_| {
        FakeResponse::ok(result_bytes.clone()).with_header("x-remaining-credits", "42")
    })
    .await;

    let image = cat_image();
    let result = client_for(&server, Duration::from_secs(10))
        .upscale(&image, OutputFormat::WebP, UpscaleFactor::X4)
        .await
        .unwrap();

    assert_eq!(result.bytes, expected);
    assert_eq!(result.remaining_credits, Some(42));

    let requests = server.captured();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.request_line().starts_with("POST /super-resolution/v1 "));
    assert_eq!(request.header("x-api-key").as_deref(), Some("test-secret"));
    assert_eq!(request.header("accept").as_deref(), Some("image/webp"));
    assert_eq!(request.form_field("upscale").as_deref(), Some("4"));

    let body = request.body_text();
    assert!(body.contains("name=\"image_file\"; filename=\"cat.png\""));
    assert!(body.to_ascii_lowercase().contains("content-type: image/png"));
}

#[tokio::test]
async fn test_remove_background_has_no_upscale_field() {
    let server = FakeServer::start(|_| FakeResponse::ok(png_bytes(2, 2, [0, 0, 0, 0]))).await;

    let result = client_for(&server, Duration::from_secs(10))
        .remove_background(&cat_image(), OutputFormat::Jpeg)
        .await
        .unwrap();
    assert_eq!(result.remaining_credits, None);

    let request = &server.captured()[0];
    assert!(request.request_line().starts_with("POST /remove-background/v1 "));
    assert_eq!(request.header("accept").as_deref(), Some("image/jpeg"));
    assert!(request.form_field("upscale").is_none());
}

#[tokio::test]
async fn test_non_success_status_is_remote_error() {
    let server = FakeServer::start(|_| FakeResponse::error(402, "Not enough credits")).await;

    let err = client_for(&server, Duration::from_secs(10))
        .remove_background(&cat_image(), OutputFormat::Png)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteApi);
    assert_eq!(err.status(), Some(402));
    assert!(err.to_string().contains("Not enough credits"));
}

#[tokio::test]
async fn test_timeout_is_remote_error_without_status() {
    let server = FakeServer::start(|_| {
        FakeResponse::ok(Vec::new()).with_delay(Duration::from_secs(10))
    })
    .await;

    let err = client_for(&server, Duration::from_millis(200))
        .remove_background(&cat_image(), OutputFormat::Png)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteApi);
    assert_eq!(err.status(), None);
    assert!(err.to_string().contains("timed out"), "{}", err);
}

#[tokio::test]
async fn test_connection_refused_is_remote_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ClipdropClient::new(
        ApiKey::new("k"),
        Endpoints::with_base_url(&format!("http://{}", addr)),
        Duration::from_secs(5),
    )
    .unwrap();

    let err = client
        .remove_background(&cat_image(), OutputFormat::Png)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteApi);
    assert_eq!(err.status(), None);
}
