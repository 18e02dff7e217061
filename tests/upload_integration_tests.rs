use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

mod common;
use common::{multipart_request, TestApp};

const MB: usize = 1024 * 1024;

#[tokio::test]
async fn test_upload_png_and_fetch_same_bytes() {
    let app = TestApp::new();
    let token = app.user_token("user@x.com").await;

    let data: Vec<u8> = (0..4 * MB).map(|i| (i % 251) as u8).collect();
    let (status, bytes) = app
        .send(multipart_request(Some(&token), "image", "image/png", &data))
        .await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let filename = body["filename"].as_str().unwrap().to_string();
    let url = body["imageUrl"].as_str().unwrap();
    assert!(filename.ends_with(".png"));
    assert!(url.ends_with(&format!("/upload/{filename}")));

    // fetch via the path component of the returned URL
    let path = &url[url.find("/upload/").unwrap()..];
    let res = app
        .router
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
    let fetched = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(fetched.len(), data.len());
    assert!(fetched[..] == data[..]);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = TestApp::new();
    let token = app.user_token("user@x.com").await;
    let data = vec![0u8; 6 * MB];
    let (status, bytes) = app
        .send(multipart_request(Some(&token), "image", "image/png", &data))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("too large"));
}

#[tokio::test]
async fn test_upload_rejects_non_image_type() {
    let app = TestApp::new();
    let token = app.user_token("user@x.com").await;
    let (status, bytes) = app
        .send(multipart_request(Some(&token), "image", "text/plain", b"hello"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let msg = body["message"].as_str().unwrap();
    assert!(msg.contains("image/jpeg"));
}

#[tokio::test]
async fn test_upload_without_image_field() {
    let app = TestApp::new();
    let token = app.user_token("user@x.com").await;
    let (status, bytes) = app
        .send(multipart_request(Some(&token), "avatar", "image/png", b"\x89PNG"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "no image uploaded");
}

#[tokio::test]
async fn test_upload_requires_authentication_but_not_admin() {
    let app = TestApp::new();
    let (status, _) = app
        .send(multipart_request(None, "image", "image/png", b"\x89PNG"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.user_token("user@x.com").await;
    let (status, _) = app
        .send(multipart_request(Some(&token), "image", "image/png", b"\x89PNG"))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_image_and_missing_files() {
    let app = TestApp::new();
    let token = app.user_token("user@x.com").await;
    let (_, bytes) = app
        .send(multipart_request(Some(&token), "image", "image/webp", b"RIFFxxxxWEBP"))
        .await;
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let filename = body["filename"].as_str().unwrap().to_string();

    let uri = format!("/upload/{filename}");
    let (status, _) = app.json("DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.json("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "image not found");

    let (status, _) = app.json("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json("GET", "/upload/..%2F..%2Fetc%2Fpasswd", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
