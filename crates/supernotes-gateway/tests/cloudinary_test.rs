//! Cloudinary uploads against a mock server.

use serde_json::json;
use supernotes_core::{Error, ImageHost, ImageSource};
use supernotes_gateway::{CloudinaryConfig, CloudinaryImageHost};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

fn host(server: &MockServer) -> CloudinaryImageHost {
    let mut config = CloudinaryConfig::new("demo");
    config.upload_url = format!("{}/v1_1/demo/auto/upload", server.uri());
    CloudinaryImageHost::new(config).unwrap()
}

#[tokio::test]
async fn test_upload_bytes_returns_secure_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .and(body_string_contains("name=\"upload_preset\""))
        .and(body_string_contains("supernotes"))
        .and(body_string_contains("image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "supernotes/abc",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/supernotes/abc.png",
            "resource_type": "image"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = host(&server)
        .upload(ImageSource::Bytes {
            file_name: "photo.png".to_string(),
            data: PNG.to_vec(),
        })
        .await
        .unwrap();
    assert_eq!(
        url,
        "https://res.cloudinary.com/demo/image/upload/v1/supernotes/abc.png"
    );
}

#[tokio::test]
async fn test_data_url_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .and(body_string_contains("data:image/png;base64,iVBORw0KGgo="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secure_url": "https://res.cloudinary.com/demo/x.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = host(&server)
        .upload(ImageSource::DataUrl(
            "data:image/png;base64,iVBORw0KGgo=".to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(url, "https://res.cloudinary.com/demo/x.png");
}

#[tokio::test]
async fn test_non_image_rejected_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = host(&server)
        .upload(ImageSource::Bytes {
            file_name: "doc.pdf".to_string(),
            data: b"%PDF-1.7\n".to_vec(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_upload_error_is_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/auto/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Upload preset must be whitelisted for unsigned uploads"}
        })))
        .mount(&server)
        .await;

    let err = host(&server)
        .upload(ImageSource::Bytes {
            file_name: "photo.png".to_string(),
            data: PNG.to_vec(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Request(msg) if msg.contains("whitelisted")));
}
