//! Multipart requests and responses.

use sdata::client::{boundary_of, parse_multipart, AttachedFile, MimePart, MultipartWriter};
use sdata::{HttpMethod, SDataRequest, Value};
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_form_field_without_files_is_form_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_regex("Content-Type", r"^multipart/form-data; boundary=\S+$"))
        .and(body_string_contains("inline; name=name"))
        .and(body_string_contains("value"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = SDataRequest::new(format!("{}/upload", server.uri()))
        .with_method(HttpMethod::Post)
        .with_form_field("name", "value")
        .execute()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let received = &server.received_requests().await.unwrap()[0];
    let content_type = received
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    let boundary = boundary_of(content_type).unwrap();
    assert!(!boundary.is_empty());

    let parts = parse_multipart(&received.body, &boundary).unwrap();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].content.as_ref(), b"value");
}

#[tokio::test]
async fn test_files_make_the_body_related() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_regex("Content-Type", r"^multipart/related; boundary=\S+$"))
        .and(body_string_contains("filename*=utf-8''r%C3%A9sum%C3%A9.pdf"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    SDataRequest::new(server.uri())
        .with_method(HttpMethod::Post)
        .with_file(AttachedFile::new(
            Some("application/pdf".into()),
            Some("résumé.pdf".into()),
            &b"%PDF-1.4"[..],
        ))
        .execute()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_multipart_response_splits_content_and_files() {
    let mut writer = MultipartWriter::new();
    writer.add(MimePart::new(r#"{"Name":"Acme"}"#).with_content_type("application/json"));
    writer.add(
        MimePart::new(&b"logo-bytes"[..])
            .with_content_type("image/png")
            .with_disposition("attachment; filename=logo.png"),
    );
    let content_type = format!("multipart/related; boundary={}", writer.boundary());
    let body = writer.finish();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type.as_str()))
        .mount(&server)
        .await;

    let response = SDataRequest::new(server.uri()).execute().await.unwrap();

    assert_eq!(
        response.value().and_then(|v| v.get("Name")).and_then(Value::as_str),
        Some("Acme")
    );
    let files = response.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name(), Some("logo.png"));
    assert_eq!(files[0].content_type(), Some("image/png"));
    assert_eq!(files[0].content().as_ref(), b"logo-bytes");
}
