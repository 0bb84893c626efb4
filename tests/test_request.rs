use plainwire::http::protocol::Version;
use plainwire::http::request::{Method, RequestBuilder};

#[test]
fn test_method_parse() {
    assert_eq!(Method::parse("GET"), Method::GET);
    assert_eq!(Method::parse("POST"), Method::POST);
    assert_eq!(Method::parse("PUT"), Method::PUT);
    assert_eq!(Method::parse("DELETE"), Method::DELETE);
    assert_eq!(Method::parse("HEAD"), Method::HEAD);
    assert_eq!(Method::parse("OPTIONS"), Method::OPTIONS);
    assert_eq!(Method::parse("PATCH"), Method::PATCH);
    assert_eq!(Method::parse("CONNECT"), Method::CONNECT);
    assert_eq!(Method::parse("TRACE"), Method::TRACE);
    assert_eq!(Method::parse("Get"), Method::Unknown);
    assert_eq!(Method::parse(""), Method::Unknown);
}

#[test]
fn test_method_as_str() {
    assert_eq!(Method::GET.as_str(), "GET");
    assert_eq!(Method::PATCH.as_str(), "PATCH");
}

#[test]
fn test_request_builder_basic() {
    let request = RequestBuilder::new()
        .method(Method::GET)
        .path("/test")
        .build()
        .unwrap();

    assert_eq!(request.method(), Method::GET);
    assert_eq!(request.path(), "/test");
    assert_eq!(request.version(), Version::Http11);
    assert!(request.body().is_none());
    assert!(request.is_persistent());
}

#[test]
fn test_request_builder_with_headers() {
    let request = RequestBuilder::new()
        .method(Method::POST)
        .path("/api")
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer token")
        .build()
        .unwrap();

    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("AUTHORIZATION"), Some("Bearer token"));
    assert!(request.headers().is_frozen());
}

#[test]
fn test_request_builder_with_body() {
    let request = RequestBuilder::new()
        .method(Method::POST)
        .path("/submit")
        .header("Content-Length", "9")
        .body(&b"test data"[..])
        .build()
        .unwrap();

    assert_eq!(request.body().map(|b| b.as_ref()), Some(&b"test data"[..]));
    assert_eq!(request.content_length(), Some(9));
}

#[test]
fn test_request_builder_missing_method() {
    let result = RequestBuilder::new().path("/test").build();
    assert_eq!(result.err(), Some("method missing"));
}

#[test]
fn test_request_builder_missing_path() {
    let result = RequestBuilder::new().method(Method::GET).build();
    assert_eq!(result.err(), Some("path missing"));
}

#[test]
fn test_request_builder_rejects_colon_in_header_name() {
    let result = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Bad:Name", "x")
        .build();
    assert!(result.is_err());
}

#[test]
fn test_persistence_follows_version_and_connection_header() {
    let http10 = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .version(Version::Http10)
        .build()
        .unwrap();
    assert!(!http10.is_persistent());

    let http10_keep_alive = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .version(Version::Http10)
        .header("Connection", "keep-alive")
        .build()
        .unwrap();
    assert!(http10_keep_alive.is_persistent());

    let http11_close = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Connection", "close")
        .build()
        .unwrap();
    assert!(!http11_close.is_persistent());
}
