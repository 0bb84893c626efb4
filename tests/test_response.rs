use plainwire::HttpError;
use plainwire::Response;
use plainwire::http::headers::CONTENT_TYPE;
use plainwire::http::protocol::{StatusCode, Version};
use plainwire::http::response::SEND_CHUNK_SIZE;

fn text(out: &[u8]) -> String {
    String::from_utf8_lossy(out).into_owned()
}

#[tokio::test]
async fn test_single_write_infers_content_length() {
    let mut out: Vec<u8> = Vec::new();
    {
        let mut response = Response::new(&mut out, Version::Http11);
        response.headers_mut().set(CONTENT_TYPE, "text/plain").unwrap();
        response.write_str("hello").await.unwrap();

        assert!(response.headers_sent());
        assert_eq!(response.content_length(), Some(5));
        assert_eq!(response.total_bytes_sent(), 5);
        assert!(response.is_complete());
    }

    assert_eq!(
        text(&out),
        "HTTP/1.1 200 OK\r\nContent-type: text/plain\r\nContent-length: 5\r\n\r\nhello"
    );
}

#[tokio::test]
async fn test_status_line_uses_request_version() {
    let mut out: Vec<u8> = Vec::new();
    {
        let mut response = Response::new(&mut out, Version::Http10);
        response.set_status(StatusCode::NotFound).unwrap();
        response.write_str("gone").await.unwrap();
    }

    assert!(text(&out).starts_with("HTTP/1.0 404 Not Found\r\n"));
}

#[tokio::test]
async fn test_status_and_headers_locked_after_send() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(&mut out, Version::Http11);
    response.write(b"x").await.unwrap();

    assert!(matches!(
        response.set_status(StatusCode::NotFound),
        Err(HttpError::HeadersAlreadySent)
    ));
    assert!(matches!(
        response.headers_mut().set("X-Late", "1"),
        Err(HttpError::HeadersFrozen)
    ));
    assert!(matches!(
        response.set_persistent(false),
        Err(HttpError::HeadersFrozen)
    ));
    assert_eq!(response.status(), StatusCode::Ok);
}

#[tokio::test]
async fn test_declared_length_is_enforced() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(&mut out, Version::Http11);
    response.headers_mut().set_content_length(Some(10)).unwrap();

    response.write(b"01234").await.unwrap();
    assert!(!response.is_complete());

    response.write(b"56789").await.unwrap();
    assert!(response.is_complete());

    let overrun = response.write(b"!").await;
    match overrun {
        Err(HttpError::ContentLengthExceeded {
            sent,
            chunk,
            declared,
        }) => {
            assert_eq!((sent, chunk, declared), (10, 1, 10));
        }
        other => panic!("expected length error, got {:?}", other),
    }
    assert_eq!(response.total_bytes_sent(), 10);
}

#[tokio::test]
async fn test_overrun_error_message() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(&mut out, Version::Http11);
    response.headers_mut().set_content_length(Some(2)).unwrap();
    response.write(b"ab").await.unwrap();

    let err = response.write(b"cde").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "total data length 2 (sent) + 3 exceeds specified Content-length of 2"
    );

    let io: HttpError = std::io::Error::other("gone").into();
    assert!(std::error::Error::source(&io).is_some());
}

#[tokio::test]
async fn test_short_body_is_incomplete() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(&mut out, Version::Http11);
    response.headers_mut().set_content_length(Some(10)).unwrap();
    response.write(b"abcde").await.unwrap();

    assert!(!response.is_complete());
    assert_eq!(response.total_bytes_sent(), 5);
}

#[tokio::test]
async fn test_end_without_body_sends_zero_length() {
    let mut out: Vec<u8> = Vec::new();
    {
        let mut response = Response::new(&mut out, Version::Http11);
        response.set_status(StatusCode::NoContent).unwrap();
        response.end().await.unwrap();
        // a second end is a no-op
        response.end().await.unwrap();
        assert!(response.is_complete());
    }

    assert_eq!(text(&out), "HTTP/1.1 204 No Content\r\nContent-length: 0\r\n\r\n");
}

#[tokio::test]
async fn test_set_persistent_writes_connection_header() {
    let mut out: Vec<u8> = Vec::new();
    {
        let mut response = Response::new(&mut out, Version::Http11);
        assert!(response.is_persistent());

        response.set_persistent(false).unwrap();
        assert!(!response.is_persistent());
        assert_eq!(response.headers().get("connection"), Some("close"));

        response.end().await.unwrap();
    }

    assert!(text(&out).contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_http10_response_needs_keep_alive() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(&mut out, Version::Http10);
    assert!(!response.is_persistent());

    response.set_persistent(true).unwrap();
    assert!(response.is_persistent());
}

#[tokio::test]
async fn test_send_from_streams_in_chunks() {
    let payload: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let mut out: Vec<u8> = Vec::new();
    {
        let mut response = Response::new(&mut out, Version::Http11);
        let mut source: &[u8] = &payload;

        let forwarded = response
            .send_from(&mut source, payload.len() as u64)
            .await
            .unwrap();

        assert_eq!(forwarded, 40_000);
        assert!(payload.len() > SEND_CHUNK_SIZE * 2);
        assert!(response.is_complete());
        assert_eq!(response.content_length(), Some(40_000));
    }

    let head = b"HTTP/1.1 200 OK\r\nContent-length: 40000\r\n\r\n";
    assert_eq!(&out[..head.len()], head);
    assert_eq!(&out[head.len()..], &payload[..]);
}

#[tokio::test]
async fn test_send_from_short_source() {
    let mut out: Vec<u8> = Vec::new();
    let mut response = Response::new(&mut out, Version::Http11);
    let mut source: &[u8] = b"four";

    let forwarded = response.send_from(&mut source, 10).await.unwrap();

    assert_eq!(forwarded, 4);
    assert!(!response.is_complete());
}

#[tokio::test]
async fn test_send_from_stops_at_declared_length() {
    let mut out: Vec<u8> = Vec::new();
    {
        let mut response = Response::new(&mut out, Version::Http11);
        response.headers_mut().set_content_length(Some(3)).unwrap();
        let mut source: &[u8] = b"abcdef";

        let forwarded = response.send_from(&mut source, 6).await.unwrap();
        assert_eq!(forwarded, 3);
        assert!(response.is_complete());
    }

    assert!(text(&out).ends_with("\r\n\r\nabc"));
}
