// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;

#[test]
fn encode_decode_roundtrip_request() {
    let request = Request::Start {
        resource: ResourceRef::washer(1),
        requester_id: RequesterId(42),
        cycle: CycleKind::Extra10,
    };

    let encoded = encode(&request).expect("encode failed");
    let decoded: Request = decode(&encoded).expect("decode failed");

    assert_eq!(request, decoded);
}

#[test]
fn request_wire_shape() {
    let request: Request = serde_json::from_str(
        r#"{"type":"Start","resource":{"class":"dryer","ordinal":3},"requester_id":7,"cycle":"extra_5"}"#,
    )
    .expect("parse failed");

    assert_eq!(
        request,
        Request::Start {
            resource: ResourceRef::dryer(3),
            requester_id: RequesterId(7),
            cycle: CycleKind::Extra5,
        }
    );
}

#[test]
fn subscribe_requester_is_optional() {
    let request: Request = serde_json::from_str(r#"{"type":"Subscribe"}"#).expect("parse failed");
    assert_eq!(request, Request::Subscribe { requester_id: None });

    let request: Request =
        serde_json::from_str(r#"{"type":"ReportFault","resource":{"class":"washer","ordinal":2},"requester_id":1,"description":"leak"}"#)
            .expect("parse failed");
    assert!(matches!(request, Request::ReportFault { photo: None, .. }));
}

#[test]
fn error_response_carries_kind() {
    let response = Response::Error {
        kind: "invalid_state".to_string(),
        message: "cannot start washer#1 while it is in_use".to_string(),
    };

    let encoded = encode(&response).expect("encode failed");
    let value: serde_json::Value = serde_json::from_slice(&encoded).expect("not json");
    assert_eq!(value["type"], "Error");
    assert_eq!(value["kind"], "invalid_state");

    let decoded: Response = decode(&encoded).expect("decode failed");
    assert_eq!(response, decoded);
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Ok;
    let encoded = encode(&response).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(
        json_str.starts_with('{'),
        "should be JSON object: {}",
        json_str
    );
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let payload = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, payload)
        .await
        .expect("write failed");

    assert_eq!(buffer.len(), 4 + payload.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, payload);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data)
        .await
        .expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let len = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
    let mut cursor = std::io::Cursor::new(len.to_vec());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
}

#[tokio::test]
async fn read_request_times_out() {
    let (_client, server) = tokio::io::duplex(64);
    let mut server = server;
    let err = read_request(&mut server, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[tokio::test]
async fn request_response_over_duplex() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    write_request(&mut client, &Request::Ping, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let request = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(request, Request::Ping);

    write_response(&mut server, &Response::Pong, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let response = read_response(&mut client, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(response, Response::Pong);
}
