use httpmock::{
    Method::{GET, POST},
    MockServer,
};
use nanobanana_rs::*;
use serde_json::json;
use std::time::Duration;

const KEY: &str = "sk-test";

fn client_for(server: &MockServer, max_attempts: u32) -> NanoBananaClient {
    NanoBananaClient::new(
        NanoBananaConfig::builder()
            .with_base_url(server.base_url())
            .with_api_key(KEY)
            .with_max_poll_attempts(max_attempts)
            .with_poll_interval(Duration::from_millis(10))
            .build(),
    )
}

// --- End to end ---

#[tokio::test]
async fn test_generate_downloads_url_result() {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/draw/nano-banana")
                .header("authorization", "Bearer sk-test")
                .json_body(json!({
                    "model": "nano-banana-fast",
                    "prompt": "a koi pond in autumn",
                    "aspectRatio": "16:9",
                    "urls": [],
                    "webHook": "",
                    "shutProgress": false
                }));
            then.status(200).json_body(json!({"id": "task-42"}));
        })
        .await;
    let image_url = server.url("/files/koi.png");
    let result = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/draw/result")
                .header("authorization", "Bearer sk-test")
                .json_body(json!({"id": "task-42"}));
            then.status(200).json_body(json!({
                "status": "completed",
                "image_url": image_url,
                "image_data": "AAAA"
            }));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/files/koi.png");
            then.status(200).body(vec![0x89u8, b'P', b'N', b'G']);
        })
        .await;

    let request =
        GenerationRequest::new("a koi pond in autumn").aspect_ratio(AspectRatio::Landscape16x9);
    let bytes = client_for(&server, 5).generate(&request).await.unwrap();

    assert_eq!(bytes, vec![0x89u8, b'P', b'N', b'G']);
    submit.assert_async().await;
    result.assert_async().await;
    download.assert_async().await;
}

#[tokio::test]
async fn test_generate_decodes_inline_result_without_download() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/nano-banana");
            then.status(200).json_body(json!({"task_id": "t-inline"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200).json_body(json!({
                "status": "SUCCESS",
                "data": "data:image/png;base64,aGVsbG8="
            }));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200);
        })
        .await;

    let bytes = client_for(&server, 3)
        .generate(&GenerationRequest::new("hello"))
        .await
        .unwrap();

    assert_eq!(bytes, b"hello".to_vec());
    download.assert_calls_async(0).await;
}

// --- Submission ---

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({"id": "never"}));
        })
        .await;

    let client = NanoBananaClient::new(
        NanoBananaConfig::builder()
            .with_base_url(server.base_url())
            .build(),
    );
    let err = client
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, DrawError::Config(_)));
    any.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_submission_http_error_carries_context() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/nano-banana");
            then.status(401).body("invalid api key");
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200);
        })
        .await;

    let err = client_for(&server, 3)
        .submit(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    match err {
        DrawError::Submission { status, body, url } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
            assert!(url.ends_with("/v1/draw/nano-banana"));
        }
        other => panic!("expected Submission, got {:?}", other),
    }
    poll.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_submission_without_task_id_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/nano-banana");
            then.status(200).json_body(json!({"code": 0, "msg": "ok"}));
        })
        .await;

    let err = client_for(&server, 3)
        .submit(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    match err {
        DrawError::MalformedResponse { body } => assert!(body.contains("\"msg\"")),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reference_images_are_not_transmitted() {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/draw/nano-banana")
                .json_body(json!({
                    "model": "nano-banana",
                    "prompt": "restyle this",
                    "aspectRatio": "3:4",
                    "urls": [],
                    "webHook": "",
                    "shutProgress": false
                }));
            then.status(200).json_body(json!({"id": 7}));
        })
        .await;

    let request = GenerationRequest::new("restyle this")
        .model("nano-banana")
        .reference_image(vec![0xFFu8, 0xD8, 0xFF]);
    let handle = client_for(&server, 3).submit(&request).await.unwrap();

    assert_eq!(handle.as_str(), "7");
    submit.assert_async().await;
}

// --- Polling ---

#[tokio::test]
async fn test_failed_status_stops_after_one_query() {
    let server = MockServer::start_async().await;
    let result = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200)
                .json_body(json!({"status": "FAILED", "error": "content blocked"}));
        })
        .await;

    let err = client_for(&server, 60)
        .poll(&TaskHandle::new("t-1"))
        .await
        .unwrap_err();

    match err {
        DrawError::TaskFailed { task_id, message } => {
            assert_eq!(task_id, "t-1");
            assert_eq!(message, "content blocked");
        }
        other => panic!("expected TaskFailed, got {:?}", other),
    }
    result.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_server_errors_exhaust_budget() {
    let server = MockServer::start_async().await;
    let result = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(503).body("upstream busy");
        })
        .await;

    let err = client_for(&server, 3)
        .poll(&TaskHandle::new("t-2"))
        .await
        .unwrap_err();

    match err {
        DrawError::PollExhausted {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"));
        }
        other => panic!("expected PollExhausted, got {:?}", other),
    }
    result.assert_calls_async(3).await;
}

#[tokio::test]
async fn test_unrecognized_status_polls_until_timeout() {
    let server = MockServer::start_async().await;
    let result = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200).json_body(json!({"status": "queued", "progress": 0}));
        })
        .await;

    let err = client_for(&server, 4)
        .poll(&TaskHandle::new("t-3"))
        .await
        .unwrap_err();

    assert!(matches!(err, DrawError::PollTimeout { attempts: 4, .. }));
    result.assert_calls_async(4).await;
}

#[tokio::test]
async fn test_invalid_json_is_transient() {
    let server = MockServer::start_async().await;
    let result = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200).body("<html>gateway</html>");
        })
        .await;

    let err = client_for(&server, 2)
        .poll(&TaskHandle::new("t-4"))
        .await
        .unwrap_err();

    assert!(matches!(err, DrawError::PollExhausted { attempts: 2, .. }));
    result.assert_calls_async(2).await;
}

#[tokio::test]
async fn test_completed_without_payload_is_extraction_failure() {
    let server = MockServer::start_async().await;
    let result = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200).json_body(json!({"status": "completed", "progress": 100}));
        })
        .await;

    let err = client_for(&server, 10)
        .poll(&TaskHandle::new("t-5"))
        .await
        .unwrap_err();

    assert!(matches!(err, DrawError::ExtractionFailed { .. }));
    result.assert_calls_async(1).await;
}

// --- Download ---

#[tokio::test]
async fn test_download_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/files/gone.png");
            then.status(404);
        })
        .await;

    let url = server.url("/files/gone.png");
    let err = client_for(&server, 1).fetch(&url).await.unwrap_err();

    match err {
        DrawError::Download { status, url: failed } => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("expected Download, got {:?}", other),
    }
}

// --- Deadlines ---

const SLOW: Duration = Duration::from_millis(500);
const DEADLINE: Duration = Duration::from_millis(100);

fn impatient_client(server: &MockServer, max_attempts: u32) -> NanoBananaClient {
    NanoBananaClient::new(
        NanoBananaConfig::builder()
            .with_base_url(server.base_url())
            .with_api_key(KEY)
            .with_max_poll_attempts(max_attempts)
            .with_poll_interval(Duration::from_millis(10))
            .with_submit_timeout(DEADLINE)
            .with_query_timeout(DEADLINE)
            .with_download_timeout(DEADLINE)
            .build(),
    )
}

#[tokio::test]
async fn test_slow_submission_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/nano-banana");
            then.status(200)
                .delay(SLOW)
                .json_body(json!({"id": "too-late"}));
        })
        .await;

    let err = impatient_client(&server, 1)
        .submit(&GenerationRequest::new("x"))
        .await
        .unwrap_err();

    match err {
        DrawError::SubmissionTimeout { url, timeout } => {
            assert_eq!(url, server.url("/v1/draw/nano-banana"));
            assert_eq!(timeout, DEADLINE);
        }
        other => panic!("expected SubmissionTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_status_queries_exhaust_budget() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/draw/result");
            then.status(200)
                .delay(SLOW)
                .json_body(json!({"status": "completed", "image_url": "https://x/y.png"}));
        })
        .await;

    let err = impatient_client(&server, 2)
        .poll(&TaskHandle::new("t-slow"))
        .await
        .unwrap_err();

    match err {
        DrawError::PollExhausted {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert!(last_error.contains("timed out"), "{}", last_error);
        }
        other => panic!("expected PollExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_download_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/files/slow.png");
            then.status(200).delay(SLOW).body(vec![1u8, 2, 3]);
        })
        .await;

    let url = server.url("/files/slow.png");
    let err = impatient_client(&server, 1).fetch(&url).await.unwrap_err();

    match err {
        DrawError::DownloadTimeout { url: failed } => assert_eq!(failed, url),
        other => panic!("expected DownloadTimeout, got {:?}", other),
    }
}
