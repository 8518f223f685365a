use crate::e2e::helpers;

use helpers::{read_samples, wav_fixture, TestContext, SPEECH_PATH};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THREE_SENTENCES: &str = "First one here. Second one here. Third one here.";

async fn mock_segment(server: &MockServer, text: &str, samples: &[i16]) {
    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .and(body_partial_json(json!({ "text": text })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(wav_fixture(samples)))
        .mount(server)
        .await;
}

async fn start_job(ctx: &TestContext, text: &str) -> String {
    let response = ctx
        .client
        .post("/api/conversions", &json!({ "text": text }))
        .await
        .unwrap();

    response.assert_status(StatusCode::ACCEPTED);
    response
        .field("id")
        .and_then(Value::as_str)
        .expect("Missing id in response")
        .to_string()
}

fn segment_statuses(job: &Value) -> Vec<String> {
    job["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn it_should_run_a_conversion_in_the_background() {
    let ctx = TestContext::with_segment_length(20).await.unwrap();
    mock_segment(&ctx.backend, "First one here.", &[1; 100]).await;
    mock_segment(&ctx.backend, "Second one here.", &[2; 100]).await;
    mock_segment(&ctx.backend, "Third one here.", &[3; 100]).await;

    let id = start_job(&ctx, THREE_SENTENCES).await;
    let job = ctx.client.wait_for_job(&id).await.unwrap();

    assert_eq!(job["status"], "succeeded");
    assert_eq!(job["id"], id.as_str());
    assert_eq!(segment_statuses(&job), vec!["completed"; 3]);
    assert!(job.get("error").is_none());
    assert!(job.get("created_at").is_some());

    let audio = ctx
        .client
        .get(&format!("/api/conversions/{}/audio", id))
        .await
        .unwrap();
    audio
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/wav")
        .assert_header("x-segment-count", "3");

    let (_, samples) = read_samples(&audio.body_bytes);
    assert_eq!(samples.len(), 300);
}

#[tokio::test]
async fn it_should_reject_blank_text() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .client
        .post("/api/conversions", &json!({ "text": "" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_code("empty_input");
}

#[tokio::test]
async fn it_should_return_not_found_for_unknown_conversion() {
    let ctx = TestContext::new().await.unwrap();
    let id = uuid::Uuid::new_v4();

    ctx.client
        .get(&format!("/api/conversions/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_code("not_found");

    ctx.client
        .delete(&format!("/api/conversions/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn it_should_report_failure_and_withhold_audio() {
    let ctx = TestContext::with_segment_length(20).await.unwrap();
    mock_segment(&ctx.backend, "First one here.", &[1; 100]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "text": "Second one here." })))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&ctx.backend)
        .await;

    let id = start_job(&ctx, THREE_SENTENCES).await;
    let job = ctx.client.wait_for_job(&id).await.unwrap();

    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"]["code"], "upstream_unauthorized");
    assert_eq!(job["failed_segment"], 1);
    assert_eq!(
        segment_statuses(&job),
        vec!["completed", "failed", "pending"]
    );

    ctx.client
        .get(&format!("/api/conversions/{}/audio", id))
        .await
        .unwrap()
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn it_should_serve_audio_of_completed_segments() {
    let ctx = TestContext::with_segment_length(20).await.unwrap();
    mock_segment(&ctx.backend, "First one here.", &[7; 50]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "text": "Second one here." })))
        .respond_with(ResponseTemplate::new(403).set_body_string("plan limit"))
        .mount(&ctx.backend)
        .await;

    let id = start_job(&ctx, THREE_SENTENCES).await;
    ctx.client.wait_for_job(&id).await.unwrap();

    let first = ctx
        .client
        .get(&format!("/api/conversions/{}/segments/0/audio", id))
        .await
        .unwrap();
    first
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/wav");
    let (spec, samples) = read_samples(&first.body_bytes);
    assert_eq!(spec.channels, 1);
    assert_eq!(samples, vec![7; 50]);

    ctx.client
        .get(&format!("/api/conversions/{}/segments/1/audio", id))
        .await
        .unwrap()
        .assert_status(StatusCode::CONFLICT)
        .assert_error_code("conflict");

    ctx.client
        .get(&format!("/api/conversions/{}/segments/9/audio", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn it_should_resume_from_the_failed_segment() {
    let ctx = TestContext::with_segment_length(20).await.unwrap();
    mock_segment(&ctx.backend, "First one here.", &[1; 100]).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "text": "Second one here." })))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&ctx.backend)
        .await;
    mock_segment(&ctx.backend, "Second one here.", &[2; 100]).await;
    mock_segment(&ctx.backend, "Third one here.", &[3; 100]).await;

    let id = start_job(&ctx, THREE_SENTENCES).await;
    let failed = ctx.client.wait_for_job(&id).await.unwrap();
    assert_eq!(failed["error"]["code"], "rate_limited");

    ctx.client
        .post_empty(&format!("/api/conversions/{}/resume", id))
        .await
        .unwrap()
        .assert_status(StatusCode::ACCEPTED);
    let resumed = ctx.client.wait_for_job(&id).await.unwrap();

    assert_eq!(resumed["status"], "succeeded");
    assert_eq!(segment_statuses(&resumed), vec!["completed"; 3]);

    // first segment was not synthesized again
    let first_calls = ctx
        .backend
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| {
            serde_json::from_slice::<Value>(&r.body).unwrap()["text"] == "First one here."
        })
        .count();
    assert_eq!(first_calls, 1);

    let audio = ctx
        .client
        .get(&format!("/api/conversions/{}/audio", id))
        .await
        .unwrap();
    let (_, samples) = read_samples(&audio.body_bytes);
    assert_eq!(samples.len(), 300);
    assert_eq!(samples[0], 1);
    assert_eq!(samples[150], 2);
    assert_eq!(samples[299], 3);
}

#[tokio::test]
async fn it_should_not_resume_a_successful_conversion() {
    let ctx = TestContext::new().await.unwrap();
    mock_segment(&ctx.backend, "Short one.", &[1; 10]).await;

    let id = start_job(&ctx, "Short one.").await;
    ctx.client.wait_for_job(&id).await.unwrap();

    ctx.client
        .post_empty(&format!("/api/conversions/{}/resume", id))
        .await
        .unwrap()
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn it_should_cancel_a_running_conversion() {
    let ctx = TestContext::new().await.unwrap();
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(wav_fixture(&[1; 10]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&ctx.backend)
        .await;

    let id = start_job(&ctx, "This will take a while.").await;

    ctx.client
        .delete(&format!("/api/conversions/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    let job = ctx.client.wait_for_job(&id).await.unwrap();

    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"]["code"], "cancelled");
    assert_ne!(segment_statuses(&job), vec!["completed"]);
}
