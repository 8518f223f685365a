use crate::e2e::helpers;

use helpers::{read_samples, wav_fixture, TestContext, SAMPLE_RATE, SPEECH_PATH};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
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

#[tokio::test]
async fn it_should_convert_text_into_a_single_wav() {
    let ctx = TestContext::with_segment_length(20).await.unwrap();
    mock_segment(&ctx.backend, "First one here.", &[1; 2400]).await;
    mock_segment(&ctx.backend, "Second one here.", &[2; 2400]).await;
    mock_segment(&ctx.backend, "Third one here.", &[3; 2400]).await;

    let response = ctx
        .client
        .post("/api/tts/convert", &json!({ "text": THREE_SENTENCES }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/wav")
        .assert_header("x-segment-count", "3")
        .assert_header("x-sample-rate", &SAMPLE_RATE.to_string())
        .assert_header("x-duration-seconds", "0.300");

    let (spec, samples) = read_samples(&response.body_bytes);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(samples.len(), 7200);
    assert!(samples[..2400].iter().all(|s| *s == 1));
    assert!(samples[2400..4800].iter().all(|s| *s == 2));
    assert!(samples[4800..].iter().all(|s| *s == 3));
}

#[tokio::test]
async fn it_should_send_credentials_and_voice_to_backend() {
    let ctx = TestContext::new().await.unwrap();

    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .and(header("authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({
            "voice_id": "oliver",
            "language": "en",
            "format": "wav",
            "sample_rate": SAMPLE_RATE
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(wav_fixture(&[5; 10])))
        .expect(1)
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .client
        .post(
            "/api/tts/convert",
            &json!({ "text": "The weather is lovely today and the garden is full of flowers." }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn it_should_pick_the_french_voice_for_french_text() {
    let ctx = TestContext::new().await.unwrap();

    Mock::given(method("POST"))
        .and(path(SPEECH_PATH))
        .and(body_partial_json(json!({
            "voice_id": "raphael",
            "language": "fr-FR"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(wav_fixture(&[7; 10])))
        .expect(1)
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .client
        .post(
            "/api/tts/convert",
            &json!({ "text": "Bonjour à tous, aujourd'hui nous allons parler de la cuisine française." }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn it_should_reject_blank_text() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .client
        .post("/api/tts/convert", &json!({ "text": "   \n\t" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_code("empty_input");
    assert!(ctx.backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn it_should_surface_rate_limits_distinctly() {
    let ctx = TestContext::new().await.unwrap();

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({ "error": "Free tier limit reached" })),
        )
        .expect(1)
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .client
        .post("/api/tts/convert", &json!({ "text": "Hello there." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::TOO_MANY_REQUESTS)
        .assert_error_code("rate_limited");
    assert_eq!(response.field("failed_segment"), Some(&json!(0)));
}

#[tokio::test]
async fn it_should_surface_auth_failures_distinctly() {
    let ctx = TestContext::new().await.unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .client
        .post("/api/tts/convert", &json!({ "text": "Hello there." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_error_code("upstream_unauthorized");
}

#[tokio::test]
async fn it_should_retry_transient_backend_errors() {
    let ctx = TestContext::new().await.unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&ctx.backend)
        .await;
    mock_segment(&ctx.backend, "Hello there.", &[9; 100]).await;

    let response = ctx
        .client
        .post("/api/tts/convert", &json!({ "text": "Hello there." }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn it_should_give_up_after_max_retries() {
    let ctx = TestContext::new().await.unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .client
        .post("/api/tts/convert", &json!({ "text": "Hello there." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_error_code("upstream_error");
}

#[tokio::test]
async fn it_should_reject_backend_audio_in_mixed_formats() {
    let ctx = TestContext::with_segment_length(20).await.unwrap();
    mock_segment(&ctx.backend, "First one here.", &[1; 10]).await;

    let stereo = {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(2i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    };
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "text": "Second one here." })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(stereo))
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .client
        .post(
            "/api/tts/convert",
            &json!({ "text": "First one here. Second one here." }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_GATEWAY)
        .assert_error_code("format_mismatch");
    assert_eq!(response.field("failed_segment"), Some(&json!(1)));
}
