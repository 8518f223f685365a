use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    domain::conversion::{ConversionOutput, ConversionRegistry, ConversionService, JobView},
    error::AppResult,
};

const X_SEGMENT_COUNT: HeaderName = HeaderName::from_static("x-segment-count");
const X_DURATION_SECONDS: HeaderName = HeaderName::from_static("x-duration-seconds");
const X_SAMPLE_RATE: HeaderName = HeaderName::from_static("x-sample-rate");

/// Request for POST /api/tts/convert and POST /api/conversions
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionAccepted {
    pub id: Uuid,
}

pub struct ConversionController {
    service: Arc<ConversionService>,
    registry: ConversionRegistry,
}

impl ConversionController {
    pub fn new(service: Arc<ConversionService>, registry: ConversionRegistry) -> Self {
        Self { service, registry }
    }

    /// POST /api/tts/convert - Convert text and answer with the merged WAV
    ///
    /// The run is cancelled if the client goes away before it finishes.
    pub async fn convert(
        State(controller): State<Arc<ConversionController>>,
        Json(request): Json<ConvertRequest>,
    ) -> AppResult<Response> {
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let output = controller
            .service
            .convert(&request.text, cancel, None)
            .await?;

        Ok(wav_response(&output))
    }

    /// POST /api/conversions - Queue a background conversion
    pub async fn create(
        State(controller): State<Arc<ConversionController>>,
        Json(request): Json<ConvertRequest>,
    ) -> AppResult<(StatusCode, Json<ConversionAccepted>)> {
        let id = controller.registry.start(request.text).await?;
        Ok((StatusCode::ACCEPTED, Json(ConversionAccepted { id })))
    }

    /// GET /api/conversions/:id
    pub async fn get(
        State(controller): State<Arc<ConversionController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<JobView>> {
        Ok(Json(controller.registry.get(id).await?))
    }

    /// GET /api/conversions/:id/audio
    pub async fn audio(
        State(controller): State<Arc<ConversionController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Response> {
        let output = controller.registry.audio(id).await?;
        Ok(wav_response(&output))
    }

    /// GET /api/conversions/:id/segments/:index/audio - One completed segment's WAV
    pub async fn segment_audio(
        State(controller): State<Arc<ConversionController>>,
        Path((id, index)): Path<(Uuid, usize)>,
    ) -> AppResult<Response> {
        let audio = controller.registry.segment_audio(id, index).await?;
        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/wav")],
            Body::from(audio.to_vec()),
        )
            .into_response())
    }

    /// POST /api/conversions/:id/resume
    pub async fn resume(
        State(controller): State<Arc<ConversionController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<(StatusCode, Json<JobView>)> {
        let view = controller.registry.resume(id).await?;
        Ok((StatusCode::ACCEPTED, Json(view)))
    }

    /// DELETE /api/conversions/:id - Cancel a running conversion
    pub async fn cancel(
        State(controller): State<Arc<ConversionController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<Json<JobView>> {
        Ok(Json(controller.registry.cancel(id).await?))
    }
}

fn wav_response(output: &ConversionOutput) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "audio/wav".to_string()),
        (X_SEGMENT_COUNT, output.segments.len().to_string()),
        (
            X_DURATION_SECONDS,
            format!("{:.3}", output.duration().as_secs_f64()),
        ),
        (X_SAMPLE_RATE, output.format.sample_rate.to_string()),
    ];

    (StatusCode::OK, headers, Body::from(output.audio.clone())).into_response()
}
