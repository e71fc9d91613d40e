//! # PUT — アップロード開始
//!
//! リクエストボディ `{"api_key", "filepath"}` を受け取り、
//! レコードを書き込んだうえで書き込み用の署名付きURLを返す。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parcel_types::{UploadRequest, UploadResponse};

use crate::broker::UploadBroker;
use crate::error::BrokerError;

/// PUT — アップロード開始。
///
/// JSONのパース失敗は serde のエラー内容を返さず、固定文言 `invalid json` とする。
pub async fn handle_upload(
    State(broker): State<Arc<UploadBroker>>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), BrokerError> {
    if body.is_empty() {
        return Err(BrokerError::BadRequest("api_key not provided".to_string()));
    }

    let request: UploadRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "リクエストボディのパースに失敗");
        BrokerError::BadRequest("invalid json".to_string())
    })?;

    let response = broker.begin_upload(&request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
