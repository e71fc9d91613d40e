//! # GET — ダウンロード開始
//!
//! クエリ `api_key`, `id` を受け取り、読み取り用の署名付きURLへ
//! 301でリダイレクトする。

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use parcel_types::DownloadQuery;

use crate::broker::UploadBroker;
use crate::error::BrokerError;

/// GET — ダウンロード開始。成功時のボディは空。
///
/// 解釈できないクエリ（`id` の重複等）は他のエラーと同じJSON形式の400で返す。
pub async fn handle_download(
    State(broker): State<Arc<UploadBroker>>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, BrokerError> {
    let Query(query) = query.map_err(|e| {
        tracing::debug!(error = %e, "クエリのパースに失敗");
        BrokerError::BadRequest("invalid query".to_string())
    })?;
    let url = broker.begin_download(&query).await?;
    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, url)]).into_response())
}
