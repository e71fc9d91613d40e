//! # Brokerエンドポイント
//!
//! `/` と `/files` の両方で同じメソッド振り分けを行う。
//! - `PUT` — アップロード開始
//! - `GET` — ダウンロード開始
//! - その他（HEADを含む） — 405

pub mod download;
pub mod upload;

pub use download::handle_download;
pub use upload::handle_upload;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;

use crate::broker::UploadBroker;

/// 未対応メソッドへの応答。
pub async fn handle_method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Brokerのルーターを構築する。
pub fn router(broker: Arc<UploadBroker>) -> axum::Router {
    let files = get(handle_download)
        .head(handle_method_not_allowed)
        .put(handle_upload)
        .fallback(handle_method_not_allowed);

    axum::Router::new()
        .route("/", files.clone())
        .route("/files", files)
        .with_state(broker)
}
