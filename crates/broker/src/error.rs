//! # Broker エラー型
//!
//! 全エンドポイントで共通のエラー型とHTTPレスポンスへの変換。
//! 内部エラーの詳細はサーバー側ログにのみ出力し、クライアントには
//! 固定メッセージだけを返す。

use axum::http::StatusCode;
use axum::Json;
use parcel_types::ErrorBody;

/// Brokerエラー型。
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// 不正なリクエスト（クライアント側で修正が必要、リトライ不可）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// APIキーが不正または未登録。形式不正と未知のキーは区別しない。
    #[error("認証に失敗")]
    Unauthorized,
    /// 未知の外部識別子
    #[error("ファイルが見つかりません: {0}")]
    NotFound(String),
    /// メタデータストア操作に失敗
    #[error("メタデータストア操作に失敗: {0}")]
    Store(String),
    /// 署名付きURL生成に失敗
    #[error("署名付きURL生成に失敗: {0}")]
    Signing(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl BrokerError {
    /// HTTPステータスコード。
    pub fn status(&self) -> StatusCode {
        match self {
            BrokerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BrokerError::Unauthorized => StatusCode::UNAUTHORIZED,
            BrokerError::NotFound(_) => StatusCode::NOT_FOUND,
            BrokerError::Store(_) | BrokerError::Signing(_) | BrokerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// クライアントに返すメッセージ。
    /// 5xx系はストレージ事業者固有の情報を含めない固定文言とする。
    pub fn public_message(&self) -> String {
        match self {
            BrokerError::BadRequest(msg) => msg.clone(),
            BrokerError::Unauthorized => "unauthorized".to_string(),
            BrokerError::NotFound(id) => format!("{id} not found"),
            BrokerError::Store(_) => "error accessing file records".to_string(),
            BrokerError::Signing(_) => "error getting presigned url".to_string(),
            BrokerError::Internal(_) => "internal error".to_string(),
        }
    }
}

impl axum::response::IntoResponse for BrokerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "リクエスト処理に失敗");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "リクエストを拒否");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
