//! # Parcel 共有型定義
//!
//! Brokerとクライアントの間でやり取りされるリクエスト・レスポンスの
//! ワイヤ形式をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - すべてJSON（UTF-8）
//! - エラーは常に `{"error": "..."}` の単一フィールド

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PUT（アップロード開始）
// ---------------------------------------------------------------------------

/// PUT リクエストボディ。
///
/// フィールド欠落は空文字列として扱う。空の `api_key` は認証で拒否され、
/// 空の `filepath` は入力検証で拒否される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// クライアントのAPIキー
    #[serde(default)]
    pub api_key: String,
    /// オーナー名前空間からの相対パス（例: "magic/thegathering.txt"）
    #[serde(default)]
    pub filepath: String,
}

/// PUT 成功レスポンス（201 Created）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// 署名付きアップロードURL（PUT）
    pub upload_url: String,
    /// ファイルの外部識別子（32桁の16進数）
    pub id: String,
}

// ---------------------------------------------------------------------------
// GET（ダウンロード開始）
// ---------------------------------------------------------------------------

/// GET クエリパラメータ。
/// 欠落したパラメータは `None` となり、Broker側で400として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQuery {
    /// クライアントのAPIキー
    pub api_key: Option<String>,
    /// PUTで払い出された外部識別子
    pub id: Option<String>,
}

// ---------------------------------------------------------------------------
// エラー
// ---------------------------------------------------------------------------

/// エラーレスポンスボディ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
