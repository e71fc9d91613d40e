//! # Metadata Store
//!
//! 外部識別子をキーとするファイルレコードの永続化。
//!
//! ## 実装
//! - `MemoryFileStore`: プロセス内HashMap（開発・テスト用）
//! - `DynamoFileStore`: DynamoDBテーブル（本番用）

pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoFileStore;
pub use memory::MemoryFileStore;

use chrono::{DateTime, Utc};

/// ファイルレコード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// 外部識別子
    pub id: String,
    /// レコード作成時刻（UTC）
    pub created_at: DateTime<Utc>,
    /// 表示名（アップロード時のパスの最終セグメント）
    pub name: String,
    /// オブジェクトキー（オーナー名前空間で始まる）
    pub storage_key: String,
}

/// ストア操作のエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// 指定した識別子のレコードが存在しない
    #[error("レコードが存在しません: {0}")]
    NotFound(String),
    /// バックエンドとの通信・デコードに失敗
    #[error("バックエンドエラー: {0}")]
    Backend(String),
}

/// ファイルレコードストアの抽象インターフェース。
///
/// 実装はスレッドセーフであること。呼び出し側はロックを持たない。
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// 識別子でレコードを取得する。存在しない場合は `StoreError::NotFound`。
    async fn get(&self, id: &str) -> Result<FileRecord, StoreError>;

    /// レコードを無条件に書き込む（既存レコードは上書き）。
    async fn put(&self, record: &FileRecord) -> Result<(), StoreError>;
}
