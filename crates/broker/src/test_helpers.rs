//! # テスト用共通ヘルパー
//!
//! 各モジュールのテストで共有するモック実装とテストサーバー。

use std::sync::Arc;
use std::time::Duration;

use crate::broker::UploadBroker;
use crate::capability::{AccessVerb, CapabilityIssuer, SigningError};
use crate::identity::StaticKeyTable;
use crate::store::{FileRecord, FileStore, MemoryFileStore, StoreError};

/// 開発用テーブルに登録されているAPIキー（オーナー: useridpaul）
pub const PAUL_KEY: &str = "c16f3b18-e43f-4216-b66e-62a26df8c683";

/// テスト用のモックCapabilityIssuer。
/// S3への接続なしで、キー・メソッド・有効期限を埋め込んだダミーURLを返す。
pub struct MockIssuer;

#[async_trait::async_trait]
impl CapabilityIssuer for MockIssuer {
    async fn issue(
        &self,
        storage_key: &str,
        verb: AccessVerb,
        validity: Duration,
    ) -> Result<String, SigningError> {
        Ok(format!(
            "https://mock-storage/{storage_key}?verb={verb}&expires={}",
            validity.as_secs()
        ))
    }
}

/// 常に署名に失敗するIssuer。
pub struct FailingIssuer;

#[async_trait::async_trait]
impl CapabilityIssuer for FailingIssuer {
    async fn issue(
        &self,
        _storage_key: &str,
        _verb: AccessVerb,
        _validity: Duration,
    ) -> Result<String, SigningError> {
        Err(SigningError::Presign("credentials provider unavailable".to_string()))
    }
}

/// 常にバックエンドエラーを返すストア。
pub struct FailingStore;

#[async_trait::async_trait]
impl FileStore for FailingStore {
    async fn get(&self, _id: &str) -> Result<FileRecord, StoreError> {
        Err(StoreError::Backend("ProvisionedThroughputExceededException".to_string()))
    }

    async fn put(&self, _record: &FileRecord) -> Result<(), StoreError> {
        Err(StoreError::Backend("ProvisionedThroughputExceededException".to_string()))
    }
}

/// 応答が返らないストア（タイムアウト検証用）。
pub struct SlowStore;

#[async_trait::async_trait]
impl FileStore for SlowStore {
    async fn get(&self, _id: &str) -> Result<FileRecord, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(StoreError::Backend("unreachable".to_string()))
    }

    async fn put(&self, _record: &FileRecord) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(StoreError::Backend("unreachable".to_string()))
    }
}

/// インメモリストアとモックIssuerで構成したBroker。
pub fn memory_broker() -> UploadBroker {
    UploadBroker::new(
        Arc::new(StaticKeyTable::dev_default()),
        Arc::new(MemoryFileStore::new()),
        Arc::new(MockIssuer),
    )
}

/// Brokerのルーターを127.0.0.1の空きポートで起動し、ベースURLを返す。
pub async fn start_test_server(broker: UploadBroker) -> String {
    let app = crate::endpoints::router(Arc::new(broker));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}
