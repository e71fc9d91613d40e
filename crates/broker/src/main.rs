//! # Parcel Broker
//!
//! オブジェクトストレージへの直接アップロード・ダウンロード用の
//! 署名付きURLを発行するBroker。
//!
//! ## 役割
//! - APIキーによるクライアント認証
//! - オーナー＋パスからの外部識別子の導出
//! - ファイルレコード（識別子 → オブジェクトキー）の永続化
//! - 単一オブジェクト・単一メソッドに限定した署名付きURLの発行
//!
//! ## API
//! - `PUT /` — アップロード開始（201 + upload_url, id）
//! - `GET /?api_key=&id=` — ダウンロード開始（301 + Location）
//! - その他のメソッド — 405

mod broker;
mod capability;
mod config;
mod endpoints;
mod error;
mod identity;
mod locator;
mod store;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::broker::UploadBroker;
use crate::capability::S3CapabilityIssuer;
use crate::config::{BrokerConfig, StoreBackend};
use crate::identity::StaticKeyTable;
use crate::store::{DynamoFileStore, FileStore, MemoryFileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BrokerConfig::from_env()?;

    // APIキー表
    let identity = match &config.api_keys {
        Some(spec) => StaticKeyTable::parse(spec)?,
        None => {
            tracing::warn!("API_KEYSが未設定です。開発用APIキーを使用します（開発環境用）");
            StaticKeyTable::dev_default()
        }
    };
    if identity.is_empty() {
        tracing::warn!("APIキーが1件も登録されていません。すべてのリクエストが401になります");
    }
    tracing::info!(keys = identity.len(), "APIキー表を読み込みました");

    // AWS設定（DynamoDBと署名の両方が同じ認証情報チェーンを使う）
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.s3.region.clone()))
        .load()
        .await;

    // メタデータストア
    let store: Arc<dyn FileStore> = match config.store_backend {
        StoreBackend::DynamoDb => {
            tracing::info!(
                table = %config.file_table_name,
                region = %config.s3.region,
                "DynamoDBストアを使用します"
            );
            Arc::new(DynamoFileStore::connect(
                &aws_config,
                config.dynamodb_endpoint.as_deref(),
                &config.file_table_name,
            ))
        }
        StoreBackend::Memory => {
            tracing::warn!("インメモリストアを使用します。再起動でレコードは失われます（開発環境用）");
            Arc::new(MemoryFileStore::new())
        }
    };

    // 署名付きURL発行（S3互換）
    let issuer = S3CapabilityIssuer::from_settings(&config.s3, aws_config.credentials_provider())?;
    if config.s3.access_key.is_none() || config.s3.secret_key.is_none() {
        tracing::info!("署名にはAWS標準の認証情報プロバイダチェーンを使用します");
    }
    if let Some(endpoint) = &config.s3.endpoint {
        tracing::info!(s3_endpoint = %endpoint, "S3互換エンドポイントを設定");
    }
    tracing::info!(
        bucket = %config.s3.bucket,
        presign_expiry_secs = config.presign_expiry.as_secs(),
        "署名付きURLの発行先"
    );

    let broker = UploadBroker::new(Arc::new(identity), store, Arc::new(issuer))
        .with_presign_expiry(config.presign_expiry)
        .with_call_timeout(config.call_timeout);

    let app = endpoints::router(Arc::new(broker));

    tracing::info!("Brokerを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
