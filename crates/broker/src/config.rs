//! # Broker設定
//!
//! 環境変数からの設定読み込み。起動時に一度だけ読み込み、
//! 以降は不変として扱う。

use std::time::Duration;

use anyhow::Context;

use crate::broker::{DEFAULT_CALL_TIMEOUT, DEFAULT_PRESIGN_EXPIRY};
use crate::capability::s3::S3Settings;
use crate::capability::validity_secs;

/// メタデータストアのバックエンド。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// DynamoDBテーブル
    DynamoDb,
    /// プロセス内HashMap（開発環境用、再起動で消える）
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("未知のSTORE_BACKENDです: {other}"),
        }
    }
}

/// Brokerの起動設定。
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// 待ち受けアドレス
    pub bind_addr: String,
    /// DynamoDBテーブル名
    pub file_table_name: String,
    /// DynamoDBのエンドポイント上書き（DynamoDB Local等）
    pub dynamodb_endpoint: Option<String>,
    /// メタデータストアのバックエンド
    pub store_backend: StoreBackend,
    /// 署名付きURLの発行先バケット
    pub s3: S3Settings,
    /// 署名付きURLの有効期限
    pub presign_expiry: Duration,
    /// ストア・署名呼び出しのタイムアウト
    pub call_timeout: Duration,
    /// `key=owner,...` 形式のAPIキー表。Noneの場合は開発用テーブル。
    pub api_keys: Option<String>,
}

/// 環境変数を読み取る関数の型。テストでは固定のマップを渡す。
type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_or(lookup: EnvLookup<'_>, name: &str, default: &str) -> String {
    lookup(name).unwrap_or_else(|| default.to_string())
}

fn env_secs(lookup: EnvLookup<'_>, name: &str, default: Duration) -> anyhow::Result<Duration> {
    match lookup(name) {
        Some(value) => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("{name}は秒数（整数）である必要があります: {value}"))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}

impl BrokerConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: EnvLookup<'_>) -> anyhow::Result<Self> {
        let region = env_or(lookup, "AWS_REGION", "us-east-1");

        let store_backend: StoreBackend = env_or(lookup, "STORE_BACKEND", "dynamodb").parse()?;

        let presign_expiry = env_secs(lookup, "PRESIGN_EXPIRY_SECS", DEFAULT_PRESIGN_EXPIRY)?;
        validity_secs(presign_expiry).context("PRESIGN_EXPIRY_SECSが不正です")?;

        let call_timeout = env_secs(lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT)?;
        if call_timeout.is_zero() {
            anyhow::bail!("REQUEST_TIMEOUT_SECSは1以上である必要があります");
        }

        Ok(Self {
            bind_addr: env_or(lookup, "BIND_ADDR", "0.0.0.0:3000"),
            file_table_name: env_or(lookup, "FILE_TABLE_NAME", "Files"),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT"),
            store_backend,
            s3: S3Settings {
                bucket: env_or(lookup, "S3_BUCKET", "parcel-uploads"),
                region,
                endpoint: lookup("S3_ENDPOINT"),
                access_key: lookup("S3_ACCESS_KEY"),
                secret_key: lookup("S3_SECRET_KEY"),
            },
            presign_expiry,
            call_timeout,
            api_keys: lookup("API_KEYS"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<BrokerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BrokerConfig::from_lookup(&|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.file_table_name, "Files");
        assert_eq!(config.store_backend, StoreBackend::DynamoDb);
        assert_eq!(config.s3.region, "us-east-1");
        assert_eq!(config.s3.bucket, "parcel-uploads");
        assert!(config.s3.endpoint.is_none());
        assert_eq!(config.presign_expiry, Duration::from_secs(300));
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert!(config.api_keys.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("FILE_TABLE_NAME", "Uploads"),
            ("AWS_REGION", "ap-northeast-1"),
            ("S3_BUCKET", "magic-uploader-files"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("STORE_BACKEND", "Memory"),
            ("PRESIGN_EXPIRY_SECS", "900"),
            ("REQUEST_TIMEOUT_SECS", " 3 "),
            ("API_KEYS", "k=alice"),
        ])
        .unwrap();
        assert_eq!(config.file_table_name, "Uploads");
        assert_eq!(config.s3.region, "ap-northeast-1");
        assert_eq!(config.s3.bucket, "magic-uploader-files");
        assert_eq!(config.s3.endpoint.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.presign_expiry, Duration::from_secs(900));
        assert_eq!(config.call_timeout, Duration::from_secs(3));
        assert_eq!(config.api_keys.as_deref(), Some("k=alice"));
    }

    #[test]
    fn test_invalid_values_fail_startup() {
        assert!(config_from(&[("PRESIGN_EXPIRY_SECS", "five")]).is_err());
        assert!(config_from(&[("PRESIGN_EXPIRY_SECS", "0")]).is_err());
        assert!(config_from(&[("PRESIGN_EXPIRY_SECS", "604801")]).is_err());
        assert!(config_from(&[("REQUEST_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("STORE_BACKEND", "postgres")]).is_err());
    }
}
