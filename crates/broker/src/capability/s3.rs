//! # S3互換 Capability Issuer 実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIに対する
//! 署名付きGET/PUT URLを発行する。署名はローカルで計算するため、
//! 発行自体はストレージへの通信を伴わない。
//!
//! 認証情報は設定の固定キー、またはAWSの標準プロバイダチェーン
//! （環境変数、プロファイル、Web Identity、ECS/EC2ロール）から取得する。
//! プロバイダから得た一時認証情報はキャッシュし、発行するURLの
//! 有効期限より先に失効する場合は発行前に取り直す。

use std::time::{Duration, SystemTime};

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use tokio::sync::Mutex;

use super::{validity_secs, AccessVerb, CapabilityIssuer, SigningError};

/// S3互換バケットへの署名付きURL発行。
pub struct S3CapabilityIssuer {
    bucket_name: String,
    region: s3::Region,
    path_style: bool,
    credentials: CredentialSource,
}

enum CredentialSource {
    /// 設定で与えられた固定キー。起動時に構築したバケットを使い回す。
    Static(Box<s3::Bucket>),
    /// AWS標準プロバイダチェーン
    Provider {
        provider: SharedCredentialsProvider,
        cached: Mutex<Option<aws_credential_types::Credentials>>,
    },
}

/// バケット接続設定。
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    /// バケット名
    pub bucket: String,
    /// リージョン（例: "us-east-1"）
    pub region: String,
    /// S3互換エンドポイント。Noneの場合はAWSのリージョンエンドポイント。
    pub endpoint: Option<String>,
    /// 明示的なアクセスキー。両方Noneの場合はAWSの標準プロバイダチェーンを使用する。
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl S3CapabilityIssuer {
    /// 設定からバケットを初期化する。
    ///
    /// `S3_ACCESS_KEY`/`S3_SECRET_KEY` が揃っていればそれを使い、
    /// なければ `provider`（通常は `aws_config` が読み込んだチェーン）を使う。
    /// カスタムエンドポイント指定時はパス形式（`{endpoint}/{bucket}/{key}`）を使用する。
    pub fn from_settings(
        settings: &S3Settings,
        provider: Option<SharedCredentialsProvider>,
    ) -> anyhow::Result<Self> {
        let region = match &settings.endpoint {
            Some(endpoint) => s3::Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => settings.region.parse::<s3::Region>()?,
        };

        let path_style = settings.endpoint.is_some();

        let credentials = match (&settings.access_key, &settings.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = s3::creds::Credentials::new(
                    Some(access_key.as_str()),
                    Some(secret_key.as_str()),
                    None,
                    None,
                    None,
                )?;
                CredentialSource::Static(open_bucket(
                    &settings.bucket,
                    &region,
                    path_style,
                    credentials,
                )?)
            }
            _ => {
                let provider = provider.ok_or_else(|| {
                    anyhow::anyhow!(
                        "S3_ACCESS_KEY/S3_SECRET_KEYが未設定で、AWSの認証情報プロバイダもありません"
                    )
                })?;
                CredentialSource::Provider {
                    provider,
                    cached: Mutex::new(None),
                }
            }
        };

        Ok(Self {
            bucket_name: settings.bucket.clone(),
            region,
            path_style,
            credentials,
        })
    }

    /// 署名に使うバケットを返す。プロバイダ利用時は `validity` の間失効しない認証情報を使う。
    async fn signing_bucket(&self, validity: Duration) -> Result<Box<s3::Bucket>, SigningError> {
        let (provider, cached) = match &self.credentials {
            CredentialSource::Static(bucket) => return Ok(bucket.clone()),
            CredentialSource::Provider { provider, cached } => (provider, cached),
        };

        let mut cached = cached.lock().await;
        let still_valid = |credentials: &aws_credential_types::Credentials| {
            credentials
                .expiry()
                .map_or(true, |expiry| expiry > SystemTime::now() + validity)
        };

        let current = match cached.as_ref().filter(|c| still_valid(*c)) {
            Some(credentials) => credentials.clone(),
            None => {
                let fresh = provider
                    .provide_credentials()
                    .await
                    .map_err(|e| SigningError::Credentials(e.to_string()))?;
                tracing::debug!(expiry = ?fresh.expiry(), "署名用の認証情報を更新しました");
                *cached = Some(fresh.clone());
                fresh
            }
        };
        drop(cached);

        let credentials = s3::creds::Credentials::new(
            Some(current.access_key_id()),
            Some(current.secret_access_key()),
            current.session_token(),
            None,
            None,
        )
        .map_err(|e| SigningError::Credentials(e.to_string()))?;

        open_bucket(&self.bucket_name, &self.region, self.path_style, credentials)
    }
}

fn open_bucket(
    name: &str,
    region: &s3::Region,
    path_style: bool,
    credentials: s3::creds::Credentials,
) -> Result<Box<s3::Bucket>, SigningError> {
    let bucket = s3::Bucket::new(name, region.clone(), credentials)
        .map_err(|e| SigningError::Presign(format!("バケットの初期化に失敗: {e}")))?;
    Ok(if path_style {
        bucket.with_path_style()
    } else {
        bucket
    })
}

#[async_trait::async_trait]
impl CapabilityIssuer for S3CapabilityIssuer {
    async fn issue(
        &self,
        storage_key: &str,
        verb: AccessVerb,
        validity: Duration,
    ) -> Result<String, SigningError> {
        let expiry_secs = validity_secs(validity)?;
        let bucket = self.signing_bucket(validity).await?;

        let url = match verb {
            AccessVerb::Read => bucket.presign_get(storage_key, expiry_secs, None).await,
            AccessVerb::Write => bucket.presign_put(storage_key, expiry_secs, None, None).await,
        }
        .map_err(|e| SigningError::Presign(format!("{verb} {storage_key}: {e}")))?;

        Ok(url)
    }
}
