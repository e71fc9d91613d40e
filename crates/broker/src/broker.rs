//! # Upload Broker
//!
//! Identity Resolver・Identifier Deriver・Metadata Store・Capability Issuer を
//! 組み合わせ、ダウンロード開始とアップロード開始の2つのフローを実装する。
//!
//! ## ダウンロード
//! 認証 → レコード取得 → 読み取り用URL発行
//!
//! ## アップロード
//! 認証 → 入力検証 → 識別子導出 → レコード書き込み → 書き込み用URL発行
//!
//! リクエスト間で共有する可変状態は持たない。ストア呼び出しと署名呼び出しは
//! それぞれ `call_timeout` で打ち切る。リトライは行わず、呼び出し側に委ねる。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parcel_types::{DownloadQuery, UploadRequest, UploadResponse};

use crate::capability::{AccessVerb, CapabilityIssuer, SigningError};
use crate::error::BrokerError;
use crate::identity::IdentityResolver;
use crate::locator::{derive_location, InvalidPath};
use crate::store::{FileRecord, FileStore, StoreError};

/// 署名付きURLの既定の有効期限（5分）。
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(300);
/// ストア・署名呼び出しの既定のタイムアウト。
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// ダウンロード・アップロードの調停役。
pub struct UploadBroker {
    identity: Arc<dyn IdentityResolver>,
    store: Arc<dyn FileStore>,
    issuer: Arc<dyn CapabilityIssuer>,
    presign_expiry: Duration,
    call_timeout: Duration,
}

impl UploadBroker {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        store: Arc<dyn FileStore>,
        issuer: Arc<dyn CapabilityIssuer>,
    ) -> Self {
        Self {
            identity,
            store,
            issuer,
            presign_expiry: DEFAULT_PRESIGN_EXPIRY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// 署名付きURLの有効期限を設定する。
    pub fn with_presign_expiry(mut self, presign_expiry: Duration) -> Self {
        self.presign_expiry = presign_expiry;
        self
    }

    /// ストア・署名呼び出しのタイムアウトを設定する。
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    async fn authenticate(&self, api_key: &str) -> Result<String, BrokerError> {
        self.identity
            .resolve(api_key)
            .await
            .map_err(|_| BrokerError::Unauthorized)
    }

    /// ストア呼び出しをタイムアウト付きで実行する。
    async fn store_call<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<Result<T, StoreError>, BrokerError> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| {
                BrokerError::Store(format!("タイムアウト ({}ms)", self.call_timeout.as_millis()))
            })
    }

    /// 署名付きURLをタイムアウト付きで発行する。
    async fn issue(&self, storage_key: &str, verb: AccessVerb) -> Result<String, BrokerError> {
        let issued = tokio::time::timeout(
            self.call_timeout,
            self.issuer.issue(storage_key, verb, self.presign_expiry),
        )
        .await
        .map_err(|_| {
            BrokerError::Signing(format!("タイムアウト ({}ms)", self.call_timeout.as_millis()))
        })?;

        issued.map_err(|e: SigningError| BrokerError::Signing(e.to_string()))
    }

    /// ダウンロード開始。読み取り用の署名付きURLを返す。
    pub async fn begin_download(&self, query: &DownloadQuery) -> Result<String, BrokerError> {
        let api_key = query
            .api_key
            .as_deref()
            .ok_or_else(|| BrokerError::BadRequest("api_key parameter missing".to_string()))?;
        let owner = self.authenticate(api_key).await?;

        let id = query
            .id
            .as_deref()
            .ok_or_else(|| BrokerError::BadRequest("id parameter missing".to_string()))?;

        let record = match self.store_call(self.store.get(id)).await? {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Err(BrokerError::NotFound(id.to_string())),
            Err(e) => return Err(BrokerError::Store(e.to_string())),
        };

        let url = self.issue(&record.storage_key, AccessVerb::Read).await?;

        tracing::info!(
            %owner,
            id = %record.id,
            storage_key = %record.storage_key,
            "ダウンロードURLを発行"
        );
        Ok(url)
    }

    /// アップロード開始。レコードを書き込み、書き込み用の署名付きURLを返す。
    ///
    /// 同じオーナー＋パスへの再アップロードは同じ識別子となり、
    /// 既存レコードを上書きする。
    pub async fn begin_upload(&self, request: &UploadRequest) -> Result<UploadResponse, BrokerError> {
        let owner = self.authenticate(&request.api_key).await?;

        let location = derive_location(&owner, &request.filepath).map_err(|e| match e {
            InvalidPath::InvalidOwner => {
                BrokerError::Internal(format!("オーナー名前空間が不正です: {owner}"))
            }
            e => BrokerError::BadRequest(e.to_string()),
        })?;

        let record = FileRecord {
            id: location.id,
            created_at: Utc::now(),
            name: location.display_name,
            storage_key: location.storage_key,
        };

        self.store_call(self.store.put(&record))
            .await?
            .map_err(|e| BrokerError::Store(e.to_string()))?;

        let upload_url = self.issue(&record.storage_key, AccessVerb::Write).await?;

        tracing::info!(
            %owner,
            id = %record.id,
            storage_key = %record.storage_key,
            "アップロードURLを発行"
        );
        Ok(UploadResponse {
            upload_url,
            id: record.id,
        })
    }
}
