//! # Capability Issuer
//!
//! 単一オブジェクト・単一メソッドに限定された、有効期限付きの
//! 署名付きURLを発行する抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。

pub mod s3;

pub use self::s3::S3CapabilityIssuer;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 署名付きURLが許可する操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessVerb {
    /// オブジェクトの取得（GET）
    Read,
    /// オブジェクトの書き込み（PUT）
    Write,
}

impl AccessVerb {
    /// 対応するHTTPメソッド名。
    pub fn method(self) -> &'static str {
        match self {
            AccessVerb::Read => "GET",
            AccessVerb::Write => "PUT",
        }
    }
}

impl fmt::Display for AccessVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

impl FromStr for AccessVerb {
    type Err = SigningError;

    /// HTTPメソッド名から変換する。GET/PUT以外は黙って既定値にせずエラーとする。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(AccessVerb::Read),
            "PUT" => Ok(AccessVerb::Write),
            other => Err(SigningError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// 署名付きURL生成のエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("method {0} not supported")]
    UnsupportedMethod(String),
    #[error("有効期限が範囲外です: {0}秒")]
    InvalidValidity(u64),
    #[error("署名用の認証情報を取得できません: {0}")]
    Credentials(String),
    #[error("署名付きURL生成に失敗: {0}")]
    Presign(String),
}

/// 署名付きURLの有効期限の上限（S3の署名付きURLは最長7日）。
pub const MAX_VALIDITY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// 署名付きURL発行の抽象インターフェース。
///
/// 実装は可変状態を持たず、並行に呼び出してよい。
#[async_trait::async_trait]
pub trait CapabilityIssuer: Send + Sync {
    /// `storage_key` に対して `verb` のみを `validity` の間許可するURLを発行する。
    async fn issue(
        &self,
        storage_key: &str,
        verb: AccessVerb,
        validity: Duration,
    ) -> Result<String, SigningError>;
}

/// 有効期限を署名用の秒数に変換する。0秒と上限超過は拒否する。
pub fn validity_secs(validity: Duration) -> Result<u32, SigningError> {
    let secs = validity.as_secs();
    if secs == 0 || validity > MAX_VALIDITY {
        return Err(SigningError::InvalidValidity(secs));
    }
    Ok(secs as u32)
}
