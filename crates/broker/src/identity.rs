//! # Identity Resolver
//!
//! APIキー（不透明なベアラ文字列）をオーナー名前空間に解決する。
//!
//! 現在の実装は起動時に一度だけ読み込む静的テーブル。
//! セッションストア等の本格的な認証基盤は `IdentityResolver` トレイトの
//! 別実装として差し替える。

use std::collections::HashMap;

/// 認証失敗。
/// 形式不正のキーと未登録のキーを区別しない（キーの列挙対策）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unauthorized")]
pub struct Unauthorized;

/// 認証情報をオーナー名前空間に解決するトレイト。
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `credential` に対応するオーナー名前空間を返す。
    async fn resolve(&self, credential: &str) -> Result<String, Unauthorized>;
}

/// APIキー → オーナー名前空間 の静的テーブル。
///
/// 起動後は不変のため、読み取りにロックは不要。
#[derive(Debug, Clone, Default)]
pub struct StaticKeyTable {
    keys: HashMap<String, String>,
}

/// 開発環境用のAPIキー。`API_KEYS` 未設定時に使用する。
const DEV_KEYS: &[(&str, &str)] = &[
    ("c16f3b18-e43f-4216-b66e-62a26df8c683", "useridpaul"),
    ("88954e19-c9ef-4350-bca5-bc896885f249", "useriduploader"),
];

impl StaticKeyTable {
    /// (APIキー, オーナー名前空間) の組からテーブルを構築する。
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            keys: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 開発環境用テーブル。
    pub fn dev_default() -> Self {
        Self::new(DEV_KEYS.iter().copied())
    }

    /// `key=owner,key2=owner2` 形式の文字列からテーブルを構築する。
    ///
    /// 空のエントリは無視する。キーの重複、空のキー・オーナー、
    /// `/` を含むオーナーは設定エラーとする。
    pub fn parse(spec: &str) -> anyhow::Result<Self> {
        let mut keys = HashMap::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, owner) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("API_KEYSのエントリが key=owner 形式ではありません"))?;
            let (key, owner) = (key.trim(), owner.trim());
            if key.is_empty() || owner.is_empty() {
                anyhow::bail!("API_KEYSに空のキーまたはオーナーが含まれています");
            }
            if owner.contains('/') || owner == "." || owner == ".." {
                anyhow::bail!("オーナー名前空間に使用できない値です: {owner}");
            }
            if keys.insert(key.to_string(), owner.to_string()).is_some() {
                anyhow::bail!("API_KEYSに重複したキーがあります");
            }
        }
        Ok(Self { keys })
    }

    /// 登録されているキーの数。
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait::async_trait]
impl IdentityResolver for StaticKeyTable {
    async fn resolve(&self, credential: &str) -> Result<String, Unauthorized> {
        self.keys.get(credential).cloned().ok_or(Unauthorized)
    }
}
