//! # Identifier Deriver
//!
//! オーナー名前空間と相対パスから、ストレージ上のオブジェクトキーと
//! 外部識別子を決定的に導出する。
//!
//! 外部識別子はオブジェクトキーのMD5（16進32桁）。既存レコードの識別子と
//! 互換を保つためにMD5を用いており、改ざん耐性は要求しない。
//! 同じオーナー＋パスは常に同じ識別子になるため、再アップロードは
//! 既存レコードを上書きする。

use md5::{Digest, Md5};

/// パスの導出に失敗した理由。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPath {
    /// 正規化後のパスが空
    #[error("filepath required")]
    Empty,
    /// `..` がオーナー名前空間の外へ出る
    #[error("filepath escapes owner namespace")]
    EscapesNamespace,
    /// オーナー名前空間そのものが不正
    #[error("invalid owner namespace")]
    InvalidOwner,
}

/// 導出結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// 外部識別子（オブジェクトキーのMD5、小文字16進）
    pub id: String,
    /// オブジェクトキー（`{owner}/{cleaned relative path}`）
    pub storage_key: String,
    /// 表示名（相対パスの最終セグメント）
    pub display_name: String,
}

/// 相対パスを正規化したセグメント列を返す。
///
/// 空セグメントと `.` は除去し、`..` は直前のセグメントを取り消す。
/// 取り消すセグメントが無い `..` はエラー。
fn clean_segments(relative_path: &str) -> Result<Vec<&str>, InvalidPath> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in relative_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or(InvalidPath::EscapesNamespace)?;
            }
            s => segments.push(s),
        }
    }
    Ok(segments)
}

/// オブジェクトキーから外部識別子を計算する。
pub fn external_id(storage_key: &str) -> String {
    hex::encode(Md5::digest(storage_key.as_bytes()))
}

/// オーナー名前空間と相対パスから `FileLocation` を導出する。
pub fn derive_location(owner: &str, relative_path: &str) -> Result<FileLocation, InvalidPath> {
    if owner.is_empty() || owner.contains('/') || owner == "." || owner == ".." {
        return Err(InvalidPath::InvalidOwner);
    }

    let segments = clean_segments(relative_path)?;
    let display_name = segments.last().ok_or(InvalidPath::Empty)?.to_string();
    let storage_key = format!("{owner}/{}", segments.join("/"));

    Ok(FileLocation {
        id: external_id(&storage_key),
        storage_key,
        display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_identifier() {
        let loc = derive_location("useridpaul", "magic/thegathering.txt").unwrap();
        assert_eq!(loc.storage_key, "useridpaul/magic/thegathering.txt");
        assert_eq!(loc.id, "e2763091577a144431e744dbf1643799");
        assert_eq!(loc.display_name, "thegathering.txt");
    }

    #[test]
    fn test_derive_is_deterministic() {
        let paths = ["a.txt", "dir/sub/file.bin", "x/../y/z", "日本語/ファイル.txt"];
        for path in paths {
            let first = derive_location("owner", path).unwrap();
            for _ in 0..3 {
                assert_eq!(derive_location("owner", path).unwrap(), first);
            }
            assert_eq!(first.id.len(), 32);
            assert!(first.id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_equivalent_paths_share_identifier() {
        let canonical = derive_location("owner", "a/b.txt").unwrap();
        for path in ["/a/b.txt", "./a//b.txt", "a/./b.txt", "a/c/../b.txt", "a/b.txt/"] {
            assert_eq!(derive_location("owner", path).unwrap(), canonical, "{path}");
        }
    }

    /// 表示名は正規化後のパスの末尾要素
    #[test]
    fn test_display_name_uses_cleaned_path() {
        assert_eq!(derive_location("owner", "a/c/..").unwrap().display_name, "a");
        assert_eq!(derive_location("owner", "a/b.txt/.").unwrap().display_name, "b.txt");
        assert_eq!(derive_location("owner", "dir/").unwrap().display_name, "dir");
    }

    #[test]
    fn test_storage_key_stays_under_owner() {
        for path in ["a", "a/../b", "deep/../../x"] {
            match derive_location("alice", path) {
                Ok(loc) => assert!(loc.storage_key.starts_with("alice/")),
                Err(e) => assert_eq!(e, InvalidPath::EscapesNamespace),
            }
        }
        assert_eq!(
            derive_location("alice", "../bob/secret.txt"),
            Err(InvalidPath::EscapesNamespace)
        );
    }

    #[test]
    fn test_different_owners_do_not_collide() {
        let a = derive_location("alice", "report.pdf").unwrap();
        let b = derive_location("bob", "report.pdf").unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.storage_key, b.storage_key);
    }

    #[test]
    fn test_empty_paths_rejected() {
        for path in ["", "/", ".", "./", "a/..", "//"] {
            assert_eq!(derive_location("owner", path), Err(InvalidPath::Empty), "{path}");
        }
    }

    #[test]
    fn test_invalid_owner_rejected() {
        for owner in ["", "a/b", "..", "."] {
            assert_eq!(derive_location(owner, "f.txt"), Err(InvalidPath::InvalidOwner));
        }
    }
}
