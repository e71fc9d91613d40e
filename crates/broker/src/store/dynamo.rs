//! # DynamoDB FileStore
//!
//! 1レコード = 1アイテム。パーティションキーは `id`。
//!
//! | 属性     | 型 | 内容                 |
//! |----------|----|----------------------|
//! | `id`     | S  | 外部識別子           |
//! | `name`   | S  | 表示名               |
//! | `s3path` | S  | オブジェクトキー     |
//! | `date`   | S  | 作成時刻（RFC 3339） |

use std::collections::HashMap;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};

use super::{FileRecord, FileStore, StoreError};

const ATTR_ID: &str = "id";
const ATTR_NAME: &str = "name";
const ATTR_STORAGE_KEY: &str = "s3path";
const ATTR_DATE: &str = "date";

/// DynamoDBテーブルによるFileStore実装。
pub struct DynamoFileStore {
    client: Client,
    table_name: String,
}

impl DynamoFileStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// 読み込み済みのAWS設定と任意のエンドポイント（DynamoDB Local等）からクライアントを構築する。
    /// 認証情報は `aws_config` の標準プロバイダチェーンから取得する。
    pub fn connect(
        sdk_config: &aws_config::SdkConfig,
        endpoint_url: Option<&str>,
        table_name: &str,
    ) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(endpoint_url) = endpoint_url {
            tracing::info!(dynamodb_endpoint = %endpoint_url, "DynamoDBエンドポイントを上書き");
            builder = builder.endpoint_url(endpoint_url);
        }

        Self::new(Client::from_conf(builder.build()), table_name)
    }
}

/// FileRecordをDynamoDBアイテムに変換する。
fn record_to_item(record: &FileRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (ATTR_ID.to_string(), AttributeValue::S(record.id.clone())),
        (ATTR_NAME.to_string(), AttributeValue::S(record.name.clone())),
        (
            ATTR_STORAGE_KEY.to_string(),
            AttributeValue::S(record.storage_key.clone()),
        ),
        (
            ATTR_DATE.to_string(),
            AttributeValue::S(record.created_at.to_rfc3339()),
        ),
    ])
}

fn string_attr<'a>(
    item: &'a HashMap<String, AttributeValue>,
    name: &str,
) -> Result<&'a str, StoreError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| StoreError::Backend(format!("属性 {name} が存在しないか文字列ではありません")))
}

/// DynamoDBアイテムをFileRecordに変換する。
fn item_to_record(item: &HashMap<String, AttributeValue>) -> Result<FileRecord, StoreError> {
    let date = string_attr(item, ATTR_DATE)?;
    let created_at = DateTime::parse_from_rfc3339(date)
        .map_err(|e| StoreError::Backend(format!("date属性のパースに失敗 ({date}): {e}")))?
        .with_timezone(&Utc);

    Ok(FileRecord {
        id: string_attr(item, ATTR_ID)?.to_string(),
        created_at,
        name: string_attr(item, ATTR_NAME)?.to_string(),
        storage_key: string_attr(item, ATTR_STORAGE_KEY)?.to_string(),
    })
}

#[async_trait::async_trait]
impl FileStore for DynamoFileStore {
    async fn get(&self, id: &str) -> Result<FileRecord, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_ID, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;

        match result.item() {
            Some(item) => item_to_record(item),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn put(&self, record: &FileRecord) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record_to_item(record)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> FileRecord {
        FileRecord {
            id: "e2763091577a144431e744dbf1643799".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap(),
            name: "thegathering.txt".to_string(),
            storage_key: "useridpaul/magic/thegathering.txt".to_string(),
        }
    }

    #[test]
    fn test_item_layout() {
        let item = record_to_item(&sample());
        assert_eq!(item.len(), 4);
        assert_eq!(
            item.get("s3path"),
            Some(&AttributeValue::S("useridpaul/magic/thegathering.txt".to_string()))
        );
        assert_eq!(
            item.get("date"),
            Some(&AttributeValue::S("2024-05-01T12:30:15+00:00".to_string()))
        );
    }

    #[test]
    fn test_item_conversion_preserves_record() {
        let record = FileRecord {
            created_at: Utc.timestamp_opt(1_714_566_615, 123_456_789).unwrap(),
            ..sample()
        };
        assert_eq!(item_to_record(&record_to_item(&record)).unwrap(), record);
    }

    /// 他のタイムゾーン表記で保存された日時も読めることを確認
    #[test]
    fn test_reads_offset_dates() {
        let mut item = record_to_item(&sample());
        item.insert(
            "date".to_string(),
            AttributeValue::S("2024-05-01T21:30:15+09:00".to_string()),
        );
        assert_eq!(item_to_record(&item).unwrap(), sample());
    }

    #[test]
    fn test_malformed_items_are_backend_errors() {
        let mut missing = record_to_item(&sample());
        missing.remove("s3path");
        assert!(matches!(item_to_record(&missing), Err(StoreError::Backend(_))));

        let mut wrong_type = record_to_item(&sample());
        wrong_type.insert("name".to_string(), AttributeValue::N("1".to_string()));
        assert!(matches!(item_to_record(&wrong_type), Err(StoreError::Backend(_))));

        let mut bad_date = record_to_item(&sample());
        bad_date.insert("date".to_string(), AttributeValue::S("yesterday".to_string()));
        assert!(matches!(item_to_record(&bad_date), Err(StoreError::Backend(_))));
    }
}
