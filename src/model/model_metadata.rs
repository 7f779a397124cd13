//! モデルメタデータの定義
//!
//! モデルバンドル（tar.gz）に同梱され、クラスラベルと入力条件を記録します。
//!
//! ## 入力条件
//! - 入力: (1, 224, 224, 3) の f32、チャネル順 R, G, B
//! - 正規化: `(v - mean) / std`（mean = std = 127.5）
//! - 出力: (1, N)、N はラベル数と一致

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ml::labels::LabelTable;
use crate::ml::preprocess::{INPUT_SIZE, NORMALIZE_MEAN, NORMALIZE_STD};

/// モデルメタデータ
///
/// tar.gz形式で保存される情報：
/// - metadata.json: このメタデータ（JSON形式）
/// - model.tflite: 変換済みモデル（TFLite フラットバッファ）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    /// 出力インデックス順のクラスラベル
    pub labels: Vec<String>,

    /// モデル入力サイズ（正方形、通常224）
    pub input_size: u32,

    /// 正規化の平均値
    #[serde(default = "default_mean")]
    pub normalize_mean: f32,

    /// 正規化の標準偏差
    #[serde(default = "default_std")]
    pub normalize_std: f32,

    /// モデルの説明
    #[serde(default)]
    pub description: String,

    /// バンドル作成時刻（ISO8601形式）
    pub exported_at: String,
}

fn default_mean() -> f32 {
    NORMALIZE_MEAN
}

fn default_std() -> f32 {
    NORMALIZE_STD
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(labels: Vec<String>, description: impl Into<String>) -> Self {
        Self {
            labels,
            input_size: INPUT_SIZE,
            normalize_mean: NORMALIZE_MEAN,
            normalize_std: NORMALIZE_STD,
            description: description.into(),
            exported_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// 組み込みの眼底画像ラベル表でメタデータを作成
    pub fn fundus(description: impl Into<String>) -> Self {
        Self::new(LabelTable::fundus().labels().to_vec(), description)
    }

    /// このエンジンの前処理と入力条件が一致するか確認
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size != INPUT_SIZE {
            return Err(ConfigError::Bundle(format!(
                "unsupported input size {} (expected {})",
                self.input_size, INPUT_SIZE
            )));
        }
        if self.normalize_mean != NORMALIZE_MEAN || self.normalize_std != NORMALIZE_STD {
            return Err(ConfigError::Bundle(format!(
                "unsupported normalization mean={} std={} (expected {} / {})",
                self.normalize_mean, self.normalize_std, NORMALIZE_MEAN, NORMALIZE_STD
            )));
        }
        Ok(())
    }

    /// ラベル表を作成
    pub fn label_table(&self) -> Result<LabelTable, ConfigError> {
        self.validate()?;
        LabelTable::new(self.labels.iter().cloned())
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip_keeps_labels() {
        let metadata = ModelMetadata::fundus("fundus v1");
        let json = metadata.to_json_string().unwrap();
        let restored = ModelMetadata::from_json_string(&json).unwrap();
        assert_eq!(restored, metadata);
        assert_eq!(restored.label_table().unwrap().len(), 46);
    }

    #[test]
    fn test_missing_normalization_uses_defaults() {
        let json = r#"{"labels": ["Drusen", "Myopia"], "input_size": 224, "exported_at": "2024-01-01T00:00:00+00:00"}"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.normalize_mean, 127.5);
        assert_eq!(metadata.normalize_std, 127.5);
        assert_eq!(metadata.label_table().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_other_input_size() {
        let mut metadata = ModelMetadata::fundus("");
        metadata.input_size = 299;
        assert!(matches!(metadata.label_table(), Err(ConfigError::Bundle(_))));
    }

    #[test]
    fn test_rejects_other_normalization() {
        let mut metadata = ModelMetadata::fundus("");
        metadata.normalize_std = 255.0;
        assert!(metadata.validate().is_err());
    }
}
