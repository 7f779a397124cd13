//! アプリケーション設定管理モジュール
//!
//! モデルファイルやラベルファイルの場所、ログ設定をJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ConfigError;

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    /// 使用するモデルファイルのパス（`.tflite` または `.tar.gz` バンドル）
    pub model_path: String,
    /// ラベルファイルのパス（1行1ラベル）。未指定ならバンドルまたは組み込みの表を使う
    #[serde(default)]
    pub labels_path: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "models/fundus_classifier.tflite".to_string(),
            labels_path: None,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// モデル設定
    pub model: ModelSettings,
    /// 推論ごとに全クラスのスコアを debug ログに出す
    #[serde(default)]
    pub log_scores: bool,
    /// ログフィルタ（`RUST_LOG` が優先）
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            log_scores: false,
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Settings(e.to_string()))
    }

    /// 設定を読み込む、存在しないか読めない場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Settings file {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Failed to load settings from {} ({}), using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Settings(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// モデルパスを設定
    pub fn set_model_path(&mut self, path: String) {
        self.model.model_path = path;
    }

    /// ラベルファイルのパスを設定
    pub fn set_labels_path(&mut self, path: Option<String>) {
        self.model.labels_path = path;
    }
}
