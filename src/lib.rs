//! 眼底画像分類ライブラリ
//!
//! 学習済み TFLite モデルで網膜の眼底写真を分類し、予測ラベルを1つ返します。
//! 画像の取得や結果の表示はアプリ側（UIシェル）の責務です。

pub mod error;
pub mod ml;
pub mod model;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use error::{ClassifyError, ConfigError, DecodeError, InferenceError};
pub use ml::{
    ClassifierModel, InferenceEngine, LabelTable, ModelSource, Prediction, RawImage, SharedEngine,
    TfliteModel, UNKNOWN_LABEL,
};
pub use model::AppConfig;

/// ログ出力を初期化（`RUST_LOG` が設定されていればそちらを優先）
///
/// 2回目以降の呼び出しは何もしません。
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 設定から推論エンジンを作成
///
/// ラベル表は、ラベルファイル → バンドルのメタデータ → 組み込みの眼底ラベル表 の順に選びます。
pub fn load_engine_from_config(config: &AppConfig) -> Result<InferenceEngine> {
    let source = ModelSource::from_path(&config.model.model_path);

    // バンドルの入力条件はラベルファイルの有無に関わらず検証する
    let bundle_metadata = match &source {
        ModelSource::Bundle(path) => {
            let metadata = model::load_metadata(path)?;
            metadata.validate().context("Invalid model bundle metadata")?;
            Some(metadata)
        }
        _ => None,
    };

    let labels = match (&config.model.labels_path, bundle_metadata) {
        (Some(path), _) => LabelTable::load(path)
            .with_context(|| format!("Failed to load label file: {}", path))?,
        (None, Some(metadata)) => metadata
            .label_table()
            .context("Invalid model bundle metadata")?,
        (None, None) => LabelTable::fundus(),
    };
    info!("Using {} class labels", labels.len());

    let engine = InferenceEngine::new(&source, labels)
        .with_context(|| format!("Failed to initialize inference engine from {}", source))?;

    Ok(engine.with_score_logging(config.log_scores))
}
