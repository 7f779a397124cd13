//! エラー型の定義
//!
//! 構築時の設定エラー、画像デコードエラー、推論エラーを区別して呼び出し側に返します。

use std::path::PathBuf;
use thiserror::Error;

/// 推論エンジン構築時のエラー
///
/// いずれもエンジンを `Ready` にしない致命的なエラーです。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Model output width ({actual}) does not match the number of class labels ({expected})")]
    ModelLabelMismatch { expected: usize, actual: usize },

    #[error("Model input shape {actual:?} does not match the expected shape {expected:?}")]
    InputShapeMismatch {
        expected: [usize; 4],
        actual: Vec<usize>,
    },

    #[error("Model does not declare a concrete output width")]
    UndeclaredOutputWidth,

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model bundle error: {0}")]
    Bundle(String),

    #[error("Label table is empty")]
    EmptyLabelTable,

    #[error("Settings error: {0}")]
    Settings(String),
}

/// 入力画像のデコードエラー
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to read image {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 推論実行時のエラー
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference failed: {0}")]
    Backend(String),

    #[error("Unexpected output length: expected {expected}, got {actual}")]
    OutputShape { expected: usize, actual: usize },

    #[error("Inference engine lock was poisoned")]
    Poisoned,

    #[error("Inference task failed: {0}")]
    Join(String),
}

/// デコードから推論までを通した分類エラー
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_both_widths() {
        let err = ConfigError::ModelLabelMismatch {
            expected: 46,
            actual: 45,
        };
        let message = err.to_string();
        assert!(message.contains("45"));
        assert!(message.contains("46"));
    }

    #[test]
    fn test_classify_error_is_transparent() {
        let err: ClassifyError = InferenceError::Backend("boom".to_string()).into();
        assert_eq!(err.to_string(), "Inference failed: boom");
        assert!(matches!(err, ClassifyError::Inference(_)));
    }
}
