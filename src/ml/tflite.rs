//! TFLite モデルバックエンド
//!
//! `tract` で TFLite のフラットバッファを読み込み、最適化済みの実行プランとして保持します。

use std::fs::File;

use memmap2::Mmap;
use tract_core::prelude::*;
use tract_tflite::tflite;
use tracing::{debug, info};

use crate::error::{ConfigError, InferenceError};
use crate::ml::backend::{ClassifierModel, ModelSource};
use crate::ml::preprocess::InputTensor;
use crate::model::load_model_binary;

type RunnablePlan = TypedRunnableModel<TypedModel>;

/// tract で実行する TFLite 分類モデル
pub struct TfliteModel {
    plan: RunnablePlan,
    input_shape: Option<Vec<usize>>,
    output_width: usize,
}

impl TfliteModel {
    /// 読み込み元からモデルを読み込む
    pub fn load(source: &ModelSource) -> Result<Self, ConfigError> {
        info!("Loading TFLite model from {}", source);
        match source {
            ModelSource::Path(path) => {
                let file = File::open(path)?;
                // SAFETY: 読み取り専用でマップし、読み込み中にファイルを書き換えない前提
                let mmap = unsafe { Mmap::map(&file)? };
                Self::from_bytes(&mmap)
            }
            ModelSource::Bytes(bytes) => Self::from_bytes(bytes),
            ModelSource::Bundle(path) => {
                let binary = load_model_binary(path)
                    .map_err(|e| ConfigError::Bundle(format!("{:#}", e)))?;
                Self::from_bytes(&binary)
            }
        }
    }

    /// フラットバッファのバイト列から読み込む
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let model = tflite()
            .model_for_read(&mut &bytes[..])
            .map_err(model_load_error)?;

        let input_shape = model
            .input_fact(0)
            .map_err(model_load_error)?
            .shape
            .as_concrete()
            .map(|dims| dims.to_vec());

        // 出力形状 (1, N) の N
        let output_width = model
            .output_fact(0)
            .map_err(model_load_error)?
            .shape
            .as_concrete()
            .and_then(|dims| dims.last().copied())
            .ok_or(ConfigError::UndeclaredOutputWidth)?;

        debug!(
            "TFLite model declares input {:?}, output width {}",
            input_shape, output_width
        );

        let plan = model
            .into_optimized()
            .and_then(|m| m.into_runnable())
            .map_err(model_load_error)?;

        Ok(Self {
            plan,
            input_shape,
            output_width,
        })
    }
}

impl ClassifierModel for TfliteModel {
    fn output_width(&self) -> usize {
        self.output_width
    }

    fn input_shape(&self) -> Option<Vec<usize>> {
        self.input_shape.clone()
    }

    fn run(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
        let tensor = Tensor::from_shape(&input.shape(), input.as_slice()).map_err(backend_error)?;
        let outputs = self.plan.run(tvec!(tensor.into())).map_err(backend_error)?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::Backend("model produced no outputs".to_string()))?;
        let scores = output.as_slice::<f32>().map_err(backend_error)?.to_vec();

        if scores.len() != self.output_width {
            return Err(InferenceError::OutputShape {
                expected: self.output_width,
                actual: scores.len(),
            });
        }
        Ok(scores)
    }
}

fn model_load_error(e: TractError) -> ConfigError {
    ConfigError::ModelLoad(format!("{:#}", e))
}

fn backend_error(e: TractError) -> InferenceError {
    InferenceError::Backend(format!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_io_error() {
        let source = ModelSource::Path("/nonexistent/fundus.tflite".into());
        assert!(matches!(TfliteModel::load(&source), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_garbage_bytes_are_model_load_error() {
        let garbage = b"this is definitely not a tflite flatbuffer, just some text".repeat(4);
        assert!(matches!(
            TfliteModel::from_bytes(&garbage),
            Err(ConfigError::ModelLoad(_))
        ));
        assert!(matches!(
            TfliteModel::load(&ModelSource::from_vec(garbage)),
            Err(ConfigError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_empty_bytes_are_model_load_error() {
        assert!(matches!(
            TfliteModel::from_bytes(&[]),
            Err(ConfigError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_garbage_model_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fundus.tflite");
        std::fs::write(&path, b"\x00\x01\x02\x03 broken model").unwrap();
        assert!(matches!(
            TfliteModel::load(&ModelSource::Path(path)),
            Err(ConfigError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_missing_bundle_is_bundle_error() {
        let source = ModelSource::Bundle("/nonexistent/fundus.tar.gz".into());
        assert!(matches!(
            TfliteModel::load(&source),
            Err(ConfigError::Bundle(_))
        ));
    }
}
