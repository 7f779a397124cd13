//! モデル推論機能

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ClassifyError, ConfigError, InferenceError};
use crate::ml::backend::{ClassifierModel, ModelSource};
use crate::ml::labels::LabelTable;
use crate::ml::preprocess::{
    decode_image_bytes, decode_image_file, preprocess_image, RawImage, INPUT_SHAPE,
};
use crate::ml::tflite::TfliteModel;

/// 1回の推論結果
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// 予測ラベル（範囲外の場合は "Unknown"）
    pub label: String,
    /// 最大スコアのインデックス
    pub index: Option<usize>,
    /// 最大スコア
    pub score: Option<f32>,
    /// 全クラスのスコア（正規化されているとは限らない）
    pub scores: Vec<f32>,
}

/// 推論エンジン
///
/// 構築に成功した時点で `Ready` であり、以降状態は変化しません。
/// 構築時の検証に失敗した場合はエンジン自体が返されません。
pub struct InferenceEngine<M: ClassifierModel = TfliteModel> {
    model: M,
    labels: LabelTable,
    log_scores: bool,
}

impl InferenceEngine<TfliteModel> {
    /// モデルを読み込んで推論エンジンを初期化
    pub fn new(source: &ModelSource, labels: LabelTable) -> Result<Self, ConfigError> {
        let model = TfliteModel::load(source)?;
        Self::with_model(model, labels)
    }

    /// `.tflite` ファイルまたはバンドルのパスから初期化
    pub fn load<P: AsRef<Path>>(model_path: P, labels: LabelTable) -> Result<Self, ConfigError> {
        Self::new(&ModelSource::from_path(model_path.as_ref()), labels)
    }
}

impl<M: ClassifierModel> InferenceEngine<M> {
    /// 読み込み済みモデルとラベル表から初期化
    ///
    /// モデルの出力幅とラベル数が一致しない場合は
    /// [`ConfigError::ModelLabelMismatch`] で失敗します。
    pub fn with_model(model: M, labels: LabelTable) -> Result<Self, ConfigError> {
        if let Some(shape) = model.input_shape() {
            if shape != INPUT_SHAPE {
                return Err(ConfigError::InputShapeMismatch {
                    expected: INPUT_SHAPE,
                    actual: shape,
                });
            }
        }

        let actual = model.output_width();
        if actual != labels.len() {
            return Err(ConfigError::ModelLabelMismatch {
                expected: labels.len(),
                actual,
            });
        }

        info!("Inference engine ready: {} classes", labels.len());

        Ok(Self {
            model,
            labels,
            log_scores: false,
        })
    }

    /// 全クラスのスコアを debug ログに出力するかどうか
    pub fn with_score_logging(mut self, enabled: bool) -> Self {
        self.log_scores = enabled;
        self
    }

    /// 単一画像を分類してラベルを返す
    pub fn classify(&mut self, image: &RawImage) -> Result<String, InferenceError> {
        Ok(self.predict(image)?.label)
    }

    /// 単一画像を分類して詳細な結果を返す
    pub fn predict(&mut self, image: &RawImage) -> Result<Prediction, InferenceError> {
        let input = preprocess_image(image);
        let scores = self.model.run(&input)?;

        if self.log_scores {
            self.log_output_scores(&scores);
        }

        let index = argmax(&scores);
        let label = self.labels.resolve(index);
        if index.map_or(true, |i| i >= self.labels.len()) {
            warn!(
                "Resolved index {:?} is outside the label table ({} labels)",
                index,
                self.labels.len()
            );
        }

        Ok(Prediction {
            label: label.to_string(),
            index,
            score: index.and_then(|i| scores.get(i).copied()),
            scores,
        })
    }

    /// 画像ファイルを読み込んで分類
    pub fn classify_path<P: AsRef<Path>>(&mut self, image_path: P) -> Result<String, ClassifyError> {
        let image = decode_image_file(image_path)?;
        Ok(self.classify(&image)?)
    }

    /// エンコード済み画像（PNG/JPEG など）を分類
    pub fn classify_bytes(&mut self, bytes: &[u8]) -> Result<String, ClassifyError> {
        let image = decode_image_bytes(bytes)?;
        Ok(self.classify(&image)?)
    }

    /// 複数画像をバッチ分類
    pub fn classify_batch(&mut self, images: &[RawImage]) -> Result<Vec<String>, InferenceError> {
        images.iter().map(|image| self.classify(image)).collect()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn log_output_scores(&self, scores: &[f32]) {
        debug!("Model output:");
        for (index, confidence) in scores.iter().enumerate() {
            debug!(
                "Class {}: {} -> {}",
                index + 1,
                self.labels.resolve(Some(index)),
                confidence
            );
        }
    }
}

/// 最大値のインデックス
///
/// 同値の場合は最初に現れたものを返します。NaN は無視し、
/// 有効な値が無い場合は `None` を返します。
/// NaN を他のどの値よりも大きいとみなす全順序の比較とは異なり、
/// NaN のスコアを持つクラスが選ばれることはありません。
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in scores.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, max)) if value <= max => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}
