//! 複数の呼び出し元から使う推論エンジン
//!
//! 1つのエンジンへの推論はロックで直列化します。並列に推論したい場合は
//! 呼び出し元ごとに別のエンジン（モデルの複製）を作ってください。

use std::sync::{Arc, Mutex};

use tokio::task;

use crate::error::InferenceError;
use crate::ml::backend::ClassifierModel;
use crate::ml::inference::{InferenceEngine, Prediction};
use crate::ml::preprocess::RawImage;
use crate::ml::tflite::TfliteModel;

/// ロックで保護された共有推論エンジン
pub struct SharedEngine<M: ClassifierModel = TfliteModel> {
    inner: Arc<Mutex<InferenceEngine<M>>>,
}

impl<M: ClassifierModel> Clone for SharedEngine<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ClassifierModel> SharedEngine<M> {
    pub fn new(engine: InferenceEngine<M>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// 現在のスレッドで分類（ロック取得まで待機）
    pub fn classify(&self, image: &RawImage) -> Result<String, InferenceError> {
        let mut engine = self.inner.lock().map_err(|_| InferenceError::Poisoned)?;
        engine.classify(image)
    }

    pub fn predict(&self, image: &RawImage) -> Result<Prediction, InferenceError> {
        let mut engine = self.inner.lock().map_err(|_| InferenceError::Poisoned)?;
        engine.predict(image)
    }
}

impl<M: ClassifierModel + Send + 'static> SharedEngine<M> {
    /// ブロッキング用スレッドで分類（UIスレッドを塞がない）
    pub async fn classify_async(&self, image: RawImage) -> Result<String, InferenceError> {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || {
            let mut engine = inner.lock().map_err(|_| InferenceError::Poisoned)?;
            engine.classify(&image)
        })
        .await
        .map_err(|e| InferenceError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::inference::tests::{three_labels, FakeModel};
    use image::{DynamicImage, RgbImage};

    fn shared(scores: Vec<f32>) -> SharedEngine<FakeModel> {
        let engine = InferenceEngine::with_model(FakeModel::returning(scores), three_labels()).unwrap();
        SharedEngine::new(engine)
    }

    #[test]
    fn test_classify_from_threads() {
        let engine = shared(vec![0.05, 0.80, 0.15]);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let image = DynamicImage::ImageRgb8(RgbImage::new(20, 30));
                    engine.classify(&image).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "Drusen");
        }
        assert_eq!(engine.inner.lock().unwrap().model().calls, 4);
    }

    #[tokio::test]
    async fn test_classify_async() {
        let engine = shared(vec![0.05, 0.10, 0.85]);
        let image = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        assert_eq!(engine.classify_async(image).await.unwrap(), "Myopia");
    }

    #[tokio::test]
    async fn test_classify_async_propagates_failure() {
        let mut model = FakeModel::returning(vec![0.1, 0.2, 0.3]);
        model.fail = true;
        let engine = SharedEngine::new(InferenceEngine::with_model(model, three_labels()).unwrap());
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        assert!(matches!(
            engine.classify_async(image).await,
            Err(InferenceError::Backend(_))
        ));
    }
}
