//! 推論バックエンドの抽象化
//!
//! 学習済みモデルは不透明な成果物として扱い、推論エンジンは
//! 「実行」と「宣言された入出力形状の問い合わせ」だけに依存します。

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use crate::error::InferenceError;
use crate::ml::preprocess::InputTensor;

/// 学習済み分類モデル
///
/// 実装は同時呼び出しに対してスレッドセーフである必要はありません。
/// `run` は `&mut self` を取るため、1インスタンスにつき同時に1つの推論しか走りません。
pub trait ClassifierModel {
    /// 宣言された出力幅 N（出力形状 (1, N)）
    fn output_width(&self) -> usize;

    /// 宣言された入力形状（不明な場合は `None`）
    fn input_shape(&self) -> Option<Vec<usize>> {
        None
    }

    /// (1, 224, 224, 3) の入力に対して長さ N の出力ベクトルを返す
    fn run(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError>;
}

impl<M: ClassifierModel + ?Sized> ClassifierModel for Box<M> {
    fn output_width(&self) -> usize {
        (**self).output_width()
    }

    fn input_shape(&self) -> Option<Vec<usize>> {
        (**self).input_shape()
    }

    fn run(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
        (**self).run(input)
    }
}

/// モデル成果物の読み込み元
pub enum ModelSource {
    /// `.tflite` ファイル（メモリマップで読み込む）
    Path(PathBuf),
    /// メモリ上のモデル（アプリに埋め込んだリソースなど）
    Bytes(Cow<'static, [u8]>),
    /// `metadata.json` と `model.tflite` を含む tar.gz バンドル
    Bundle(PathBuf),
}

impl ModelSource {
    /// 拡張子からファイルかバンドルかを判定
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ModelSource::Bundle(path)
        } else {
            ModelSource::Path(path)
        }
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        ModelSource::Bytes(Cow::Borrowed(bytes))
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        ModelSource::Bytes(Cow::Owned(bytes))
    }
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ModelSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ModelSource::Bundle(path) => f.debug_tuple("Bundle").field(path).finish(),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => write!(f, "{}", path.display()),
            ModelSource::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
            ModelSource::Bundle(path) => write!(f, "bundle {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_detects_bundle() {
        assert!(matches!(
            ModelSource::from_path("models/fundus.tar.gz"),
            ModelSource::Bundle(_)
        ));
        assert!(matches!(
            ModelSource::from_path("models/FUNDUS.TGZ"),
            ModelSource::Bundle(_)
        ));
        assert!(matches!(
            ModelSource::from_path("models/fundus.tflite"),
            ModelSource::Path(_)
        ));
    }

    #[test]
    fn test_debug_hides_bytes() {
        let source = ModelSource::from_vec(vec![0u8; 16]);
        assert_eq!(format!("{:?}", source), "Bytes(16 bytes)");
    }
}
