//! 入力画像の前処理
//!
//! 任意サイズの画像を 224x224 に引き伸ばし、RGB各チャネルを `(v - 127.5) / 127.5` で
//! [-1, 1] に正規化した NHWC (1, 224, 224, 3) のテンソルに変換します。
//! リサイズフィルタと正規化定数はモデル学習時の条件と一致させる必要があります。

use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use crate::error::DecodeError;

/// モデル入力の一辺（正方形）
pub const INPUT_SIZE: u32 = 224;

/// チャネル数（R, G, B）
pub const INPUT_CHANNELS: usize = 3;

/// モデル入力形状 [batch, height, width, channels]
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, INPUT_CHANNELS];

/// 入力テンソルの要素数
pub const INPUT_LEN: usize = INPUT_SHAPE[0] * INPUT_SHAPE[1] * INPUT_SHAPE[2] * INPUT_SHAPE[3];

/// 正規化の平均値
pub const NORMALIZE_MEAN: f32 = 127.5;

/// 正規化の標準偏差
pub const NORMALIZE_STD: f32 = 127.5;

/// リサイズフィルタ（バイリニア）
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// 呼び出し側が渡すデコード済み画像
pub type RawImage = DynamicImage;

/// 正規化済みの入力テンソル（NHWC, f32）
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
}

impl InputTensor {
    /// 平坦化済みデータから作成（要素数が一致しない場合は `None`）
    pub fn from_vec(data: Vec<f32>) -> Option<Self> {
        (data.len() == INPUT_LEN).then_some(Self { data })
    }

    pub fn shape(&self) -> [usize; 4] {
        INPUT_SHAPE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// (y, x, channel) の値を取得
    pub fn get(&self, y: usize, x: usize, channel: usize) -> Option<f32> {
        if y >= INPUT_SHAPE[1] || x >= INPUT_SHAPE[2] || channel >= INPUT_CHANNELS {
            return None;
        }
        self.data
            .get((y * INPUT_SHAPE[2] + x) * INPUT_CHANNELS + channel)
            .copied()
    }
}

/// 8bitチャネル値を正規化
#[inline]
pub fn normalize_channel(value: u8) -> f32 {
    (value as f32 - NORMALIZE_MEAN) / NORMALIZE_STD
}

/// 画像を 224x224 に引き伸ばす（アスペクト比は保持しない）
///
/// アルファチャネルはここで破棄されます。
pub fn resize_to_input(image: &RawImage) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
        return rgb;
    }
    imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, RESIZE_FILTER)
}

/// 画像をモデル入力テンソルに変換
pub fn preprocess_image(image: &RawImage) -> InputTensor {
    let resized = resize_to_input(image);

    // RgbImage の生データは行優先の R,G,B 並びなので NHWC と同じ順序
    let data: Vec<f32> = resized
        .as_raw()
        .iter()
        .map(|&v| normalize_channel(v))
        .collect();

    InputTensor { data }
}

/// メモリ上のエンコード済み画像（PNG/JPEG など）をデコード
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RawImage, DecodeError> {
    Ok(image::load_from_memory(bytes)?)
}

/// 画像ファイルを読み込んでデコード
pub fn decode_image_file<P: AsRef<Path>>(path: P) -> Result<RawImage, DecodeError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_image_bytes(&bytes)
}
