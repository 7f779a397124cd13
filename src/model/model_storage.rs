//! モデルとメタデータの永続化
//!
//! Tar.gz形式でモデルとメタデータを1ファイルに統合して保存・読み込みします。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json   - メタデータ（ラベル、入力条件など）
//! - model.tflite    - 変換済みモデル

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use tracing::info;

use crate::model::model_metadata::ModelMetadata;

const METADATA_ENTRY: &str = "metadata.json";
const MODEL_ENTRY: &str = "model.tflite";

/// メタデータと共にモデルをTar.gz形式で保存
///
/// 保存先のパスを返します（拡張子が無ければ `.tar.gz` を付加）。
pub fn save_model_with_metadata(
    output_path: &Path,
    metadata: &ModelMetadata,
    model_binary: &[u8],
) -> Result<PathBuf> {
    let tar_gz_path = if output_path.extension().and_then(|s| s.to_str()) == Some("gz") {
        output_path.to_path_buf()
    } else {
        output_path.with_extension("tar.gz")
    };

    if let Some(parent) = tar_gz_path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create parent directory: {:?}", parent))?;
    }

    let tar_gz_file = File::create(&tar_gz_path)
        .context(format!("Failed to create tar.gz file: {:?}", tar_gz_path))?;

    let encoder = GzEncoder::new(tar_gz_file, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    let json_str = metadata.to_json_string()?;
    append_entry(&mut tar_builder, METADATA_ENTRY, json_str.as_bytes())?;
    append_entry(&mut tar_builder, MODEL_ENTRY, model_binary)?;

    // gzipストリームまで書き切る
    tar_builder
        .into_inner()
        .context("Failed to finalize tar archive")?
        .finish()
        .context("Failed to finalize gzip stream")?;

    info!(
        "Saved model bundle {:?} ({} labels, {} bytes)",
        tar_gz_path,
        metadata.labels.len(),
        model_binary.len()
    );
    Ok(tar_gz_path)
}

fn append_entry<W: std::io::Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, data)
        .context(format!("Failed to add {} to tar", name))
}

/// Tar.gzからモデルメタデータを読み込む
pub fn load_metadata(tar_gz_path: &Path) -> Result<ModelMetadata> {
    let (metadata, _) = read_bundle(tar_gz_path, true, false)?;
    metadata.ok_or_else(|| anyhow::anyhow!("{} not found in tar.gz archive", METADATA_ENTRY))
}

/// Tar.gzからモデルバイナリを読み込む
pub fn load_model_binary(tar_gz_path: &Path) -> Result<Vec<u8>> {
    let (_, binary) = read_bundle(tar_gz_path, false, true)?;
    binary.ok_or_else(|| anyhow::anyhow!("{} not found in tar.gz archive", MODEL_ENTRY))
}

/// メタデータとモデルバイナリを共に読み込む
pub fn load_model_with_metadata(tar_gz_path: &Path) -> Result<(ModelMetadata, Vec<u8>)> {
    match read_bundle(tar_gz_path, true, true)? {
        (Some(metadata), Some(binary)) => Ok((metadata, binary)),
        (None, _) => Err(anyhow::anyhow!("{} not found in tar.gz archive", METADATA_ENTRY)),
        (_, None) => Err(anyhow::anyhow!("{} not found in tar.gz archive", MODEL_ENTRY)),
    }
}

fn read_bundle(
    tar_gz_path: &Path,
    want_metadata: bool,
    want_model: bool,
) -> Result<(Option<ModelMetadata>, Option<Vec<u8>>)> {
    let tar_gz_file = File::open(tar_gz_path)
        .context(format!("Failed to open tar.gz file: {:?}", tar_gz_path))?;

    let decoder = GzDecoder::new(tar_gz_file);
    let mut archive = Archive::new(decoder);

    let mut metadata_opt: Option<ModelMetadata> = None;
    let mut model_binary_opt: Option<Vec<u8>> = None;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_path_buf();

        match path.to_str() {
            Some(METADATA_ENTRY) if want_metadata => {
                let mut json_str = String::new();
                entry.read_to_string(&mut json_str)?;
                metadata_opt = Some(ModelMetadata::from_json_string(&json_str)?);
            }
            Some(MODEL_ENTRY) if want_model => {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                model_binary_opt = Some(buffer);
            }
            _ => {}
        }

        if (!want_metadata || metadata_opt.is_some()) && (!want_model || model_binary_opt.is_some()) {
            break;
        }
    }

    Ok((metadata_opt, model_binary_opt))
}

/// メタデータをコンソールに表示
pub fn print_metadata_info(metadata: &ModelMetadata) {
    println!("\n=== モデルメタデータ ===");
    println!("説明: {}", metadata.description);
    println!("クラス数: {}", metadata.labels.len());
    println!("モデル入力サイズ: {}x{}", metadata.input_size, metadata.input_size);
    println!(
        "正規化: (v - {}) / {}",
        metadata.normalize_mean, metadata.normalize_std
    );
    println!("作成日時: {}", metadata.exported_at);
    println!("========================");
}
