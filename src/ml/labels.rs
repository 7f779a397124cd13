//! クラスラベル表
//!
//! モデル出力ベクトルのインデックスとクラス名を対応付けます。
//! 並び順はモデル学習時のクラス順と一致している必要があります（検証できるのは長さのみ）。

use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// 範囲外インデックスに対して返すラベル
pub const UNKNOWN_LABEL: &str = "Unknown";

/// 眼底画像分類モデルのクラス数
pub const NUM_FUNDUS_CLASSES: usize = 46;

/// 眼底画像分類モデルのクラス名（出力インデックス順）
pub const FUNDUS_LABELS: [&str; NUM_FUNDUS_CLASSES] = [
    "Diabetic Retinopathy",               // DR
    "Age-Related Macular Degeneration",   // ARMD
    "Macular Hole",                       // MH
    "Drusen",                             // DN
    "Myopia",                             // MYA
    "Branch Retinal Vein Occlusion",      // BRVO
    "Tilted Disc Syndrome",               // TSLN
    "Epiretinal Membrane",                // ERM
    "Lacquer Cracks",                     // LS
    "Macular Scar",                       // MS
    "Central Serous Retinopathy",         // CSR
    "Optic Disc Coloboma",                // ODC
    "Central Retinal Vein Occlusion",     // CRVO
    "Toxoplasma Vasculitis",              // TV
    "Arterial Hypertension",              // AH
    "Optic Disc Pit",                     // ODP
    "Optic Disc Edema",                   // ODE
    "Staphyloma",                         // ST
    "Anterior Ischemic Optic Neuropathy", // AION
    "Papilledema",                        // PT
    "Retinal Tear",                       // RT
    "Retinoschisis",                      // RS
    "Choroidal Rupture Syndrome",         // CRS
    "Edema",                              // EDN
    "Retinal Pigment Epithelium Changes", // RPEC
    "Macular Hemorrhage",                 // MHL
    "Retinitis Pigmentosa",               // RP
    "Cotton Wool Spots",                  // CWS
    "Choroidal Blood",                    // CB
    "Optic Disc Pallor or Maculopathy",   // ODPM
    "Preretinal Hemorrhage",              // PRH
    "Macular Neovascularization",         // MNF
    "Hemorrhage",                         // HR
    "Central Retinal Artery Occlusion",   // CRAO
    "Toxoplasmic Disease",                // TD
    "Cystoid Macular Edema",              // CME
    "Posterior Capsular Rupture",         // PTCR
    "Cystoid Fibrosis",                   // CF
    "Vitreous Hemorrhage",                // VH
    "Macular Atrophy",                    // MCA
    "Vitreous Syneresis",                 // VS
    "Branch Retinal Artery Occlusion",    // BRAO
    "Plaque",                             // PLQ
    "Hyperpigmentation and Edema",        // HPED
    "Chorioretinal Lesion",               // CL
    // 学習済みモデル側のクラスが不明なスロット。名前は推測しない
    "Placeholder Label",
];

/// 出力インデックス順のラベル表
///
/// 起動時に一度だけ構築し、エンジンへ明示的に渡します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// 任意のラベル列から作成
    pub fn new<I, S>(labels: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ConfigError::EmptyLabelTable);
        }
        Ok(Self { labels })
    }

    /// 組み込みの眼底画像ラベル表（46クラス）
    pub fn fundus() -> Self {
        Self {
            labels: FUNDUS_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 1行1ラベルのテキストから作成（空行は無視）
    pub fn from_lines(text: &str) -> Result<Self, ConfigError> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// ラベルファイルを読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_lines(&text)
    }

    /// ラベル一覧（出力インデックス順）
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// インデックスからラベルを取得
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// インデックスをラベルに解決
    ///
    /// 範囲外（または `None`）の場合は [`UNKNOWN_LABEL`] を返します。
    pub fn resolve(&self, index: Option<usize>) -> &str {
        index
            .and_then(|i| self.get(i))
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// ラベルからインデックスを取得
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::fundus()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fundus_table() {
        let table = LabelTable::fundus();
        assert_eq!(table.len(), 46);
        assert_eq!(table.get(0), Some("Diabetic Retinopathy"));
        assert_eq!(table.get(3), Some("Drusen"));
        assert_eq!(table.get(44), Some("Chorioretinal Lesion"));
        assert_eq!(table.get(45), Some("Placeholder Label"));
    }

    #[test]
    fn test_resolve_out_of_range_is_unknown() {
        let table = LabelTable::new(["Diabetic Retinopathy", "Drusen", "Myopia"]).unwrap();
        assert_eq!(table.resolve(Some(1)), "Drusen");
        assert_eq!(table.resolve(Some(3)), UNKNOWN_LABEL);
        assert_eq!(table.resolve(Some(usize::MAX)), UNKNOWN_LABEL);
        assert_eq!(table.resolve(None), UNKNOWN_LABEL);
    }

    #[test]
    fn test_from_lines_skips_blank_lines() {
        let table = LabelTable::from_lines("Drusen\n\n  Myopia  \r\nEdema\n").unwrap();
        assert_eq!(table.labels(), &["Drusen", "Myopia", "Edema"]);
        assert_eq!(table.index_of("Myopia"), Some(1));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        assert!(matches!(
            LabelTable::from_lines("\n \n"),
            Err(ConfigError::EmptyLabelTable)
        ));
    }
}
