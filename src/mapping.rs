use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::catalog::LogicalBone;
use crate::rig::{BoneId, Rig};

/// 保存形式でルートボーンを表す予約キー
pub const ROOT_KEY: &str = "root";

/// 論理ボーン → リグのボーン名 の割り当て
///
/// 登録されている名前は、割り当てた時点のリグに必ず存在する。
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMapping {
    targets: BTreeMap<LogicalBone, String>,
    root: LogicalBone,
}

impl Default for BoneMapping {
    fn default() -> Self {
        Self {
            targets: BTreeMap::new(),
            root: LogicalBone::Spine0,
        }
    }
}

impl BoneMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一般的なボーン名のうちリグに存在するものを割り当てる
    pub fn with_defaults(rig: &Rig) -> Self {
        let mut mapping = Self::new();
        for bone in LogicalBone::ALL {
            mapping.assign(rig, bone, bone.default_target());
        }
        mapping
    }

    /// 割り当てる。リグに無い名前は未割り当てにする（エラーにはしない）。
    /// 空文字列は割り当て解除。割り当てられたら true。
    pub fn set_mapping(&mut self, rig: &Rig, bone: LogicalBone, target: &str) -> bool {
        let assigned = self.assign(rig, bone, target);
        if !assigned && !target.is_empty() {
            warn!("Bone '{}' not found in rig, {} left unmapped", target, bone);
        }
        assigned
    }

    fn assign(&mut self, rig: &Rig, bone: LogicalBone, target: &str) -> bool {
        if !target.is_empty() && rig.contains(target) {
            self.targets.insert(bone, target.to_string());
            true
        } else {
            self.targets.remove(&bone);
            false
        }
    }

    pub fn target(&self, bone: LogicalBone) -> Option<&str> {
        self.targets.get(&bone).map(String::as_str)
    }

    /// 平行移動を受け持つ論理ボーン
    pub fn root(&self) -> LogicalBone {
        self.root
    }

    pub fn set_root(&mut self, bone: LogicalBone) {
        self.root = bone;
    }

    /// 割り当て済みのものだけ、一覧の表示順で
    pub fn iter(&self) -> impl Iterator<Item = (LogicalBone, &str)> {
        self.targets.iter().map(|(bone, name)| (*bone, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// リグのボーン ID に解決する。見つからない名前は飛ばす。
    pub fn resolve(&self, rig: &Rig) -> Vec<(LogicalBone, BoneId)> {
        self.targets
            .iter()
            .filter_map(|(bone, name)| rig.find(name).map(|id| (*bone, id)))
            .collect()
    }

    /// 保存用のフラットなキー・値。未割り当ては空文字列。
    pub fn to_document(&self) -> BTreeMap<String, String> {
        let mut doc: BTreeMap<String, String> = LogicalBone::ALL
            .iter()
            .map(|bone| {
                let target = self.target(*bone).unwrap_or_default();
                (bone.name().to_string(), target.to_string())
            })
            .collect();
        doc.insert(ROOT_KEY.to_string(), self.root.name().to_string());
        doc
    }

    /// キー・値から作る。知らないキーは無視し、リグに無い名前は未割り当てにする。
    pub fn from_document(doc: &BTreeMap<String, String>, rig: &Rig) -> Self {
        let mut mapping = Self::new();
        for (key, value) in doc {
            if key == ROOT_KEY {
                match LogicalBone::from_name(value) {
                    Some(bone) => mapping.root = bone,
                    None => debug!("Unknown root bone '{}' ignored", value),
                }
                continue;
            }
            match LogicalBone::from_name(key) {
                Some(bone) => {
                    mapping.assign(rig, bone, value);
                }
                None => debug!("Unknown mapping key '{}' ignored", key),
            }
        }
        mapping
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_document())?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write mapping {}", path.display()))?;
        Ok(())
    }

    /// ファイルから読み込んで置き換える
    ///
    /// 読めない・壊れているファイルならエラーを返し、現在の割り当てはそのまま残す。
    pub fn load<P: AsRef<Path>>(&mut self, path: P, rig: &Rig) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping {}", path.display()))?;
        let doc: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse mapping {}", path.display()))?;
        *self = Self::from_document(&doc, rig);
        Ok(())
    }
}
