use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::error::RetargetError;

pub type BoneId = usize;

/// リグの1ボーン
///
/// ワールド（アーマチュア空間）変換は
/// `親のワールド変換 * rest * 平行移動(location) * rotation`。
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    /// 親ボーン座標系でのレスト姿勢（ヘッド位置と向き）
    pub rest: Isometry3<f32>,
    /// ポーズ回転（レスト姿勢からの相対）
    pub rotation: UnitQuaternion<f32>,
    /// ポーズ平行移動（レスト姿勢の座標系）
    pub location: Vector3<f32>,
}

/// ボーン階層のアリーナ。親は必ず子より先に登録される。
#[derive(Debug, Clone, Default)]
pub struct Rig {
    bones: Vec<Bone>,
}

// --- JSON deserialization types ---

#[derive(Deserialize)]
struct JsonRig {
    bones: Vec<JsonBone>,
}

#[derive(Deserialize)]
struct JsonBone {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    /// 親座標系でのヘッド位置
    head: [f32; 3],
    /// レスト回転 (x, y, z, w)
    #[serde(default = "identity_rotation")]
    rotation: [f32; 4],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rig file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: JsonRig = serde_json::from_str(content).context("Failed to parse rig JSON")?;

        let mut rig = Rig::new();
        let mut name_to_id: HashMap<String, BoneId> = HashMap::new();
        for bone in raw.bones {
            let parent = match &bone.parent {
                Some(p) => Some(*name_to_id.get(p).ok_or_else(|| RetargetError::UnknownParent {
                    bone: bone.name.clone(),
                    parent: p.clone(),
                })?),
                None => None,
            };
            let [x, y, z, w] = bone.rotation;
            let rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), 1.0e-6)
                .with_context(|| format!("Bone '{}' has a zero-length rest rotation", bone.name))?;
            let rest = Isometry3::from_parts(
                Translation3::new(bone.head[0], bone.head[1], bone.head[2]),
                rotation,
            );
            let id = rig.add_bone(&bone.name, parent, rest)?;
            name_to_id.insert(bone.name, id);
        }
        Ok(rig)
    }

    /// ボーンを追加する。名前の重複と未登録の親はエラー。
    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<BoneId>,
        rest: Isometry3<f32>,
    ) -> Result<BoneId, RetargetError> {
        if self.contains(name) {
            return Err(RetargetError::DuplicateBone(name.to_string()));
        }
        if let Some(p) = parent {
            if p >= self.bones.len() {
                return Err(RetargetError::UnknownParent {
                    bone: name.to_string(),
                    parent: format!("#{}", p),
                });
            }
        }

        let id = self.bones.len();
        self.bones.push(Bone {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            rest,
            rotation: UnitQuaternion::identity(),
            location: Vector3::zeros(),
        });
        if let Some(p) = parent {
            self.bones[p].children.push(id);
        }
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id]
    }

    pub fn bone_mut(&mut self, id: BoneId) -> &mut Bone {
        &mut self.bones[id]
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// 親を持たないボーン（アリーナ順）
    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(id, _)| id)
    }

    /// 全ボーンをレスト姿勢に戻す（回転なし、移動なし）
    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.rotation = UnitQuaternion::identity();
            bone.location = Vector3::zeros();
        }
    }

    /// ボーン自身のポーズを除いた座標系（親のワールド変換 * rest）
    pub fn parent_frame(&self, id: BoneId) -> Isometry3<f32> {
        let bone = &self.bones[id];
        match bone.parent {
            Some(p) => self.world_transform(p) * bone.rest,
            None => bone.rest,
        }
    }

    /// アーマチュア空間でのポーズ済み変換
    pub fn world_transform(&self, id: BoneId) -> Isometry3<f32> {
        let bone = &self.bones[id];
        let pose = Isometry3::from_parts(Translation3::from(bone.location), bone.rotation);
        self.parent_frame(id) * pose
    }

    /// アーマチュア空間のヘッド位置
    pub fn world_position(&self, id: BoneId) -> Vector3<f32> {
        self.world_transform(id).translation.vector
    }

    /// アーマチュア空間でのヘッド位置を指定し、対応する location を設定する
    pub fn set_world_translation(&mut self, id: BoneId, position: Vector3<f32>) {
        let frame = self.parent_frame(id);
        let local = frame.inverse_transform_point(&Point3::from(position));
        self.bones[id].location = local.coords;
    }
}
