use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::joint::JointType;

/// リグに割り当て可能な論理ボーン
///
/// 並び順はマッピング一覧の表示順（頭 → 体幹 → 左腕 → 右腕 → 左脚 → 右脚）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalBone {
    Head,
    Neck,
    Spine1,
    Spine0,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
}

/// 論理ボーンの定義: 始点関節、終点関節、レスト方向ヒント
///
/// ヒントはリグ（アーマチュア）座標系のベクトルで、レスト姿勢が
/// 基準軸と揃っていないボーン（体幹・頭・肩）にだけ付く。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneDefinition {
    pub start: JointType,
    pub end: JointType,
    pub rest_axis_hint: Option<Vector3<f32>>,
}

impl BoneDefinition {
    fn new(start: JointType, end: JointType) -> Self {
        Self {
            start,
            end,
            rest_axis_hint: None,
        }
    }

    fn with_hint(start: JointType, end: JointType, x: f32, y: f32, z: f32) -> Self {
        Self {
            start,
            end,
            rest_axis_hint: Some(Vector3::new(x, y, z)),
        }
    }
}

impl LogicalBone {
    pub const COUNT: usize = 18;

    pub const ALL: [LogicalBone; Self::COUNT] = [
        Self::Head,
        Self::Neck,
        Self::Spine1,
        Self::Spine0,
        Self::LeftShoulder,
        Self::LeftUpperArm,
        Self::LeftLowerArm,
        Self::LeftHand,
        Self::RightShoulder,
        Self::RightUpperArm,
        Self::RightLowerArm,
        Self::RightHand,
        Self::LeftUpperLeg,
        Self::LeftLowerLeg,
        Self::LeftFoot,
        Self::RightUpperLeg,
        Self::RightLowerLeg,
        Self::RightFoot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Neck => "Neck",
            Self::Spine1 => "Spine1",
            Self::Spine0 => "Spine0",
            Self::LeftShoulder => "LeftShoulder",
            Self::LeftUpperArm => "LeftUpperArm",
            Self::LeftLowerArm => "LeftLowerArm",
            Self::LeftHand => "LeftHand",
            Self::RightShoulder => "RightShoulder",
            Self::RightUpperArm => "RightUpperArm",
            Self::RightLowerArm => "RightLowerArm",
            Self::RightHand => "RightHand",
            Self::LeftUpperLeg => "LeftUpperLeg",
            Self::LeftLowerLeg => "LeftLowerLeg",
            Self::LeftFoot => "LeftFoot",
            Self::RightUpperLeg => "RightUpperLeg",
            Self::RightLowerLeg => "RightLowerLeg",
            Self::RightFoot => "RightFoot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|bone| bone.name() == name)
    }

    pub fn definition(self) -> BoneDefinition {
        use JointType::*;
        match self {
            Self::Head => BoneDefinition::with_hint(Neck, Head, 0.0, 0.0, 1.0),
            Self::Neck => BoneDefinition::with_hint(SpineShoulder, Neck, 0.0, 0.0, 1.0),
            Self::Spine1 => BoneDefinition::with_hint(SpineMid, SpineShoulder, 0.0, 0.0, 1.0),
            Self::Spine0 => BoneDefinition::with_hint(SpineBase, SpineMid, 0.0, 0.0, 1.0),
            Self::LeftShoulder => {
                BoneDefinition::with_hint(SpineShoulder, ShoulderLeft, 1.0, 0.0, -0.5)
            }
            Self::LeftUpperArm => BoneDefinition::new(ShoulderLeft, ElbowLeft),
            Self::LeftLowerArm => BoneDefinition::new(ElbowLeft, WristLeft),
            Self::LeftHand => BoneDefinition::new(WristLeft, HandLeft),
            Self::RightShoulder => {
                BoneDefinition::with_hint(SpineShoulder, ShoulderRight, -1.0, 0.0, -0.5)
            }
            Self::RightUpperArm => BoneDefinition::new(ShoulderRight, ElbowRight),
            Self::RightLowerArm => BoneDefinition::new(ElbowRight, WristRight),
            Self::RightHand => BoneDefinition::new(WristRight, HandRight),
            Self::LeftUpperLeg => BoneDefinition::new(HipLeft, KneeLeft),
            Self::LeftLowerLeg => BoneDefinition::new(KneeLeft, AnkleLeft),
            Self::LeftFoot => BoneDefinition::new(AnkleLeft, FootLeft),
            Self::RightUpperLeg => BoneDefinition::new(HipRight, KneeRight),
            Self::RightLowerLeg => BoneDefinition::new(KneeRight, AnkleRight),
            Self::RightFoot => BoneDefinition::new(AnkleRight, FootRight),
        }
    }

    /// 一般的なヒューマノイドリグで使われるボーン名（自動割り当て用）
    pub fn default_target(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Neck => "Neck",
            Self::Spine1 => "Spine2",
            Self::Spine0 => "Hips",
            Self::LeftShoulder => "LeftShoulder",
            Self::LeftUpperArm => "LeftArm",
            Self::LeftLowerArm => "LeftForeArm",
            Self::LeftHand => "LeftHand",
            Self::RightShoulder => "RightShoulder",
            Self::RightUpperArm => "RightArm",
            Self::RightLowerArm => "RightForeArm",
            Self::RightHand => "RightHand",
            Self::LeftUpperLeg => "LeftUpLeg",
            Self::LeftLowerLeg => "LeftLeg",
            Self::LeftFoot => "LeftFoot",
            Self::RightUpperLeg => "RightUpLeg",
            Self::RightLowerLeg => "RightLeg",
            Self::RightFoot => "RightFoot",
        }
    }
}

impl std::fmt::Display for LogicalBone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
