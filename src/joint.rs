use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::source::TrackingSource;

/// Kinect v2 の 25 関節インデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum JointType {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

impl JointType {
    pub const COUNT: usize = 25;

    pub const ALL: [JointType; Self::COUNT] = [
        Self::SpineBase,
        Self::SpineMid,
        Self::Neck,
        Self::Head,
        Self::ShoulderLeft,
        Self::ElbowLeft,
        Self::WristLeft,
        Self::HandLeft,
        Self::ShoulderRight,
        Self::ElbowRight,
        Self::WristRight,
        Self::HandRight,
        Self::HipLeft,
        Self::KneeLeft,
        Self::AnkleLeft,
        Self::FootLeft,
        Self::HipRight,
        Self::KneeRight,
        Self::AnkleRight,
        Self::FootRight,
        Self::SpineShoulder,
        Self::HandTipLeft,
        Self::ThumbLeft,
        Self::HandTipRight,
        Self::ThumbRight,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 関節の信頼度状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

impl TrackingState {
    /// デバイスの生の状態値から変換（2 = 追跡中、1 = 推定、それ以外は未追跡）
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            2 => Self::Tracked,
            1 => Self::Inferred,
            _ => Self::NotTracked,
        }
    }
}

/// 単一関節のサンプル（デバイス座標系、メートル）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Joint {
    pub position: Vector3<f32>,
    pub state: TrackingState,
}

impl Joint {
    pub fn new(position: Vector3<f32>, state: TrackingState) -> Self {
        Self { position, state }
    }

    pub fn tracked(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vector3::new(x, y, z), TrackingState::Tracked)
    }

    /// 完全に追跡されているか（推定値は含めない）
    pub fn is_tracked(&self) -> bool {
        self.state == TrackingState::Tracked
    }
}

/// 1ティック分の全関節スナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct JointFrame {
    pub joints: [Joint; JointType::COUNT],
}

impl JointFrame {
    /// トラッキングソースの現在値を読み出す
    pub fn capture<S: TrackingSource + ?Sized>(source: &S) -> Self {
        Self {
            joints: JointType::ALL.map(|joint| source.joint(joint)),
        }
    }

    pub fn get(&self, joint: JointType) -> &Joint {
        &self.joints[joint as usize]
    }

    pub fn set(&mut self, joint: JointType, sample: Joint) {
        self.joints[joint as usize] = sample;
    }
}

impl Default for JointFrame {
    fn default() -> Self {
        Self {
            joints: [Joint::default(); JointType::COUNT],
        }
    }
}
