use std::collections::BTreeMap;

use log::debug;
use nalgebra::UnitQuaternion;

use crate::catalog::LogicalBone;
use crate::retarget::axes::{reference_axis, shortest_arc};
use crate::retarget::root::RootConfig;
use crate::rig::{BoneId, Rig};

/// レスト方向補正（論理ボーンごとの補正回転）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestCalibration {
    compensation: BTreeMap<LogicalBone, UnitQuaternion<f32>>,
}

impl RestCalibration {
    pub fn get(&self, bone: LogicalBone) -> Option<&UnitQuaternion<f32>> {
        self.compensation.get(&bone)
    }

    pub fn len(&self) -> usize {
        self.compensation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compensation.is_empty()
    }
}

/// セッション開始時のキャリブレーション
///
/// リグはレスト姿勢に戻してから呼ぶこと。ヒント付きの論理ボーンについて、
/// ヒントをボーン座標系に変換したベクトルを基準軸 (0,1,0) に重ねる回転を求める。
/// ルートボーンはアーマチュア空間の位置を `initial_offset` として保存し、
/// 初回フレーム位置をリセットする。
pub fn calibrate(
    rig: &Rig,
    targets: &[(LogicalBone, BoneId)],
    root: &mut RootConfig,
) -> RestCalibration {
    let mut calibration = RestCalibration::default();
    root.first_frame_position = None;

    for &(logical, id) in targets {
        let transform = rig.world_transform(id);

        if let Some(hint) = logical.definition().rest_axis_hint {
            let local = transform.rotation.inverse_transform_vector(&hint);
            if let Some(q) = shortest_arc(&local, &reference_axis()) {
                debug!(
                    "Rest compensation {} -> {}: {:.1} deg",
                    logical,
                    rig.bone(id).name,
                    q.angle().to_degrees()
                );
                calibration.compensation.insert(logical, q);
            }
        }

        if logical == root.bone {
            root.initial_offset = transform.translation.vector;
        }
    }

    calibration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retarget::root::AxisLocks;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Translation3, Vector3};
    use std::f32::consts::FRAC_PI_2;

    /// Z-up のリグ: ボーンの +Y 軸がボーンの向き
    fn rig() -> Rig {
        let up = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        let mut rig = Rig::new();
        let hips = rig
            .add_bone("Hips", None, Isometry3::from_parts(Translation3::new(0.0, 0.0, 1.0), up))
            .unwrap();
        let spine = rig
            .add_bone("Spine2", Some(hips), Isometry3::translation(0.0, 0.3, 0.0))
            .unwrap();
        // 左肩: 体幹から +X（リグ座標）へ伸びる
        let out = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -FRAC_PI_2);
        rig.add_bone(
            "LeftShoulder",
            Some(spine),
            Isometry3::from_parts(Translation3::new(0.0, 0.2, 0.0), out),
        )
        .unwrap();
        rig.add_bone("LeftArm", Some(2), Isometry3::translation(0.0, 0.15, 0.0))
            .unwrap();
        rig
    }

    fn targets() -> Vec<(LogicalBone, BoneId)> {
        vec![
            (LogicalBone::Spine0, 0),
            (LogicalBone::Spine1, 1),
            (LogicalBone::LeftShoulder, 2),
            (LogicalBone::LeftUpperArm, 3),
        ]
    }

    #[test]
    fn test_only_hinted_bones_calibrated() {
        let rig = rig();
        let mut root = RootConfig::new(LogicalBone::Spine0, AxisLocks::default());
        let cal = calibrate(&rig, &targets(), &mut root);
        assert_eq!(cal.len(), 3);
        assert!(cal.get(LogicalBone::LeftUpperArm).is_none());
        assert!(cal.get(LogicalBone::Spine1).is_some());
    }

    #[test]
    fn test_upright_spine_needs_no_compensation() {
        let rig = rig();
        let mut root = RootConfig::new(LogicalBone::Spine0, AxisLocks::default());
        let cal = calibrate(&rig, &targets(), &mut root);
        // 体幹は +Z（ヒント方向）を向いているので補正は単位回転
        let q = cal.get(LogicalBone::Spine0).unwrap();
        assert_relative_eq!(*q, UnitQuaternion::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_compensation_maps_local_hint_to_reference() {
        let rig = rig();
        let mut root = RootConfig::new(LogicalBone::Spine0, AxisLocks::default());
        let cal = calibrate(&rig, &targets(), &mut root);

        let hint = LogicalBone::LeftShoulder.definition().rest_axis_hint.unwrap();
        let local = rig.world_transform(2).rotation.inverse_transform_vector(&hint);
        let q = cal.get(LogicalBone::LeftShoulder).unwrap();
        assert_relative_eq!(q * local.normalize(), Vector3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_calibration_is_idempotent() {
        let rig = rig();
        let mut root = RootConfig::new(LogicalBone::Spine0, AxisLocks::default());
        let first = calibrate(&rig, &targets(), &mut root);
        let second = calibrate(&rig, &targets(), &mut root);
        assert_eq!(first, second);
    }

    #[test]
    fn test_root_offset_and_reset() {
        let rig = rig();
        let mut root = RootConfig::new(LogicalBone::Spine0, AxisLocks::default());
        root.first_frame_position = Some(Vector3::new(1.0, 1.0, 1.0));
        calibrate(&rig, &targets(), &mut root);
        assert_eq!(root.first_frame_position, None);
        assert_relative_eq!(root.initial_offset, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_root_offset_follows_designated_bone() {
        let rig = rig();
        let mut root = RootConfig::new(LogicalBone::Spine1, AxisLocks::default());
        calibrate(&rig, &targets(), &mut root);
        // Spine2 のヘッドは Hips から 0.3 上
        assert_relative_eq!(root.initial_offset, Vector3::new(0.0, 0.0, 1.3), epsilon = 1e-6);
    }
}
