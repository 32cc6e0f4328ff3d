use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

/// これより短い方向ベクトルは向きが定まらないものとして扱う
pub const MIN_DIRECTION_NORM: f32 = 1e-6;

/// ボーンの基準軸（ボーン座標系の +Y がボーンの向き）
pub fn reference_axis() -> Vector3<f32> {
    Vector3::y()
}

/// デバイス座標系 → リグ座標系
///
/// リグX = -デバイスX、リグY = デバイスZ（奥行き）、リグZ = デバイスY（鉛直）。
/// デバイスとリグで座標系の利き手が逆なので X を反転する。
pub fn remap_device(v: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-v.x, v.z, v.y)
}

/// 始点関節 → 終点関節の方向（リグ座標系）
///
/// 成分で書くと (start.x - end.x, end.z - start.z, end.y - start.y)。
pub fn bone_direction(start: &Vector3<f32>, end: &Vector3<f32>) -> Vector3<f32> {
    remap_device(end) - remap_device(start)
}

/// `from` を `to` に重ねる最短回転。どちらかがほぼゼロ長なら None。
/// 入力は正規化されていなくてよい。
pub fn shortest_arc(from: &Vector3<f32>, to: &Vector3<f32>) -> Option<UnitQuaternion<f32>> {
    let a = from.try_normalize(MIN_DIRECTION_NORM)?;
    let b = to.try_normalize(MIN_DIRECTION_NORM)?;
    let dot = a.dot(&b);

    if dot < -1.0 + 1e-6 {
        // 反平行: from に直交する軸まわりに 180 度
        let helper = if a.x.abs() < 0.9 { Vector3::x() } else { Vector3::z() };
        let axis = Unit::new_normalize(a.cross(&helper));
        return Some(UnitQuaternion::from_axis_angle(&axis, std::f32::consts::PI));
    }

    let c = a.cross(&b);
    Some(UnitQuaternion::new_normalize(Quaternion::new(1.0 + dot, c.x, c.y, c.z)))
}
