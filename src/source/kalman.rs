use nalgebra::{Matrix3, Matrix3x6, Matrix6, Vector3, Vector6};

/// 等速度モデルのカルマンフィルタ（関節1つ分）
///
/// 状態: [x, y, z, vx, vy, vz]。指令加速度は 0 とする。
pub struct JointKalman {
    a: Matrix6<f64>,
    c: Matrix3x6<f64>,
    /// プロセスノイズ共分散
    ex: Matrix6<f64>,
    /// 観測ノイズ共分散
    ez: Matrix3<f64>,
    p: Matrix6<f64>,
    state: Option<Vector6<f64>>,
}

impl JointKalman {
    pub fn new(dt: f32, measurement_noise: f32, process_noise: f32) -> Self {
        let dt = dt as f64;
        let q = process_noise as f64;

        let mut a = Matrix6::identity();
        for i in 0..3 {
            a[(i, i + 3)] = dt;
        }

        let mut c = Matrix3x6::zeros();
        for i in 0..3 {
            c[(i, i)] = 1.0;
        }

        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        let mut ex = Matrix6::zeros();
        for i in 0..3 {
            ex[(i, i)] = dt4 / 4.0;
            ex[(i, i + 3)] = dt3 / 2.0;
            ex[(i + 3, i)] = dt3 / 2.0;
            ex[(i + 3, i + 3)] = dt2;
        }
        let ex = ex * (q * q);

        Self {
            a,
            c,
            ex,
            ez: Matrix3::identity() * measurement_noise as f64,
            p: ex,
            state: None,
        }
    }

    /// 観測値を入力してフィルタ済み位置を返す。初回は観測値をそのまま返す。
    pub fn filter(&mut self, measured: Vector3<f32>) -> Vector3<f32> {
        let z = measured.cast::<f64>();
        let state = match self.state {
            Some(state) => state,
            None => {
                self.state = Some(Vector6::new(z.x, z.y, z.z, 0.0, 0.0, 0.0));
                return measured;
            }
        };

        // predict
        let predicted = self.a * state;
        self.p = self.a * self.p * self.a.transpose() + self.ex;

        // update
        let s = self.c * self.p * self.c.transpose() + self.ez;
        let estimate = match s.try_inverse() {
            Some(s_inv) => {
                let k = self.p * self.c.transpose() * s_inv;
                self.p = (Matrix6::identity() - k * self.c) * self.p;
                predicted + k * (z - self.c * predicted)
            }
            None => predicted,
        };
        self.state = Some(estimate);

        Vector3::new(estimate[0], estimate[1], estimate[2]).cast::<f32>()
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.p = self.ex;
    }
}
