use micromath::F32Ext;

use crate::vector::Vector3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Quaternion {
    /// Rotate `v` from the body frame to the earth frame.
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        let Quaternion { w, x, y, z } = *self;
        Vector3::new(
            v.x * (w * w + x * x - y * y - z * z)
                + v.y * 2.0 * (x * y - w * z)
                + v.z * 2.0 * (x * z + w * y),
            v.x * 2.0 * (x * y + w * z)
                + v.y * (w * w - x * x + y * y - z * z)
                + v.z * 2.0 * (y * z - w * x),
            v.x * 2.0 * (x * z - w * y)
                + v.y * 2.0 * (y * z + w * x)
                + v.z * (w * w - x * x - y * y + z * z),
        )
    }

    /// Rotate `v` from the earth frame to the body frame.
    pub fn rotate_inverse(&self, v: Vector3) -> Vector3 {
        Quaternion {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
        .rotate(v)
    }

    /// Advance by body rate `omega` (rad/s) over `dt`, then renormalise.
    fn integrate(&mut self, omega: Vector3, dt: f32) {
        let half = 0.5 * dt;
        let Quaternion { w, x, y, z } = *self;
        let q = Quaternion {
            w: w + (-x * omega.x - y * omega.y - z * omega.z) * half,
            x: x + (w * omega.x + y * omega.z - z * omega.y) * half,
            y: y + (w * omega.y - x * omega.z + z * omega.x) * half,
            z: z + (w * omega.z + x * omega.y - y * omega.x) * half,
        };
        let norm = (q.w * q.w + q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
        if norm > 0.0 {
            let k = norm.recip();
            *self = Quaternion {
                w: q.w * k,
                x: q.x * k,
                y: q.y * k,
                z: q.z * k,
            };
        }
    }

    /// Roll, pitch, yaw (rad)
    pub fn euler(&self) -> Vector3 {
        let Quaternion { w, x, y, z } = *self;

        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));

        let sinp = 2.0 * (w * y - z * x);
        let pitch = if sinp.abs() >= 1.0 {
            core::f32::consts::FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        };

        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        Vector3::new(roll, pitch, yaw)
    }
}

/// Mahony complementary filter on accel (+ optional mag) with PI feedback.
pub struct Mahony {
    kp: f32,
    ki: f32,
    integral: Vector3,
    q: Quaternion,
}

impl Default for Mahony {
    fn default() -> Self {
        Self::new(2.0, 0.005)
    }
}

impl Mahony {
    pub fn new(kp: f32, ki: f32) -> Self {
        Self {
            kp,
            ki,
            integral: Vector3::ZERO,
            q: Quaternion::default(),
        }
    }

    pub fn quaternion(&self) -> Quaternion {
        self.q
    }

    /// Fuse one sample. Gyro in rad/s; accel and mag only need consistent
    /// units since they are normalised. A zero mag falls back to 6-DOF.
    pub fn update(&mut self, dt: f32, gyro: Vector3, accel: Vector3, mag: Vector3) {
        let Some(a) = normalize(accel) else {
            // Free fall or dead sensor: integrate gyro only
            self.q.integrate(gyro, dt);
            return;
        };

        // Gravity as the current estimate sees it
        let v = self.q.rotate_inverse(Vector3::new(0.0, 0.0, 1.0));
        let mut error = a.cross(v);

        if let Some(m) = normalize(mag) {
            // Earth field flattened onto the north/down plane, back in body frame
            let h = self.q.rotate(m);
            let b = Vector3::new((h.x * h.x + h.y * h.y).sqrt(), 0.0, h.z);
            let w = self.q.rotate_inverse(b);
            error = error + m.cross(w);
        }

        if self.ki > 0.0 {
            self.integral = self.integral + error * (self.ki * dt);
        } else {
            self.integral = Vector3::ZERO;
        }

        let omega = gyro + error * self.kp + self.integral;
        self.q.integrate(omega, dt);
    }

    pub fn euler(&self) -> Vector3 {
        self.q.euler()
    }
}

fn normalize(v: Vector3) -> Option<Vector3> {
    let norm = v.dot(v).sqrt();
    (norm > 0.0).then(|| v * norm.recip())
}
