/// PID loop with derivative on measurement and a clamped integrator.
pub struct Pid {
    kp: f32,
    ki: f32,
    kd: f32,
    integral: f32,
    integral_limit: f32,
    output_limit: f32,
    prev_measurement: Option<f32>,
}

impl Pid {
    pub fn new(kp: f32, ki: f32, kd: f32, integral_limit: f32, output_limit: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral: 0.0,
            integral_limit: integral_limit.abs(),
            output_limit: output_limit.abs(),
            prev_measurement: None,
        }
    }

    /// P and D only; the integral term keeps its gain.
    pub fn set_gains(&mut self, kp: f32, kd: f32) {
        self.kp = kp;
        self.kd = kd;
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_measurement = None;
    }

    pub fn update(&mut self, dt: f32, setpoint: f32, measured: f32) -> f32 {
        let error = setpoint - measured;

        self.integral = (self.integral + self.ki * error * dt)
            .clamp(-self.integral_limit, self.integral_limit);

        // No kick on the first sample or on a setpoint step
        let derivative = match self.prev_measurement {
            Some(prev) if dt > 0.0 => (measured - prev) / dt,
            _ => 0.0,
        };
        self.prev_measurement = Some(measured);

        let output = self.kp * error + self.integral - self.kd * derivative;
        output.clamp(-self.output_limit, self.output_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_only() {
        let mut pid = Pid::new(0.5, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(pid.update(0.01, 1.0, 0.5), 0.25);
    }

    #[test]
    fn output_is_clamped() {
        let mut pid = Pid::new(10.0, 0.0, 0.0, 1.0, 0.3);
        assert_eq!(pid.update(0.01, 1.0, 0.0), 0.3);
        assert_eq!(pid.update(0.01, -1.0, 0.0), -0.3);
    }

    #[test]
    fn derivative_opposes_a_rising_measurement() {
        let mut pid = Pid::new(0.0, 0.0, 0.1, 1.0, 10.0);
        assert_eq!(pid.update(0.5, 0.0, 0.0), 0.0);
        // Measurement rose by 1 over 0.5 s
        assert_eq!(pid.update(0.5, 0.0, 1.0), -0.2);
    }

    #[test]
    fn integrator_is_bounded_and_reset() {
        let mut pid = Pid::new(0.0, 1.0, 0.0, 0.25, 10.0);
        for _ in 0..10 {
            pid.update(0.1, 1.0, 0.0);
        }
        assert_eq!(pid.update(0.1, 1.0, 0.0), 0.25);
        pid.reset();
        assert_eq!(pid.update(0.5, 0.0, 0.0), 0.0);
    }
}
