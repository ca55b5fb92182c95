//! Live-tunable parameters and the bridge that feeds them to the control law.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::control::FlightControl;
use crate::error::FlightError;
use crate::vector::Vector3;

pub const TRIM_ROLL: &str = "TrimRoll";
pub const TRIM_PITCH: &str = "TrimPitch";
pub const TRIM_YAW: &str = "TrimYaw";
pub const PID_GAIN_RATE_P: &str = "PIDGainRate_P";
pub const PID_GAIN_RATE_D: &str = "PIDGainRate_D";
pub const PID_GAIN_ANGLE_P: &str = "PIDGainAngle_P";
pub const PID_GAIN_RATE_YAW_P: &str = "PIDGainRateYaw_P";
pub const PID_GAIN_RATE_YAW_D: &str = "PIDGainRateYaw_D";

/// A resolved parameter whose value may change at any time.
pub trait ParamHandle {
    fn value(&self) -> f32;
}

/// Name → handle lookup. Parameters are assumed not to come and go at runtime,
/// so a handle resolved once stays valid.
pub trait ParamRegistry {
    type Handle: ParamHandle;

    fn find_param_by_name(&self, name: &str) -> Option<Self::Handle>;
}

/// Named `f32` stored as atomic bits so it can be written from a console task
/// while the flight task reads it.
#[derive(Debug)]
pub struct Param {
    name: &'static str,
    bits: AtomicU32,
}

impl Param {
    pub const fn new(name: &'static str, value: f32) -> Self {
        Self {
            name,
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl ParamHandle for &Param {
    fn value(&self) -> f32 {
        self.get()
    }
}

/// Fixed parameter table, usually a `static` array.
#[derive(Clone, Copy)]
pub struct ParamTable<'a> {
    params: &'a [Param],
}

impl<'a> ParamTable<'a> {
    pub const fn new(params: &'a [Param]) -> Self {
        Self { params }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Param> {
        self.params.iter()
    }

    /// Apply a `Name=value` assignment. Returns the updated parameter.
    pub fn apply(&self, line: &str) -> Result<&'a Param, FlightError> {
        let (name, value) = parse_assignment(line).ok_or(FlightError::BadAssignment)?;
        let param = self
            .params
            .iter()
            .find(|p| p.name == name)
            .ok_or(FlightError::UnknownParam)?;
        param.set(value);
        Ok(param)
    }
}

impl<'a> ParamRegistry for ParamTable<'a> {
    type Handle = &'a Param;

    fn find_param_by_name(&self, name: &str) -> Option<&'a Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Split `Name=value` (surrounding whitespace ignored).
pub fn parse_assignment(line: &str) -> Option<(&str, f32)> {
    let (name, value) = line.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value: f32 = value.trim().parse().ok()?;
    value.is_finite().then_some((name, value))
}

/// Rate/angle gains pushed as one call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    pub rate_p: f32,
    pub rate_d: f32,
    pub angle_p: f32,
}

/// Handles resolved once at task start.
///
/// Trims and yaw-rate gains are optional and default to "no change". The three
/// rate/angle gains are required: a missing one is a configuration fault
/// reported by [`ParamBridge::resolve`] before the first cycle runs.
pub struct ParamBridge<H> {
    trim: [Option<H>; 3],
    rate_p: H,
    rate_d: H,
    angle_p: H,
    yaw_rate: Option<(H, H)>,
}

impl<H: ParamHandle> ParamBridge<H> {
    pub fn resolve<R: ParamRegistry<Handle = H>>(registry: &R) -> Result<Self, FlightError> {
        let required = |name: &'static str| {
            registry.find_param_by_name(name).ok_or_else(|| {
                error!("parameter {} is missing", name);
                FlightError::MissingParam(name)
            })
        };

        let trim = [TRIM_ROLL, TRIM_PITCH, TRIM_YAW].map(|name| {
            let handle = registry.find_param_by_name(name);
            if handle.is_none() {
                warn!("parameter {} not found, trim defaults to 0", name);
            }
            handle
        });

        let rate_p = required(PID_GAIN_RATE_P)?;
        let rate_d = required(PID_GAIN_RATE_D)?;
        let angle_p = required(PID_GAIN_ANGLE_P)?;

        let yaw_rate = match (
            registry.find_param_by_name(PID_GAIN_RATE_YAW_P),
            registry.find_param_by_name(PID_GAIN_RATE_YAW_D),
        ) {
            (Some(p), Some(d)) => Some((p, d)),
            _ => None,
        };

        Ok(Self {
            trim,
            rate_p,
            rate_d,
            angle_p,
            yaw_rate,
        })
    }

    /// Current trim; each axis comes from its own handle, 0.0 when absent.
    pub fn trim(&self) -> Vector3 {
        let [roll, pitch, yaw] = self
            .trim
            .each_ref()
            .map(|h| h.as_ref().map_or(0.0, ParamHandle::value));
        Vector3::new(roll, pitch, yaw)
    }

    pub fn gains(&self) -> PidGains {
        PidGains {
            rate_p: self.rate_p.value(),
            rate_d: self.rate_d.value(),
            angle_p: self.angle_p.value(),
        }
    }

    /// Push the live values into the control law. Called every cycle.
    pub fn push<C: FlightControl>(&self, control: &mut C) {
        control.set_trim(self.trim());

        let gains = self.gains();
        control.set_pid_gains(gains.rate_p, gains.rate_d, gains.angle_p);

        if let Some((p, d)) = &self.yaw_rate {
            control.set_yaw_rate_gains(p.value(), d.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::tests::RecordingControl;

    fn full_table() -> [Param; 8] {
        [
            Param::new(TRIM_ROLL, 0.1),
            Param::new(TRIM_PITCH, 0.2),
            Param::new(TRIM_YAW, 0.3),
            Param::new(PID_GAIN_RATE_P, 1.0),
            Param::new(PID_GAIN_RATE_D, 2.0),
            Param::new(PID_GAIN_ANGLE_P, 3.0),
            Param::new(PID_GAIN_RATE_YAW_P, 4.0),
            Param::new(PID_GAIN_RATE_YAW_D, 5.0),
        ]
    }

    #[test]
    fn pushes_trim_and_gains() {
        let params = full_table();
        let bridge = ParamBridge::resolve(&ParamTable::new(&params)).unwrap();
        let mut control = RecordingControl::default();

        bridge.push(&mut control);

        assert_eq!(control.trim, Some(Vector3::new(0.1, 0.2, 0.3)));
        assert_eq!(control.gains, Some((1.0, 2.0, 3.0)));
        assert_eq!(control.yaw_gains, Some((4.0, 5.0)));
    }

    #[test]
    fn absent_yaw_trim_is_zero_not_pitch() {
        let params = [
            Param::new(TRIM_ROLL, 0.5),
            Param::new(TRIM_PITCH, -0.7),
            Param::new(PID_GAIN_RATE_P, 1.0),
            Param::new(PID_GAIN_RATE_D, 2.0),
            Param::new(PID_GAIN_ANGLE_P, 3.0),
        ];
        let bridge = ParamBridge::resolve(&ParamTable::new(&params)).unwrap();
        let trim = bridge.trim();
        assert_eq!(trim.x, 0.5);
        assert_eq!(trim.y, -0.7);
        assert_eq!(trim.z, 0.0);
    }

    #[test]
    fn yaw_trim_is_read_from_its_own_handle() {
        let params = full_table();
        params[1].set(9.0);
        let bridge = ParamBridge::resolve(&ParamTable::new(&params)).unwrap();
        assert_eq!(bridge.trim(), Vector3::new(0.1, 9.0, 0.3));
    }

    #[test]
    fn missing_gain_fails_at_resolve() {
        let params = [
            Param::new(PID_GAIN_RATE_P, 1.0),
            Param::new(PID_GAIN_ANGLE_P, 3.0),
        ];
        let err = ParamBridge::resolve(&ParamTable::new(&params)).err();
        assert_eq!(err, Some(FlightError::MissingParam(PID_GAIN_RATE_D)));
    }

    #[test]
    fn live_updates_reach_the_control_law() {
        let params = full_table();
        let table = ParamTable::new(&params);
        let bridge = ParamBridge::resolve(&table).unwrap();
        let mut control = RecordingControl::default();

        table.apply("PIDGainAngle_P = 6.5").unwrap();
        table.apply("TrimYaw=-1").unwrap();
        bridge.push(&mut control);

        assert_eq!(control.gains, Some((1.0, 2.0, 6.5)));
        assert_eq!(control.trim, Some(Vector3::new(0.1, 0.2, -1.0)));
    }

    #[test]
    fn yaw_gains_need_both_handles() {
        let params = [
            Param::new(PID_GAIN_RATE_P, 1.0),
            Param::new(PID_GAIN_RATE_D, 2.0),
            Param::new(PID_GAIN_ANGLE_P, 3.0),
            Param::new(PID_GAIN_RATE_YAW_P, 4.0),
        ];
        let bridge = ParamBridge::resolve(&ParamTable::new(&params)).unwrap();
        let mut control = RecordingControl::default();
        bridge.push(&mut control);
        assert_eq!(control.yaw_gains, None);
    }

    #[test]
    fn parses_assignments() {
        assert_eq!(parse_assignment("TrimRoll=0.25"), Some(("TrimRoll", 0.25)));
        assert_eq!(parse_assignment("  TrimYaw = -3 \r\n"), Some(("TrimYaw", -3.0)));
        assert_eq!(parse_assignment("TrimRoll"), None);
        assert_eq!(parse_assignment("=1.0"), None);
        assert_eq!(parse_assignment("TrimRoll=abc"), None);
        assert_eq!(parse_assignment("TrimRoll=inf"), None);
    }

    #[test]
    fn apply_rejects_unknown_names() {
        let params = full_table();
        let table = ParamTable::new(&params);
        assert_eq!(table.apply("Nope=1").err(), Some(FlightError::UnknownParam));
        assert_eq!(table.apply("garbage").err(), Some(FlightError::BadAssignment));
    }
}
