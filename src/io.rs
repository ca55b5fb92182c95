//! Receiver inputs and motor outputs in pulse-width terms.

use crate::config::{RECEIVER_CENTER_US, RECEIVER_MIN_US, RECEIVER_RANGE_US};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxChannel {
    Roll = 0,
    Pitch = 1,
    Throttle = 2,
    Yaw = 3,
    VarA = 4,
    VarB = 5,
}

impl RxChannel {
    pub const ALL: [RxChannel; 6] = [
        RxChannel::Roll,
        RxChannel::Pitch,
        RxChannel::Throttle,
        RxChannel::Yaw,
        RxChannel::VarA,
        RxChannel::VarB,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorChannel {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
}

/// Pulse-width I/O driver. Widths are absolute microseconds.
pub trait PulseIo {
    fn input_pulse_width(&self, channel: RxChannel) -> u32;
    fn set_output_pulse_width(&mut self, channel: MotorChannel, width_us: u32);
}

/// Pilot commands normalised from receiver pulses.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceiverInputs {
    /// -1..1
    pub roll: f32,
    /// -1..1
    pub pitch: f32,
    /// 0..1
    pub throttle: f32,
    /// -1..1
    pub yaw: f32,
    /// 0..1
    pub var_a: f32,
    /// 0..1
    pub var_b: f32,
}

impl ReceiverInputs {
    pub fn read<P: PulseIo + ?Sized>(io: &P) -> Self {
        Self {
            roll: centered(io.input_pulse_width(RxChannel::Roll)),
            pitch: centered(io.input_pulse_width(RxChannel::Pitch)),
            throttle: unipolar(io.input_pulse_width(RxChannel::Throttle)),
            yaw: centered(io.input_pulse_width(RxChannel::Yaw)),
            var_a: unipolar(io.input_pulse_width(RxChannel::VarA)),
            var_b: unipolar(io.input_pulse_width(RxChannel::VarB)),
        }
    }
}

fn centered(width_us: u32) -> f32 {
    let offset = width_us as f32 - RECEIVER_CENTER_US as f32;
    (offset / (RECEIVER_RANGE_US as f32 / 2.0)).clamp(-1.0, 1.0)
}

fn unipolar(width_us: u32) -> f32 {
    let offset = width_us as f32 - RECEIVER_MIN_US as f32;
    (offset / RECEIVER_RANGE_US as f32).clamp(0.0, 1.0)
}

/// Normalised motor commands, 0..1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorDemands {
    pub front_left: f32,
    pub front_right: f32,
    pub rear_left: f32,
    pub rear_right: f32,
}

impl MotorDemands {
    pub fn write<P: PulseIo + ?Sized>(&self, io: &mut P) {
        io.set_output_pulse_width(MotorChannel::FrontLeft, demand_to_us(self.front_left));
        io.set_output_pulse_width(MotorChannel::FrontRight, demand_to_us(self.front_right));
        io.set_output_pulse_width(MotorChannel::RearLeft, demand_to_us(self.rear_left));
        io.set_output_pulse_width(MotorChannel::RearRight, demand_to_us(self.rear_right));
    }
}

pub fn demand_to_us(demand: f32) -> u32 {
    RECEIVER_MIN_US + (demand.clamp(0.0, 1.0) * RECEIVER_RANGE_US as f32) as u32
}
