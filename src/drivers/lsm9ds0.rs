use embassy_stm32::dma::NoDma;
use embassy_stm32::i2c::{Error, I2c, Instance};

use quad_flight::config::{LSM9DS0_G_ADDR, LSM9DS0_XM_ADDR};
use quad_flight::imu::InertialSensor;

// Gyro (G) registers
const WHO_AM_I_G: u8 = 0x0F;
const CTRL_REG1_G: u8 = 0x20;
const CTRL_REG4_G: u8 = 0x23;
const CTRL_REG5_G: u8 = 0x24;
const OUT_X_L_G: u8 = 0x28;
const FIFO_CTRL_REG_G: u8 = 0x2E;
const FIFO_SRC_REG_G: u8 = 0x2F;

// Accel/mag (XM) registers
const OUT_TEMP_L_XM: u8 = 0x05;
const OUT_X_L_M: u8 = 0x08;
const WHO_AM_I_XM: u8 = 0x0F;
const CTRL_REG0_XM: u8 = 0x1F;
const CTRL_REG1_XM: u8 = 0x20;
const CTRL_REG2_XM: u8 = 0x21;
const CTRL_REG5_XM: u8 = 0x24;
const CTRL_REG6_XM: u8 = 0x25;
const CTRL_REG7_XM: u8 = 0x26;
const OUT_X_L_A: u8 = 0x28;
const FIFO_CTRL_REG: u8 = 0x2E;
const FIFO_SRC_REG: u8 = 0x2F;

/// Sub-address MSB: auto-increment on multi-byte reads
const AUTO_INCREMENT: u8 = 0x80;

const FIFO_EN: u8 = 0x40;
const FIFO_MODE_STREAM: u8 = 0x40;
const FIFO_LEVEL_MASK: u8 = 0x1F;

/// Expected `(WHO_AM_I_XM << 8) | WHO_AM_I_G`
pub const WHO_AM_I: u16 = 0x49D4;

// ODR 380 Hz, cut-off 100 Hz, all axes on
const G_ODR_380_BW_100: u8 = 0xBF;
const G_SCALE_500DPS: u8 = 0x10;
// ODR 800 Hz, all axes on
const A_ODR_800: u8 = 0x97;
const A_SCALE_8G: u8 = 0x18;
// Temperature sensor on, high resolution, 25 Hz
const TEMP_EN_M_HIGH_RES_25HZ: u8 = 0xEC;
const M_SCALE_4GS: u8 = 0x20;
const M_CONTINUOUS: u8 = 0x00;

const G_FULL_SCALE_DPS: f32 = 500.0;
const A_FULL_SCALE_G: f32 = 8.0;
const M_FULL_SCALE_GAUSS: f32 = 4.0;

/// LSM9DS0 over blocking I2C.
///
/// Bus errors never reach the flight task: they are logged and counted, and
/// the affected read returns the last good value.
pub struct Lsm9ds0<'d, T: Instance> {
    i2c: I2c<'d, T, NoDma, NoDma>,
    gyro: [i16; 3],
    accel: [i16; 3],
    mag: [i16; 3],
    temp: i16,
    bus_errors: u32,
}

impl<'d, T: Instance> Lsm9ds0<'d, T> {
    pub fn new(i2c: I2c<'d, T, NoDma, NoDma>) -> Self {
        Self {
            i2c,
            gyro: [0; 3],
            accel: [0; 3],
            mag: [0; 3],
            temp: 0,
            bus_errors: 0,
        }
    }

    /// Configure both dies and return the combined WHO_AM_I.
    pub fn begin(&mut self) -> Result<u16, Error> {
        let g_id = self.read_reg(LSM9DS0_G_ADDR, WHO_AM_I_G)?;
        let xm_id = self.read_reg(LSM9DS0_XM_ADDR, WHO_AM_I_XM)?;
        let who_am_i = u16::from(xm_id) << 8 | u16::from(g_id);

        // Gyro: 500 dps, FIFO in stream mode
        self.write_reg(LSM9DS0_G_ADDR, CTRL_REG1_G, G_ODR_380_BW_100)?;
        self.write_reg(LSM9DS0_G_ADDR, CTRL_REG4_G, G_SCALE_500DPS)?;
        self.write_reg(LSM9DS0_G_ADDR, CTRL_REG5_G, FIFO_EN)?;
        self.write_reg(LSM9DS0_G_ADDR, FIFO_CTRL_REG_G, FIFO_MODE_STREAM)?;

        // Accel: 8 g, FIFO in stream mode
        self.write_reg(LSM9DS0_XM_ADDR, CTRL_REG0_XM, FIFO_EN)?;
        self.write_reg(LSM9DS0_XM_ADDR, CTRL_REG1_XM, A_ODR_800)?;
        self.write_reg(LSM9DS0_XM_ADDR, CTRL_REG2_XM, A_SCALE_8G)?;
        self.write_reg(LSM9DS0_XM_ADDR, FIFO_CTRL_REG, FIFO_MODE_STREAM)?;

        // Mag + temperature
        self.write_reg(LSM9DS0_XM_ADDR, CTRL_REG5_XM, TEMP_EN_M_HIGH_RES_25HZ)?;
        self.write_reg(LSM9DS0_XM_ADDR, CTRL_REG6_XM, M_SCALE_4GS)?;
        self.write_reg(LSM9DS0_XM_ADDR, CTRL_REG7_XM, M_CONTINUOUS)?;

        Ok(who_am_i)
    }

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Error> {
        self.i2c.blocking_write(addr, &[reg, value])
    }

    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8, Error> {
        let mut data = [0u8; 1];
        self.i2c.blocking_write_read(addr, &[reg], &mut data)?;
        Ok(data[0])
    }

    fn read_axes(&mut self, addr: u8, reg: u8) -> Result<[i16; 3], Error> {
        let mut data = [0u8; 6];
        self.i2c
            .blocking_write_read(addr, &[reg | AUTO_INCREMENT], &mut data)?;
        Ok([
            i16::from_le_bytes([data[0], data[1]]),
            i16::from_le_bytes([data[2], data[3]]),
            i16::from_le_bytes([data[4], data[5]]),
        ])
    }

    fn absorb<V>(&mut self, what: &str, result: Result<V, Error>) -> Option<V> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.bus_errors = self.bus_errors.wrapping_add(1);
                defmt::warn!("lsm9ds0 {} read failed: {} ({} total)", what, e, self.bus_errors);
                None
            }
        }
    }
}

impl<'d, T: Instance> InertialSensor for Lsm9ds0<'d, T> {
    fn fifo_count_gyro(&mut self) -> u8 {
        let src = self.read_reg(LSM9DS0_G_ADDR, FIFO_SRC_REG_G);
        self.absorb("gyro fifo", src)
            .map_or(0, |s| s & FIFO_LEVEL_MASK)
    }

    fn fifo_count_accel(&mut self) -> u8 {
        let src = self.read_reg(LSM9DS0_XM_ADDR, FIFO_SRC_REG);
        self.absorb("accel fifo", src)
            .map_or(0, |s| s & FIFO_LEVEL_MASK)
    }

    fn read_gyro(&mut self) -> [i16; 3] {
        let raw = self.read_axes(LSM9DS0_G_ADDR, OUT_X_L_G);
        if let Some(v) = self.absorb("gyro", raw) {
            self.gyro = v;
        }
        self.gyro
    }

    fn read_accel(&mut self) -> [i16; 3] {
        let raw = self.read_axes(LSM9DS0_XM_ADDR, OUT_X_L_A);
        if let Some(v) = self.absorb("accel", raw) {
            self.accel = v;
        }
        self.accel
    }

    fn read_mag(&mut self) -> [i16; 3] {
        let raw = self.read_axes(LSM9DS0_XM_ADDR, OUT_X_L_M);
        if let Some(v) = self.absorb("mag", raw) {
            self.mag = v;
        }
        self.mag
    }

    fn read_temp(&mut self) -> i16 {
        let mut data = [0u8; 2];
        let raw = self
            .i2c
            .blocking_write_read(LSM9DS0_XM_ADDR, &[OUT_TEMP_L_XM | AUTO_INCREMENT], &mut data);
        if self.absorb("temperature", raw).is_some() {
            // 12-bit two's complement, right justified
            self.temp = i16::from_le_bytes([data[0], data[1]]) << 4 >> 4;
        }
        self.temp
    }

    fn calc_gyro(&self, raw: i16) -> f32 {
        f32::from(raw) * (G_FULL_SCALE_DPS / 32768.0)
    }

    fn calc_accel(&self, raw: i16) -> f32 {
        f32::from(raw) * (A_FULL_SCALE_G / 32768.0)
    }

    fn calc_mag(&self, raw: i16) -> f32 {
        f32::from(raw) * (M_FULL_SCALE_GAUSS / 32768.0)
    }
}
