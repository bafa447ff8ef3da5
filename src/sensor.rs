use crate::types::MotionSample;
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Dirección I2C por defecto del MPU6050
pub const MPU6050_ADDR: u16 = 0x68;

// Registros del MPU6050
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A; // DLPF
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_XOUT_H: u8 = 0x43;

// Factores de sensibilidad: ±4g → 8192 LSB/g, ±250°/s → 131 LSB/(°/s)
const ACCEL_SCALE: f32 = 8192.0;
const GYRO_SCALE: f32 = 131.0;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("I2C error: {0}")]
    I2c(#[from] LinuxI2CError),

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
}

/// Fuente de muestras de movimiento, una por tick.
///
/// `init` se llama una sola vez antes del lazo de control y su fallo es
/// fatal; un fallo de `read_motion` es transitorio y el lazo salta el tick.
/// La lectura es bloqueante con latencia acotada por el driver del bus.
pub trait Sensor {
    fn init(&mut self) -> Result<(), SensorError>;
    fn read_motion(&mut self) -> Result<MotionSample, SensorError>;
}

/// MPU6050 sobre el bus I2C de Linux (/dev/i2c-*)
pub struct Mpu6050 {
    dev: LinuxI2CDevice,
}

impl Mpu6050 {
    pub fn open(bus_path: &str) -> Result<Self, SensorError> {
        let dev = LinuxI2CDevice::new(bus_path, MPU6050_ADDR)?;
        Ok(Self { dev })
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.dev.smbus_write_byte_data(reg, value)?;
        Ok(())
    }

    /// Lectura en ráfaga de 3 ejes (2 bytes por eje, big-endian)
    fn read_axes(&mut self, start_reg: u8, scale: f32) -> Result<(f32, f32, f32), SensorError> {
        let data = self.dev.smbus_read_i2c_block_data(start_reg, 6)?;
        if data.len() < 6 {
            return Err(SensorError::ShortRead {
                expected: 6,
                actual: data.len(),
            });
        }

        let x = i16::from_be_bytes([data[0], data[1]]) as f32 / scale;
        let y = i16::from_be_bytes([data[2], data[3]]) as f32 / scale;
        let z = i16::from_be_bytes([data[4], data[5]]) as f32 / scale;
        Ok((x, y, z))
    }
}

impl Sensor for Mpu6050 {
    fn init(&mut self) -> Result<(), SensorError> {
        // Reset del dispositivo
        self.write_register(REG_PWR_MGMT_1, 0x80)?;
        thread::sleep(Duration::from_millis(100));

        // DLPF modo 5: ~10 Hz
        self.write_register(REG_CONFIG, 0x05)?;

        // Rango del acelerómetro a ±4g (AFS_SEL = 1)
        self.write_register(REG_ACCEL_CONFIG, 0x08)?;

        // Reloj del giroscopio X como fuente y salir de sleep
        self.write_register(REG_PWR_MGMT_1, 0x01)
    }

    fn read_motion(&mut self) -> Result<MotionSample, SensorError> {
        let (ax, ay, az) = self.read_axes(REG_ACCEL_XOUT_H, ACCEL_SCALE)?;
        let (gx, gy, gz) = self.read_axes(REG_GYRO_XOUT_H, GYRO_SCALE)?;
        Ok(MotionSample::new(ax, ay, az, gx, gy, gz))
    }
}
