//! HX711 load cell amplifier driver.
//!
//! Bit-bangs the HX711's two-wire interface (DOUT + PD_SCK) through
//! `embedded-hal` 1.0 pin traits, so the same driver runs on ESP-IDF
//! `PinDriver`s and on mock pins in tests.
//!
//! ## Protocol
//!
//! DOUT low = conversion ready.  Each of 24 PD_SCK pulses shifts one bit
//! out (MSB first, two's complement); a 25th pulse selects channel A,
//! gain 128 for the next conversion.
//!
//! ```text
//!  DOUT  ‾‾‾\____/ b23 \/ b22 \/ … \/ b0 \____________
//!  SCK   ______/‾\_/‾\_/‾\_ … _/‾\_/‾\____  (24 + 1 pulses)
//! ```
//!
//! Reported weight = (average raw − offset) / scale.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::WeightSensorPort;
use crate::error::SensorError;

/// Data bits per conversion.
const DATA_BITS: u8 = 24;
/// Extra pulses after the data: 1 = channel A, gain 128.
const GAIN_PULSES: u8 = 1;
/// PD_SCK high/low time.  The HX711 needs ≥ 0.2 µs; it powers down if
/// SCK stays high for > 60 µs.
const CLOCK_HALF_PERIOD_US: u32 = 1;
/// Readiness poll step.
const READY_POLL_MS: u32 = 1;

pub struct LoadCell<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    offset: i32,
    scale: f32,
    /// Per-conversion readiness budget while averaging.
    sample_timeout_ms: u32,
    conversions: u32,
}

impl<DOUT, SCK, D> LoadCell<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DOUT, mut sck: SCK, delay: D, sample_timeout_ms: u32) -> Result<Self, SensorError> {
        // SCK low = powered up.
        sck.set_low().map_err(|_| SensorError::GpioFailed)?;
        Ok(Self {
            dout,
            sck,
            delay,
            offset: 0,
            scale: 1.0,
            sample_timeout_ms,
            conversions: 0,
        })
    }

    /// DOUT low means a conversion is waiting.
    pub fn data_ready(&mut self) -> bool {
        self.dout.is_low().unwrap_or(false)
    }

    /// Poll for readiness for up to `timeout_ms`.
    pub fn wait_ready(&mut self, timeout_ms: u32) -> bool {
        let mut waited = 0;
        loop {
            if self.data_ready() {
                return true;
            }
            if waited >= timeout_ms {
                return false;
            }
            self.delay.delay_ms(READY_POLL_MS);
            waited += READY_POLL_MS;
        }
    }

    /// Clock out one conversion.  Caller must have seen DOUT low.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        let mut value: u32 = 0;
        for _ in 0..DATA_BITS {
            self.pulse()?;
            let bit = self.dout.is_high().map_err(|_| SensorError::GpioFailed)?;
            value = (value << 1) | u32::from(bit);
        }
        for _ in 0..GAIN_PULSES {
            self.pulse()?;
        }
        self.conversions = self.conversions.wrapping_add(1);
        Ok(sign_extend_24(value))
    }

    /// Average `samples` conversions, waiting for each in turn.
    pub fn read_average(&mut self, samples: u8) -> Result<f32, SensorError> {
        if samples == 0 {
            return Err(SensorError::NoSamples);
        }
        let mut sum: i64 = 0;
        for _ in 0..samples {
            if !self.wait_ready(self.sample_timeout_ms) {
                return Err(SensorError::NotReady);
            }
            sum += i64::from(self.read_raw()?);
        }
        Ok(sum as f32 / f32::from(samples))
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn conversions(&self) -> u32 {
        self.conversions
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(CLOCK_HALF_PERIOD_US);
        self.sck.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(CLOCK_HALF_PERIOD_US);
        Ok(())
    }
}

fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

impl<DOUT, SCK, D> WeightSensorPort for LoadCell<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    fn is_ready(&mut self, timeout_ms: u32) -> bool {
        self.wait_ready(timeout_ms)
    }

    fn read_averaged(&mut self, samples: u8) -> Result<f32, SensorError> {
        let raw = self.read_average(samples)?;
        Ok((raw - self.offset as f32) / self.scale)
    }

    fn set_scale(&mut self, factor: f32) {
        if factor == 0.0 || !factor.is_finite() {
            warn!("LoadCell: ignoring scale {}", factor);
            return;
        }
        self.scale = factor;
    }

    fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        let avg = self.read_average(samples)?;
        self.offset = avg.round() as i32;
        debug!("LoadCell: offset {}", self.offset);
        Ok(())
    }
}
