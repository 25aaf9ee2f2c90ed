//! Outputs driven with each frame's distance.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::config::{PwmConfig, SerialConfig};

/// Receives one call per frame.
pub trait DistanceSink {
    fn emit(&mut self, distance: f32) -> io::Result<()>;

    /// Called for frames without a usable distance.
    fn idle(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logs each distance.
#[derive(Debug, Default)]
pub struct LogSink;

impl DistanceSink for LogSink {
    fn emit(&mut self, distance: f32) -> io::Result<()> {
        tracing::info!(distance, "dot ranged");
        Ok(())
    }

    fn idle(&mut self) -> io::Result<()> {
        tracing::info!("dot not found");
        Ok(())
    }
}

/// Duty value for a distance: `scale * cbrt(distance)`, saturating at `u16`.
pub fn pwm_duty(distance: f32, scale: f32) -> u16 {
    (distance.max(0.0).cbrt() * scale) as u16
}

/// Writes a duty value as decimal text, e.g. to a sysfs PWM channel.
#[derive(Debug)]
pub struct PwmSink<W: Write> {
    out: W,
    scale: f32,
}

impl<W: Write> PwmSink<W> {
    pub fn new(out: W, scale: f32) -> Self {
        Self { out, scale }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_duty(&mut self, duty: u16) -> io::Result<()> {
        writeln!(self.out, "{duty}")?;
        self.out.flush()
    }
}

impl PwmSink<File> {
    pub fn open(config: &PwmConfig) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).open(&config.path)?;
        Ok(Self::new(file, config.scale))
    }
}

impl<W: Write> DistanceSink for PwmSink<W> {
    fn emit(&mut self, distance: f32) -> io::Result<()> {
        self.write_duty(pwm_duty(distance, self.scale))
    }

    /// Drives the output to zero when nothing is in view.
    fn idle(&mut self) -> io::Result<()> {
        self.write_duty(0)
    }
}

/// Four-byte frame: sentinel, command, then millimeters high byte first.
pub fn encode_frame(sentinel: u8, command: u8, millimeters: u16) -> [u8; 4] {
    let [hi, lo] = millimeters.to_be_bytes();
    [sentinel, command, hi, lo]
}

/// Sends each distance over a serial link as a four-byte frame.
#[derive(Debug)]
pub struct SerialSink<W: Write> {
    out: W,
    sentinel: u8,
    command: u8,
    mm_per_unit: f32,
}

impl<W: Write> SerialSink<W> {
    pub fn new(out: W, config: &SerialConfig) -> Self {
        Self {
            out,
            sentinel: config.sentinel,
            command: config.command,
            mm_per_unit: config.mm_per_unit,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl SerialSink<File> {
    /// Opens the device for writing. Line speed is left to the system setup.
    pub fn open(config: &SerialConfig) -> io::Result<Self> {
        let file = open_device(&config.path)?;
        Ok(Self::new(file, config))
    }
}

fn open_device(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).open(path)
}

impl<W: Write> DistanceSink for SerialSink<W> {
    fn emit(&mut self, distance: f32) -> io::Result<()> {
        let mm = (distance * self.mm_per_unit).round().clamp(0.0, u16::MAX as f32) as u16;
        self.out
            .write_all(&encode_frame(self.sentinel, self.command, mm))?;
        self.out.flush()
    }
}
