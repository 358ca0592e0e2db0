//! Stimulation program carried by `SET` commands.
//!
//! | Type | Frequencies (Hz)                           | Pulse widths (µs)              |
//! |------|--------------------------------------------|--------------------------------|
//! | EMS  | 500..=1000 step 100, 2000..=10000 step 1000 | 300, 500                       |
//! | TENS | 2..=10, 15..=50 step 5, 60..=120 step 10    | 50, 75, 100, 150, 200, 250, 300 |
//!
//! On/off times are 0.1–10 s in 0.1 s steps (stored in deciseconds);
//! session duration is 1–60 whole minutes.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde_json::Value;

use super::parse::Info;
use crate::error::CommandError;

pub const MUSCLES: [&str; 15] = [
    "ABDOMINALS",
    "OBLIQUES",
    "TRAPEZIUS",
    "LATISSIMUS DORSI",
    "BICEPS",
    "TRICEPS",
    "FRONT DELTOIDS",
    "REAR DELTOIDS",
    "VASTUS MEDIALIS",
    "VASTUS LATERALIS",
    "QUADRICEPS & GRACILIS",
    "HAMSTRINGS",
    "GLUTEUS MAXIMUS",
    "CALVES",
    "FOREARMS",
];

const EMS_PULSE_WIDTHS: [u32; 2] = [300, 500];
const TENS_PULSE_WIDTHS: [u32; 7] = [50, 75, 100, 150, 200, 250, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulationType {
    Ems,
    Tens,
}

impl StimulationType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "EMS" => Some(Self::Ems),
            "TENS" => Some(Self::Tens),
            _ => None,
        }
    }

    pub fn frequency_valid(self, hz: u32) -> bool {
        match self {
            Self::Ems => {
                ((500..=1000).contains(&hz) && hz % 100 == 0)
                    || ((2000..=10_000).contains(&hz) && hz % 1000 == 0)
            }
            Self::Tens => {
                (2..=10).contains(&hz)
                    || ((15..=50).contains(&hz) && hz % 5 == 0)
                    || ((60..=120).contains(&hz) && hz % 10 == 0)
            }
        }
    }

    pub fn pulse_width_valid(self, us: u32) -> bool {
        match self {
            Self::Ems => EMS_PULSE_WIDTHS.contains(&us),
            Self::Tens => TENS_PULSE_WIDTHS.contains(&us),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulationProgram {
    pub muscle: &'static str,
    pub frequency_hz: u32,
    pub pulse_width_us: u32,
    pub stimulation_type: StimulationType,
    pub on_time_ds: u16,
    pub off_time_ds: u16,
    pub duration_min: u8,
}

impl Default for StimulationProgram {
    fn default() -> Self {
        Self {
            muscle: MUSCLES[0],
            frequency_hz: 500,
            pulse_width_us: 300,
            stimulation_type: StimulationType::Ems,
            on_time_ds: 10,
            off_time_ds: 10,
            duration_min: 20,
        }
    }
}

impl StimulationProgram {
    /// Apply the fields present in `info` on top of `self`.
    ///
    /// The result is validated as a whole, since a type change moves the
    /// valid frequency and pulse-width sets. `self` is untouched on error.
    pub fn merged(&self, info: &Info) -> Result<Self, CommandError> {
        let mut next = self.clone();

        if let Some(v) = info.get("muscle") {
            let name = v.as_str().ok_or(CommandError::InvalidProgram("muscle"))?;
            next.muscle = MUSCLES
                .iter()
                .copied()
                .find(|m| *m == name)
                .ok_or(CommandError::InvalidProgram("muscle"))?;
        }
        if let Some(v) = info.get("stimulationType") {
            next.stimulation_type = v
                .as_str()
                .and_then(StimulationType::parse)
                .ok_or(CommandError::InvalidProgram("stimulationType"))?;
        }
        if let Some(v) = info.get("frequency") {
            next.frequency_hz = whole(v).ok_or(CommandError::InvalidProgram("frequency"))?;
        }
        if let Some(v) = info.get("pulseWidth") {
            next.pulse_width_us = whole(v).ok_or(CommandError::InvalidProgram("pulseWidth"))?;
        }
        if let Some(v) = info.get("onTime") {
            next.on_time_ds = deciseconds(v).ok_or(CommandError::InvalidProgram("onTime"))?;
        }
        if let Some(v) = info.get("offTime") {
            next.off_time_ds = deciseconds(v).ok_or(CommandError::InvalidProgram("offTime"))?;
        }
        if let Some(v) = info.get("duration") {
            next.duration_min = whole(v)
                .filter(|m| (1..=60).contains(m))
                .and_then(|m| u8::try_from(m).ok())
                .ok_or(CommandError::InvalidProgram("duration"))?;
        }

        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if !self.stimulation_type.frequency_valid(self.frequency_hz) {
            return Err(CommandError::InvalidProgram("frequency"));
        }
        if !self.stimulation_type.pulse_width_valid(self.pulse_width_us) {
            return Err(CommandError::InvalidProgram("pulseWidth"));
        }
        if !(1..=100).contains(&self.on_time_ds) {
            return Err(CommandError::InvalidProgram("onTime"));
        }
        if !(1..=100).contains(&self.off_time_ds) {
            return Err(CommandError::InvalidProgram("offTime"));
        }
        if !(1..=60).contains(&self.duration_min) {
            return Err(CommandError::InvalidProgram("duration"));
        }
        Ok(())
    }
}

/// Non-negative integer, also accepting integral floats (`500.0`).
fn whole(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = v.as_f64()?;
    if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f) {
        Some(f as u32)
    } else {
        None
    }
}

/// Seconds with one decimal → deciseconds.
fn deciseconds(v: &Value) -> Option<u16> {
    let tenths = v.as_f64()? * 10.0;
    let rounded = tenths.round();
    if (tenths - rounded).abs() > 1e-6 || !(0.0..=f64::from(u16::MAX)).contains(&rounded) {
        return None;
    }
    Some(rounded as u16)
}

/// Current program, shared by every connection.
pub struct ProgramStore {
    inner: BlockingMutex<CriticalSectionRawMutex, RefCell<StimulationProgram>>,
}

impl ProgramStore {
    pub fn new(program: StimulationProgram) -> Self {
        Self {
            inner: BlockingMutex::new(RefCell::new(program)),
        }
    }

    pub fn get(&self) -> StimulationProgram {
        self.inner.lock(|p| p.borrow().clone())
    }

    /// Merge `info` into the stored program; nothing changes on error.
    pub fn update(&self, info: &Info) -> Result<StimulationProgram, CommandError> {
        self.inner.lock(|p| {
            let next = p.borrow().merged(info)?;
            *p.borrow_mut() = next.clone();
            Ok(next)
        })
    }
}

impl Default for ProgramStore {
    fn default() -> Self {
        Self::new(StimulationProgram::default())
    }
}
