//! Effect parameters and presets

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

/// Allowed range for `speed`
pub const SPEED_RANGE: (f64, f64) = (0.25, 3.0);
/// Allowed range for `pitch`
pub const PITCH_RANGE: (f64, f64) = (0.5, 2.0);
/// Allowed range for `volume`
pub const VOLUME_RANGE: (f64, f64) = (0.0, 2.0);
/// Allowed range for `reverb`
pub const REVERB_RANGE: (f64, f64) = (0.0, 1.0);
/// Allowed range for `echo`
pub const ECHO_RANGE: (f64, f64) = (0.0, 1.0);

/// Parameter set for one render
///
/// A new value replaces the old one on every change; the pipeline never
/// mutates a value it was given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    /// Playback-rate multiplier
    pub speed: f64,
    /// Frequency multiplier, 1.0 = unchanged
    pub pitch: f64,
    /// Linear gain multiplier
    pub volume: f64,
    /// Reverb wet fraction
    pub reverb: f64,
    /// Echo wet fraction, also scales feedback
    pub echo: f64,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
            volume: 1.0,
            reverb: 0.0,
            echo: 0.0,
        }
    }
}

impl EffectParams {
    /// Build a parameter set, rejecting out-of-range values
    pub fn new(speed: f64, pitch: f64, volume: f64, reverb: f64, echo: f64) -> Result<Self> {
        let params = Self {
            speed,
            pitch,
            volume,
            reverb,
            echo,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate every field against its range
    pub fn validate(&self) -> Result<()> {
        check_range("speed", self.speed, SPEED_RANGE)?;
        check_range("pitch", self.pitch, PITCH_RANGE)?;
        check_range("volume", self.volume, VOLUME_RANGE)?;
        check_range("reverb", self.reverb, REVERB_RANGE)?;
        check_range("echo", self.echo, ECHO_RANGE)?;
        Ok(())
    }

    /// Detune in cents equivalent to the `pitch` multiplier
    pub fn detune_cents(&self) -> f64 {
        self.pitch.log2() * 1200.0
    }

    /// True when any field differs from the default
    pub fn is_modified(&self) -> bool {
        *self != Self::default()
    }

    /// Field-wise comparison within `epsilon`
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.speed - other.speed).abs() < epsilon
            && (self.pitch - other.pitch).abs() < epsilon
            && (self.volume - other.volume).abs() < epsilon
            && (self.reverb - other.reverb).abs() < epsilon
            && (self.echo - other.echo).abs() < epsilon
    }
}

fn check_range(param: &str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(StudioError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: format!("{} to {}", min, max),
        })
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Named parameter sets offered as one-click effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    SlowedReverb,
    SpedUp,
    Nightcore,
}

impl Preset {
    /// All presets, in display order
    pub const ALL: [Preset; 3] = [Preset::SlowedReverb, Preset::SpedUp, Preset::Nightcore];

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Preset::SlowedReverb => "Slowed + Reverb",
            Preset::SpedUp => "Sped Up",
            Preset::Nightcore => "Nightcore",
        }
    }

    /// Machine name, as accepted by `from_name`
    pub fn name(&self) -> &'static str {
        match self {
            Preset::SlowedReverb => "slowed-reverb",
            Preset::SpedUp => "sped-up",
            Preset::Nightcore => "nightcore",
        }
    }

    /// Look a preset up by machine or display name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|preset| {
            preset.name().eq_ignore_ascii_case(name)
                || preset.display_name().eq_ignore_ascii_case(name)
        })
    }

    /// Parameter values for this preset
    pub fn params(&self) -> EffectParams {
        match self {
            Preset::SlowedReverb => EffectParams {
                speed: 0.85,
                pitch: 0.9,
                volume: 1.0,
                reverb: 0.6,
                echo: 0.3,
            },
            Preset::SpedUp => EffectParams {
                speed: 1.25,
                pitch: 1.1,
                volume: 1.0,
                reverb: 0.1,
                echo: 0.0,
            },
            Preset::Nightcore => EffectParams {
                speed: 1.3,
                pitch: 1.3,
                volume: 1.0,
                reverb: 0.2,
                echo: 0.1,
            },
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
