//! Muscle activation patterns for the simulator

use std::f32::consts::PI;

/// Activation envelope of the simulated muscle over time, in [0, 1]
#[derive(Debug, Clone, Copy)]
pub enum ActivationPattern {
    /// Fully relaxed muscle, baseline noise only
    Rest,
    /// Constant activation level
    Constant { level: f32 },
    /// Sinusoidal contract-release cycle
    Sinusoidal { frequency_hz: f32, amplitude: f32, baseline: f32 },
    /// On/off contraction bursts
    Burst { on_duration_s: f32, off_duration_s: f32, level: f32 },
}

impl ActivationPattern {
    /// Activation level at a given time, clamped to [0, 1]
    pub fn activation_at(&self, time_s: f32) -> f32 {
        let raw = match self {
            ActivationPattern::Rest => 0.0,
            ActivationPattern::Constant { level } => *level,
            ActivationPattern::Sinusoidal { frequency_hz, amplitude, baseline } => {
                baseline + amplitude * (2.0 * PI * frequency_hz * time_s).sin()
            }
            ActivationPattern::Burst { on_duration_s, off_duration_s, level } => {
                let cycle = on_duration_s + off_duration_s;
                if time_s % cycle < *on_duration_s {
                    *level
                } else {
                    0.0
                }
            }
        };
        raw.clamp(0.0, 1.0)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ActivationPattern::Rest => "rest",
            ActivationPattern::Constant { .. } => "constant activation",
            ActivationPattern::Sinusoidal { .. } => "sinusoidal contraction",
            ActivationPattern::Burst { .. } => "contraction bursts",
        }
    }
}

impl Default for ActivationPattern {
    fn default() -> Self {
        ActivationPattern::Constant { level: 0.4 }
    }
}
