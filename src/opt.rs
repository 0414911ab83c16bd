use crate::base::PREFAULT_VOLTAGE;
use derive_builder::Builder;

/// Reference resolution of the distance-to-fault sweep.
pub const DEFAULT_SAMPLES: usize = 1000;

/// Calculation options.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct FaultOpt {
    /// Pre-fault source voltage (p.u.). Default value is 1.0.
    #[builder(default = "PREFAULT_VOLTAGE")]
    pub prefault_voltage: f64,

    /// Number of distances sampled by the fault locator, end points
    /// included. Default value is 1000.
    #[builder(default = "DEFAULT_SAMPLES")]
    pub samples: usize,
}

impl FaultOptBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(vf) = self.prefault_voltage {
            if !(vf.is_finite() && vf > 0.0) {
                return Err(format!("pre-fault voltage must be positive, got {}", vf));
            }
        }
        if let Some(samples) = self.samples {
            if samples < 2 {
                return Err(format!("at least 2 samples are required, got {}", samples));
            }
        }
        Ok(())
    }
}

impl Default for FaultOpt {
    fn default() -> Self {
        Self {
            prefault_voltage: PREFAULT_VOLTAGE,
            samples: DEFAULT_SAMPLES,
        }
    }
}
