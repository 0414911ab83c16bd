use crate::error::{FaultError, Result};
use crate::math::SQRT_3;
use num_complex::Complex64;

/// System MVA base for all percent and per-unit impedances.
pub const MVA_BASE: f64 = 100.0;

/// Balanced pre-fault source voltage (p.u.).
pub const PREFAULT_VOLTAGE: f64 = 1.0;

/// Base quantities at one voltage level on the 100 MVA system base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Base {
    /// Nominal line-to-line voltage (kV).
    pub kv: f64,

    /// MVA base.
    pub mva: f64,

    /// Base impedance `kV^2 / MVA` (ohms).
    pub zbase: f64,

    /// Base current `MVA / (sqrt(3) kV)` (kA).
    pub ibase: f64,
}

impl Base {
    pub fn new(kv: f64) -> Result<Self> {
        if !(kv.is_finite() && kv > 0.0) {
            return Err(FaultError::NumericDomain(format!(
                "base voltage must be positive, got {} kV",
                kv
            )));
        }
        Ok(Self {
            kv,
            mva: MVA_BASE,
            zbase: kv * kv / MVA_BASE,
            ibase: MVA_BASE / (SQRT_3 * kv),
        })
    }

    /// Magnitude of a per-unit current in primary amperes.
    pub fn amps(&self, i_pu: Complex64) -> f64 {
        i_pu.norm() * self.ibase * 1000.0
    }

    /// Per-unit current as a primary-ampere phasor.
    pub fn amps_phasor(&self, i_pu: Complex64) -> Complex64 {
        i_pu * self.ibase * 1000.0
    }

    /// Per-unit phase voltage as a line-to-neutral kV phasor.
    pub fn kv_phasor(&self, v_pu: Complex64) -> Complex64 {
        v_pu * self.kv / SQRT_3
    }

    /// Per-unit impedance in primary ohms.
    pub fn ohms(&self, z_pu: Complex64) -> Complex64 {
        z_pu * self.zbase
    }
}

/// Nominal voltages are compared as entered in the impedance sheets.
pub(crate) fn same_kv(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Percent on the 100 MVA base to per-unit.
pub fn pct_to_pu(z_pct: Complex64) -> Complex64 {
    z_pct / 100.0
}

/// Primary ohms referred to the relay through the CT and PT ratios.
pub fn secondary_ohms(z_ohms: Complex64, ctr: f64, ptr: f64) -> Result<Complex64> {
    if !(ptr.is_finite() && ptr > 0.0) || !(ctr.is_finite() && ctr > 0.0) {
        return Err(FaultError::NumericDomain(format!(
            "CT/PT ratios must be positive (CTR {}, PTR {})",
            ctr, ptr
        )));
    }
    Ok(z_ohms * (ctr / ptr))
}

/// Full-load line current (A) of a three-phase rating in kVA at `kv`.
pub fn rated_amps(kva: f64, kv: f64) -> Result<f64> {
    if !(kv.is_finite() && kv > 0.0) {
        return Err(FaultError::NumericDomain(format!(
            "voltage must be positive, got {} kV",
            kv
        )));
    }
    Ok(kva * 1000.0 / (SQRT_3 * kv * 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use approx::assert_relative_eq;

    #[test]
    fn base_quantities_at_13_2_kv() -> anyhow::Result<()> {
        let base = Base::new(13.2)?;
        assert_relative_eq!(base.zbase, 1.7424, epsilon = 1e-12);
        assert_relative_eq!(base.ibase, 4.373_866, epsilon = 1e-6);
        assert_relative_eq!(base.amps(cmplx!(1.0)), 4373.866, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn rejects_zero_voltage() {
        assert!(matches!(Base::new(0.0), Err(FaultError::NumericDomain(_))));
        assert!(matches!(Base::new(f64::NAN), Err(FaultError::NumericDomain(_))));
    }

    #[test]
    fn ohm_conversions() -> anyhow::Result<()> {
        let base = Base::new(13.2)?;
        let z = base.ohms(pct_to_pu(cmplx!(26.2, 129.4)));
        assert_relative_eq!(z.re, 0.262 * 1.7424, epsilon = 1e-12);
        assert_relative_eq!(z.im, 1.294 * 1.7424, epsilon = 1e-12);

        let zs = secondary_ohms(z, 600.0, 100.0)?;
        assert_relative_eq!(zs.re, z.re * 6.0, epsilon = 1e-12);
        assert!(secondary_ohms(z, 600.0, 0.0).is_err());
        Ok(())
    }

    #[test]
    fn transformer_full_load_current() -> anyhow::Result<()> {
        assert_relative_eq!(rated_amps(300.0, 0.208)?, 832.7, epsilon = 0.05);
        assert_relative_eq!(rated_amps(1000.0, 13.2)?, 43.74, epsilon = 0.01);
        Ok(())
    }
}
