use crate::base::Base;
use crate::debug::format_polar_vec;
use crate::error::{FaultError, Result};
use crate::math::{check_finite, xr_ratio, J, SQRT_3};
use crate::seq::{seq_to_phase, Abc, Seq};
use num_complex::Complex64;
use num_traits::Zero;
use std::fmt;
use std::str::FromStr;

/// Classical shunt fault types.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum FaultType {
    /// Balanced fault between all three phases.
    ThreePhase,
    /// Phase B to phase C.
    LineToLine,
    /// Phase A to ground.
    SingleLineToGround,
    /// Phases B and C to ground.
    DoubleLineToGround,
}

impl FaultType {
    /// Report order: ABC, AG, BC, BCG.
    pub const ALL: [FaultType; 4] = [
        FaultType::ThreePhase,
        FaultType::SingleLineToGround,
        FaultType::LineToLine,
        FaultType::DoubleLineToGround,
    ];

    /// Short phase label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            FaultType::ThreePhase => "ABC",
            FaultType::LineToLine => "BC",
            FaultType::SingleLineToGround => "AG",
            FaultType::DoubleLineToGround => "BCG",
        }
    }

    /// Ground faults need a zero-sequence path.
    pub fn is_ground(&self) -> bool {
        matches!(
            self,
            FaultType::SingleLineToGround | FaultType::DoubleLineToGround
        )
    }

    /// Index of the phase whose current is reported as "the" fault current.
    pub fn faulted_phase(&self) -> usize {
        match self {
            FaultType::ThreePhase | FaultType::SingleLineToGround => 0,
            FaultType::LineToLine | FaultType::DoubleLineToGround => 1,
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultType::ThreePhase => "three-phase",
            FaultType::LineToLine => "line-to-line",
            FaultType::SingleLineToGround => "single-line-to-ground",
            FaultType::DoubleLineToGround => "double-line-to-ground",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for FaultType {
    type Err = FaultError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace(['_', ' '], "-");
        match key.as_str() {
            "3ph" | "3-phase" | "abc" | "three-phase" => Ok(FaultType::ThreePhase),
            "ll" | "bc" | "line-to-line" => Ok(FaultType::LineToLine),
            "slg" | "lg" | "ag" | "line-to-ground" | "single-line-to-ground" => {
                Ok(FaultType::SingleLineToGround)
            }
            "dlg" | "llg" | "bcg" | "double-line-to-ground" => Ok(FaultType::DoubleLineToGround),
            _ => Err(FaultError::Parse {
                field: "fault type",
                value: s.to_string(),
            }),
        }
    }
}

/// Outcome of one fault-type solve at one network point. All values are
/// per-unit on the base of the faulted point.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultResult {
    pub fault_type: FaultType,

    /// Sequence currents `[I0, I1, I2]`.
    pub i_seq: Seq,

    /// Sequence voltages `[V0, V1, V2]`.
    pub v_seq: Seq,

    /// Phase currents `[IA, IB, IC]`.
    pub i_abc: Abc,

    /// Phase voltages `[VA, VB, VC]`.
    pub v_abc: Abc,

    /// X/R ratio of the impedance driving the fault.
    pub x_over_r: f64,
}

impl FaultResult {
    /// Current in the reported faulted phase (p.u.).
    pub fn fault_current(&self) -> Complex64 {
        self.i_abc[self.fault_type.faulted_phase()]
    }

    /// Fault current magnitude in primary amperes.
    pub fn fault_amps(&self, base: &Base) -> f64 {
        base.amps(self.fault_current())
    }

    /// Phase currents as primary-ampere phasors.
    pub fn phase_amps(&self, base: &Base) -> Abc {
        self.i_abc.map(|i| base.amps_phasor(i))
    }

    /// Phase voltages as line-to-neutral kV phasors.
    pub fn phase_kv(&self, base: &Base) -> Abc {
        self.v_abc.map(|v| base.kv_phasor(v))
    }
}

fn require_z0(z0: Option<Complex64>, fault_type: FaultType) -> Result<Complex64> {
    z0.ok_or(FaultError::UnsupportedFaultType {
        fault: fault_type,
        reason: "no zero-sequence path at the fault point",
    })
}

/// Solves one fault type from the total sequence impedances seen at the
/// fault point.
///
/// `z1` and `z0` are per-unit on the system base; the negative-sequence
/// impedance is taken equal to `z1`. `z0` is `None` where the network has
/// no zero-sequence path, in which case the ground fault types are
/// rejected. `vf` is the pre-fault voltage (p.u.).
pub fn solve_fault(
    z1: Complex64,
    z0: Option<Complex64>,
    fault_type: FaultType,
    vf: f64,
) -> Result<FaultResult> {
    if z1.is_zero() {
        return Err(FaultError::NumericDomain(
            "positive-sequence impedance is zero".to_string(),
        ));
    }
    check_finite("positive-sequence impedance", z1)?;
    if let Some(z0) = z0 {
        check_finite("zero-sequence impedance", z0)?;
    }
    let xr_pos = xr_ratio(z1)?;

    let vf = Complex64::new(vf, 0.0);
    let zero = Complex64::zero();
    let z2 = z1;

    let (i_seq, z0, x_over_r) = match fault_type {
        FaultType::ThreePhase => ([zero, vf / z1, zero], z0.unwrap_or(zero), xr_pos),
        FaultType::LineToLine => {
            let i1 = vf / (z1 * 2.0);
            ([zero, i1, -i1], z0.unwrap_or(zero), xr_pos)
        }
        FaultType::SingleLineToGround => {
            let z0 = require_z0(z0, fault_type)?;
            let z_loop = z1 + z2 + z0;
            let x_over_r = xr_ratio(z_loop)?;
            // 1/Zloop without a complex division
            let y = z_loop.conj() / z_loop.norm_sqr();
            let i = vf * y;
            ([i, i, i], z0, x_over_r)
        }
        FaultType::DoubleLineToGround => {
            let z0 = require_z0(z0, fault_type)?;
            let z_par = z0 + z2;
            if z_par.is_zero() {
                return Err(FaultError::NumericDomain(
                    "Z0 + Z2 is zero for double-line-to-ground fault".to_string(),
                ));
            }
            let z_f = (z2 * z0) / z_par;
            let x_over_r = xr_ratio(z1 + z_f)?;
            let i1 = vf / (z1 + z_f);
            let i2 = -i1 * (z0 / z_par);
            let i0 = -i1 * (z2 / z_par);
            ([i0, i1, i2], z0, x_over_r)
        }
    };

    let i_abc = match fault_type {
        FaultType::LineToLine => {
            let i_b = -J * SQRT_3 * i_seq[1];
            [zero, i_b, -i_b]
        }
        FaultType::SingleLineToGround => [i_seq[0] * 3.0, zero, zero],
        _ => seq_to_phase(&i_seq),
    };

    let v_seq = [
        -z0 * i_seq[0],
        vf - z1 * i_seq[1],
        -z2 * i_seq[2],
    ];
    let v_abc = seq_to_phase(&v_seq);

    for (what, values) in [
        ("sequence current", &i_seq),
        ("phase current", &i_abc),
        ("sequence voltage", &v_seq),
        ("phase voltage", &v_abc),
    ] {
        for &v in values.iter() {
            check_finite(what, v)?;
        }
    }

    log::trace!("{} I012: {}", fault_type, format_polar_vec(&i_seq));
    log::trace!("{} IABC: {}", fault_type, format_polar_vec(&i_abc));

    Ok(FaultResult {
        fault_type,
        i_seq,
        v_seq,
        i_abc,
        v_abc,
        x_over_r,
    })
}
