//! Inverse-time overcurrent curves (IEEE C37.112 shapes as numbered on
//! SEL relays).

use crate::error::{FaultError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Cycles per second.
pub const SYSTEM_FREQUENCY: f64 = 60.0;

/// CT and PT ratios of the relay at the source end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RelayRatios {
    /// Current transformer ratio (CTR:1).
    pub ctr: f64,

    /// Potential transformer ratio (PTR:1).
    pub ptr: f64,
}

impl RelayRatios {
    /// Ratios from a study file with command-line overrides applied.
    /// Without file ratios both overrides must be given.
    pub fn resolve(
        file: Option<RelayRatios>,
        ctr: Option<f64>,
        ptr: Option<f64>,
    ) -> Result<Option<RelayRatios>> {
        match (file, ctr, ptr) {
            (Some(r), ctr, ptr) => Ok(Some(RelayRatios {
                ctr: ctr.unwrap_or(r.ctr),
                ptr: ptr.unwrap_or(r.ptr),
            })),
            (None, Some(ctr), Some(ptr)) => Ok(Some(RelayRatios { ctr, ptr })),
            (None, None, None) => Ok(None),
            (None, _, _) => Err(FaultError::Config(
                "both CTR and PTR are needed when the study has no relay ratios".to_string(),
            )),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum UCurve {
    /// Moderately inverse.
    U1,
    /// Inverse.
    U2,
    /// Very inverse.
    U3,
    /// Extremely inverse.
    U4,
    /// Short-time inverse.
    U5,
}

struct Coefficients {
    a: f64,
    b: f64,
    p: f64,
    tr: f64,
}

impl UCurve {
    pub const ALL: [UCurve; 5] = [UCurve::U1, UCurve::U2, UCurve::U3, UCurve::U4, UCurve::U5];

    fn coefficients(&self) -> Coefficients {
        let (a, b, p, tr) = match self {
            UCurve::U1 => (0.0226, 0.0104, 0.02, 1.08),
            UCurve::U2 => (0.180, 5.95, 2.0, 5.95),
            UCurve::U3 => (0.0963, 3.88, 2.0, 3.88),
            UCurve::U4 => (0.0352, 5.67, 2.0, 5.67),
            UCurve::U5 => (0.00262, 0.00342, 0.02, 0.323),
        };
        Coefficients { a, b, p, tr }
    }

    /// Operate time (s) at time dial `td` and pickup multiple `m > 1`.
    pub fn operate_time(&self, td: f64, m: f64) -> Result<f64> {
        check_dial(td)?;
        if !(m.is_finite() && m > 1.0) {
            return Err(FaultError::NumericDomain(format!(
                "relay does not operate below pickup (M = {})",
                m
            )));
        }
        let c = self.coefficients();
        Ok(td * (c.a + c.b / (m.powf(c.p) - 1.0)))
    }

    /// Electromechanical reset time (s) at time dial `td` and `0 <= m < 1`.
    pub fn reset_time(&self, td: f64, m: f64) -> Result<f64> {
        check_dial(td)?;
        if !(m.is_finite() && (0.0..1.0).contains(&m)) {
            return Err(FaultError::NumericDomain(format!(
                "relay does not reset above pickup (M = {})",
                m
            )));
        }
        let c = self.coefficients();
        Ok(td * c.tr / (1.0 - m * m))
    }
}

fn check_dial(td: f64) -> Result<()> {
    if td.is_finite() && td > 0.0 {
        Ok(())
    } else {
        Err(FaultError::NumericDomain(format!(
            "time dial must be positive, got {}",
            td
        )))
    }
}

impl fmt::Display for UCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for UCurve {
    type Err = FaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "U1" => Ok(UCurve::U1),
            "U2" => Ok(UCurve::U2),
            "U3" => Ok(UCurve::U3),
            "U4" => Ok(UCurve::U4),
            "U5" => Ok(UCurve::U5),
            _ => Err(FaultError::Parse {
                field: "curve",
                value: s.to_string(),
            }),
        }
    }
}

/// Multiple of pickup seen by a relay with the given tap and CT ratio.
pub fn pickup_multiple(primary_amps: f64, tap: f64, ctr: f64) -> Result<f64> {
    if !(primary_amps.is_finite() && primary_amps >= 0.0) {
        return Err(FaultError::NumericDomain(format!(
            "fault current must be a non-negative magnitude, got {} A",
            primary_amps
        )));
    }
    let pickup = tap * ctr;
    if !(pickup.is_finite() && pickup > 0.0) {
        return Err(FaultError::NumericDomain(format!(
            "pickup must be positive (tap {} x CTR {})",
            tap, ctr
        )));
    }
    Ok(primary_amps / pickup)
}

pub fn to_cycles(seconds: f64) -> f64 {
    seconds * SYSTEM_FREQUENCY
}

/// Operate or reset time of one relay for one fault current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveTimes {
    pub curve: UCurve,

    /// Multiple of pickup.
    pub m: f64,

    /// Seconds to trip, if above pickup.
    pub operate: Option<f64>,

    /// Seconds to reset, if below pickup.
    pub reset: Option<f64>,
}

pub fn curve_times(curve: UCurve, td: f64, tap: f64, ctr: f64, primary_amps: f64) -> Result<CurveTimes> {
    check_dial(td)?;
    let m = pickup_multiple(primary_amps, tap, ctr)?;
    let operate = if m > 1.0 { Some(curve.operate_time(td, m)?) } else { None };
    let reset = if m < 1.0 { Some(curve.reset_time(td, m)?) } else { None };
    log::debug!("{} TD {} at M = {:.3}: operate {:?}, reset {:?}", curve, td, m, operate, reset);
    Ok(CurveTimes {
        curve,
        m,
        operate,
        reset,
    })
}
