use crate::base::{rated_amps, MVA_BASE};
use crate::error::{FaultError, Result};
use crate::fault::FaultType;
use crate::math::SQRT_3;
use derive_builder::Builder;
use num_complex::Complex64;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Winding connection of a distribution transformer.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Connection {
    DeltaGroundedWye,
    GroundedWyeGroundedWye,
    DeltaDelta,
    WyeWye,
}

impl Connection {
    /// Short symbol as written on one-line diagrams.
    pub fn symbol(&self) -> &'static str {
        match self {
            Connection::DeltaGroundedWye => "Δ-Yg",
            Connection::GroundedWyeGroundedWye => "Yg-Yg",
            Connection::DeltaDelta => "Δ-Δ",
            Connection::WyeWye => "Y-Y",
        }
    }

    /// Returns true if ground-fault current can flow on the secondary.
    pub fn has_ground_path(&self) -> bool {
        matches!(
            self,
            Connection::DeltaGroundedWye | Connection::GroundedWyeGroundedWye
        )
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Connection::DeltaGroundedWye => "Delta-GroundedWye",
            Connection::GroundedWyeGroundedWye => "GroundedWye-GroundedWye",
            Connection::DeltaDelta => "Delta-Delta",
            Connection::WyeWye => "Wye-Wye",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Connection {
    type Err = FaultError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "δyg" | "dyg" | "deltagroundedwye" => Ok(Connection::DeltaGroundedWye),
            "ygyg" | "groundedwyegroundedwye" => Ok(Connection::GroundedWyeGroundedWye),
            "δδ" | "dd" | "deltadelta" => Ok(Connection::DeltaDelta),
            "yy" | "wyewye" => Ok(Connection::WyeWye),
            _ => Err(FaultError::InvalidConnection(s.to_string())),
        }
    }
}

/// Typical nameplate impedance of standard three-phase units:
/// (kVA, %Z, X/R).
pub const PREDEFINED: [(f64, f64, f64); 12] = [
    (45.0, 2.7, 1.2),
    (75.0, 2.7, 1.6),
    (112.5, 3.1, 1.9),
    (150.0, 3.1, 2.2),
    (225.0, 3.1, 2.6),
    (300.0, 3.1, 2.9),
    (500.0, 4.3, 4.0),
    (750.0, 5.7, 4.9),
    (1000.0, 5.7, 5.5),
    (1500.0, 5.7, 6.5),
    (2000.0, 5.7, 7.3),
    (2500.0, 5.7, 7.9),
];

/// Nameplate %Z and X/R of a standard unit size.
pub fn predefined_impedance(kva: f64) -> Option<(f64, f64)> {
    PREDEFINED
        .iter()
        .find(|(size, _, _)| (size - kva).abs() < 1e-9)
        .map(|&(_, pct_z, x_over_r)| (pct_z, x_over_r))
}

/// Transformer as entered by the user. Missing %Z and X/R are taken from
/// the standard unit table.
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[builder(setter(into))]
pub struct TransformerSpec {
    pub kva: f64,

    pub connection: String,

    /// Secondary line-to-line voltage (kV).
    pub sec_kv: f64,

    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub pct_z: Option<f64>,

    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub x_over_r: Option<f64>,
}

impl TransformerSpec {
    pub fn build(&self) -> Result<Transformer> {
        let (pct_z, x_over_r) = match (self.pct_z, self.x_over_r) {
            (Some(pct_z), Some(x_over_r)) => (pct_z, x_over_r),
            (pct_z, x_over_r) => {
                let (std_z, std_xr) = predefined_impedance(self.kva).ok_or_else(|| {
                    FaultError::InvalidTransformer(format!(
                        "no standard impedance for {} kVA; give %Z and X/R",
                        self.kva
                    ))
                })?;
                (pct_z.unwrap_or(std_z), x_over_r.unwrap_or(std_xr))
            }
        };
        build_transformer(self.kva, &self.connection, self.sec_kv, pct_z, x_over_r)
    }
}

/// Three-phase distribution transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    pub kva: f64,
    pub connection: Connection,

    /// Secondary line-to-line voltage (kV).
    pub sec_kv: f64,

    /// Nameplate impedance (% on own rating).
    pub pct_z: f64,

    pub x_over_r: f64,

    /// Positive-sequence impedance (% at 100 MVA).
    pub z1: Complex64,

    /// Zero-sequence impedance of the unit (% at 100 MVA). Equal to `z1`.
    pub z0: Complex64,
}

impl Transformer {
    /// Standard unit of the given size.
    pub fn predefined(kva: f64, connection: &str, sec_kv: f64) -> Result<Self> {
        let (pct_z, x_over_r) = predefined_impedance(kva).ok_or_else(|| {
            FaultError::InvalidTransformer(format!("{} kVA is not a standard size", kva))
        })?;
        build_transformer(kva, connection, sec_kv, pct_z, x_over_r)
    }

    pub fn mva(&self) -> f64 {
        self.kva / 1000.0
    }

    /// Impedance angle (degrees).
    pub fn angle(&self) -> f64 {
        self.x_over_r.atan().to_degrees()
    }

    /// Secondary full-load current (A).
    pub fn rated_amps(&self) -> Result<f64> {
        rated_amps(self.kva, self.sec_kv)
    }

    /// Referral of secondary fault currents to a primary at `pri_kv`.
    pub fn referral(&self, pri_kv: f64) -> Result<PrimaryReferral> {
        if !(pri_kv.is_finite() && pri_kv > 0.0) {
            return Err(FaultError::NumericDomain(format!(
                "primary voltage must be positive, got {}",
                pri_kv
            )));
        }
        Ok(PrimaryReferral {
            pri_kv,
            ratio: self.sec_kv / pri_kv,
            connection: self.connection,
        })
    }
}

/// Builds a transformer from nameplate data.
///
/// The nameplate impedance is moved to the 100 MVA base and split by the
/// X/R ratio: `Z = %Z * (100 / MVA) * (cos θ + j sin θ)`, `θ = atan(X/R)`.
pub fn build_transformer(
    kva: f64,
    connection: &str,
    sec_kv: f64,
    pct_z: f64,
    x_over_r: f64,
) -> Result<Transformer> {
    let connection = connection.parse::<Connection>()?;
    if !(kva.is_finite() && kva > 0.0) {
        return Err(FaultError::InvalidTransformer(format!(
            "rating must be positive, got {} kVA",
            kva
        )));
    }
    if !(sec_kv.is_finite() && sec_kv > 0.0) {
        return Err(FaultError::InvalidTransformer(format!(
            "secondary voltage must be positive, got {} kV",
            sec_kv
        )));
    }
    if !(pct_z.is_finite() && pct_z > 0.0) {
        return Err(FaultError::InvalidTransformer(format!(
            "impedance must be positive, got {}%",
            pct_z
        )));
    }
    if !(x_over_r.is_finite() && x_over_r >= 0.0) {
        return Err(FaultError::InvalidTransformer(format!(
            "X/R must be non-negative, got {}",
            x_over_r
        )));
    }

    let theta = x_over_r.atan();
    let z1 = Complex64::from_polar(pct_z * (MVA_BASE / (kva / 1000.0)), theta);

    log::debug!(
        "transformer: {} kVA {} {:.2}% X/R {:.2}, Z1 = {:.2} % at {} MVA",
        kva,
        connection.symbol(),
        pct_z,
        x_over_r,
        z1,
        MVA_BASE
    );

    Ok(Transformer {
        kva,
        connection,
        sec_kv,
        pct_z,
        x_over_r,
        z1,
        z0: z1,
    })
}

/// Scales secondary fault currents to the primary side of the unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryReferral {
    pub pri_kv: f64,

    /// Secondary to primary voltage ratio.
    pub ratio: f64,

    pub connection: Connection,
}

impl PrimaryReferral {
    /// Factor applied to a secondary current of `fault_type`.
    ///
    /// On a Δ-Yg unit a secondary ground fault appears in two primary
    /// phase conductors and is reduced by a further `1/√3`.
    pub fn factor(&self, fault_type: FaultType) -> f64 {
        if self.connection == Connection::DeltaGroundedWye && fault_type.is_ground() {
            self.ratio / SQRT_3
        } else {
            self.ratio
        }
    }

    pub fn primary_amps(&self, fault_type: FaultType, secondary_amps: f64) -> f64 {
        secondary_amps * self.factor(fault_type)
    }
}
