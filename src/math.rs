// Copyright (c) 2022-2024, Richard Lincoln. All rights reserved.

use crate::error::{FaultError, Result};
use num_complex::Complex64;
use serde::{Deserialize, Deserializer};

pub const J: Complex64 = Complex64 { re: 0.0, im: 1.0 };

pub const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// The 120 degree rotation operator `a = exp(j 2pi/3)`.
pub const A_OP: Complex64 = Complex64 {
    re: -0.5,
    im: 0.866_025_403_784_438_6,
};

/// `a^2 = exp(j 4pi/3)`.
pub const A2_OP: Complex64 = Complex64 {
    re: -0.5,
    im: -0.866_025_403_784_438_6,
};

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Reactance to resistance ratio of `z`.
///
/// A purely reactive impedance has no finite ratio and is reported as an
/// error instead of an infinity.
pub fn xr_ratio(z: Complex64) -> Result<f64> {
    if z.re == 0.0 {
        return Err(FaultError::NumericDomain(format!(
            "X/R undefined for impedance with zero resistance ({}j)",
            z.im
        )));
    }
    Ok(z.im / z.re)
}

/// Angle of `z` in degrees.
pub fn degrees(z: Complex64) -> f64 {
    z.arg().to_degrees()
}

/// Parses impedance text as written in the impedance sheets, e.g.
/// `"0.61+4.52j"`, `"(0.053+0.665j)"` or `"4.52j"`.
pub fn parse_complex(field: &'static str, text: &str) -> Result<Complex64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .map(|c| if c == 'j' || c == 'J' { 'i' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(FaultError::Parse {
            field,
            value: text.to_string(),
        });
    }
    let z = cleaned
        .parse::<Complex64>()
        .map_err(|_| FaultError::Parse {
            field,
            value: text.to_string(),
        })?;
    if !z.re.is_finite() || !z.im.is_finite() {
        return Err(FaultError::Parse {
            field,
            value: text.to_string(),
        });
    }
    Ok(z)
}

pub(crate) fn check_finite(what: &str, z: Complex64) -> Result<Complex64> {
    if z.re.is_finite() && z.im.is_finite() {
        Ok(z)
    } else {
        Err(FaultError::NumericDomain(format!("{} is not finite", what)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ComplexRepr {
    Text(String),
    Real(f64),
    Pair([f64; 2]),
}

/// Reads a complex value written as text, a bare real or `[re, im]`.
pub(crate) fn de_complex<'de, D>(deserializer: D) -> std::result::Result<Complex64, D::Error>
where
    D: Deserializer<'de>,
{
    match ComplexRepr::deserialize(deserializer)? {
        ComplexRepr::Text(s) => parse_complex("impedance", &s).map_err(serde::de::Error::custom),
        ComplexRepr::Real(re) => Ok(Complex64::new(re, 0.0)),
        ComplexRepr::Pair([re, im]) => Ok(Complex64::new(re, im)),
    }
}

/// As [`de_complex`], for cells that may be absent.
pub(crate) fn de_complex_opt<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Complex64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<ComplexRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ComplexRepr::Text(s)) => parse_complex("impedance", &s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(ComplexRepr::Real(re)) => Ok(Some(Complex64::new(re, 0.0))),
        Some(ComplexRepr::Pair([re, im])) => Ok(Some(Complex64::new(re, im))),
    }
}
