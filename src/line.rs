use crate::base::{pct_to_pu, same_kv};
use crate::bus::has_zero_sequence;
use crate::error::{FaultError, Result};
use crate::math::{de_complex, de_complex_opt};
use num_complex::Complex64;
use num_traits::Zero;
use serde::Deserialize;

/// Feet per mile. Impedances of overhead primary conductors on the 36 kV
/// and 11.5 kV systems are tabulated per mile.
pub const FEET_PER_MILE: f64 = 5280.0;

/// Impedances of all other conductors are tabulated per 1000 ft.
pub const FEET_PER_KFT: f64 = 1000.0;

/// Segment category from the line trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SegmentKind {
    #[serde(rename = "OH Pri. Conductor")]
    OverheadPrimary,
    #[serde(rename = "Reactor")]
    Reactor,
    /// Underground cable, secondary conductor, etc.
    #[serde(other)]
    Other,
}

/// One row of a line trace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SegmentRecord {
    pub kind: SegmentKind,

    #[serde(default)]
    pub conductor_size: String,

    #[serde(default)]
    pub conductor_type: String,

    /// Segment length (ft). Ignored for reactors.
    #[serde(default)]
    pub length_ft: f64,

    /// Positive-sequence impedance (% at 100 MVA per unit length). For a
    /// reactor, the impedance of the unit.
    #[serde(deserialize_with = "de_complex")]
    pub z1: Complex64,

    /// Zero-sequence impedance (% at 100 MVA per unit length). Required
    /// for conductors on circuits with a zero-sequence source.
    #[serde(default, deserialize_with = "de_complex_opt")]
    pub z0: Option<Complex64>,

    /// Nominal line-to-line voltage of the circuit (kV).
    pub voltage_level: f64,
}

impl SegmentRecord {
    pub fn conductor(
        kind: SegmentKind,
        conductor_size: &str,
        conductor_type: &str,
        length_ft: f64,
        z1: Complex64,
        z0: Complex64,
        voltage_level: f64,
    ) -> Self {
        Self {
            kind,
            conductor_size: conductor_size.to_string(),
            conductor_type: conductor_type.to_string(),
            length_ft,
            z1,
            z0: Some(z0),
            voltage_level,
        }
    }

    pub fn reactor(z1: Complex64, voltage_level: f64) -> Self {
        Self {
            kind: SegmentKind::Reactor,
            conductor_size: String::new(),
            conductor_type: String::new(),
            length_ft: 0.0,
            z1,
            z0: None,
            voltage_level,
        }
    }
}

/// Unit length the per-unit-length impedance of a segment is tabulated in.
pub fn conversion_factor(kind: SegmentKind, kv: f64) -> f64 {
    if kind == SegmentKind::OverheadPrimary && (same_kv(kv, 36.0) || same_kv(kv, 11.5)) {
        FEET_PER_MILE
    } else {
        FEET_PER_KFT
    }
}

/// Nominal voltage from the leading letter of a circuit number.
pub fn voltage_class_for_circuit(circuit: &str) -> Option<f64> {
    match circuit.trim().chars().next()?.to_ascii_uppercase() {
        'R' => Some(36.0),
        'L' => Some(13.2),
        'V' => Some(11.5),
        'H' => Some(4.6),
        _ => None,
    }
}

/// Impedance added by one segment (% at 100 MVA).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentContribution {
    pub kind: SegmentKind,
    pub z1: Complex64,
    pub z0: Complex64,
}

/// Series sum of a line trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineAggregate {
    /// Total positive-sequence impedance (% at 100 MVA).
    pub z1: Complex64,

    /// Total zero-sequence impedance (% at 100 MVA).
    pub z0: Complex64,

    /// Total conductor length (ft). Reactors add nothing.
    pub length_ft: f64,

    /// Total conductor length (miles).
    pub length_mi: f64,

    pub segments: Vec<SegmentContribution>,
}

impl LineAggregate {
    pub fn z1_pu(&self) -> Complex64 {
        pct_to_pu(self.z1)
    }

    pub fn z0_pu(&self) -> Complex64 {
        pct_to_pu(self.z0)
    }

    /// Average positive- and zero-sequence impedance per mile (p.u.).
    pub fn per_mile_pu(&self) -> Result<(Complex64, Complex64)> {
        if !(self.length_mi > 0.0) {
            return Err(FaultError::NumericDomain(
                "line has no conductor length".to_string(),
            ));
        }
        Ok((
            self.z1_pu() / self.length_mi,
            self.z0_pu() / self.length_mi,
        ))
    }
}

/// Sums the segments of a line trace into total sequence impedances and
/// length.
///
/// Conductor impedances are scaled by `length / conversion_factor`.
/// Reactors add their positive-sequence impedance unscaled and no
/// zero-sequence impedance or length. A conductor without Z0 is an error
/// unless its circuit is ungrounded (4.6 kV).
pub fn aggregate_line(segments: &[SegmentRecord]) -> Result<LineAggregate> {
    let mut agg = LineAggregate::default();

    for (index, seg) in segments.iter().enumerate() {
        let contribution = match seg.kind {
            SegmentKind::Reactor => {
                if !seg.z1.re.is_finite() || !seg.z1.im.is_finite() {
                    return Err(FaultError::NumericDomain(format!(
                        "reactor {} impedance is not finite",
                        index
                    )));
                }
                SegmentContribution {
                    kind: seg.kind,
                    z1: seg.z1,
                    z0: Complex64::zero(),
                }
            }
            _ => {
                if !(seg.length_ft.is_finite() && seg.length_ft > 0.0) {
                    return Err(FaultError::InvalidSegment {
                        index,
                        length: seg.length_ft,
                    });
                }
                let z0 = match seg.z0 {
                    Some(z0) => z0,
                    None if has_zero_sequence(seg.voltage_level) => {
                        return Err(FaultError::MissingField {
                            record: "segment",
                            field: "z0",
                        });
                    }
                    None => Complex64::zero(),
                };
                let scale = seg.length_ft / conversion_factor(seg.kind, seg.voltage_level);
                agg.length_ft += seg.length_ft;
                SegmentContribution {
                    kind: seg.kind,
                    z1: seg.z1 * scale,
                    z0: z0 * scale,
                }
            }
        };
        agg.z1 += contribution.z1;
        agg.z0 += contribution.z0;
        agg.segments.push(contribution);
    }
    agg.length_mi = agg.length_ft / FEET_PER_MILE;

    log::debug!(
        "line: {} segments, {:.0} ft, Z1 = {}, Z0 = {}",
        agg.segments.len(),
        agg.length_ft,
        agg.z1,
        agg.z0
    );
    Ok(agg)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cmplx;
    use approx::assert_relative_eq;

    pub(crate) fn trace() -> Vec<SegmentRecord> {
        vec![
            SegmentRecord::conductor(
                SegmentKind::Other,
                "1000",
                "AL",
                400.0,
                cmplx!(0.68, 0.74),
                cmplx!(2.05, 1.72),
                13.2,
            ),
            SegmentRecord::conductor(
                SegmentKind::OverheadPrimary,
                "336",
                "AL",
                2000.0,
                cmplx!(0.61, 4.52),
                cmplx!(4.02, 14.35),
                13.2,
            ),
            SegmentRecord::reactor(cmplx!(0.0, 15.0), 13.2),
        ]
    }

    #[test]
    fn sums_segments() -> anyhow::Result<()> {
        let agg = aggregate_line(&trace())?;
        // 0.4 * (0.68+0.74j) + 2.0 * (0.61+4.52j) + 15j
        assert_relative_eq!(agg.z1.re, 0.272 + 1.22, epsilon = 1e-12);
        assert_relative_eq!(agg.z1.im, 0.296 + 9.04 + 15.0, epsilon = 1e-12);
        assert_relative_eq!(agg.z0.re, 0.82 + 8.04, epsilon = 1e-12);
        assert_relative_eq!(agg.z0.im, 0.688 + 28.7, epsilon = 1e-12);
        assert_relative_eq!(agg.length_ft, 2400.0);
        assert_relative_eq!(agg.length_mi, 2400.0 / 5280.0, epsilon = 1e-12);
        assert_eq!(agg.segments.len(), 3);

        assert_eq!(aggregate_line(&trace())?, agg);
        Ok(())
    }

    #[test]
    fn reactor_has_no_length_or_zero_sequence() -> anyhow::Result<()> {
        let mut reactor = SegmentRecord::reactor(cmplx!(0.5, 15.0), 13.2);
        reactor.z0 = Some(cmplx!(9.0, 9.0));
        reactor.length_ft = 750.0;
        let agg = aggregate_line(&[reactor])?;
        assert_eq!(agg.z1, cmplx!(0.5, 15.0));
        assert_eq!(agg.z0, Complex64::zero());
        assert_eq!(agg.length_ft, 0.0);
        Ok(())
    }

    #[test]
    fn overhead_primary_per_mile_branch() -> anyhow::Result<()> {
        assert_eq!(conversion_factor(SegmentKind::OverheadPrimary, 36.0), FEET_PER_MILE);
        assert_eq!(conversion_factor(SegmentKind::OverheadPrimary, 11.5), FEET_PER_MILE);
        assert_eq!(conversion_factor(SegmentKind::OverheadPrimary, 13.2), FEET_PER_KFT);
        assert_eq!(conversion_factor(SegmentKind::Other, 36.0), FEET_PER_KFT);

        let seg = SegmentRecord::conductor(
            SegmentKind::OverheadPrimary,
            "795",
            "AL",
            5280.0,
            cmplx!(1.0, 2.0),
            cmplx!(3.0, 6.0),
            36.0,
        );
        let agg = aggregate_line(&[seg])?;
        assert_relative_eq!(agg.z1.re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(agg.z1.im, 2.0, epsilon = 1e-12);
        assert_relative_eq!(agg.length_mi, 1.0, epsilon = 1e-12);

        let (z1, z0) = agg.per_mile_pu()?;
        assert_relative_eq!(z1.im, 0.02, epsilon = 1e-12);
        assert_relative_eq!(z0.im, 0.06, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn rejects_non_positive_length() {
        let mut segments = trace();
        segments[1].length_ft = 0.0;
        assert_eq!(
            aggregate_line(&segments).unwrap_err(),
            FaultError::InvalidSegment {
                index: 1,
                length: 0.0
            }
        );
        segments[1].length_ft = -10.0;
        assert!(aggregate_line(&segments).is_err());
    }

    #[test]
    fn empty_trace() -> anyhow::Result<()> {
        let agg = aggregate_line(&[])?;
        assert_eq!(agg.z1, Complex64::zero());
        assert_eq!(agg.length_mi, 0.0);
        assert!(agg.per_mile_pu().is_err());
        Ok(())
    }

    #[test]
    fn circuit_voltage_class() {
        assert_eq!(voltage_class_for_circuit("R1234"), Some(36.0));
        assert_eq!(voltage_class_for_circuit("l0402"), Some(13.2));
        assert_eq!(voltage_class_for_circuit("V77"), Some(11.5));
        assert_eq!(voltage_class_for_circuit("H12"), Some(4.6));
        assert_eq!(voltage_class_for_circuit("X1"), None);
        assert_eq!(voltage_class_for_circuit(""), None);
    }

    #[test]
    fn reads_trace_rows() -> anyhow::Result<()> {
        let seg: SegmentRecord = serde_json::from_str(
            r#"{"kind": "OH Pri. Conductor", "conductor_size": "336", "conductor_type": "AL",
                "length_ft": 1200, "z1": "0.61+4.52j", "z0": "4.02+14.35j", "voltage_level": 13.2}"#,
        )?;
        assert_eq!(seg.kind, SegmentKind::OverheadPrimary);
        assert_eq!(seg.z1, cmplx!(0.61, 4.52));

        let seg: SegmentRecord = serde_json::from_str(
            r#"{"kind": "UG Pri. Cable", "length_ft": 50, "z1": [0.68, 0.74], "voltage_level": 13.2}"#,
        )?;
        assert_eq!(seg.kind, SegmentKind::Other);
        assert_eq!(seg.z0, None);
        Ok(())
    }

    #[test]
    fn conductor_without_zero_sequence() -> anyhow::Result<()> {
        let row = |kv: f64| -> anyhow::Result<SegmentRecord> {
            Ok(serde_json::from_str(&format!(
                r#"{{"kind": "OH Pri. Conductor", "length_ft": 2000, "z1": "0.61+4.52j", "voltage_level": {}}}"#,
                kv
            ))?)
        };

        let mut segments = trace();
        segments.insert(1, row(13.2)?);
        assert_eq!(
            aggregate_line(&segments).unwrap_err(),
            FaultError::MissingField {
                record: "segment",
                field: "z0"
            }
        );

        // ungrounded circuits carry no zero-sequence data
        let agg = aggregate_line(&[row(4.6)?])?;
        assert_eq!(agg.z0, Complex64::zero());
        assert_relative_eq!(agg.z1.im, 9.04, epsilon = 1e-12);
        Ok(())
    }
}
