use crate::base::{pct_to_pu, same_kv, Base};
use crate::error::{FaultError, Result};
use crate::math::parse_complex;
use crate::network::SequenceNetwork;
use crate::opt::FaultOpt;
use crate::study::FaultStudy;
use num_complex::Complex64;
use num_traits::Zero;
use serde::Deserialize;

/// Voltage class treated as ungrounded: no zero-sequence network is
/// computed or reported at this level.
pub const UNGROUNDED_KV: f64 = 4.6;

/// Returns true if buses at `kv` have a zero-sequence source.
pub fn has_zero_sequence(kv: f64) -> bool {
    !same_kv(kv, UNGROUNDED_KV)
}

/// One row of a bus impedance sheet.
///
/// Impedances are kept as the text found in the sheet so that blank and
/// malformed cells are reported when the bus is built rather than being
/// read as zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusRecord {
    /// Station name.
    pub station: String,

    /// Supplying system.
    pub supplied_from: String,

    /// Transformer number and kVA.
    pub transformer_kva: String,

    /// Tap ratio (kV).
    pub tap_ratio: String,

    /// Positive-sequence impedance (% at 100 MVA).
    pub z1: Option<String>,

    /// Voltage drop at 120 V base.
    pub d_e_120v: Option<f64>,

    /// Three-phase short-circuit MVA.
    pub short_circuit_mva: Option<f64>,

    /// Zero-sequence impedance (% at 100 MVA). Absent on 4.6 kV sheets.
    pub z0: Option<String>,

    /// Line-to-ground impedance (% at 100 MVA).
    pub z_lg: Option<String>,

    /// Line-to-ground short-circuit MVA.
    pub short_circuit_mva_lg: Option<f64>,

    /// Nominal line-to-line voltage (kV).
    pub voltage_level: Option<f64>,
}

fn cell(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Source impedance and available fault currents at a substation bus.
#[derive(Debug, Clone)]
pub struct BusSource {
    pub station: String,
    pub supplied_from: String,
    pub transformer_kva: String,
    pub tap_ratio: String,

    /// Nominal line-to-line voltage (kV).
    pub kv: f64,

    /// Positive-sequence impedance (% at 100 MVA).
    pub z1: Complex64,

    /// Zero-sequence impedance (% at 100 MVA), `None` where the voltage
    /// class has no zero-sequence path.
    pub z0: Option<Complex64>,

    pub base: Base,

    /// Fault currents at the bus itself.
    pub study: FaultStudy,
}

impl BusSource {
    pub fn new(record: &BusRecord, opt: &FaultOpt) -> Result<Self> {
        let kv = record.voltage_level.ok_or(FaultError::MissingField {
            record: "bus",
            field: "voltage_level",
        })?;
        let base = Base::new(kv)?;

        let z1 = cell(&record.z1).ok_or(FaultError::MissingField {
            record: "bus",
            field: "z1",
        })?;
        let z1 = parse_complex("z1", z1)?;

        let z0 = if has_zero_sequence(kv) {
            let text = cell(&record.z0).ok_or(FaultError::MissingField {
                record: "bus",
                field: "z0",
            })?;
            let z0 = parse_complex("z0", text)?;
            if z0.is_zero() {
                log::debug!("{}: zero Z0 read as no zero-sequence source", record.station);
                None
            } else {
                Some(z0)
            }
        } else {
            None
        };

        let network = SequenceNetwork::new(pct_to_pu(z1), z0.map(pct_to_pu), base);
        let study = FaultStudy::solve(&network, opt)?;

        Ok(Self {
            station: record.station.clone(),
            supplied_from: record.supplied_from.clone(),
            transformer_kva: record.transformer_kva.clone(),
            tap_ratio: record.tap_ratio.clone(),
            kv,
            z1,
            z0,
            base,
            study,
        })
    }

    /// Positive-sequence impedance (p.u.).
    pub fn z1_pu(&self) -> Complex64 {
        pct_to_pu(self.z1)
    }

    /// Zero-sequence impedance (p.u.).
    pub fn z0_pu(&self) -> Option<Complex64> {
        self.z0.map(pct_to_pu)
    }
}

/// Builds a bus source from one impedance sheet row with the default
/// options (1.0 p.u. pre-fault voltage).
pub fn build_bus_source(record: &BusRecord) -> Result<BusSource> {
    BusSource::new(record, &FaultOpt::default())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fault::FaultType;
    use approx::assert_relative_eq;

    pub(crate) fn record(kv: f64) -> BusRecord {
        BusRecord {
            station: "Brookside".to_string(),
            supplied_from: "138 kV".to_string(),
            transformer_kva: "1 - 20000".to_string(),
            tap_ratio: "132/13.2".to_string(),
            z1: Some("26.2+129.4j".to_string()),
            z0: Some("5.3+66.5j".to_string()),
            voltage_level: Some(kv),
            ..Default::default()
        }
    }

    #[test]
    fn bus_fault_currents() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        assert_relative_eq!(bus.base.zbase, 1.7424, epsilon = 1e-12);
        assert_relative_eq!(bus.z1_pu().re, 0.262, epsilon = 1e-12);

        let i3 = bus.study.fault_amps(FaultType::ThreePhase).unwrap();
        assert!(i3 > 3300.0 && i3 < 3330.0, "{}", i3);
        for ft in FaultType::ALL {
            assert!(bus.study.get(ft).is_some(), "{}", ft);
        }
        Ok(())
    }

    #[test]
    fn ungrounded_class_suppresses_ground_faults() -> anyhow::Result<()> {
        let mut rec = record(4.6);
        rec.z0 = None;
        let bus = build_bus_source(&rec)?;
        assert!(bus.z0.is_none());
        assert!(bus.study.get(FaultType::SingleLineToGround).is_none());
        assert!(bus.study.get(FaultType::DoubleLineToGround).is_none());
        assert!(bus.study.get(FaultType::ThreePhase).is_some());
        assert!(bus.study.get(FaultType::LineToLine).is_some());

        // a Z0 cell on a 4.6 kV sheet is still ignored
        let bus = build_bus_source(&record(4.6))?;
        assert!(bus.z0.is_none());
        Ok(())
    }

    #[test]
    fn missing_and_malformed_fields() {
        let mut rec = record(13.2);
        rec.z1 = Some("  ".to_string());
        assert_eq!(
            build_bus_source(&rec).unwrap_err(),
            FaultError::MissingField {
                record: "bus",
                field: "z1"
            }
        );

        let mut rec = record(13.2);
        rec.z0 = None;
        assert_eq!(
            build_bus_source(&rec).unwrap_err(),
            FaultError::MissingField {
                record: "bus",
                field: "z0"
            }
        );

        let mut rec = record(13.2);
        rec.voltage_level = None;
        assert!(matches!(
            build_bus_source(&rec),
            Err(FaultError::MissingField {
                field: "voltage_level",
                ..
            })
        ));

        let mut rec = record(13.2);
        rec.z1 = Some("26.2+q4".to_string());
        assert!(matches!(
            build_bus_source(&rec),
            Err(FaultError::Parse { field: "z1", .. })
        ));
    }
}
