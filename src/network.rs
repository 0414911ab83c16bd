use crate::base::{pct_to_pu, Base};
use crate::bus::BusSource;
use crate::error::{FaultError, Result};
use crate::fault::{solve_fault, FaultResult, FaultType};
use crate::line::LineAggregate;
use crate::transformer::{Connection, Transformer};
use num_complex::Complex64;
use num_traits::Zero;

/// Total sequence impedances seen from a fault point, with the voltage
/// base of that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceNetwork {
    /// Positive-sequence impedance (p.u.). Negative sequence is equal.
    pub z1: Complex64,

    /// Zero-sequence impedance (p.u.), `None` where there is no
    /// zero-sequence path to the fault.
    pub z0: Option<Complex64>,

    pub base: Base,
}

impl SequenceNetwork {
    pub fn new(z1: Complex64, z0: Option<Complex64>, base: Base) -> Self {
        Self { z1, z0, base }
    }

    /// Fault at the substation bus.
    pub fn at_bus(bus: &BusSource) -> Self {
        Self::new(bus.z1_pu(), bus.z0_pu(), bus.base)
    }

    /// Fault at the far end of a line trace.
    pub fn end_of_line(bus: &BusSource, line: &LineAggregate) -> Self {
        Self::new(
            pct_to_pu(bus.z1 + line.z1),
            bus.z0.map(|z0| pct_to_pu(z0 + line.z0)),
            bus.base,
        )
    }

    /// Fault `miles` from the bus, taking the line impedance as uniformly
    /// distributed along its length.
    pub fn along_line(bus: &BusSource, line: &LineAggregate, miles: f64) -> Result<Self> {
        if !(miles >= 0.0 && miles <= line.length_mi) {
            return Err(FaultError::NumericDomain(format!(
                "distance {} mi is outside the line (0 to {} mi)",
                miles, line.length_mi
            )));
        }
        let (z1, z0) = line.per_mile_pu()?;
        Ok(Self::at_bus(bus).extend(z1 * miles, z0 * miles))
    }

    /// Fault on the secondary terminals of a transformer fed from the bus
    /// through an optional line trace.
    ///
    /// The zero-sequence network depends on the winding connection: a Δ-Yg
    /// unit isolates the primary so only the transformer impedance remains,
    /// Yg-Yg passes the whole primary zero-sequence path through, and Δ-Δ
    /// or Y-Y units give no ground return.
    pub fn at_secondary(
        bus: &BusSource,
        line: Option<&LineAggregate>,
        transformer: &Transformer,
    ) -> Result<Self> {
        let (line_z1, line_z0) = match line {
            Some(line) => (line.z1, line.z0),
            None => (Complex64::zero(), Complex64::zero()),
        };

        let z1 = pct_to_pu(bus.z1 + line_z1 + transformer.z1);
        let z0 = match transformer.connection {
            Connection::DeltaGroundedWye => Some(pct_to_pu(transformer.z0)),
            Connection::GroundedWyeGroundedWye => bus
                .z0
                .map(|bus_z0| pct_to_pu(bus_z0 + line_z0 + transformer.z0)),
            Connection::DeltaDelta | Connection::WyeWye => None,
        };

        Ok(Self::new(z1, z0, Base::new(transformer.sec_kv)?))
    }

    /// Adds series impedance. A missing zero-sequence network stays missing.
    pub fn extend(&self, z1: Complex64, z0: Complex64) -> Self {
        Self::new(self.z1 + z1, self.z0.map(|z| z + z0), self.base)
    }

    pub fn solve(&self, fault_type: FaultType, vf: f64) -> Result<FaultResult> {
        solve_fault(self.z1, self.z0, fault_type, vf)
    }
}
