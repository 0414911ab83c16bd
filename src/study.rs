use crate::bus::BusSource;
use crate::debug::format_rect_vec;
use crate::error::{FaultError, Result};
use crate::fault::{FaultResult, FaultType};
use crate::line::LineAggregate;
use crate::math::xr_ratio;
use crate::network::SequenceNetwork;
use crate::opt::FaultOpt;
use crate::transformer::{PrimaryReferral, Transformer};

/// All fault types solved at one network point.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultStudy {
    pub network: SequenceNetwork,

    pub three_phase: FaultResult,
    pub line_to_line: FaultResult,

    /// `None` where the network has no zero-sequence path.
    pub single_line_to_ground: Option<FaultResult>,
    pub double_line_to_ground: Option<FaultResult>,

    /// X/R of the positive-sequence network.
    pub x_over_r_pos: f64,

    /// X/R of the ground-fault loop `2 Z1 + Z0`.
    pub x_over_r_zero: Option<f64>,
}

impl FaultStudy {
    pub fn solve(network: &SequenceNetwork, opt: &FaultOpt) -> Result<Self> {
        let vf = opt.prefault_voltage;
        if log::log_enabled!(log::Level::Trace) {
            let z: Vec<_> = std::iter::once(network.z1).chain(network.z0).collect();
            log::trace!("Z1, Z0 at {} kV (p.u.): {}", network.base.kv, format_rect_vec(&z));
        }

        let ground = |fault_type: FaultType| -> Result<Option<FaultResult>> {
            match network.solve(fault_type, vf) {
                Ok(result) => Ok(Some(result)),
                Err(FaultError::UnsupportedFaultType { .. }) => Ok(None),
                Err(err) => Err(err),
            }
        };

        let study = Self {
            network: *network,
            three_phase: network.solve(FaultType::ThreePhase, vf)?,
            line_to_line: network.solve(FaultType::LineToLine, vf)?,
            single_line_to_ground: ground(FaultType::SingleLineToGround)?,
            double_line_to_ground: ground(FaultType::DoubleLineToGround)?,
            x_over_r_pos: xr_ratio(network.z1)?,
            x_over_r_zero: network
                .z0
                .map(|z0| xr_ratio(2.0 * network.z1 + z0))
                .transpose()?,
        };

        if log::log_enabled!(log::Level::Debug) {
            for result in study.results() {
                log::debug!(
                    "{:>4} at {} kV: {:.0} A",
                    result.fault_type.label(),
                    network.base.kv,
                    result.fault_amps(&network.base)
                );
            }
        }
        Ok(study)
    }

    pub fn get(&self, fault_type: FaultType) -> Option<&FaultResult> {
        match fault_type {
            FaultType::ThreePhase => Some(&self.three_phase),
            FaultType::LineToLine => Some(&self.line_to_line),
            FaultType::SingleLineToGround => self.single_line_to_ground.as_ref(),
            FaultType::DoubleLineToGround => self.double_line_to_ground.as_ref(),
        }
    }

    /// Solved results in report order.
    pub fn results(&self) -> impl Iterator<Item = &FaultResult> + '_ {
        FaultType::ALL.into_iter().filter_map(|ft| self.get(ft))
    }

    /// Fault current magnitude (A) of `fault_type`, if solved.
    pub fn fault_amps(&self, fault_type: FaultType) -> Option<f64> {
        self.get(fault_type)
            .map(|result| result.fault_amps(&self.network.base))
    }
}

/// Study at the far end of a line trace.
pub fn line_study(bus: &BusSource, line: &LineAggregate, opt: &FaultOpt) -> Result<FaultStudy> {
    FaultStudy::solve(&SequenceNetwork::end_of_line(bus, line), opt)
}

/// Study on the secondary of a transformer, with the currents referred to
/// the primary.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryStudy {
    pub study: FaultStudy,
    pub referral: PrimaryReferral,
}

impl SecondaryStudy {
    /// Fault current (A) of `fault_type` seen on the primary.
    pub fn primary_amps(&self, fault_type: FaultType) -> Option<f64> {
        self.study
            .fault_amps(fault_type)
            .map(|amps| self.referral.primary_amps(fault_type, amps))
    }
}

pub fn secondary_study(
    bus: &BusSource,
    line: Option<&LineAggregate>,
    transformer: &Transformer,
    opt: &FaultOpt,
) -> Result<SecondaryStudy> {
    let network = SequenceNetwork::at_secondary(bus, line, transformer)?;
    Ok(SecondaryStudy {
        study: FaultStudy::solve(&network, opt)?,
        referral: transformer.referral(bus.kv)?,
    })
}
