use crate::bus::BusSource;
use crate::error::{FaultError, Result};
use crate::fault::{solve_fault, FaultType};
use crate::line::LineAggregate;
use crate::network::SequenceNetwork;
use crate::opt::FaultOpt;
use crate::traits::CurveSink;
use num_complex::Complex64;

/// Whether the measured current lies on the swept curve.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Confidence {
    /// Measured current is within the range of the curve.
    Matched,
    /// Measured current is above or below every point of the curve; the
    /// reported distance is the nearest end.
    OutOfRange,
}

/// Predicted fault current (A) at evenly spaced distances (miles).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepCurve {
    pub miles: Vec<f64>,
    pub amps: Vec<f64>,
}

impl SweepCurve {
    fn with_capacity(n: usize) -> Self {
        Self {
            miles: Vec::with_capacity(n),
            amps: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.miles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.miles.is_empty()
    }

    /// Smallest and largest predicted current.
    pub fn span(&self) -> (f64, f64) {
        self.amps
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &a| {
                (lo.min(a), hi.max(a))
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaultLocation {
    pub fault_type: FaultType,

    /// Measured fault current (A).
    pub measured_amps: f64,

    /// Estimated distance from the bus (miles).
    pub miles: f64,

    /// Predicted current at the estimated distance (A).
    pub predicted_amps: f64,

    /// `|predicted - measured|` (A).
    pub error_amps: f64,

    /// Distance between samples (miles).
    pub step: f64,

    pub confidence: Confidence,

    pub curve: SweepCurve,
}

/// Estimates the distance to a fault from its measured current.
///
/// The line impedance per mile is added to the bus impedance at
/// `opt.samples` evenly spaced distances from 0 to `total_miles`,
/// inclusive. The distance whose predicted current is closest to
/// `measured_amps` is returned; on a tie the nearest to the bus wins.
pub fn locate_fault(
    bus: &SequenceNetwork,
    per_mile: (Complex64, Complex64),
    total_miles: f64,
    fault_type: FaultType,
    measured_amps: f64,
    opt: &FaultOpt,
    sink: Option<&dyn CurveSink>,
) -> Result<FaultLocation> {
    if !(measured_amps.is_finite() && measured_amps > 0.0) {
        return Err(FaultError::InvalidMeasurement(measured_amps));
    }
    if !(total_miles.is_finite() && total_miles > 0.0) {
        return Err(FaultError::NumericDomain(format!(
            "line length must be positive, got {} mi",
            total_miles
        )));
    }
    let n = opt.samples;
    if n < 2 {
        return Err(FaultError::Config(format!(
            "at least 2 samples are required, got {}",
            n
        )));
    }

    let (z1_per_mile, z0_per_mile) = per_mile;
    let step = total_miles / (n - 1) as f64;

    let mut curve = SweepCurve::with_capacity(n);
    let mut best = 0;
    let mut best_error = f64::INFINITY;

    for i in 0..n {
        let miles = if i == n - 1 { total_miles } else { i as f64 * step };
        let z1 = bus.z1 + z1_per_mile * miles;
        let z0 = bus.z0.map(|z0| z0 + z0_per_mile * miles);

        let amps = solve_fault(z1, z0, fault_type, opt.prefault_voltage)?.fault_amps(&bus.base);
        let error = (amps - measured_amps).abs();
        if error < best_error {
            best = i;
            best_error = error;
        }

        if let Some(sink) = sink {
            sink.sample(i, miles, amps);
        }
        curve.miles.push(miles);
        curve.amps.push(amps);
    }

    let (lo, hi) = curve.span();
    log::trace!(
        "curve from {:.0} A at the bus to {:.0} A at {} mi",
        curve.amps[0],
        curve.amps[n - 1],
        total_miles
    );
    let confidence = if measured_amps < lo || measured_amps > hi {
        log::warn!(
            "measured {:.0} A is outside the {} curve ({:.0} to {:.0} A)",
            measured_amps,
            fault_type,
            lo,
            hi
        );
        Confidence::OutOfRange
    } else {
        Confidence::Matched
    };

    let location = FaultLocation {
        fault_type,
        measured_amps,
        miles: curve.miles[best],
        predicted_amps: curve.amps[best],
        error_amps: best_error,
        step,
        confidence,
        curve,
    };
    log::debug!(
        "{} fault of {:.0} A located at {:.3} mi ({:.0} A predicted)",
        fault_type,
        measured_amps,
        location.miles,
        location.predicted_amps
    );
    Ok(location)
}

/// Locates a fault on a line trace fed from `bus`.
pub fn locate_on_line(
    bus: &BusSource,
    line: &LineAggregate,
    fault_type: FaultType,
    measured_amps: f64,
    opt: &FaultOpt,
    sink: Option<&dyn CurveSink>,
) -> Result<FaultLocation> {
    locate_fault(
        &SequenceNetwork::at_bus(bus),
        line.per_mile_pu()?,
        line.length_mi,
        fault_type,
        measured_amps,
        opt,
        sink,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::build_bus_source;
    use crate::bus::tests::record;
    use crate::cmplx;
    use crate::line::{aggregate_line, SegmentKind, SegmentRecord};
    use crate::opt::FaultOptBuilder;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    fn feeder() -> Vec<SegmentRecord> {
        vec![SegmentRecord::conductor(
            SegmentKind::OverheadPrimary,
            "336",
            "AL",
            5.0 * 5280.0,
            cmplx!(0.61, 4.52),
            cmplx!(4.02, 14.35),
            13.2,
        )]
    }

    #[test]
    fn finds_midpoint_fault() -> anyhow::Result<()> {
        let opt = FaultOpt::default();
        let bus = build_bus_source(&record(13.2))?;
        let line = aggregate_line(&feeder())?;
        assert_relative_eq!(line.length_mi, 5.0, epsilon = 1e-12);

        for ft in FaultType::ALL {
            let mid = SequenceNetwork::along_line(&bus, &line, 2.5)?;
            let measured = mid.solve(ft, 1.0)?.fault_amps(&mid.base);

            let loc = locate_on_line(&bus, &line, ft, measured, &opt, None)?;
            assert!(
                (loc.miles - 2.5).abs() <= loc.step,
                "{}: {} mi",
                ft,
                loc.miles
            );
            assert_eq!(loc.confidence, Confidence::Matched);
            assert_eq!(loc.curve.len(), 1000);
            assert_relative_eq!(loc.step, 5.0 / 999.0, epsilon = 1e-12);
            assert_eq!(loc.curve.miles[0], 0.0);
            assert_eq!(loc.curve.miles[999], 5.0);
        }
        Ok(())
    }

    #[test]
    fn current_falls_with_distance() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let line = aggregate_line(&feeder())?;
        let loc = locate_on_line(
            &bus,
            &line,
            FaultType::SingleLineToGround,
            1000.0,
            &FaultOpt::default(),
            None,
        )?;
        assert!(loc.curve.amps.windows(2).all(|w| w[1] < w[0]));
        Ok(())
    }

    #[test]
    fn out_of_range_measurement() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let line = aggregate_line(&feeder())?;
        let opt = FaultOpt::default();
        let at_bus = bus.study.fault_amps(FaultType::ThreePhase).unwrap();

        let loc = locate_on_line(&bus, &line, FaultType::ThreePhase, at_bus * 2.0, &opt, None)?;
        assert_eq!(loc.confidence, Confidence::OutOfRange);
        assert_eq!(loc.miles, 0.0);

        let loc = locate_on_line(&bus, &line, FaultType::ThreePhase, 1.0, &opt, None)?;
        assert_eq!(loc.confidence, Confidence::OutOfRange);
        assert_eq!(loc.miles, 5.0);
        Ok(())
    }

    #[test]
    fn ties_go_to_the_bus() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let net = SequenceNetwork::at_bus(&bus);
        let zero = cmplx!();
        let loc = locate_fault(
            &net,
            (zero, zero),
            3.0,
            FaultType::ThreePhase,
            500.0,
            &FaultOpt::default(),
            None,
        )?;
        assert_eq!(loc.miles, 0.0);
        Ok(())
    }

    #[test]
    fn rejects_bad_inputs() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let line = aggregate_line(&feeder())?;
        let opt = FaultOpt::default();
        for measured in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                locate_on_line(&bus, &line, FaultType::ThreePhase, measured, &opt, None),
                Err(FaultError::InvalidMeasurement(_))
            ));
        }

        let net = SequenceNetwork::at_bus(&bus);
        let per_mile = line.per_mile_pu()?;
        assert!(matches!(
            locate_fault(&net, per_mile, 0.0, FaultType::ThreePhase, 100.0, &opt, None),
            Err(FaultError::NumericDomain(_))
        ));

        let mut rec = record(4.6);
        rec.z0 = None;
        let ungrounded = build_bus_source(&rec)?;
        assert!(matches!(
            locate_on_line(&ungrounded, &line, FaultType::SingleLineToGround, 100.0, &opt, None),
            Err(FaultError::UnsupportedFaultType { .. })
        ));
        Ok(())
    }

    struct CountSamples {
        count: Cell<usize>,
    }

    impl CurveSink for CountSamples {
        fn sample(&self, i: usize, _miles: f64, _amps: f64) {
            assert_eq!(i, self.count.get());
            self.count.set(i + 1);
        }
    }

    #[test]
    fn streams_curve_to_sink() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let line = aggregate_line(&feeder())?;
        let opt = FaultOptBuilder::default().samples(11).build()?;
        let sink = CountSamples {
            count: Cell::new(0),
        };
        let loc = locate_on_line(&bus, &line, FaultType::LineToLine, 2000.0, &opt, Some(&sink))?;
        assert_eq!(sink.count.get(), 11);
        assert_eq!(loc.curve.len(), 11);
        assert_relative_eq!(loc.curve.miles[5], 2.5, epsilon = 1e-12);
        Ok(())
    }
}
