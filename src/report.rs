//! Plain-text result reports.

use crate::base::{secondary_ohms, Base};
use crate::bus::BusSource;
use crate::error::Result;
use crate::fault::FaultType;
use crate::line::LineAggregate;
use crate::locate::{Confidence, FaultLocation, SweepCurve};
use crate::math::degrees;
use crate::relay::{to_cycles, CurveTimes, RelayRatios};
use crate::study::{FaultStudy, SecondaryStudy};
use crate::transformer::Transformer;
use csv::Writer;
use num_complex::Complex64;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;

/// Lines of a text report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn append(&mut self, other: Report) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Current phasor in amperes, e.g. `3313∠-78.55° Amps`.
pub fn fmt_amps(amps: Complex64) -> String {
    if amps.norm() < 0.5 {
        return "0∠0.00° Amps".to_string();
    }
    format!("{:.0}∠{:.2}° Amps", amps.norm(), degrees(amps))
}

/// Rectangular impedance, e.g. `26.20+129.40j`.
pub fn fmt_rect(z: Complex64) -> String {
    let sign = if z.im < 0.0 { '-' } else { '+' };
    format!("{:.2}{}{:.2}j", z.re, sign, z.im.abs())
}

/// Polar impedance in ohms.
pub fn fmt_ohms(z: Complex64) -> String {
    format!("{:.2}∠{:.2}° Ω", z.norm(), degrees(z))
}

pub fn bus_summary(bus: &BusSource) -> Report {
    let mut r = Report::new();
    r.line(format!("Station: {}", bus.station));
    r.line(format!("Voltage: {} kV", bus.kv));
    r.line(format!("Supplied from (System): {}", bus.supplied_from));
    r.line(format!("Transformer(s): {} kVA", bus.transformer_kva));
    r.line(format!("Tap Ratio: {} kV", bus.tap_ratio));
    r.line(format!("% Z @ 100MVA: {}", fmt_rect(bus.z1)));
    if let Some(z0) = bus.z0 {
        r.line(format!("% Zo @ 100MVA: {}", fmt_rect(z0)));
    }
    r.append(study_summary(&bus.study, "Bus"));
    r
}

pub fn line_summary(
    line: &LineAggregate,
    base: &Base,
    relay: Option<&RelayRatios>,
) -> Result<Report> {
    let mut r = Report::new();
    r.line(format!("Z+ Total Line: {} %", fmt_rect(line.z1)));
    r.line(format!("Z0 Total Line: {} %", fmt_rect(line.z0)));
    r.line(format!(
        "Total Length: {:.0} ft - {:.3} mi",
        line.length_ft, line.length_mi
    ));

    let z1_ohms = base.ohms(line.z1_pu());
    let z0_ohms = base.ohms(line.z0_pu());
    r.line(format!("Z+ Primary: {}", fmt_ohms(z1_ohms)));
    r.line(format!("Z0 Primary: {}", fmt_ohms(z0_ohms)));

    if let Some(relay) = relay {
        r.line(format!("CTR: {}:1  PTR: {}:1", relay.ctr, relay.ptr));
        r.line(format!(
            "Z+ Secondary: {}",
            fmt_ohms(secondary_ohms(z1_ohms, relay.ctr, relay.ptr)?)
        ));
        r.line(format!(
            "Z0 Secondary: {}",
            fmt_ohms(secondary_ohms(z0_ohms, relay.ctr, relay.ptr)?)
        ));
    }
    Ok(r)
}

pub fn transformer_summary(t: &Transformer) -> Result<Report> {
    let mut r = Report::new();
    r.line(format!("KVA: {}", t.kva));
    r.line(format!("Z: {:.2}%", t.pct_z));
    r.line(format!("X/R: {:.2}", t.x_over_r));
    r.line(format!("Connection: {}", t.connection.symbol()));
    r.line(format!("Secondary Voltage: {} kV", t.sec_kv));
    r.line(format!("Z+ @ 100MVA: {} %", fmt_rect(t.z1)));
    r.line(format!("Full Load Current: {:.0} Amps", t.rated_amps()?));
    Ok(r)
}

/// X/R ratios, fault currents and the phase current table at one point.
pub fn study_summary(study: &FaultStudy, at: &str) -> Report {
    let base = &study.network.base;

    let mut r = Report::new();
    r.line(format!("X/R Positive Seq at {}: {:.2}", at, study.x_over_r_pos));
    if let Some(xr) = study.x_over_r_zero {
        r.line(format!("X/R Zero Seq at {}: {:.2}", at, xr));
    }
    r.blank();
    for result in study.results() {
        r.line(format!(
            "{}: {}",
            result.fault_type.label(),
            fmt_amps(base.amps_phasor(result.fault_current()))
        ));
    }
    r.blank();
    r.append(phase_table(study));
    r
}

/// Phase currents of every solved fault type.
pub fn phase_table(study: &FaultStudy) -> Report {
    let base = &study.network.base;

    let mut r = Report::new();
    for result in study.results() {
        let [a, b, c] = result.phase_amps(base);
        r.line(format!("{}:", result.fault_type.label()));
        r.line(format!(
            "A: {:<22}  B: {:<22}  C: {}",
            fmt_amps(a),
            fmt_amps(b),
            fmt_amps(c)
        ));
    }
    r
}

/// Secondary fault currents as seen on the transformer primary.
pub fn referred_summary(secondary: &SecondaryStudy) -> Report {
    let mut r = Report::new();
    r.line(format!(
        "Referred to {} kV primary ({}):",
        secondary.referral.pri_kv,
        secondary.referral.connection.symbol()
    ));
    for result in secondary.study.results() {
        if let Some(amps) = secondary.primary_amps(result.fault_type) {
            r.line(format!("{}: {:.0} Amps", result.fault_type.label(), amps));
        }
    }
    r
}

pub fn location_summary(location: &FaultLocation) -> Report {
    let mut r = Report::new();
    r.line(format!("Fault Type: {}", location.fault_type));
    r.line(format!("Measured Current: {:.0} Amps", location.measured_amps));
    r.line(format!(
        "Fault Location: {:.2} miles from station",
        location.miles
    ));
    r.line(format!(
        "Calculated Current: {:.0} Amps (difference {:.0} Amps)",
        location.predicted_amps, location.error_amps
    ));
    if location.confidence == Confidence::OutOfRange {
        let (lo, hi) = location.curve.span();
        r.line(format!(
            "Measured current is outside the calculated range ({:.0} to {:.0} Amps)",
            lo, hi
        ));
    }
    r
}

pub fn curve_summary(times: &CurveTimes) -> Report {
    let mut r = Report::new();
    r.line(format!("Curve: {}", times.curve));
    r.line(format!("Multiple of Pickup: {:.2}", times.m));
    match times.operate {
        Some(t) => r.line(format!(
            "Operation time: {:.2} seconds, {:.1} cycles",
            t,
            to_cycles(t)
        )),
        None if times.m == 1.0 => r.line("Operation time: at pickup, relay does not operate"),
        None => r.line("Operation time: below pickup"),
    }
    if let Some(t) = times.reset {
        r.line(format!(
            "Reset time: {:.2} seconds, {:.1} cycles",
            t,
            to_cycles(t)
        ));
    }
    r
}

#[derive(Debug, Clone, Copy, Serialize)]
struct CurveRow {
    distance_mi: f64,
    current_a: f64,
}

/// Writes the locator sweep as CSV with a `distance_mi,current_a` header.
pub fn write_curve_csv<W: io::Write>(curve: &SweepCurve, w: W) -> csv::Result<()> {
    let mut writer = Writer::from_writer(w);
    for (&distance_mi, &current_a) in curve.miles.iter().zip(&curve.amps) {
        writer.serialize(CurveRow {
            distance_mi,
            current_a,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Named values for a fault-letter template.
pub fn report_fields(
    bus: &BusSource,
    study: &FaultStudy,
    transformer: Option<&Transformer>,
) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut set = |key: &str, value: String| {
        fields.insert(key.to_string(), value);
    };

    set(
        "fault_loc",
        (if transformer.is_some() { "Secondary" } else { "Primary" }).to_string(),
    );
    set("pri_volt", format!("{}", bus.kv));
    set("no_phases", "3".to_string());
    if let Some(t) = transformer {
        set("sec_volt", format!("{}", t.sec_kv));
        set("tr_kva", format!("{}", t.kva));
        set("tr_conn", t.connection.to_string());
        set("tr_imp", format!("{}", t.pct_z));
        set("x_r_ratio", format!("{}", t.x_over_r));
    }
    set(
        "fault_voltage_lvl",
        format!("{:.0}", study.network.base.kv * 1000.0),
    );
    let amps = |ft| {
        study
            .fault_amps(ft)
            .map_or_else(|| "N/A".to_string(), |a| format!("{:.0}", a))
    };
    set("3ph_fault", amps(FaultType::ThreePhase));
    set("l_g_fault", amps(FaultType::SingleLineToGround));
    set("x_r_pos_ratio", format!("{:.2}", study.x_over_r_pos));
    set(
        "x_r_zero_ratio",
        study
            .x_over_r_zero
            .map_or_else(|| "N/A".to_string(), |xr| format!("{:.2}", xr)),
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::build_bus_source;
    use crate::bus::tests::record;
    use crate::cmplx;
    use crate::opt::FaultOpt;
    use crate::relay::{curve_times, UCurve};
    use crate::study::secondary_study;
    use crate::transformer::build_transformer;

    #[test]
    fn number_formats() {
        assert_eq!(fmt_amps(cmplx!(0.0, -1000.0)), "1000∠-90.00° Amps");
        assert_eq!(fmt_amps(cmplx!(1e-12, 1e-12)), "0∠0.00° Amps");
        assert_eq!(fmt_rect(cmplx!(26.2, 129.4)), "26.20+129.40j");
        assert_eq!(fmt_rect(cmplx!(1.0, -0.5)), "1.00-0.50j");
        assert_eq!(fmt_ohms(cmplx!(0.0, 2.0)), "2.00∠90.00° Ω");
    }

    #[test]
    fn bus_report() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let text = bus_summary(&bus).to_string();
        assert!(text.contains("Station: Brookside"));
        assert!(text.contains("% Z @ 100MVA: 26.20+129.40j"));
        assert!(text.contains("X/R Zero Seq at Bus:"));
        for label in ["ABC:", "AG:", "BC:", "BCG:"] {
            assert!(text.lines().any(|l| l.starts_with(label)), "{}", label);
        }
        // unfaulted phase of the BC fault
        assert!(text.contains("A: 0∠0.00° Amps"));

        let mut rec = record(4.6);
        rec.z0 = None;
        let text = bus_summary(&build_bus_source(&rec)?).to_string();
        assert!(!text.contains("AG:"));
        assert!(!text.contains("X/R Zero Seq"));
        Ok(())
    }

    #[test]
    fn relay_curve_report() -> anyhow::Result<()> {
        let text = curve_summary(&curve_times(UCurve::U3, 1.0, 5.0, 120.0, 600.0)?).to_string();
        assert!(text.contains("Multiple of Pickup: 1.00"));
        assert!(text.contains("Operation time: at pickup"));
        assert!(!text.contains("Reset time"));

        let text = curve_summary(&curve_times(UCurve::U3, 1.0, 5.0, 120.0, 300.0)?).to_string();
        assert!(text.contains("Operation time: below pickup"));
        assert!(text.contains("Reset time:"));

        let text = curve_summary(&curve_times(UCurve::U3, 1.0, 5.0, 120.0, 3000.0)?).to_string();
        assert!(text.contains("Operation time: 0.26 seconds, 15.5 cycles"));
        Ok(())
    }

    #[test]
    fn curve_csv() -> anyhow::Result<()> {
        let curve = SweepCurve {
            miles: vec![0.0, 0.5, 1.0],
            amps: vec![3300.0, 2100.5, 1500.0],
        };
        let mut buf = Vec::new();
        write_curve_csv(&curve, &mut buf)?;
        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["distance_mi,current_a", "0.0,3300.0", "0.5,2100.5", "1.0,1500.0"]);
        Ok(())
    }

    #[test]
    fn template_fields() -> anyhow::Result<()> {
        let bus = build_bus_source(&record(13.2))?;
        let t = build_transformer(300.0, "Δ-Δ", 0.208, 3.1, 2.9)?;
        let sec = secondary_study(&bus, None, &t, &FaultOpt::default())?;
        let fields = report_fields(&bus, &sec.study, Some(&t));
        assert_eq!(fields["fault_loc"], "Secondary");
        assert_eq!(fields["fault_voltage_lvl"], "208");
        assert_eq!(fields["tr_conn"], "Delta-Delta");
        assert_eq!(fields["l_g_fault"], "N/A");
        assert_ne!(fields["3ph_fault"], "N/A");

        let text = referred_summary(&sec).to_string();
        assert!(text.contains("ABC:"));
        assert!(!text.contains("AG:"));
        Ok(())
    }
}
