use anyhow::{format_err, Result};
use clap::{Args, Parser, Subcommand};
use faults::report::{self, Report};
use faults::traits::CurveSink;
use faults::{
    aggregate_line, curve_times, line_study, load_study, locate_on_line, secondary_study,
    BusSource, FaultOpt, FaultOptBuilder, FaultType, RelayRatios, StudyCase, UCurve,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Symmetrical-component short-circuit calculations for distribution feeders.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Available fault current at the substation bus
    Bus(StudyArgs),

    /// Available fault current at the end of the line trace
    Line(LineArgs),

    /// Available fault current on the transformer secondary
    #[clap(name = "trans")]
    Transformer(StudyArgs),

    /// Distance to fault from a measured fault current
    Locate(LocateArgs),

    /// Relay inverse-time curve operate and reset times
    Curve(CurveArgs),
}

#[derive(Args)]
struct StudyArgs {
    /// The study file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Report file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pre-fault voltage (p.u.).
    #[arg(long)]
    vf: Option<f64>,
}

#[derive(Args)]
struct LineArgs {
    #[command(flatten)]
    study: StudyArgs,

    /// Relay CT ratio (CTR:1), overriding the study file.
    #[arg(long)]
    ctr: Option<f64>,

    /// Relay PT ratio (PTR:1), overriding the study file.
    #[arg(long)]
    ptr: Option<f64>,
}

#[derive(Args)]
struct LocateArgs {
    #[command(flatten)]
    study: StudyArgs,

    /// Fault type: 3ph, ll, slg or dlg.
    #[arg(long)]
    fault_type: FaultType,

    /// Measured fault current (A).
    #[arg(long)]
    amps: f64,

    /// Number of distances sampled along the line.
    #[arg(long)]
    samples: Option<usize>,

    /// Write the swept current curve as CSV.
    #[arg(long)]
    curve: Option<PathBuf>,

    /// Print every n-th sample of the swept curve.
    #[arg(long)]
    print_every: Option<usize>,
}

#[derive(Args)]
struct CurveArgs {
    /// Curve: U1 to U5.
    #[arg(long)]
    curve: UCurve,

    /// Time dial.
    #[arg(long)]
    td: f64,

    /// Tap setting (secondary amps).
    #[arg(long)]
    tap: f64,

    /// CT ratio (CTR:1).
    #[arg(long)]
    ctr: f64,

    /// Primary fault current (A).
    #[arg(long)]
    amps: f64,
}

struct PrintCurve {
    every: usize,
}

impl CurveSink for PrintCurve {
    fn sample(&self, i: usize, miles: f64, amps: f64) {
        if i == 0 {
            println!("   mi       amps");
            println!("-------  ---------");
        }
        if i % self.every == 0 {
            println!("{:7.3}  {:9.0}", miles, amps);
        }
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let (report, output) = match &cli.command {
        Commands::Bus(args) => {
            let (_, _, bus) = setup(args, None)?;
            (report::bus_summary(&bus), &args.output)
        }
        Commands::Line(args) => {
            let (opt, case, bus) = setup(&args.study, None)?;
            let line = aggregate_line(&case.line)?;
            let relay = RelayRatios::resolve(case.relay, args.ctr, args.ptr)?;

            let mut r = Report::new();
            r.append(report::line_summary(&line, &bus.base, relay.as_ref())?);
            r.blank();
            r.append(report::study_summary(
                &line_study(&bus, &line, &opt)?,
                "line trace",
            ));
            (r, &args.study.output)
        }
        Commands::Transformer(args) => {
            let (opt, case, bus) = setup(args, None)?;
            let spec = case
                .transformer
                .as_ref()
                .ok_or_else(|| format_err!("study file has no transformer"))?;
            let transformer = spec.build()?;
            let line = if case.line.is_empty() {
                None
            } else {
                Some(aggregate_line(&case.line)?)
            };
            let secondary = secondary_study(&bus, line.as_ref(), &transformer, &opt)?;

            let mut r = report::transformer_summary(&transformer)?;
            r.blank();
            r.append(report::study_summary(&secondary.study, "secondary"));
            r.blank();
            r.append(report::referred_summary(&secondary));
            (r, &args.output)
        }
        Commands::Locate(args) => {
            let (opt, case, bus) = setup(&args.study, args.samples)?;
            let line = aggregate_line(&case.line)?;

            let printer = args.print_every.map(|every| PrintCurve {
                every: every.max(1),
            });
            let sink = printer.as_ref().map(|p| p as &dyn CurveSink);
            let location = locate_on_line(&bus, &line, args.fault_type, args.amps, &opt, sink)?;

            if let Some(curve_path) = &args.curve {
                report::write_curve_csv(&location.curve, File::create(curve_path)?)?;
            }
            (report::location_summary(&location), &args.study.output)
        }
        Commands::Curve(args) => {
            let times = curve_times(args.curve, args.td, args.tap, args.ctr, args.amps)?;
            (report::curve_summary(&times), &None)
        }
    };

    match output {
        Some(out_path) => {
            let mut w = BufWriter::new(File::create(out_path)?);
            write!(w, "{}", report)?;
            w.flush()?;
        }
        None => print!("{}", report),
    }

    Ok(())
}

fn setup(args: &StudyArgs, samples: Option<usize>) -> Result<(FaultOpt, StudyCase, BusSource)> {
    let mut builder = FaultOptBuilder::default();
    if let Some(vf) = args.vf {
        builder.prefault_voltage(vf);
    }
    if let Some(samples) = samples {
        builder.samples(samples);
    }
    let opt = builder.build()?;

    let case = load_study(&args.input)?;
    let bus = BusSource::new(&case.bus, &opt)?;
    Ok((opt, case, bus))
}
