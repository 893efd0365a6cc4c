use std::fs::File;
use std::io::{BufReader, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, LevelFilter};
use simple_logger::SimpleLogger;

use ukf_fusion::accuracy::{calculate_rmse, to_cartesian, NisStats};
use ukf_fusion::config::{Cli, Command, FilterArgs, SimulateArgs};
use ukf_fusion::io::{estimate_writer, read_records, write_estimate, write_records};
use ukf_fusion::sim::{simulate, Scenario};
use ukf_fusion::{NoiseParams, SensorKind, UnscentedKalmanFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Filter(args) => args.verbose,
        Command::Simulate(args) => args.verbose,
    };
    SimpleLogger::new()
        .with_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init()?;

    match cli.command {
        Command::Filter(args) => run_filter(&args),
        Command::Simulate(args) => run_simulate(&args),
    }
}

fn run_filter(args: &FilterArgs) -> Result<()> {
    let input = File::open(&args.input)
        .with_context(|| format!("cannot open input file {}", args.input.display()))?;
    let output = File::create(&args.output)
        .with_context(|| format!("cannot open output file {}", args.output.display()))?;

    let records = read_records(BufReader::new(input), args.sensor_filter())?;
    info!(
        "read {} records from {}",
        records.len(),
        args.input.display()
    );

    let noise = NoiseParams::from(&args.noise);
    let mut ukf = UnscentedKalmanFilter::new(noise);
    let mut wtr = estimate_writer(BufWriter::new(output));
    let mut nis_stats = NisStats::default();
    let mut estimations = Vec::with_capacity(records.len());
    let mut ground_truth = Vec::with_capacity(records.len());

    for (k, r) in records.iter().enumerate() {
        ukf.process_measurement(&r.measurement)
            .with_context(|| format!("entry {} (t={})", k + 1, r.measurement.timestamp))?;

        let nis = ukf.nis();
        if let Some(nis) = nis {
            nis_stats.push(nis);
        }
        write_estimate(
            &mut wtr,
            &ukf.state(),
            &r.measurement,
            nis.map_or(0.0, |n| n.value),
        )?;

        estimations.push(to_cartesian(&ukf.state()));
        ground_truth.push(r.ground_truth);

        debug!("***** Entry: {} *****", k + 1);
        debug!("x = {}", ukf.state());
        debug!("P = {}", ukf.covariance());
    }
    wtr.flush()?;

    let rmse = calculate_rmse(&estimations, &ground_truth)?;
    println!("Accuracy - RMSE:");
    for v in rmse.iter() {
        println!("{:.6}", v);
    }
    for sensor in [SensorKind::Lidar, SensorKind::Radar] {
        if let Some(frac) = nis_stats.exceedance(sensor) {
            info!(
                "{} NIS above {}: {:.1}% of {} updates",
                sensor,
                NisStats::threshold(sensor),
                frac * 100.0,
                nis_stats.count(sensor)
            );
        }
    }
    Ok(())
}

fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let scenario = Scenario {
        steps: args.steps,
        dt_us: args.dt_us,
        seed: args.seed,
        noise: NoiseParams::from(&args.noise),
        ..Scenario::default()
    };
    let records = simulate(&scenario)?;
    let output = File::create(&args.output)
        .with_context(|| format!("cannot open output file {}", args.output.display()))?;
    write_records(BufWriter::new(output), &records)?;
    info!(
        "wrote {} records to {}",
        records.len(),
        args.output.display()
    );
    Ok(())
}
