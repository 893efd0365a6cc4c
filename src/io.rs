//! Reading the whitespace-separated measurement log and writing the estimate table.
//!
//! Input lines look like
//!
//! ```text
//! L  px   py          timestamp  gt_px gt_py gt_vx gt_vy
//! R  rho  phi rho_dot timestamp  gt_px gt_py gt_vx gt_vy
//! ```

use std::io::{BufRead, Write};
use std::str::{FromStr, SplitWhitespace};

use anyhow::{anyhow, bail, Context, Result};

use crate::measurement::{GroundTruth, Measurement, Reading, Record, SensorKind};
use crate::model::State;

/// Which sensor kinds reach the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorFilter {
    #[default]
    All,
    RadarOnly,
    LidarOnly,
}

impl SensorFilter {
    pub fn accepts(self, kind: SensorKind) -> bool {
        match self {
            SensorFilter::All => true,
            SensorFilter::RadarOnly => kind == SensorKind::Radar,
            SensorFilter::LidarOnly => kind == SensorKind::Lidar,
        }
    }
}

fn next<T: FromStr>(tokens: &mut SplitWhitespace<'_>, what: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let token = tokens.next().ok_or_else(|| anyhow!("missing {}", what))?;
    token
        .parse()
        .with_context(|| format!("invalid {} {:?}", what, token))
}

pub fn parse_record(line: &str) -> Result<Record> {
    let mut tokens = line.split_whitespace();
    let measurement = match tokens.next() {
        Some("L") => {
            let px = next(&mut tokens, "px")?;
            let py = next(&mut tokens, "py")?;
            Measurement::lidar(px, py, next(&mut tokens, "timestamp")?)
        }
        Some("R") => {
            let rho = next(&mut tokens, "rho")?;
            let phi = next(&mut tokens, "phi")?;
            let rho_dot = next(&mut tokens, "rho_dot")?;
            Measurement::radar(rho, phi, rho_dot, next(&mut tokens, "timestamp")?)
        }
        Some(other) => bail!("unknown sensor type {:?}", other),
        None => bail!("empty line"),
    };
    let ground_truth = GroundTruth::new(
        next(&mut tokens, "ground truth px")?,
        next(&mut tokens, "ground truth py")?,
        next(&mut tokens, "ground truth vx")?,
        next(&mut tokens, "ground truth vy")?,
    );
    Ok(Record {
        measurement,
        ground_truth,
    })
}

// ログを読み込み, 除外するセンサの行は捨てる
pub fn read_records<R: BufRead>(reader: R, filter: SensorFilter) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record(&line).with_context(|| format!("line {}", i + 1))?;
        if filter.accepts(record.measurement.kind()) {
            records.push(record);
        }
    }
    Ok(records)
}

// 読み込みと同じ形式でログを書き出す (センサごとに列数が異なる)
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_writer(writer);
    for r in records {
        let m = &r.measurement;
        let mut row = vec![m.kind().token().to_string()];
        match &m.reading {
            Reading::Lidar(z) => row.extend(z.iter().map(|v| v.to_string())),
            Reading::Radar(z) => row.extend(z.iter().map(|v| v.to_string())),
        }
        row.push(m.timestamp.to_string());
        row.extend(r.ground_truth.iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn estimate_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer)
}

// MARK: - Log
pub fn write_estimate<W: Write>(
    wtr: &mut csv::Writer<W>,
    x: &State,
    m: &Measurement,
    nis: f64,
) -> Result<(), csv::Error> {
    let (meas_px, meas_py) = m.reading.to_cartesian();
    wtr.write_record(&[
        x[0].to_string(),
        x[1].to_string(),
        x[2].to_string(),
        x[3].to_string(),
        x[4].to_string(),
        meas_px.to_string(),
        meas_py.to_string(),
        nis.to_string(),
    ])?;
    Ok(())
}
