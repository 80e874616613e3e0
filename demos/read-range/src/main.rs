//! Print summary statistics of a sample range of a tagged data file.
//!
//! ```text
//! read-range <file> --fs <hz> --chans Ex,Ey,Hx,Hy,Hz [--from N] [--to N] [--parallel]
//! ```
use std::path::PathBuf;

use itertools::Itertools;
use mtreader::{open_tagged, validate, ReadOptions, ScaleStage, SegmentedReader};
use pico_args::Arguments;

struct Args {
    path: PathBuf,
    fs: f64,
    chans: Vec<String>,
    from: Option<u64>,
    to: Option<u64>,
    parallel: bool,
}

fn parse_args() -> eyre::Result<Args> {
    let mut args = Arguments::from_env();
    let parallel = args.contains("--parallel");
    let fs = args.value_from_str("--fs")?;
    let chans: String = args.value_from_str("--chans")?;
    let from = args.opt_value_from_str("--from")?;
    let to = args.opt_value_from_str("--to")?;
    let path = args.free_from_str()?;
    let rest = args.finish();
    if !rest.is_empty() {
        eyre::bail!("Unexpected arguments {rest:?}");
    }
    Ok(Args {
        path,
        fs,
        chans: chans.split(',').map(|c| c.trim().to_string()).collect(),
        from,
        to,
        parallel,
    })
}

fn run(args: Args) -> eyre::Result<()> {
    let index = open_tagged(&args.path, args.fs, args.chans.as_slice(), &[])?;
    validate(&index)?;

    let from = args.from.unwrap_or(0);
    let to = args.to.unwrap_or(index.last_sample());
    let reader = SegmentedReader::new(&index).with_options(
        ReadOptions::new()
            .parallel(args.parallel)
            .stage(ScaleStage::Raw),
    );
    let buffer = reader.read(from, to)?;

    println!(
        "{} records, samples {from} to {to} at {} Hz, {} to {}",
        index.len(),
        buffer.fs(),
        buffer.first_time(),
        buffer.last_time()
    );
    println!("channel\tmin\tmax\tmean");
    for (name, row) in buffer.channels().iter().zip(buffer.data().rows()) {
        let (min, max) = row
            .iter()
            .copied()
            .minmax()
            .into_option()
            .unwrap_or((f64::NAN, f64::NAN));
        let mean = row.iter().sum::<f64>() / row.len() as f64;
        println!("{name}\t{min}\t{max}\t{mean:.3}");
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    env_logger::init();
    let args = parse_args()?;
    run(args)
}
