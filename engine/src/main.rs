use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};
use structopt::StructOpt;

use xfer_engine::flow::batch::{parse_jobs, select, tally, FlowBatch};
use xfer_engine::verify_all;
use xfer_engine::flow::shared::Settings;
use xfer_shared::config::{DEFAULT_TIMEOUT_MS, DEFAULT_WIDTH, PARALLEL};
use xfer_shared::logging;

#[derive(StructOpt)]
#[structopt(
    name = "xfer-engine",
    about = "Verify abstract transfer functions against their concrete operations",
    rename_all = "kebab-case"
)]
struct Args {
    /// Verbosity, repeat for more
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Width of the operands in bits
    #[structopt(short, long)]
    width: Option<u32>,

    /// Per-query solver timeout in milliseconds, 0 to disable
    #[structopt(short, long)]
    timeout: Option<u64>,

    /// Verify the pairs in parallel
    #[structopt(short, long)]
    parallel: bool,

    /// Jobs to run (JSON), the declared pairs if absent
    #[structopt(short, long)]
    jobs: Option<PathBuf>,

    /// Only run pairs whose name contains this
    #[structopt(short, long)]
    filter: Option<String>,

    /// Save the full reports (JSON)
    #[structopt(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let Args {
        verbose,
        width,
        timeout,
        parallel,
        jobs,
        filter,
        output,
    } = args;

    // setup logging
    logging::setup(verbose)?;

    // command line overrides the environment
    let width = width.unwrap_or(*DEFAULT_WIDTH);
    let timeout_ms = match timeout {
        None => *DEFAULT_TIMEOUT_MS,
        Some(0) => None,
        Some(ms) => Some(ms),
    };
    let settings = Settings::new(width, timeout_ms)?;

    // run the batch
    let parallel = parallel || *PARALLEL;
    let reports = match jobs {
        None => verify_all(settings, parallel, filter.as_deref()),
        Some(path) => {
            let entries = parse_jobs(&fs::read_to_string(&path)?)?;
            FlowBatch::new(select(entries, filter.as_deref()), settings, parallel).execute()
        }
    };
    for report in &reports {
        println!("{}", report.summary());
    }

    let (pass, fail, unknown, error) = tally(&reports);
    info!(
        "Outcomes: {} pass, {} fail, {} unknown, {} error",
        pass, fail, unknown, error
    );
    if unknown != 0 {
        warn!("Some queries were inconclusive, consider raising the timeout");
    }

    // save the reports if requested
    if let Some(path) = output {
        fs::write(&path, serde_json::to_string_pretty(&reports)?)?;
        info!(
            "Reports saved at {}",
            path.into_os_string()
                .to_str()
                .unwrap_or("<non-ascii-path>")
        );
    }

    // done with everything
    Ok(())
}
