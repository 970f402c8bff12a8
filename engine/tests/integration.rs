use std::env;
use std::fs;
use std::path::Path;

use anyhow::anyhow;
use datatest_stable::{harness, Result};
use tempfile::tempdir;

use xfer_engine::flow::batch::{parse_jobs, FlowBatch};
use xfer_engine::flow::report::PairReport;
use xfer_engine::flow::shared::Settings;

/// Width of the operands in every case
const WIDTH: u32 = 4;

fn run_test(path_expected: &Path) -> Result<()> {
    // config based on environment variable
    let verbose = env::var("LOG").map_or(false, |v| v != "0");

    // load the expected result
    let expected = fs::read_to_string(path_expected)
        .expect("unable to load content from the expected output file");

    // load the jobs
    let path_dir = path_expected
        .parent()
        .expect("unable to locate the test case directory");
    let content = fs::read_to_string(path_dir.join("jobs.json"))
        .expect("unable to load the jobs of the test case");
    let entries = parse_jobs(&content)?;

    // run every job in the case
    let settings = Settings::new(WIDTH, Some(60_000))?;
    let reports = FlowBatch::new(entries, settings, false).execute();
    if verbose {
        for report in &reports {
            println!("{}", report);
        }
    }

    // reports survive a trip through their JSON form
    let temp = tempdir().expect("unable to create a temporary directory");
    let path_saved = temp.path().join("reports.json");
    fs::write(&path_saved, serde_json::to_string_pretty(&reports)?)?;
    let reloaded: Vec<PairReport> = serde_json::from_str(&fs::read_to_string(&path_saved)?)?;
    temp.close()
        .expect("unable to clean-up the temporary directory");
    if reloaded != reports {
        return Err(anyhow!("reports changed after saving and loading").into());
    }

    // compare the summaries
    let obtained: Vec<_> = reports.iter().map(PairReport::summary).collect();
    let wanted: Vec<_> = expected.lines().filter(|l| !l.trim().is_empty()).collect();
    if obtained != wanted {
        println!(
            "Summary mismatch:\n{}\n<- expected vs obtained ->\n{}",
            wanted.join("\n"),
            obtained.join("\n")
        );
        return Err(anyhow!("result does not match with expectation").into());
    }
    Ok(())
}

harness!(run_test, "tests/cases", r"expected$");
