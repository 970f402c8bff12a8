pub use error::EngineError;

use crate::flow::batch::{select, Entry, FlowBatch, Job};
use crate::flow::report::PairReport;
use crate::flow::shared::Settings;

pub mod analysis;
pub mod error;
pub mod flow;
pub mod word;

/// Main entrypoint: verify the declared transfer functions of every operation,
/// optionally only those whose name contains `filter`
pub fn verify_all(settings: Settings, parallel: bool, filter: Option<&str>) -> Vec<PairReport> {
    let entries = Job::standard(settings.width)
        .into_iter()
        .map(Entry::from)
        .collect();
    FlowBatch::new(select(entries, filter), settings, parallel).execute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_pairs_are_sound_at_width_2() {
        let reports = verify_all(Settings::new(2, Some(30_000)).unwrap(), false, None);
        assert_eq!(reports.len(), 9);
        for report in &reports {
            let verdict = report.verdict().unwrap();
            assert!(verdict.validity.is_pass(), "{}", report);
            assert!(verdict.soundness.is_pass(), "{}", report);
        }
    }

    #[test]
    fn declared_pairs_can_be_filtered() {
        let settings = Settings::new(2, Some(30_000)).unwrap();
        let reports = verify_all(settings, true, Some("trunc"));
        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["known-bits:trunc:1/trunc:1", "range:trunc:1/trunc:1"]);
    }
}
