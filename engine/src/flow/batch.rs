use log::{debug, info, warn};
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::bits::{KnownBitsDomain, KnownBitsTransfer};
use crate::analysis::generic::{AbstractDomain, TransferFunction};
use crate::analysis::operation::Operation;
use crate::analysis::range::{RangeDomain, RangeTransfer};
use crate::error::{EngineError, EngineResult};
use crate::flow::check::verify;
use crate::flow::report::{PairReport, Verdict};
use crate::flow::shared::{Settings, Target};

/// One (operation, transfer function) pair to verify
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Job {
    KnownBits {
        operation: Operation,
        transfer: KnownBitsTransfer,
        /// Textual operands to pin, all symbolic if empty
        operands: Vec<String>,
    },
    Range {
        operation: Operation,
        transfer: RangeTransfer,
        operands: Vec<String>,
    },
}

impl Job {
    /// The declared transfer function of every operation, in both domains
    pub fn standard(width: u32) -> Vec<Self> {
        let mut jobs = vec![];
        for operation in Operation::all(width) {
            jobs.push(Self::KnownBits {
                operation,
                transfer: KnownBitsTransfer::standard(&operation),
                operands: vec![],
            });
        }
        for operation in Operation::all(width) {
            if let Some(transfer) = RangeTransfer::standard(&operation) {
                jobs.push(Self::Range {
                    operation,
                    transfer,
                    operands: vec![],
                });
            }
        }
        jobs
    }

    pub fn name(&self) -> String {
        match self {
            Self::KnownBits {
                operation,
                transfer,
                operands,
            } => label::<KnownBitsTransfer>(operation, transfer, operands),
            Self::Range {
                operation,
                transfer,
                operands,
            } => label::<RangeTransfer>(operation, transfer, operands),
        }
    }

    /// Verify this pair under `settings`
    pub fn run(&self, settings: Settings) -> EngineResult<Verdict> {
        match self {
            Self::KnownBits {
                operation,
                transfer,
                operands,
            } => run_pair(*operation, transfer, operands, settings),
            Self::Range {
                operation,
                transfer,
                operands,
            } => run_pair(*operation, transfer, operands, settings),
        }
    }
}

fn label<T: TransferFunction>(operation: &Operation, transfer: &T, operands: &[String]) -> String {
    let name = Target::new(*operation, transfer).name();
    if operands.is_empty() {
        name
    } else {
        format!("{}({})", name, operands.join(", "))
    }
}

fn run_pair<T: TransferFunction>(
    operation: Operation,
    transfer: &T,
    operands: &[String],
    settings: Settings,
) -> EngineResult<Verdict> {
    if operands.is_empty() {
        return verify(Target::new(operation, transfer), settings);
    }

    let mut pinned = vec![];
    for text in operands {
        pinned.push(T::Domain::parse(settings.width, text)?);
    }
    verify(Target::pinned(operation, transfer, &pinned), settings)
}

/// A job as written in a jobs file, with every name still unresolved
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub domain: String,
    pub operation: String,
    pub transfer: String,
    #[serde(default)]
    pub operands: Vec<String>,
}

impl JobSpec {
    /// Same form as `Job::name`, without resolving anything
    pub fn name(&self) -> String {
        let name = format!("{}:{}/{}", self.domain, self.operation, self.transfer);
        if self.operands.is_empty() {
            name
        } else {
            format!("{}({})", name, self.operands.join(", "))
        }
    }

    pub fn resolve(&self) -> EngineResult<Job> {
        let operation: Operation = self.operation.parse()?;
        let operands = self.operands.clone();
        if self.domain == KnownBitsDomain::NAME {
            Ok(Job::KnownBits {
                operation,
                transfer: self.transfer.parse()?,
                operands,
            })
        } else if self.domain == RangeDomain::NAME {
            Ok(Job::Range {
                operation,
                transfer: self.transfer.parse()?,
                operands,
            })
        } else {
            Err(EngineError::InvalidJob(format!(
                "unknown domain '{}'",
                self.domain
            )))
        }
    }
}

/// An item of a batch: a job to run, or the reason its description was refused
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Entry {
    Ready(Job),
    Refused { name: String, error: EngineError },
}

impl Entry {
    pub fn name(&self) -> String {
        match self {
            Self::Ready(job) => job.name(),
            Self::Refused { name, .. } => name.clone(),
        }
    }
}

impl From<Job> for Entry {
    fn from(job: Job) -> Self {
        Self::Ready(job)
    }
}

/// Read a jobs file: a JSON array whose items are resolved one at a time,
/// so a bad item only refuses itself
pub fn parse_jobs(content: &str) -> EngineResult<Vec<Entry>> {
    let items: Vec<Value> = serde_json::from_str(content)
        .map_err(|e| EngineError::InvalidJob(format!("jobs are not a JSON array: {}", e)))?;

    let mut entries = vec![];
    for (index, item) in items.into_iter().enumerate() {
        let entry = match serde_json::from_value::<JobSpec>(item) {
            Err(err) => Entry::Refused {
                name: format!("job #{}", index),
                error: EngineError::InvalidJob(err.to_string()),
            },
            Ok(spec) => match spec.resolve() {
                Ok(job) => Entry::Ready(job),
                Err(error) => Entry::Refused {
                    name: spec.name(),
                    error,
                },
            },
        };
        entries.push(entry);
    }
    Ok(entries)
}

/// Run a single entry, turning its failure into a report
fn run_entry(entry: &Entry, settings: Settings) -> PairReport {
    let name = entry.name();
    let result = match entry {
        Entry::Ready(job) => {
            debug!("running {}", name);
            job.run(settings)
        }
        Entry::Refused { error, .. } => Err(error.clone()),
    };
    if let Err(err) = &result {
        warn!("{} rejected: {}", name, err);
    }
    PairReport::new(name, result)
}

pub struct FlowBatch {
    /// Pairs to verify, in submission order
    entries: Vec<Entry>,
    /// Query settings shared by all jobs
    settings: Settings,
    /// Fan out across the rayon pool
    parallel: bool,
}

/// Entrypoints
impl FlowBatch {
    pub fn new(entries: Vec<Entry>, settings: Settings, parallel: bool) -> Self {
        Self {
            entries,
            settings,
            parallel,
        }
    }

    pub fn execute(self) -> Vec<PairReport> {
        let Self {
            entries,
            settings,
            parallel,
        } = self;
        info!("Number of pairs to verify: {}", entries.len());

        let reports: Vec<_> = if parallel {
            entries
                .into_par_iter()
                .map(|entry| run_entry(&entry, settings))
                .collect()
        } else {
            entries
                .iter()
                .map(|entry| run_entry(entry, settings))
                .collect()
        };

        let rejected = reports.iter().filter(|r| r.verdict().is_none()).count();
        info!(
            "Verified {} pairs, {} rejected",
            reports.len() - rejected,
            rejected
        );
        reports
    }
}

/// Tally of outcomes across a batch: (pass, fail, unknown, error)
pub fn tally(reports: &[PairReport]) -> (usize, usize, usize, usize) {
    let mut counts = (0, 0, 0, 0);
    for report in reports {
        match report.verdict() {
            None => counts.3 += 1,
            Some(verdict) => {
                for outcome in [&verdict.validity, &verdict.soundness, &verdict.precision] {
                    if outcome.is_pass() {
                        counts.0 += 1;
                    } else if outcome.is_fail() {
                        counts.1 += 1;
                    } else if outcome.is_unknown() {
                        counts.2 += 1;
                    }
                }
            }
        }
    }
    counts
}

/// Keep the entries whose name contains `filter`
pub fn select(entries: Vec<Entry>, filter: Option<&str>) -> Vec<Entry> {
    match filter {
        None => entries,
        Some(pattern) => entries
            .into_iter()
            .filter(|entry| entry.name().contains(pattern))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::Unsupported;
    use crate::flow::report::{Counterexample, Outcome, PairResult};

    fn settings() -> Settings {
        Settings::new(4, Some(30_000)).unwrap()
    }

    fn ready(entries: Vec<Job>) -> Vec<Entry> {
        entries.into_iter().map(Entry::from).collect()
    }

    #[test]
    fn standard_table() {
        let names: Vec<_> = Job::standard(4).iter().map(Job::name).collect();
        assert_eq!(
            names,
            [
                "known-bits:and/and",
                "known-bits:or/or",
                "known-bits:xor/xor",
                "known-bits:add/add",
                "known-bits:sub/sub",
                "known-bits:trunc:1/trunc:1",
                "known-bits:trunc:2/trunc:2",
                "known-bits:trunc:3/trunc:3",
                "range:add/add",
                "range:sub/sub",
                "range:trunc:1/trunc:1",
                "range:trunc:2/trunc:2",
                "range:trunc:3/trunc:3",
            ]
        );
    }

    #[test]
    fn jobs_are_read_from_json() {
        let entries = parse_jobs(
            r#"[
                {"domain": "known-bits", "operation": "and", "transfer": "top",
                 "operands": ["0011", "0001"]},
                {"domain": "range", "operation": "trunc:2", "transfer": "trunc:2"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0].name(), "known-bits:and/top(0011, 0001)");
        assert_eq!(
            entries[1],
            Entry::Ready(Job::Range {
                operation: Operation::Trunc { width: 2 },
                transfer: RangeTransfer::Trunc { width: 2 },
                operands: vec![],
            })
        );
        assert!(matches!(
            parse_jobs(r#"{"domain": "range"}"#),
            Err(EngineError::InvalidJob(_))
        ));
    }

    #[test]
    fn unreadable_jobs_are_refused_one_by_one() {
        let entries = parse_jobs(
            r#"[
                {"domain": "known-bits", "operation": "mul", "transfer": "and"},
                {"domain": "range", "operation": "and", "transfer": "and"},
                {"domain": "octagon", "operation": "add", "transfer": "add"},
                {"domain": "range", "operation": "add"},
                {"domain": "known-bits", "operation": "xor", "transfer": "xor"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[0],
            Entry::Refused {
                name: "known-bits:mul/and".into(),
                error: EngineError::UnsupportedOperation(Unsupported::Operation("mul".into())),
            }
        );
        assert!(matches!(
            &entries[1],
            Entry::Refused {
                error: EngineError::UnsupportedOperation(Unsupported::Transfer { .. }),
                ..
            }
        ));
        assert!(matches!(
            &entries[2],
            Entry::Refused {
                error: EngineError::InvalidJob(_),
                ..
            }
        ));
        assert_eq!(entries[3].name(), "job #3");
        assert!(matches!(entries[4], Entry::Ready(_)));

        let reports = FlowBatch::new(entries, settings(), false).execute();
        assert_eq!(
            reports[0].summary(),
            "known-bits:mul/and error=[xfer::unsupported] operation 'mul'"
        );
        assert_eq!(
            reports[4].summary(),
            "known-bits:xor/xor validity=pass soundness=pass precision=pass"
        );
        assert_eq!(tally(&reports), (3, 0, 0, 4));
    }

    #[test]
    fn failures_are_isolated_and_ordered() {
        let jobs = ready(vec![
            Job::KnownBits {
                operation: Operation::Add,
                transfer: KnownBitsTransfer::Add,
                operands: vec!["XXX".into(), "000".into()],
            },
            Job::KnownBits {
                operation: Operation::Xor,
                transfer: KnownBitsTransfer::Xor,
                operands: vec![],
            },
            Job::Range {
                operation: Operation::Trunc { width: 2 },
                transfer: RangeTransfer::Add,
                operands: vec![],
            },
        ]);
        for parallel in [false, true] {
            let reports = FlowBatch::new(jobs.clone(), settings(), parallel).execute();
            assert_eq!(reports.len(), 3);
            assert!(matches!(reports[0].result, PairResult::Rejected { .. }));
            assert_eq!(
                reports[1].summary(),
                "known-bits:xor/xor validity=pass soundness=pass precision=pass"
            );
            assert!(matches!(reports[2].result, PairResult::Rejected { .. }));
            assert_eq!(tally(&reports), (3, 0, 0, 2));
        }
    }

    #[test]
    fn unknown_outcomes_are_counted() {
        let verdict = Verdict {
            validity: Outcome::Pass,
            soundness: Outcome::Unknown {
                reason: "timeout".into(),
            },
            precision: Outcome::Fail {
                counterexample: Counterexample::new(4, BTreeMap::new()),
            },
        };
        let reports = [PairReport::new("range:add/add".into(), Ok(verdict))];
        assert_eq!(tally(&reports), (1, 1, 1, 0));
    }

    #[test]
    fn filter_by_name() {
        let entries = select(ready(Job::standard(4)), Some("range:"));
        assert_eq!(entries.len(), 5);
        assert!(select(ready(Job::standard(4)), None).len() > entries.len());
    }
}
