use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A concrete assignment to the free variables of a failed query
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Counterexample {
    /// Width of the operands
    pub width: u32,
    /// Variable name to value
    pub assignments: BTreeMap<String, u64>,
}

impl Counterexample {
    pub fn new(width: u32, assignments: BTreeMap<String, u64>) -> Self {
        Self { width, assignments }
    }

    pub fn value(&self, name: &str) -> Option<u64> {
        self.assignments.get(name).copied()
    }
}

impl Display for Counterexample {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let items: Vec<_> = self
            .assignments
            .iter()
            .map(|(name, value)| {
                format!("{}={:#0w$b}", name, value, w = self.width as usize + 2)
            })
            .collect();
        write!(f, "{}", items.join(" "))
    }
}

/// Result of one solver query
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// The property is proved
    Pass,
    /// The property is refuted
    Fail { counterexample: Counterexample },
    /// The solver gave up
    Unknown { reason: String },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    pub fn counterexample(&self) -> Option<&Counterexample> {
        match self {
            Self::Fail { counterexample } => Some(counterexample),
            Self::Pass | Self::Unknown { .. } => None,
        }
    }

    /// One-word status
    pub fn status(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail { .. } => "fail",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail { counterexample } => write!(f, "fail ({})", counterexample),
            Self::Unknown { reason } => write!(f, "unknown ({})", reason),
        }
    }
}

/// All outcomes for one (operation, transfer function) pair
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Verdict {
    /// The abstract result is always a valid abstract value
    pub validity: Outcome,
    /// No concrete result escapes the abstract result
    pub soundness: Outcome,
    /// Every member of the abstract result is reachable
    pub precision: Outcome,
}

/// What happened to one job of a batch
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum PairResult {
    Verified(Verdict),
    Rejected { error: String },
}

/// Report for one job of a batch
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct PairReport {
    pub name: String,
    #[serde(flatten)]
    pub result: PairResult,
}

impl PairReport {
    pub fn new(name: String, result: Result<Verdict, EngineError>) -> Self {
        let result = match result {
            Ok(verdict) => PairResult::Verified(verdict),
            Err(err) => PairResult::Rejected {
                error: err.to_string(),
            },
        };
        Self { name, result }
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.result {
            PairResult::Verified(verdict) => Some(verdict),
            PairResult::Rejected { .. } => None,
        }
    }

    /// Single line with the status of each check but no counterexample
    pub fn summary(&self) -> String {
        match &self.result {
            PairResult::Verified(Verdict {
                validity,
                soundness,
                precision,
            }) => format!(
                "{} validity={} soundness={} precision={}",
                self.name,
                validity.status(),
                soundness.status(),
                precision.status()
            ),
            PairResult::Rejected { error } => format!("{} error={}", self.name, error),
        }
    }
}

impl Display for PairReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            PairResult::Verified(Verdict {
                validity,
                soundness,
                precision,
            }) => {
                writeln!(f, "{}", self.name)?;
                writeln!(f, "  validity:  {}", validity)?;
                writeln!(f, "  soundness: {}", soundness)?;
                write!(f, "  precision: {}", precision)
            }
            PairResult::Rejected { error } => {
                write!(f, "{}\n  error: {}", self.name, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counterexample_listing() {
        let mut assignments = BTreeMap::new();
        assignments.insert("op0.one".to_string(), 0b0101);
        assignments.insert("inst0".to_string(), 0b1101);
        let cex = Counterexample::new(4, assignments);
        assert_eq!(cex.to_string(), "inst0=0b1101 op0.one=0b0101");
        assert_eq!(cex.value("inst0"), Some(13));
        assert_eq!(cex.value("inst9"), None);
    }

    #[test]
    fn reports_serialize_with_status_tags() {
        let verdict = Verdict {
            validity: Outcome::Pass,
            soundness: Outcome::Unknown {
                reason: "timeout".into(),
            },
            precision: Outcome::Fail {
                counterexample: Counterexample::new(2, BTreeMap::new()),
            },
        };
        let report = PairReport::new("known-bits:add/add".into(), Ok(verdict));
        assert_eq!(
            report.summary(),
            "known-bits:add/add validity=pass soundness=unknown precision=fail"
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"], "verified");
        assert_eq!(json["soundness"]["status"], "unknown");
        assert_eq!(json["precision"]["counterexample"]["width"], 2);

        let back: PairReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn rejected_pairs_keep_the_error() {
        let report = PairReport::new(
            "range:xor/add".into(),
            Err(EngineError::InvalidWidth(0)),
        );
        assert_eq!(
            report.summary(),
            "range:xor/add error=[xfer::width] invalid width 0"
        );
        assert!(report.verdict().is_none());
    }
}
