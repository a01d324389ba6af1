//! Result aggregation across a request's entries.

use serde::Serialize;
use serde_json::Value;

use crate::decoder::EntryStatus;
use crate::dispatcher::{Batch, EntryOutcome};
use crate::error::{ExtractError, Result};

/// Per-entry diagnostic kept alongside the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub name: String,
    /// Actors this entry contributed
    pub actors: usize,
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// Final response payload for one upload.
///
/// `actors` is the concatenation of every entry's actors in the order the
/// entries finished decoding, so it has no positional relationship to the
/// archive's member order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub files_processed: usize,
    pub total_actors: usize,
    pub actors: Vec<Value>,
    #[serde(skip)]
    entries: Vec<EntryReport>,
}

impl AggregateResult {
    /// Per-entry reports, in completion order.
    ///
    /// Distinguishes an entry with no actors from one that failed to parse.
    #[must_use]
    pub fn entries(&self) -> &[EntryReport] {
        &self.entries
    }
}

/// Accumulates entry outcomes as they complete
#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    actors: Vec<Value>,
    entries: Vec<EntryReport>,
}

impl Aggregator {
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            actors: Vec::new(),
            entries: Vec::with_capacity(expected),
        }
    }

    /// Drain a batch in completion order and build its result.
    ///
    /// # Errors
    ///
    /// Returns an internal fault if the batch closed before every dispatched
    /// entry reported.
    pub fn collect(batch: Batch) -> Result<AggregateResult> {
        let mut aggregator = Self::new(batch.dispatched());
        for outcome in batch {
            aggregator.push(outcome);
        }
        aggregator.finish()
    }

    pub fn push(&mut self, outcome: EntryOutcome) {
        let EntryOutcome {
            name,
            actors,
            status,
        } = outcome;
        self.entries.push(EntryReport {
            name,
            actors: actors.len(),
            status,
        });
        self.actors.extend(actors);
    }

    pub fn finish(self) -> Result<AggregateResult> {
        if self.entries.len() != self.expected {
            return Err(ExtractError::Internal(format!(
                "{} of {} dispatched entries never reported",
                self.expected.saturating_sub(self.entries.len()),
                self.expected
            )));
        }

        Ok(AggregateResult {
            files_processed: self.expected,
            total_actors: self.actors.len(),
            actors: self.actors,
            entries: self.entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{ParseStrategy, TextEncoding};
    use serde_json::json;

    fn outcome(name: &str, actors: Vec<Value>) -> EntryOutcome {
        let status = if actors.is_empty() {
            EntryStatus::Unparseable
        } else {
            EntryStatus::Extracted {
                encoding: TextEncoding::Utf8,
                strategy: ParseStrategy::WholeDocument,
            }
        };
        EntryOutcome {
            name: name.to_string(),
            actors,
            status,
        }
    }

    #[test]
    fn test_concatenates_in_push_order() {
        let mut aggregator = Aggregator::new(3);
        aggregator.push(outcome("late.json", vec![json!(3)]));
        aggregator.push(outcome("bad.json", Vec::new()));
        aggregator.push(outcome("early.json", vec![json!(1), json!(2)]));

        let result = aggregator.finish().expect("complete");
        assert_eq!(result.files_processed, 3);
        assert_eq!(result.total_actors, 3);
        assert_eq!(result.actors, vec![json!(3), json!(1), json!(2)]);

        let names: Vec<_> = result.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["late.json", "bad.json", "early.json"]);
        assert_eq!(result.entries()[1].status, EntryStatus::Unparseable);
    }

    #[test]
    fn test_missing_outcomes_are_internal_fault() {
        let mut aggregator = Aggregator::new(2);
        aggregator.push(outcome("only.json", vec![json!(1)]));

        let err = aggregator.finish().expect_err("one entry missing");
        assert!(matches!(err, ExtractError::Internal(ref msg) if msg.contains("1 of 2")));
    }

    #[test]
    fn test_serializes_public_shape_only() {
        let mut aggregator = Aggregator::new(1);
        aggregator.push(outcome("a.json", vec![json!({"id": 1})]));
        let result = aggregator.finish().expect("complete");

        assert_eq!(
            serde_json::to_value(&result).expect("serialize"),
            json!({"files_processed": 1, "total_actors": 1, "actors": [{"id": 1}]})
        );
    }

    #[test]
    fn test_entry_report_flattens_status() {
        let report = EntryReport {
            name: "a.json".to_string(),
            actors: 0,
            status: EntryStatus::NoActors,
        };
        assert_eq!(
            serde_json::to_value(&report).expect("serialize"),
            json!({"name": "a.json", "actors": 0, "status": "no_actors"})
        );
    }
}
