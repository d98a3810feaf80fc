use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Instant;

/// Wall-clock seconds per labeled pipeline stage, accumulated monotonically
/// over the run of one target and persisted once at the end.
///
/// Serializes as a JSON object in insertion order, so the ledger reads in
/// the order the stages actually ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingLedger {
    entries: Vec<(String, f64)>,
}

impl TimingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the elapsed seconds for a stage. Re-recording a label
    /// overwrites its value without changing its position.
    pub fn record(&mut self, label: impl Into<String>, seconds: f64) {
        let label = label.into();
        match self.entries.iter().position(|(l, _)| *l == label) {
            Some(index) => self.entries[index].1 = seconds,
            None => self.entries.push((label, seconds)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TimingLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, seconds) in &self.entries {
            map.serialize_entry(label, seconds)?;
        }
        map.end()
    }
}

/// Runs `f` and returns its result together with the elapsed wall-clock
/// seconds.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_preserves_insertion_order_in_json() {
        let mut ledger = TimingLedger::new();
        ledger.record("process_features_model_1_pred_0", 1.5);
        ledger.record("predict_and_compile_model_1_pred_0", 12.25);
        ledger.record("relax_model_1_pred_0", 3.0);

        let json = serde_json::to_string(&ledger).unwrap();
        let p = json.find("process_features").unwrap();
        let q = json.find("predict_and_compile").unwrap();
        let r = json.find("relax_").unwrap();
        assert!(p < q && q < r);
    }

    #[test]
    fn re_recording_overwrites_in_place() {
        let mut ledger = TimingLedger::new();
        ledger.record("a", 1.0);
        ledger.record("b", 2.0);
        ledger.record("a", 9.0);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get("a"), Some(9.0));
        let labels: Vec<&str> = ledger.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn timed_reports_nonnegative_elapsed_seconds() {
        let (value, seconds) = timed(|| 41 + 1);
        assert_eq!(value, 42);
        assert!(seconds >= 0.0);
    }
}
