use std::fmt;

/// Lifecycle of one target as it moves through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    FeaturesLoaded,
    Predicting,
    Ranked,
    Relaxing,
    /// Terminal success: the complete artifact set exists on disk.
    ArtifactsWritten,
    /// Terminal: feature load failed; nothing was written.
    Skipped,
    /// Terminal: an unrecoverable error occurred mid-pipeline.
    Failed,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Pending => "pending",
            TargetState::FeaturesLoaded => "features_loaded",
            TargetState::Predicting => "predicting",
            TargetState::Ranked => "ranked",
            TargetState::Relaxing => "relaxing",
            TargetState::ArtifactsWritten => "artifacts_written",
            TargetState::Skipped => "skipped",
            TargetState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TargetState::ArtifactsWritten | TargetState::Skipped | TargetState::Failed
        )
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final disposition of one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub name: String,
    pub state: TargetState,
    pub error: Option<String>,
}

impl TargetReport {
    pub fn succeeded(&self) -> bool {
        self.state == TargetState::ArtifactsWritten
    }
}

/// Aggregated outcome of a multi-target run. Individual target failures are
/// recorded here instead of aborting the run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TargetReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: TargetReport) {
        self.reports.push(report);
    }

    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(TargetReport::succeeded)
    }

    pub fn completed(&self) -> usize {
        self.reports.iter().filter(|r| r.succeeded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.state == TargetState::Skipped)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.state == TargetState::Failed)
            .count()
    }
}
