use crate::engine::config::RelaxMode;
use crate::engine::ranking::RankingManifest;

/// Decides which ranked models receive the relaxation step.
///
/// Pure and total: `none` selects nothing, `best` the top-ranked model
/// (nothing when the ranking is empty), `all` every ranked model. The
/// returned names are unique and in ranking order.
pub fn select_for_relaxation(ranking: &RankingManifest, mode: RelaxMode) -> Vec<String> {
    match mode {
        RelaxMode::None => Vec::new(),
        RelaxMode::Best => ranking
            .best()
            .map(|m| vec![m.name.clone()])
            .unwrap_or_default(),
        RelaxMode::All => ranking.order().map(str::to_string).collect(),
    }
}
