//! # Foldpipe Core Library
//!
//! A library for driving multi-model protein structure-prediction inference:
//! running a pool of predictor instances over precomputed features, ranking
//! their outputs by model-reported confidence, selectively applying physical
//! relaxation, and persisting a consistent artifact set per target.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`Structure`, `FeatureBundle`, `PredictionResult`) and I/O utilities for
//!   the structural formats and record artifacts.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer holds the pipeline
//!   components: the predictor pool and its seed derivation, the ranking
//!   policy, the relaxation selector, the refinement adapter, the timing
//!   ledger, and the artifact writer.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level,
//!   user-facing layer. It ties the `engine` and `core` together to carry a
//!   target through the full inference pipeline and to loop a whole run over
//!   many targets with isolated failure domains.
//!
//! The predictor and the relaxation engine themselves are deliberately *not*
//! part of this library. They are consumed through the [`engine::runner::ModelRunner`]
//! and [`engine::relax::Relaxer`] traits, so alternative backends can be
//! substituted without touching the orchestration logic.

pub mod core;
pub mod engine;
pub mod workflows;
