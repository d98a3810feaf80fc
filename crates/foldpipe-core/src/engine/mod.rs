//! # Engine Module
//!
//! This module implements the pipeline components for multi-model inference
//! orchestration, providing the machinery between the stateless data models
//! and the top-level workflow.
//!
//! ## Overview
//!
//! The engine coordinates everything one target needs: deriving per-runner
//! seeds and invoking the predictor pool, ranking completed predictions,
//! selecting which of them receive the costly relaxation step, adapting the
//! external refinement engine, accumulating wall-clock timings, and writing
//! the fixed artifact set that downstream tooling consumes.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules that handle different
//! aspects of the pipeline:
//!
//! - **Configuration** ([`config`]) - run-wide settings and their builder
//! - **Predictor Pool** ([`runner`]) - the `ModelRunner` capability and the
//!   ordered runner collection with reproducible seed derivation
//! - **Ranking Policy** ([`ranking`]) - deterministic confidence ordering
//! - **Relaxation Selector** ([`selection`]) - which predictions get refined
//! - **Refinement Adapter** ([`relax`]) - the `Relaxer` capability and its
//!   outcome/metrics types
//! - **Artifact Writer** ([`artifacts`]) - the per-target output file set
//! - **Timing Ledger** ([`timing`]) - per-stage wall-clock accumulation
//! - **State Tracking** ([`state`]) - target lifecycle and run summaries
//! - **Progress Monitoring** ([`progress`]) - progress reporting callbacks
//! - **Error Handling** ([`error`]) - pipeline error taxonomy

pub mod artifacts;
pub mod config;
pub mod error;
pub mod progress;
pub mod ranking;
pub mod relax;
pub mod runner;
pub mod selection;
pub mod state;
pub mod timing;
