//! Decision support for community pharmacy consultations.
//!
//! Signed rule packs drive a pathway evaluator; a transcript extractor proposes intake values
//! that a clinician reviews before they reach the evaluator.

pub mod config;
pub mod error;
pub mod logic;
pub mod telemetry;
pub mod workflows;
