//! testify-core — Exam document model, session state machine, and scoring.
//!
//! This crate holds everything with real invariants: normalizing untrusted
//! exam documents, the timed Lobby/Section/Results state machine, scoring,
//! and the editable builder model. It performs no I/O beyond the
//! convenience file loader in [`parser`].

pub mod builder;
pub mod clock;
pub mod error;
pub mod model;
pub mod parser;
pub mod scoring;
pub mod session;
