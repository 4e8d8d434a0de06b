//! The operator runtime (§4.F): a closed family of transformations, each a
//! small state machine with precise ordering and termination semantics.
//! Grounded in `seen_std::reactive::operators`, whose per-operator
//! `XObserver` structs (`MapObserver`, `FilterObserver`, `TakeObserver`, …)
//! set the idiom every operator here follows. Split into one file per
//! family from spec.md's table, rather than the teacher's single
//! `operators.rs`, because the family here is roughly ten times larger.

pub mod combine;
pub mod counting;
pub mod dedup;
pub mod higher_order;
pub mod inject;
pub mod pure;
pub mod scan;
pub mod schedule;
pub mod timing;
