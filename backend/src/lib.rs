//! Journal Desk backend library.
//!
//! Editorial workflow service for a scholarly journal: submission queues,
//! the editor task board, stage files, discussions and peer review.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
