//! Local-first visitor analytics for a personal site. Decides whether a
//! page view counts as a new visit, keeps a rolling 30 day history of daily
//! visit counts, and tracks time-of-day and device distributions of counted
//! visits. Everything stays on the device; there is no server component.
//!

pub mod cli;
pub mod engine;
pub mod utils;
