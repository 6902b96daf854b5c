//! Report tables and output plumbing for the dispatch binaries.

pub mod output;
pub mod report;
