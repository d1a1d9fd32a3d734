/*!
The purge engine: identity, adapters, discovery, preview, deletion and
reporting.
*/

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod confirm;
pub mod executor;
pub mod identity;
pub mod ledger;
pub mod occurrence;
pub mod orchestrator;
pub mod preview;
pub mod report;
pub mod runner;

#[cfg(test)]
mod testing;
