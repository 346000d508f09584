pub mod api;
pub mod archive;
pub mod config;
pub mod fetch;
pub mod humanize;
pub mod ledger;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod storage;
pub mod webhook;
pub mod worker;
