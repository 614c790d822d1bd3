//! Core library for the materials-tools command line application.
//!
//! The library exposes the helpers that power the `materials` CLI as well as
//! the integration tests. IO adapters live under [`materials::tools::io`], the
//! in-memory table representation inside [`materials::tools::model`], the
//! deduplicating aggregation in [`materials::tools::aggregate`], the daily
//! batch collection in [`materials::tools::batch`], and the load → aggregate →
//! write orchestration under [`materials::tools::pipeline`].

pub mod materials;

pub use materials::tools::{
    Result, ToolError, aggregate, batch, config, error, io, model, pipeline,
};
