pub mod aggregate;
pub mod batch;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;

pub use error::{Result, ToolError};
