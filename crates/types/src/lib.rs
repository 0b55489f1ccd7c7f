//! Shared type definitions for the oaish engine, transport, and CLI.
//!
//! Everything here is plain data: cataloged operations, flattened inputs,
//! assembled request payloads, and the YAML configuration model.

pub mod config;
pub mod operation;
pub mod payload;

pub use config::{AfterCallConfig, CommandConfig, FieldFormat, FieldSpec, FormatBlock, LayoutKind, ResponseFormatting, ShellConfig, StateConfig};
pub use operation::{DeclaredParameter, FlattenedParameter, OperationRecord, ParameterLocation};
pub use payload::{AssembledPayload, Assembly};
