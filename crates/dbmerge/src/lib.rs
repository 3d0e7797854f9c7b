//! Schema reconciliation engine.
//!
//! Given two schema snapshots — an authoritative model and the shape
//! detected in a live database — the engine computes an ordered plan of
//! [`Token`]s whose execution reconciles one side with the other. Every
//! token is directional: a to-database token emits DDL through a
//! [`DbAdapter`], and its reverse resolves the same drift by mutating the
//! in-memory model instead.
//!
//! ```no_run
//! use dbmerge::{Merger, StandardMergerFactory, plan};
//! use dbmerge_schema::Schema;
//!
//! let model = Schema::new();
//! let detected = Schema::new();
//!
//! let factory = StandardMergerFactory;
//! let tokens = Merger::new(&factory).create_merge_tokens(&model, &detected);
//! println!("{}", plan(&tokens));
//! ```
//!
//! SQL generation, database introspection and connection management all
//! live behind traits ([`DbAdapter`], [`SqlExecutor`]); the engine itself
//! never parses or interprets SQL.

pub mod adapter;
pub mod context;
pub mod diff;
pub mod error;
mod execute;
pub mod factory;
pub mod filter;
pub mod order;
pub mod token;

pub use adapter::{DbAdapter, EmptyValueForNullProvider, ValueForNullProvider};
pub use context::{
    MergeContext, SchemaChange, ScriptExecutor, Severity, SqlExecutor, ValidationFailure,
    ValidationResult,
};
pub use diff::Merger;
pub use error::{Error, Result};
pub use execute::{execute_tokens, plan};
pub use factory::{MergerFactory, StandardMergerFactory};
pub use filter::NameFilter;
pub use order::sort_tokens;
pub use token::{Direction, Token, TokenKind, requires_fk_constraint};
