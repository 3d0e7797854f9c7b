//! The transient execution scope of one reconciliation run.
//!
//! A [`MergeContext`] owns everything a token needs while executing: the
//! model schema being mutated, the [`DbAdapter`] rendering DDL, the
//! [`SqlExecutor`] standing in for the live connection, the registered
//! [`SchemaChange`] observers, and the [`ValidationResult`] accumulator
//! returned to the caller afterwards. It is created per run and
//! discarded when the run completes.

use crate::adapter::DbAdapter;
use crate::error::Result;
use dbmerge_schema::{Column, Entity, Relationship, Schema};

/// A structural change applied to the model, broadcast fire-and-forget
/// to every registered observer so that dependent subsystems (name
/// deduplication, UI refresh) can react without the executor knowing
/// about them.
#[derive(Debug, Clone)]
pub enum SchemaChange {
    EntityAdded(Entity),
    EntityRemoved(Entity),
    RelationshipAdded(Relationship),
    RelationshipRemoved(Relationship),
    ColumnAdded { entity: String, column: Column },
    ColumnRemoved { entity: String, column: Column },
    ColumnChanged { entity: String, column: String },
    PrimaryKeyChanged { entity: String },
}

/// Executes a single SQL statement against the reconciliation target.
///
/// Live connection management is out of scope for the engine; this trait
/// is the seam where it plugs in.
pub trait SqlExecutor {
    fn execute_sql(&mut self, sql: &str) -> Result<()>;
}

/// Collects statements instead of executing them: the dry-run target.
#[derive(Debug, Default)]
pub struct ScriptExecutor {
    statements: Vec<String>,
}

impl ScriptExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements collected so far, in execution order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<String> {
        self.statements
    }
}

impl SqlExecutor for ScriptExecutor {
    fn execute_sql(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        Ok(())
    }
}

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single validation finding surfaced during a run.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub severity: Severity,
    pub message: String,
}

/// Warnings and errors accumulated over a run, returned to the caller
/// independently of any abort error.
#[derive(Debug, Default)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.failures.push(ValidationFailure {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.failures.push(ValidationFailure {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn has_errors(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-run execution scope. Exclusively owns its target for the duration
/// of the run; tokens never touch shared state outside of it.
pub struct MergeContext<'a> {
    pub(crate) schema: &'a mut Schema,
    pub(crate) adapter: &'a dyn DbAdapter,
    pub(crate) executor: &'a mut dyn SqlExecutor,
    observers: Vec<Box<dyn FnMut(&SchemaChange) + 'a>>,
    pub(crate) validation: ValidationResult,
}

impl<'a> MergeContext<'a> {
    pub fn new(
        schema: &'a mut Schema,
        adapter: &'a dyn DbAdapter,
        executor: &'a mut dyn SqlExecutor,
    ) -> Self {
        Self {
            schema,
            adapter,
            executor,
            observers: Vec::new(),
            validation: ValidationResult::default(),
        }
    }

    /// Register an observer for structural change events. Observers are
    /// independent of each other and receive every event of the run.
    pub fn subscribe(&mut self, observer: impl FnMut(&SchemaChange) + 'a) {
        self.observers.push(Box::new(observer));
    }

    /// Broadcast a structural change to every observer.
    pub(crate) fn notify(&mut self, change: SchemaChange) {
        tracing::trace!(?change, "schema changed");
        for observer in &mut self.observers {
            observer(&change);
        }
    }

    /// The model schema snapshot owned for this run.
    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        self.schema
    }

    /// Run one statement through the executor.
    pub fn execute_sql(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "executing statement");
        self.executor.execute_sql(sql)
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn validation_mut(&mut self) -> &mut ValidationResult {
        &mut self.validation
    }

    /// Consume the context, keeping the accumulated validation findings.
    pub fn into_validation(self) -> ValidationResult {
        self.validation
    }
}
