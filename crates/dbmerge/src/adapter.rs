//! Collaborator boundaries: SQL generation and value providers.
//!
//! The engine never inspects SQL syntax. A [`DbAdapter`] turns a token's
//! payload into a sequence of statement strings; an empty sequence means
//! "no DDL required for this dialect" and the token degrades to a no-op.

use dbmerge_schema::{Column, Entity, Relationship};

/// Dialect-specific SQL builder for to-database tokens.
///
/// No dialect ships with the engine; implementations live with the
/// driver/adapter layer of the host application.
pub trait DbAdapter {
    fn create_table(&self, entity: &Entity) -> Vec<String>;
    fn drop_table(&self, entity: &Entity) -> Vec<String>;
    fn add_column(&self, entity: &Entity, column: &Column) -> Vec<String>;
    fn drop_column(&self, entity: &Entity, column: &Column) -> Vec<String>;
    fn set_not_null(&self, entity: &Entity, column: &Column) -> Vec<String>;
    fn set_allow_null(&self, entity: &Entity, column: &Column) -> Vec<String>;
    /// Alter a column's declared type from `from` to `to`.
    fn set_column_type(&self, entity: &Entity, from: &Column, to: &Column) -> Vec<String>;
    /// Create the foreign key constraint backing a to-one relationship.
    fn add_foreign_key(&self, relationship: &Relationship) -> Vec<String>;
    /// Drop the named foreign key constraint backing a relationship.
    fn drop_foreign_key(&self, relationship: &Relationship, constraint: &str) -> Vec<String>;
    fn set_primary_key(
        &self,
        entity: &Entity,
        old_name: Option<&str>,
        old_columns: &[Column],
        new_columns: &[Column],
    ) -> Vec<String>;
    /// DML populating a value into rows where `column` is NULL, ahead of
    /// a SET NOT NULL. `value` is an SQL literal.
    fn set_value_for_null(&self, entity: &Entity, column: &Column, value: &str) -> Vec<String>;
}

/// Supplies SQL literal values for populating freshly added NOT NULL
/// columns. Consulted at diff time; the chosen value is captured in the
/// token.
pub trait ValueForNullProvider {
    /// The value to backfill `column` with, or `None` when no value can
    /// be supplied (the set-value token is then withheld).
    fn value_for(&self, entity: &Entity, column: &Column) -> Option<String>;
}

/// The default provider: never supplies a value.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyValueForNullProvider;

impl ValueForNullProvider for EmptyValueForNullProvider {
    fn value_for(&self, _entity: &Entity, _column: &Column) -> Option<String> {
        None
    }
}
