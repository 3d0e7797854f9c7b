//! Merge tokens: atomic, directional, reversible schema-change operations.
//!
//! A [`Token`] is an immutable value object created by the differ and
//! consumed exactly once by the executor. Every token knows its stable
//! category label ([`Token::token_name`]), a human-readable identifier of
//! the affected schema object ([`Token::token_value`], also the
//! deterministic sort tie-break), its [`Direction`], and how to construct
//! its opposite through a [`MergerFactory`](crate::factory::MergerFactory).

use crate::factory::MergerFactory;
use dbmerge_schema::{Column, Entity, Relationship};
use std::fmt;

/// Which side of the reconciliation a token's effect targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The token emits DDL/DML against the live database.
    ToDatabase,
    /// The token mutates the in-memory model.
    ToModel,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToDatabase => write!(f, "to-db"),
            Direction::ToModel => write!(f, "to-model"),
        }
    }
}

/// The closed set of schema-change operations.
///
/// Each variant carries the minimal payload needed to render its effect
/// and to construct its reverse.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    CreateTable {
        entity: Entity,
    },
    DropTable {
        entity: Entity,
    },
    AddColumn {
        entity: Entity,
        column: Column,
    },
    DropColumn {
        entity: Entity,
        column: Column,
    },
    SetNotNull {
        entity: Entity,
        column: Column,
    },
    SetAllowNull {
        entity: Entity,
        column: Column,
    },
    SetColumnType {
        entity: Entity,
        from: Column,
        to: Column,
    },
    AddRelationship {
        relationship: Relationship,
    },
    DropRelationship {
        relationship: Relationship,
    },
    SetPrimaryKey {
        entity: Entity,
        /// Detected primary key constraint name, when known
        old_name: Option<String>,
        old_columns: Vec<Column>,
        new_columns: Vec<Column>,
    },
    /// Populate a freshly added mandatory column before SET NOT NULL.
    /// The value is an SQL literal captured from the value provider at
    /// diff time.
    SetValueForNull {
        entity: Entity,
        column: Column,
        value: String,
    },
}

/// True when an add-relationship token has a physical foreign key to
/// create. To-many relationships have no foreign key of their own, and
/// self-referential or join-less relationships need none either; such
/// tokens stay in the plan as DDL no-ops for reverse-relationship
/// bookkeeping.
pub fn requires_fk_constraint(rel: &Relationship) -> bool {
    !rel.to_many && !rel.is_self_referential() && !rel.joins.is_empty()
}

/// An atomic, named, directional change operation with a reversible
/// counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    kind: TokenKind,
    direction: Direction,
}

impl Token {
    pub fn new(kind: TokenKind, direction: Direction) -> Self {
        Self { kind, direction }
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Stable category label, shared by both directions of an operation.
    pub fn token_name(&self) -> &'static str {
        match &self.kind {
            TokenKind::CreateTable { .. } => "Create Table",
            TokenKind::DropTable { .. } => "Drop Table",
            TokenKind::AddColumn { .. } => "Add Column",
            TokenKind::DropColumn { .. } => "Drop Column",
            TokenKind::SetNotNull { .. } => "Set Not Null",
            TokenKind::SetAllowNull { .. } => "Set Allow Null",
            TokenKind::SetColumnType { .. } => "Set Column Type",
            TokenKind::AddRelationship { .. } => "Add Relationship",
            TokenKind::DropRelationship { .. } => "Drop Relationship",
            TokenKind::SetPrimaryKey { .. } => "Set Primary Key",
            TokenKind::SetValueForNull { .. } => "Set Value For Null",
        }
    }

    /// Human-readable identifier of the affected schema object; used for
    /// logging and as the deterministic ordering tie-break.
    pub fn token_value(&self) -> String {
        match &self.kind {
            TokenKind::CreateTable { entity }
            | TokenKind::DropTable { entity }
            | TokenKind::SetPrimaryKey { entity, .. } => entity.name().to_string(),
            TokenKind::AddColumn { entity, column }
            | TokenKind::DropColumn { entity, column }
            | TokenKind::SetNotNull { entity, column }
            | TokenKind::SetAllowNull { entity, column }
            | TokenKind::SetValueForNull { entity, column, .. } => {
                format!("{}.{}", entity.name(), column.name)
            }
            TokenKind::SetColumnType { entity, to, .. } => {
                format!("{}.{}", entity.name(), to.name)
            }
            TokenKind::AddRelationship { relationship }
            | TokenKind::DropRelationship { relationship } => relationship.to_string(),
        }
    }

    /// Construct the opposite token: same drift, resolved toward the
    /// other side. Returns `None` for the one documented non-reversible
    /// kind ([`TokenKind::SetValueForNull`], a data fixup with no model
    /// counterpart).
    pub fn create_reverse(&self, factory: &dyn MergerFactory) -> Option<Token> {
        let to_db = self.direction == Direction::ToModel;
        Some(match &self.kind {
            TokenKind::CreateTable { entity } => {
                if to_db {
                    factory.drop_table_to_db(entity)
                } else {
                    factory.drop_table_to_model(entity)
                }
            }
            TokenKind::DropTable { entity } => {
                if to_db {
                    factory.create_table_to_db(entity)
                } else {
                    factory.create_table_to_model(entity)
                }
            }
            TokenKind::AddColumn { entity, column } => {
                if to_db {
                    factory.drop_column_to_db(entity, column)
                } else {
                    factory.drop_column_to_model(entity, column)
                }
            }
            TokenKind::DropColumn { entity, column } => {
                if to_db {
                    factory.add_column_to_db(entity, column)
                } else {
                    factory.add_column_to_model(entity, column)
                }
            }
            TokenKind::SetNotNull { entity, column } => {
                if to_db {
                    factory.set_allow_null_to_db(entity, column)
                } else {
                    factory.set_allow_null_to_model(entity, column)
                }
            }
            TokenKind::SetAllowNull { entity, column } => {
                if to_db {
                    factory.set_not_null_to_db(entity, column)
                } else {
                    factory.set_not_null_to_model(entity, column)
                }
            }
            TokenKind::SetColumnType { entity, from, to } => {
                if to_db {
                    factory.set_column_type_to_db(entity, to, from)
                } else {
                    factory.set_column_type_to_model(entity, to, from)
                }
            }
            TokenKind::AddRelationship { relationship } => {
                if to_db {
                    factory.drop_relationship_to_db(relationship)
                } else {
                    factory.drop_relationship_to_model(relationship)
                }
            }
            TokenKind::DropRelationship { relationship } => {
                if to_db {
                    factory.add_relationship_to_db(relationship)
                } else {
                    factory.add_relationship_to_model(relationship)
                }
            }
            TokenKind::SetPrimaryKey {
                entity,
                old_name,
                old_columns,
                new_columns,
            } => {
                if to_db {
                    factory.set_primary_key_to_db(
                        entity,
                        old_name.as_deref(),
                        new_columns,
                        old_columns,
                    )
                } else {
                    factory.set_primary_key_to_model(
                        entity,
                        old_name.as_deref(),
                        new_columns,
                        old_columns,
                    )
                }
            }
            TokenKind::SetValueForNull { .. } => return None,
        })
    }

    /// Dependency rank of a to-database token: creates before alters
    /// before drops. Relationship creates come after the column and key
    /// changes they may reference (a foreign key can cover a freshly
    /// added column); drop-relationship precedes the column and table
    /// drops that would strand it.
    pub(crate) fn dependency_rank(&self) -> u8 {
        match &self.kind {
            TokenKind::CreateTable { .. } => 0,
            TokenKind::AddColumn { .. }
            | TokenKind::SetValueForNull { .. }
            | TokenKind::SetNotNull { .. }
            | TokenKind::SetAllowNull { .. }
            | TokenKind::SetColumnType { .. } => 1,
            TokenKind::SetPrimaryKey { .. } => 2,
            TokenKind::AddRelationship { .. } => 3,
            TokenKind::DropRelationship { .. } => 4,
            TokenKind::DropColumn { .. } => 5,
            TokenKind::DropTable { .. } => 6,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.token_name(), self.token_value())
    }
}
