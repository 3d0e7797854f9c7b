//! Token construction seam.
//!
//! The differ never instantiates tokens directly; it goes through a
//! [`MergerFactory`] so that dialect-aware variants can substitute their
//! own payload tweaks without the differ changing. The provided defaults
//! build the standard tokens, and [`StandardMergerFactory`] is the
//! stock all-defaults implementation.

use crate::token::{Direction, Token, TokenKind};
use dbmerge_schema::{Column, Entity, Relationship};

/// Constructs concrete token instances for each operation kind.
pub trait MergerFactory {
    fn create_table_to_db(&self, entity: &Entity) -> Token {
        Token::new(
            TokenKind::CreateTable {
                entity: entity.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn create_table_to_model(&self, entity: &Entity) -> Token {
        Token::new(
            TokenKind::CreateTable {
                entity: entity.clone(),
            },
            Direction::ToModel,
        )
    }

    fn drop_table_to_db(&self, entity: &Entity) -> Token {
        Token::new(
            TokenKind::DropTable {
                entity: entity.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn drop_table_to_model(&self, entity: &Entity) -> Token {
        Token::new(
            TokenKind::DropTable {
                entity: entity.clone(),
            },
            Direction::ToModel,
        )
    }

    fn add_column_to_db(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::AddColumn {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn add_column_to_model(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::AddColumn {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToModel,
        )
    }

    fn drop_column_to_db(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::DropColumn {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn drop_column_to_model(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::DropColumn {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToModel,
        )
    }

    fn set_not_null_to_db(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::SetNotNull {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn set_not_null_to_model(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::SetNotNull {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToModel,
        )
    }

    fn set_allow_null_to_db(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::SetAllowNull {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn set_allow_null_to_model(&self, entity: &Entity, column: &Column) -> Token {
        Token::new(
            TokenKind::SetAllowNull {
                entity: entity.clone(),
                column: column.clone(),
            },
            Direction::ToModel,
        )
    }

    fn set_column_type_to_db(&self, entity: &Entity, from: &Column, to: &Column) -> Token {
        Token::new(
            TokenKind::SetColumnType {
                entity: entity.clone(),
                from: from.clone(),
                to: to.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn set_column_type_to_model(&self, entity: &Entity, from: &Column, to: &Column) -> Token {
        Token::new(
            TokenKind::SetColumnType {
                entity: entity.clone(),
                from: from.clone(),
                to: to.clone(),
            },
            Direction::ToModel,
        )
    }

    fn add_relationship_to_db(&self, relationship: &Relationship) -> Token {
        Token::new(
            TokenKind::AddRelationship {
                relationship: relationship.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn add_relationship_to_model(&self, relationship: &Relationship) -> Token {
        Token::new(
            TokenKind::AddRelationship {
                relationship: relationship.clone(),
            },
            Direction::ToModel,
        )
    }

    fn drop_relationship_to_db(&self, relationship: &Relationship) -> Token {
        Token::new(
            TokenKind::DropRelationship {
                relationship: relationship.clone(),
            },
            Direction::ToDatabase,
        )
    }

    fn drop_relationship_to_model(&self, relationship: &Relationship) -> Token {
        Token::new(
            TokenKind::DropRelationship {
                relationship: relationship.clone(),
            },
            Direction::ToModel,
        )
    }

    fn set_primary_key_to_db(
        &self,
        entity: &Entity,
        old_name: Option<&str>,
        old_columns: &[Column],
        new_columns: &[Column],
    ) -> Token {
        Token::new(
            TokenKind::SetPrimaryKey {
                entity: entity.clone(),
                old_name: old_name.map(str::to_string),
                old_columns: old_columns.to_vec(),
                new_columns: new_columns.to_vec(),
            },
            Direction::ToDatabase,
        )
    }

    fn set_primary_key_to_model(
        &self,
        entity: &Entity,
        old_name: Option<&str>,
        old_columns: &[Column],
        new_columns: &[Column],
    ) -> Token {
        Token::new(
            TokenKind::SetPrimaryKey {
                entity: entity.clone(),
                old_name: old_name.map(str::to_string),
                old_columns: old_columns.to_vec(),
                new_columns: new_columns.to_vec(),
            },
            Direction::ToModel,
        )
    }

    fn set_value_for_null_to_db(&self, entity: &Entity, column: &Column, value: String) -> Token {
        Token::new(
            TokenKind::SetValueForNull {
                entity: entity.clone(),
                column: column.clone(),
                value,
            },
            Direction::ToDatabase,
        )
    }
}

/// The stock factory: every token built with the default construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardMergerFactory;

impl MergerFactory for StandardMergerFactory {}
