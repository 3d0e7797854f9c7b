//! Token execution.
//!
//! Tokens are applied strictly in orderer-provided sequence. A failure
//! executing one token aborts the remaining run and surfaces the
//! triggering token's identity; no partial rollback is attempted, since
//! DDL is typically non-transactional across vendors.

use crate::adapter::DbAdapter;
use crate::context::{MergeContext, SchemaChange};
use crate::error::{Error, Result};
use crate::token::{Direction, Token, TokenKind, requires_fk_constraint};
use dbmerge_schema::{Column, Relationship, SqlType, names};

/// Apply an ordered token list to the context's target. The first
/// failure aborts the remainder; validation findings survive in the
/// context either way.
pub fn execute_tokens(tokens: &[Token], ctx: &mut MergeContext<'_>) -> Result<()> {
    for token in tokens {
        tracing::info!(direction = %token.direction(), "executing {token}");
        token.execute(ctx).map_err(|source| Error::Token {
            name: token.token_name().to_string(),
            value: token.token_value(),
            source: Box::new(source),
        })?;
    }
    Ok(())
}

/// Render a token list for human review (dry-run mode): one
/// `token-name token-value` line per token.
pub fn plan(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&token.to_string());
        out.push('\n');
    }
    out
}

impl Token {
    /// Apply this token to the context's target: to-database tokens emit
    /// DDL through the adapter boundary, to-model tokens mutate the
    /// in-memory schema and broadcast [`SchemaChange`] events.
    pub fn execute(&self, ctx: &mut MergeContext<'_>) -> Result<()> {
        match self.direction() {
            Direction::ToDatabase => self.execute_to_db(ctx),
            Direction::ToModel => self.execute_to_model(ctx),
        }
    }

    fn execute_to_db(&self, ctx: &mut MergeContext<'_>) -> Result<()> {
        let statements = self.render(ctx.adapter);
        if statements.is_empty() {
            tracing::debug!("no statements for {self}, skipping");
            return Ok(());
        }
        for sql in statements {
            ctx.execute_sql(&sql)?;
        }
        Ok(())
    }

    /// Statements for this token's database-side effect. Empty means
    /// no-op: a to-many or self-referential relationship has no foreign
    /// key to create, and a relationship without a resolvable constraint
    /// name has none to drop.
    fn render(&self, adapter: &dyn DbAdapter) -> Vec<String> {
        match self.kind() {
            TokenKind::CreateTable { entity } => adapter.create_table(entity),
            TokenKind::DropTable { entity } => adapter.drop_table(entity),
            TokenKind::AddColumn { entity, column } => adapter.add_column(entity, column),
            TokenKind::DropColumn { entity, column } => adapter.drop_column(entity, column),
            TokenKind::SetNotNull { entity, column } => adapter.set_not_null(entity, column),
            TokenKind::SetAllowNull { entity, column } => adapter.set_allow_null(entity, column),
            TokenKind::SetColumnType { entity, from, to } => {
                adapter.set_column_type(entity, from, to)
            }
            TokenKind::AddRelationship { relationship } => {
                if requires_fk_constraint(relationship) {
                    adapter.add_foreign_key(relationship)
                } else {
                    Vec::new()
                }
            }
            TokenKind::DropRelationship { relationship } => match &relationship.fk_name {
                Some(constraint) => adapter.drop_foreign_key(relationship, constraint),
                None => Vec::new(),
            },
            TokenKind::SetPrimaryKey {
                entity,
                old_name,
                old_columns,
                new_columns,
            } => adapter.set_primary_key(entity, old_name.as_deref(), old_columns, new_columns),
            TokenKind::SetValueForNull {
                entity,
                column,
                value,
            } => adapter.set_value_for_null(entity, column, value),
        }
    }

    fn execute_to_model(&self, ctx: &mut MergeContext<'_>) -> Result<()> {
        match self.kind() {
            TokenKind::CreateTable { entity } => {
                if ctx.schema.find_entity(entity.name()).is_some() {
                    return Ok(());
                }
                ctx.schema.add_entity(entity.clone())?;
                ctx.notify(SchemaChange::EntityAdded(entity.clone()));
                Ok(())
            }
            TokenKind::DropTable { entity } => {
                if let Some(removed) = ctx.schema.remove_entity(entity.name()) {
                    ctx.notify(SchemaChange::EntityRemoved(removed));
                }
                Ok(())
            }
            TokenKind::AddColumn { entity, column } => {
                let name = entity.name().to_string();
                let target = ctx
                    .schema
                    .find_entity_mut(&name)
                    .ok_or_else(|| Error::UnknownEntity(name.clone()))?;
                if target.find_column(&column.name).is_some() {
                    return Ok(());
                }
                target.add_column(column.clone())?;
                ctx.notify(SchemaChange::ColumnAdded {
                    entity: name,
                    column: column.clone(),
                });
                Ok(())
            }
            TokenKind::DropColumn { entity, column } => {
                let name = entity.name().to_string();
                let target = ctx
                    .schema
                    .find_entity_mut(&name)
                    .ok_or_else(|| Error::UnknownEntity(name.clone()))?;
                if let Some(removed) = target.remove_column(&column.name) {
                    ctx.notify(SchemaChange::ColumnRemoved {
                        entity: name,
                        column: removed,
                    });
                }
                Ok(())
            }
            TokenKind::SetNotNull { entity, column } => {
                set_mandatory(ctx, entity.name(), &column.name, true)
            }
            TokenKind::SetAllowNull { entity, column } => {
                set_mandatory(ctx, entity.name(), &column.name, false)
            }
            TokenKind::SetColumnType { entity, to, .. } => {
                let name = entity.name().to_string();
                let target = ctx
                    .schema
                    .find_entity_mut(&name)
                    .ok_or_else(|| Error::UnknownEntity(name.clone()))?;
                let existing = target.find_column_mut(&to.name).ok_or_else(|| {
                    Error::UnknownColumn {
                        entity: name.clone(),
                        column: to.name.clone(),
                    }
                })?;
                existing.sql_type = to.sql_type;
                existing.max_length = to.max_length;
                existing.precision = to.precision;
                existing.scale = to.scale;
                ctx.notify(SchemaChange::ColumnChanged {
                    entity: name,
                    column: to.name.clone(),
                });
                Ok(())
            }
            TokenKind::AddRelationship { relationship } => {
                add_relationship_to_model(ctx, relationship)
            }
            TokenKind::DropRelationship { relationship } => {
                let Some(source) = ctx.schema.find_entity_mut(&relationship.source_entity) else {
                    ctx.validation.add_warning(format!(
                        "drop relationship {relationship}: no such entity in the model"
                    ));
                    return Ok(());
                };
                if let Some(removed) = source.remove_relationship(relationship) {
                    ctx.notify(SchemaChange::RelationshipRemoved(removed));
                }
                Ok(())
            }
            TokenKind::SetPrimaryKey {
                entity,
                new_columns,
                ..
            } => {
                let name = entity.name().to_string();
                let target = ctx
                    .schema
                    .find_entity_mut(&name)
                    .ok_or_else(|| Error::UnknownEntity(name.clone()))?;
                for column in new_columns {
                    if target.find_column(&column.name).is_none() {
                        return Err(Error::UnknownColumn {
                            entity: name,
                            column: column.name.clone(),
                        });
                    }
                }
                for column in target.columns_mut() {
                    column.primary_key = false;
                }
                for column in new_columns {
                    if let Some(existing) = target.find_column_mut(&column.name) {
                        existing.primary_key = true;
                    }
                }
                ctx.notify(SchemaChange::PrimaryKeyChanged { entity: name });
                Ok(())
            }
            // data fixup with no model counterpart
            TokenKind::SetValueForNull { .. } => Ok(()),
        }
    }
}

fn set_mandatory(
    ctx: &mut MergeContext<'_>,
    entity_name: &str,
    column_name: &str,
    mandatory: bool,
) -> Result<()> {
    let target = ctx
        .schema
        .find_entity_mut(entity_name)
        .ok_or_else(|| Error::UnknownEntity(entity_name.to_string()))?;
    let column = target
        .find_column_mut(column_name)
        .ok_or_else(|| Error::UnknownColumn {
            entity: entity_name.to_string(),
            column: column_name.to_string(),
        })?;
    column.mandatory = mandatory;
    ctx.notify(SchemaChange::ColumnChanged {
        entity: entity_name.to_string(),
        column: column_name.to_string(),
    });
    Ok(())
}

/// Merge a relationship into the model's source entity, synthesizing any
/// join columns the entity is missing (typed after the target column when
/// resolvable) and deduplicating the relationship name.
fn add_relationship_to_model(ctx: &mut MergeContext<'_>, rel: &Relationship) -> Result<()> {
    let source = ctx
        .schema
        .find_entity(&rel.source_entity)
        .ok_or_else(|| Error::UnknownEntity(rel.source_entity.clone()))?;
    if source.find_relationship(rel).is_some() {
        return Ok(());
    }

    let mut missing: Vec<Column> = Vec::new();
    for join in &rel.joins {
        if source.find_column(&join.source).is_none() {
            let template = ctx
                .schema
                .find_entity(&rel.target_entity)
                .and_then(|t| t.find_column(&join.target));
            let mut column = match template {
                Some(t) => {
                    let mut c = Column::new(join.source.clone(), t.sql_type);
                    c.max_length = t.max_length;
                    c.precision = t.precision;
                    c.scale = t.scale;
                    c
                }
                None => Column::new(join.source.clone(), SqlType::BigInt),
            };
            column.foreign_key = true;
            missing.push(column);
        }
    }

    let mut new_rel = rel.clone();
    if new_rel.name.is_empty() {
        let base = names::strip_id_suffix(&new_rel.target_entity).to_ascii_lowercase();
        new_rel.name = names::unique_relationship_name(source, &base);
    }

    let source_name = source.name().to_string();
    if let Some(entity) = ctx.schema.find_entity_mut(&source_name) {
        for column in &missing {
            entity.add_column(column.clone())?;
        }
        entity.add_relationship(new_rel.clone());
    }
    for column in missing {
        ctx.notify(SchemaChange::ColumnAdded {
            entity: source_name.clone(),
            column,
        });
    }
    ctx.notify(SchemaChange::RelationshipAdded(new_rel));
    Ok(())
}
