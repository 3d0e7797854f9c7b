//! Schema comparison: walk two snapshots and emit the tokens required to
//! reconcile them.
//!
//! The `existing` side is authoritative (the model); the `detected` side
//! is observed (loaded from a live database). The resulting to-database
//! tokens alter the database to match the model; each token's reverse
//! resolves the same drift toward the model instead.

use crate::adapter::{EmptyValueForNullProvider, ValueForNullProvider};
use crate::factory::MergerFactory;
use crate::filter::NameFilter;
use crate::order::sort_tokens;
use crate::token::Token;
use dbmerge_schema::{Column, Entity, Schema};
use tracing::debug;

static EMPTY_VALUE_PROVIDER: EmptyValueForNullProvider = EmptyValueForNullProvider;

/// The schema comparator.
///
/// Holds the token factory, the value provider consulted for new NOT
/// NULL columns, and the entity-name inclusion filter.
pub struct Merger<'a> {
    factory: &'a dyn MergerFactory,
    value_for_null: &'a dyn ValueForNullProvider,
    filter: NameFilter,
}

impl<'a> Merger<'a> {
    pub fn new(factory: &'a dyn MergerFactory) -> Self {
        Self {
            factory,
            value_for_null: &EMPTY_VALUE_PROVIDER,
            filter: NameFilter::all(),
        }
    }

    /// Use `provider` for backfilling freshly added mandatory columns.
    pub fn with_value_provider(mut self, provider: &'a dyn ValueForNullProvider) -> Self {
        self.value_for_null = provider;
        self
    }

    /// Restrict the diff to entity names passing `filter`.
    pub fn with_filter(mut self, filter: NameFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Compare `existing` (model) against `detected` (observed) and
    /// return the ordered token list that reconciles them.
    ///
    /// `diff(A, A)` returns an empty list.
    pub fn create_merge_tokens(&self, existing: &Schema, detected: &Schema) -> Vec<Token> {
        let mut unmatched: Vec<&Entity> = detected.entities().collect();
        let mut tokens: Vec<Token> = Vec::new();

        for entity in existing.entities() {
            if !self.filter.is_included(entity.name()) {
                continue;
            }

            let Some(detected_entity) = detected.find_entity(entity.name()) else {
                debug!(entity = entity.name(), "not in database, creating");
                tokens.push(self.factory.create_table_to_db(entity));
                for rel in entity.relationships() {
                    if !self.filter.is_included(&rel.target_entity) {
                        continue;
                    }
                    tokens.push(self.factory.add_relationship_to_db(rel));
                }
                continue;
            };

            unmatched.retain(|e| !e.name().eq_ignore_ascii_case(entity.name()));

            self.check_relationships_to_drop(existing, entity, detected_entity, &mut tokens);
            self.check_relationships_to_add(entity, detected_entity, &mut tokens);
            self.check_columns(entity, detected_entity, &mut tokens);
            if let Some(token) = self.check_primary_key(entity, detected_entity) {
                tokens.push(token);
            }
        }

        // whatever is left on the detected side has no model counterpart
        for entity in unmatched {
            if !self.filter.is_included(entity.name()) {
                continue;
            }
            debug!(entity = entity.name(), "not in model, dropping");
            tokens.push(self.factory.drop_table_to_db(entity));

            // foreign keys between a surviving table and this one would
            // dangle once the table is gone; the per-entity relationship
            // walk skips them because their target has left the model
            for rel in entity.relationships() {
                if existing.find_entity(&rel.target_entity).is_none() {
                    continue;
                }
                if let Some(reverse) = detected.reverse_relationship(rel) {
                    tokens.push(self.factory.drop_relationship_to_db(reverse));
                }
            }
        }

        sort_tokens(&mut tokens);
        tokens
    }

    /// Column drift: drops, adds (with the add → set-value → set-not-null
    /// sequence for mandatory columns), nullability and character-length
    /// changes.
    fn check_columns(&self, entity: &Entity, detected_entity: &Entity, tokens: &mut Vec<Token>) {
        for detected in detected_entity.columns() {
            if entity.find_column(&detected.name).is_none() {
                tokens.push(self.factory.drop_column_to_db(entity, detected));
            }
        }

        for column in entity.columns() {
            let Some(detected) = detected_entity.find_column(&column.name) else {
                tokens.push(self.factory.add_column_to_db(entity, column));
                if column.mandatory {
                    self.push_not_null_fixup(entity, column, tokens);
                }
                continue;
            };

            if column.mandatory != detected.mandatory {
                if column.mandatory {
                    self.push_not_null_fixup(entity, column, tokens);
                } else {
                    tokens.push(self.factory.set_allow_null_to_db(entity, column));
                }
            }

            if detected.sql_type.is_character() && column.max_length != detected.max_length {
                tokens.push(self.factory.set_column_type_to_db(entity, detected, column));
            }
        }
    }

    /// A SET NOT NULL, preceded by a value backfill when the provider can
    /// supply one. The statements must run in this order: the column
    /// cannot be constrained while NULL rows remain.
    fn push_not_null_fixup(&self, entity: &Entity, column: &Column, tokens: &mut Vec<Token>) {
        if let Some(value) = self.value_for_null.value_for(entity, column) {
            tokens.push(self.factory.set_value_for_null_to_db(entity, column, value));
        }
        tokens.push(self.factory.set_not_null_to_db(entity, column));
    }

    /// Detected relationships with no structurally-equal model
    /// counterpart are dropped. Their references are first repaired to
    /// the model's canonical identifier casing; to-many relationships
    /// have no physical foreign key, so their drop is redirected to the
    /// reverse (to-model) token.
    fn check_relationships_to_drop(
        &self,
        existing: &Schema,
        entity: &Entity,
        detected_entity: &Entity,
        tokens: &mut Vec<Token>,
    ) {
        for detected in detected_entity.relationships() {
            if entity.find_relationship(detected).is_some() {
                continue;
            }
            let Some(target) = existing.find_entity(&detected.target_entity) else {
                continue;
            };

            let mut repaired = detected.clone();
            repaired.source_entity = entity.name().to_string();
            repaired.target_entity = target.name().to_string();
            for join in &mut repaired.joins {
                if let Some(column) = entity.find_column(&join.source) {
                    join.source = column.name.clone();
                }
                if let Some(column) = target.find_column(&join.target) {
                    join.target = column.name.clone();
                }
            }

            let token = self.factory.drop_relationship_to_db(&repaired);
            let token = if repaired.to_many {
                // no physical foreign key to drop; resolve model-side
                match token.create_reverse(self.factory) {
                    Some(reverse) => reverse,
                    None => token,
                }
            } else {
                token
            };
            tokens.push(token);
        }
    }

    /// Model relationships with no detected counterpart become
    /// add-relationship tokens. The token is registered even when it
    /// requires no foreign key constraint: executing it is a DDL no-op,
    /// but its reverse still lets the relationship be merged into the
    /// model on the other side.
    fn check_relationships_to_add(
        &self,
        entity: &Entity,
        detected_entity: &Entity,
        tokens: &mut Vec<Token>,
    ) {
        for rel in entity.relationships() {
            if detected_entity.find_relationship(rel).is_some() {
                continue;
            }
            if !self.filter.is_included(&rel.target_entity) {
                continue;
            }
            tokens.push(self.factory.add_relationship_to_db(rel));
        }
    }

    /// Primary keys are compared as case-insensitive column name sets; a
    /// single set-primary-key token carries the old constraint name
    /// (when detected), the old column set and the new one.
    fn check_primary_key(&self, entity: &Entity, detected_entity: &Entity) -> Option<Token> {
        if entity.primary_key_names_upper() == detected_entity.primary_key_names_upper() {
            return None;
        }

        let old_columns: Vec<Column> = detected_entity.primary_key_columns().cloned().collect();
        let new_columns: Vec<Column> = entity.primary_key_columns().cloned().collect();
        debug!(entity = entity.name(), "primary key changed");
        Some(self.factory.set_primary_key_to_db(
            entity,
            detected_entity.primary_key_name.as_deref(),
            &old_columns,
            &new_columns,
        ))
    }
}
