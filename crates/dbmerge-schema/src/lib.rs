//! Schema model types for dbmerge.
//!
//! This crate contains the in-memory representation of a database schema
//! snapshot: entities (tables), columns, relationships and primary keys.
//! It is shared between the reconciliation engine and whatever loads
//! snapshots (a live-database introspector on one side, a persisted model
//! on the other).
//!
//! ## Identity
//!
//! Entity and column names are identities **case-insensitively**: lookups
//! go through an index keyed by the upper-cased name, while the original
//! casing is preserved for display and DDL generation. Declaration order
//! is preserved as well.

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

pub mod names;

pub use names::normalize;

/// Error constructing or mutating a schema snapshot.
#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate entity name: {0}")]
    DuplicateEntity(String),

    #[error("duplicate column name: {entity}.{column}")]
    DuplicateColumn { entity: String, column: String },
}

/// SQL column types, as a closed set of type codes.
///
/// This mirrors the usual JDBC-style type codes without committing to any
/// dialect's spelling; [`fmt::Display`] renders the conventional keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// SMALLINT (2 bytes)
    SmallInt,
    /// INTEGER (4 bytes)
    Integer,
    /// BIGINT (8 bytes)
    BigInt,
    /// REAL (4 bytes floating point)
    Real,
    /// DOUBLE PRECISION (8 bytes floating point)
    Double,
    /// NUMERIC (precision/scale)
    Numeric,
    /// DECIMAL (precision/scale)
    Decimal,
    /// BOOLEAN
    Boolean,
    /// CHAR (fixed length)
    Char,
    /// VARCHAR (variable length)
    Varchar,
    /// LONGVARCHAR / TEXT
    LongVarchar,
    /// DATE
    Date,
    /// TIME
    Time,
    /// TIMESTAMP
    Timestamp,
    /// BINARY
    Binary,
    /// BLOB
    Blob,
    /// CLOB
    Clob,
}

impl SqlType {
    /// True for character types, where a declared max length is part of
    /// the column's shape and participates in drift detection.
    pub fn is_character(&self) -> bool {
        matches!(self, SqlType::Char | SqlType::Varchar | SqlType::LongVarchar)
    }

    /// True if a max length is meaningful for this type.
    pub fn supports_length(&self) -> bool {
        self.is_character() || matches!(self, SqlType::Binary)
    }

    /// True if precision/scale are meaningful for this type.
    pub fn supports_precision(&self) -> bool {
        matches!(self, SqlType::Numeric | SqlType::Decimal)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Real => write!(f, "REAL"),
            SqlType::Double => write!(f, "DOUBLE PRECISION"),
            SqlType::Numeric => write!(f, "NUMERIC"),
            SqlType::Decimal => write!(f, "DECIMAL"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Char => write!(f, "CHAR"),
            SqlType::Varchar => write!(f, "VARCHAR"),
            SqlType::LongVarchar => write!(f, "LONGVARCHAR"),
            SqlType::Date => write!(f, "DATE"),
            SqlType::Time => write!(f, "TIME"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
            SqlType::Binary => write!(f, "BINARY"),
            SqlType::Blob => write!(f, "BLOB"),
            SqlType::Clob => write!(f, "CLOB"),
        }
    }
}

/// A column definition.
///
/// Length and precision/scale are only meaningful for applicable types
/// (see [`SqlType::supports_length`] / [`SqlType::supports_precision`]);
/// they are carried but ignored elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name (original casing)
    pub name: String,
    /// SQL type code
    pub sql_type: SqlType,
    /// Whether the column is NOT NULL
    pub mandatory: bool,
    /// Declared max length (character/binary types)
    pub max_length: Option<u32>,
    /// Numeric precision
    pub precision: Option<u32>,
    /// Numeric scale
    pub scale: Option<i32>,
    /// Whether this column is part of the primary key
    pub primary_key: bool,
    /// Whether this column participates in a foreign key
    pub foreign_key: bool,
}

impl Column {
    /// Create a nullable, non-key column of the given type.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            mandatory: false,
            max_length: None,
            precision: None,
            scale: None,
            primary_key: false,
            foreign_key: false,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Mark the column as part of the primary key (implies NOT NULL).
    pub fn pk(mut self) -> Self {
        self.primary_key = true;
        self.mandatory = true;
        self
    }

    /// Mark the column as participating in a foreign key.
    pub fn fk(mut self) -> Self {
        self.foreign_key = true;
        self
    }

    /// Set the declared max length.
    pub fn with_max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Set precision and scale.
    pub fn with_precision(mut self, precision: u32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }
}

/// A single source-column to target-column pairing within a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Column on the source entity
    pub source: String,
    /// Column on the target entity
    pub target: String,
}

impl Join {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    fn matches(&self, other: &Join) -> bool {
        self.source.eq_ignore_ascii_case(&other.source)
            && self.target.eq_ignore_ascii_case(&other.target)
    }
}

/// A relationship from a source entity to a target entity, expressed as an
/// ordered set of column joins.
///
/// A reverse relationship is never stored on the struct; use
/// [`Schema::reverse_relationship`] to look one up.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Relationship name (may be empty for detected relationships)
    pub name: String,
    /// Source entity name
    pub source_entity: String,
    /// Target entity name
    pub target_entity: String,
    /// Whether this is a to-many relationship
    pub to_many: bool,
    /// Column-level joins, in declaration order
    pub joins: Vec<Join>,
    /// Detected foreign key constraint name, when known.
    ///
    /// Systems without formal constraints report none; a physical drop of
    /// such a relationship degrades to a no-op.
    pub fk_name: Option<String>,
}

impl Relationship {
    pub fn new(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_entity: source_entity.into(),
            target_entity: target_entity.into(),
            to_many: false,
            joins: Vec::new(),
            fk_name: None,
        }
    }

    /// Mark as to-many.
    pub fn to_many(mut self) -> Self {
        self.to_many = true;
        self
    }

    /// Add a source-column to target-column join.
    pub fn join(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.joins.push(Join::new(source, target));
        self
    }

    /// Set the detected foreign key constraint name.
    pub fn with_fk_name(mut self, name: impl Into<String>) -> Self {
        self.fk_name = Some(name.into());
        self
    }

    /// True if source and target are the same entity (case-insensitively).
    pub fn is_self_referential(&self) -> bool {
        self.source_entity.eq_ignore_ascii_case(&self.target_entity)
    }

    /// Structural equality: same endpoints and the same *unordered* set of
    /// joins, all compared case-insensitively. Name, direction cardinality
    /// and constraint names do not participate.
    pub fn joins_equal(&self, other: &Relationship) -> bool {
        if !self.source_entity.eq_ignore_ascii_case(&other.source_entity)
            || !self.target_entity.eq_ignore_ascii_case(&other.target_entity)
        {
            return false;
        }
        if self.joins.len() != other.joins.len() {
            return false;
        }
        self.joins
            .iter()
            .all(|j| other.joins.iter().any(|o| j.matches(o)))
    }

    /// True if `other` is the mirror image of this relationship: endpoints
    /// swapped and every join reversed.
    pub fn is_reverse_of(&self, other: &Relationship) -> bool {
        if !self.source_entity.eq_ignore_ascii_case(&other.target_entity)
            || !self.target_entity.eq_ignore_ascii_case(&other.source_entity)
        {
            return false;
        }
        if self.joins.len() != other.joins.len() {
            return false;
        }
        self.joins.iter().all(|j| {
            other.joins.iter().any(|o| {
                j.source.eq_ignore_ascii_case(&o.target) && j.target.eq_ignore_ascii_case(&o.source)
            })
        })
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source_entity, self.target_entity)
    }
}

/// A table-level schema object: columns, relationships and a primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity name (original casing)
    name: String,
    /// Columns keyed by normalized (upper-cased) name, declaration order
    columns: IndexMap<String, Column>,
    /// Relationships rooted at this entity
    relationships: Vec<Relationship>,
    /// Detected primary key constraint name, when known
    pub primary_key_name: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            relationships: Vec::new(),
            primary_key_name: None,
        }
    }

    /// Entity name, original casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a column; rejects a case-insensitive duplicate.
    pub fn add_column(&mut self, column: Column) -> Result<(), Error> {
        let key = normalize(&column.name);
        if self.columns.contains_key(&key) {
            return Err(Error::DuplicateColumn {
                entity: self.name.clone(),
                column: column.name,
            });
        }
        self.columns.insert(key, column);
        Ok(())
    }

    /// Builder-style [`Entity::add_column`] for literal schema setup.
    /// Silently ignores duplicates; use `add_column` when that matters.
    pub fn column(mut self, column: Column) -> Self {
        let _ = self.add_column(column);
        self
    }

    /// Case-insensitive column lookup.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(&normalize(name))
    }

    /// Case-insensitive mutable column lookup.
    pub fn find_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(&normalize(name))
    }

    /// Remove a column by name (case-insensitively). Order of the
    /// remaining columns is preserved.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        self.columns.shift_remove(&normalize(name))
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Mutable iteration over columns in declaration order.
    pub fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.columns.values_mut()
    }

    /// Add a relationship rooted at this entity.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Builder-style [`Entity::add_relationship`].
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Remove the first relationship structurally equal to `rel`.
    pub fn remove_relationship(&mut self, rel: &Relationship) -> Option<Relationship> {
        let idx = self.relationships.iter().position(|r| r.joins_equal(rel))?;
        Some(self.relationships.remove(idx))
    }

    /// Relationships rooted at this entity.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Find a relationship structurally equal to `rel` (unordered joins,
    /// case-insensitive).
    pub fn find_relationship(&self, rel: &Relationship) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.joins_equal(rel))
    }

    /// Primary key columns, in declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values().filter(|c| c.primary_key)
    }

    /// Upper-cased primary key column names; the unit of primary-key
    /// drift comparison.
    pub fn primary_key_names_upper(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .primary_key_columns()
            .map(|c| normalize(&c.name))
            .collect();
        names.sort();
        names
    }
}

/// A schema snapshot: entities keyed case-insensitively by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entities: IndexMap<String, Entity>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity; entity names are unique case-insensitively.
    pub fn add_entity(&mut self, entity: Entity) -> Result<(), Error> {
        let key = normalize(entity.name());
        if self.entities.contains_key(&key) {
            return Err(Error::DuplicateEntity(entity.name().to_string()));
        }
        self.entities.insert(key, entity);
        Ok(())
    }

    /// Builder-style [`Schema::add_entity`] for literal schema setup.
    /// Silently ignores duplicates; use `add_entity` when that matters.
    pub fn entity(mut self, entity: Entity) -> Self {
        let _ = self.add_entity(entity);
        self
    }

    /// Case-insensitive entity lookup.
    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(&normalize(name))
    }

    /// Case-insensitive mutable entity lookup.
    pub fn find_entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(&normalize(name))
    }

    /// Remove an entity by name (case-insensitively), preserving the
    /// order of the remaining entities.
    pub fn remove_entity(&mut self, name: &str) -> Option<Entity> {
        self.entities.shift_remove(&normalize(name))
    }

    /// Entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if the schema holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Look up the reverse of `rel`: a relationship on the target entity
    /// pointing back with mirrored joins. A lookup, not a stored edge.
    pub fn reverse_relationship(&self, rel: &Relationship) -> Option<&Relationship> {
        let target = self.find_entity(&rel.target_entity)?;
        target.relationships.iter().find(|r| r.is_reverse_of(rel))
    }

    /// Deep, case-insensitive structural comparison: same entities, same
    /// columns (type, nullability, length, precision, key flags), same
    /// relationship sets and primary keys. Name casing, declaration order
    /// and detected constraint names do not participate.
    pub fn structurally_equal(&self, other: &Schema) -> bool {
        if self.entities.len() != other.entities.len() {
            return false;
        }
        self.entities.values().all(|e| {
            other
                .find_entity(e.name())
                .is_some_and(|o| entity_structurally_equal(e, o))
        })
    }
}

fn entity_structurally_equal(a: &Entity, b: &Entity) -> bool {
    if a.columns.len() != b.columns.len() || a.relationships.len() != b.relationships.len() {
        return false;
    }
    let columns_match = a.columns.values().all(|c| {
        b.find_column(&c.name).is_some_and(|o| {
            c.sql_type == o.sql_type
                && c.mandatory == o.mandatory
                && c.max_length == o.max_length
                && c.precision == o.precision
                && c.scale == o.scale
                && c.primary_key == o.primary_key
        })
    });
    let relationships_match = a
        .relationships
        .iter()
        .all(|r| b.relationships.iter().any(|o| r.joins_equal(o) && r.to_many == o.to_many));
    columns_match && relationships_match && a.primary_key_names_upper() == b.primary_key_names_upper()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist() -> Entity {
        Entity::new("ARTIST")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("NAME", SqlType::Varchar).not_null().with_max_length(100))
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let e = artist();
        assert!(e.find_column("name").is_some());
        assert!(e.find_column("Name").is_some());
        assert_eq!(e.find_column("NAME").map(|c| c.name.as_str()), Some("NAME"));
        assert!(e.find_column("MISSING").is_none());
    }

    #[test]
    fn entity_lookup_is_case_insensitive() {
        let schema = Schema::new().entity(artist());
        assert!(schema.find_entity("artist").is_some());
        assert_eq!(
            schema.find_entity("Artist").map(|e| e.name()),
            Some("ARTIST")
        );
    }

    #[test]
    fn duplicate_entity_is_rejected() {
        let mut schema = Schema::new();
        schema.add_entity(Entity::new("ARTIST")).unwrap();
        let err = schema.add_entity(Entity::new("artist")).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(name) if name == "artist"));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let mut e = Entity::new("ARTIST");
        e.add_column(Column::new("ID", SqlType::BigInt)).unwrap();
        assert!(e.add_column(Column::new("id", SqlType::Integer)).is_err());
    }

    #[test]
    fn column_order_is_preserved() {
        let e = artist();
        let names: Vec<&str> = e.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ID", "NAME"]);
    }

    #[test]
    fn joins_equal_is_unordered_and_case_insensitive() {
        let a = Relationship::new("toPainting", "ARTIST", "PAINTING")
            .join("ID", "ARTIST_ID")
            .join("KIND", "KIND");
        let b = Relationship::new("", "artist", "painting")
            .join("kind", "kind")
            .join("id", "artist_id");
        assert!(a.joins_equal(&b));

        let c = Relationship::new("", "ARTIST", "PAINTING").join("ID", "OTHER");
        assert!(!a.joins_equal(&c));
    }

    #[test]
    fn reverse_relationship_is_a_lookup() {
        let forward = Relationship::new("paintings", "ARTIST", "PAINTING")
            .to_many()
            .join("ID", "ARTIST_ID");
        let backward = Relationship::new("artist", "PAINTING", "ARTIST").join("ARTIST_ID", "ID");

        let schema = Schema::new()
            .entity(
                Entity::new("ARTIST")
                    .column(Column::new("ID", SqlType::BigInt).pk())
                    .relationship(forward.clone()),
            )
            .entity(
                Entity::new("PAINTING")
                    .column(Column::new("ID", SqlType::BigInt).pk())
                    .column(Column::new("ARTIST_ID", SqlType::BigInt).fk())
                    .relationship(backward),
            );

        let reverse = schema.reverse_relationship(&forward).unwrap();
        assert_eq!(reverse.name, "artist");
    }

    #[test]
    fn structural_equality_ignores_case() {
        let a = Schema::new().entity(artist());
        let b = Schema::new().entity(
            Entity::new("artist")
                .column(Column::new("id", SqlType::BigInt).pk())
                .column(Column::new("name", SqlType::Varchar).not_null().with_max_length(100)),
        );
        assert!(a.structurally_equal(&b));
    }

    #[test]
    fn structural_equality_sees_length_drift() {
        let a = Schema::new().entity(artist());
        let b = Schema::new().entity(
            Entity::new("ARTIST")
                .column(Column::new("ID", SqlType::BigInt).pk())
                .column(Column::new("NAME", SqlType::Varchar).not_null().with_max_length(50)),
        );
        assert!(!a.structurally_equal(&b));
    }
}
