//! End-to-end reconciliation tests.
//!
//! The central property: for any two snapshots A (model) and B
//! (detected), resolving every token of `diff(A, B)` model-side turns A
//! into a schema structurally equal to B. Resolution applies each
//! token's model-side form (the token itself when it is already
//! to-model, its reverse otherwise) in reverse plan order, undo-style.

use dbmerge::{
    DbAdapter, Direction, MergeContext, Merger, ScriptExecutor, StandardMergerFactory, Token,
};
use dbmerge_schema::{Column, Entity, Relationship, Schema, SqlType};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Adapter producing minimal generic DDL, enough to observe statement
/// order and content.
struct GenericAdapter;

impl DbAdapter for GenericAdapter {
    fn create_table(&self, entity: &Entity) -> Vec<String> {
        let cols: Vec<String> = entity
            .columns()
            .map(|c| format!("{} {}", c.name, c.sql_type))
            .collect();
        vec![format!("CREATE TABLE {} ({})", entity.name(), cols.join(", "))]
    }
    fn drop_table(&self, entity: &Entity) -> Vec<String> {
        vec![format!("DROP TABLE {}", entity.name())]
    }
    fn add_column(&self, entity: &Entity, column: &Column) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            entity.name(),
            column.name,
            column.sql_type
        )]
    }
    fn drop_column(&self, entity: &Entity, column: &Column) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            entity.name(),
            column.name
        )]
    }
    fn set_not_null(&self, entity: &Entity, column: &Column) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
            entity.name(),
            column.name
        )]
    }
    fn set_allow_null(&self, entity: &Entity, column: &Column) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
            entity.name(),
            column.name
        )]
    }
    fn set_column_type(&self, entity: &Entity, _from: &Column, to: &Column) -> Vec<String> {
        let length = to
            .max_length
            .map(|l| format!("({l})"))
            .unwrap_or_default();
        vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}{}",
            entity.name(),
            to.name,
            to.sql_type,
            length
        )]
    }
    fn add_foreign_key(&self, relationship: &Relationship) -> Vec<String> {
        let join = &relationship.joins[0];
        vec![format!(
            "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({})",
            relationship.source_entity, join.source, relationship.target_entity, join.target
        )]
    }
    fn drop_foreign_key(&self, relationship: &Relationship, constraint: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            relationship.source_entity, constraint
        )]
    }
    fn set_primary_key(
        &self,
        entity: &Entity,
        old_name: Option<&str>,
        _old_columns: &[Column],
        new_columns: &[Column],
    ) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(name) = old_name {
            out.push(format!("ALTER TABLE {} DROP CONSTRAINT {}", entity.name(), name));
        }
        let cols: Vec<&str> = new_columns.iter().map(|c| c.name.as_str()).collect();
        out.push(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            entity.name(),
            cols.join(", ")
        ));
        out
    }
    fn set_value_for_null(&self, entity: &Entity, column: &Column, value: &str) -> Vec<String> {
        vec![format!(
            "UPDATE {} SET {} = {} WHERE {} IS NULL",
            entity.name(),
            column.name,
            value,
            column.name
        )]
    }
}

/// Resolve every token model-side against `schema`, undo-style.
fn resolve_model_side(tokens: &[Token], schema: &mut Schema) {
    let factory = StandardMergerFactory;
    let adapter = GenericAdapter;
    let mut script = ScriptExecutor::new();
    let mut ctx = MergeContext::new(schema, &adapter, &mut script);
    for token in tokens.iter().rev() {
        let model_side = match token.direction() {
            Direction::ToModel => Some(token.clone()),
            Direction::ToDatabase => token.create_reverse(&factory),
        };
        if let Some(token) = model_side {
            token.execute(&mut ctx).unwrap();
        }
    }
}

/// Simulate applying the to-database tokens to the detected snapshot:
/// the structural effect of each token's DDL equals its kind executed
/// model-style against that snapshot. No-op tokens (to-many
/// relationship bookkeeping) are to-model and skipped here.
fn resolve_database_side(tokens: &[Token], schema: &mut Schema) {
    let adapter = GenericAdapter;
    let mut script = ScriptExecutor::new();
    let mut ctx = MergeContext::new(schema, &adapter, &mut script);
    for token in tokens {
        if token.direction() == Direction::ToDatabase {
            Token::new(token.kind().clone(), Direction::ToModel)
                .execute(&mut ctx)
                .unwrap();
        }
    }
}

fn diff(existing: &Schema, detected: &Schema) -> Vec<Token> {
    let factory = StandardMergerFactory;
    Merger::new(&factory).create_merge_tokens(existing, detected)
}

fn artist() -> Entity {
    Entity::new("ARTIST")
        .column(Column::new("ID", SqlType::BigInt).pk())
        .column(
            Column::new("NAME", SqlType::Varchar)
                .not_null()
                .with_max_length(100),
        )
}

fn assert_converges(existing: &Schema, detected: &Schema) {
    init_tracing();
    let tokens = diff(existing, detected);
    let mut model = existing.clone();
    resolve_model_side(&tokens, &mut model);
    assert!(
        model.structurally_equal(detected),
        "model did not converge\ntokens: {tokens:#?}\nmodel: {model:#?}\ndetected: {detected:#?}"
    );
}

#[test]
fn converges_over_column_drift() {
    let existing = Schema::new().entity(
        artist().column(Column::new("BIRTHDATE", SqlType::Date).not_null()),
    );
    let detected = Schema::new().entity(
        Entity::new("ARTIST")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(
                Column::new("NAME", SqlType::Varchar)
                    .with_max_length(50),
            )
            .column(Column::new("BIRTHYEAR", SqlType::Integer)),
    );
    assert_converges(&existing, &detected);
}

#[test]
fn converges_over_missing_and_extra_tables() {
    let rel = Relationship::new("artist", "PAINTING", "ARTIST").join("ARTIST_ID", "ID");
    let existing = Schema::new().entity(artist()).entity(
        Entity::new("PAINTING")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("ARTIST_ID", SqlType::BigInt).fk())
            .relationship(rel),
    );
    let detected = Schema::new().entity(
        Entity::new("GALLERY")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("CITY", SqlType::Varchar).with_max_length(40)),
    );
    assert_converges(&existing, &detected);
}

#[test]
fn converges_over_primary_key_drift() {
    let existing = Schema::new().entity(
        Entity::new("ARTIST")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("CODE", SqlType::Varchar).not_null()),
    );
    let mut detected_entity = Entity::new("ARTIST")
        .column(Column::new("ID", SqlType::BigInt).not_null())
        .column(Column::new("CODE", SqlType::Varchar).pk());
    detected_entity.primary_key_name = Some("pk_artist".to_string());
    let detected = Schema::new().entity(detected_entity);
    assert_converges(&existing, &detected);
}

#[test]
fn converges_over_detected_to_many_relationship() {
    let forward = Relationship::new("paintings", "ARTIST", "PAINTING")
        .to_many()
        .join("ID", "ARTIST_ID");
    let existing = Schema::new().entity(artist()).entity(
        Entity::new("PAINTING")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("ARTIST_ID", SqlType::BigInt).fk()),
    );
    let detected = Schema::new()
        .entity(artist().relationship(forward))
        .entity(
            Entity::new("PAINTING")
                .column(Column::new("ID", SqlType::BigInt).pk())
                .column(Column::new("ARTIST_ID", SqlType::BigInt).fk()),
        );
    assert_converges(&existing, &detected);
}

#[test]
fn generated_script_reconciles_a_database() {
    init_tracing();
    let rel = Relationship::new("artist", "PAINTING", "ARTIST").join("ARTIST_ID", "ID");
    let existing = Schema::new().entity(artist()).entity(
        Entity::new("PAINTING")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("ARTIST_ID", SqlType::BigInt).fk())
            .relationship(rel),
    );
    let detected = Schema::new()
        .entity(
            Entity::new("ARTIST")
                .column(Column::new("ID", SqlType::BigInt).pk())
                .column(
                    Column::new("NAME", SqlType::Varchar)
                        .not_null()
                        .with_max_length(50),
                ),
        )
        .entity(Entity::new("OBSOLETE").column(Column::new("ID", SqlType::BigInt).pk()));

    let tokens = diff(&existing, &detected);
    let mut model = existing.clone();
    let adapter = GenericAdapter;
    let mut script = ScriptExecutor::new();
    let mut ctx = MergeContext::new(&mut model, &adapter, &mut script);
    dbmerge::execute_tokens(&tokens, &mut ctx).unwrap();
    drop(ctx);

    insta::assert_snapshot!(script.statements().join("\n"), @r"
    CREATE TABLE PAINTING (ID BIGINT, ARTIST_ID BIGINT)
    ALTER TABLE ARTIST ALTER COLUMN NAME TYPE VARCHAR(100)
    ALTER TABLE PAINTING ADD FOREIGN KEY (ARTIST_ID) REFERENCES ARTIST (ID)
    DROP TABLE OBSOLETE
    ");
}

#[test]
fn fk_column_is_created_before_its_foreign_key() {
    init_tracing();
    let rel = Relationship::new("artist", "PAINTING", "ARTIST").join("ARTIST_ID", "ID");
    let existing = Schema::new().entity(artist()).entity(
        Entity::new("PAINTING")
            .column(Column::new("ID", SqlType::BigInt).pk())
            .column(Column::new("ARTIST_ID", SqlType::BigInt).fk())
            .relationship(rel),
    );
    let detected = Schema::new()
        .entity(artist())
        .entity(Entity::new("PAINTING").column(Column::new("ID", SqlType::BigInt).pk()));

    let tokens = diff(&existing, &detected);
    let mut model = existing.clone();
    let adapter = GenericAdapter;
    let mut script = ScriptExecutor::new();
    let mut ctx = MergeContext::new(&mut model, &adapter, &mut script);
    dbmerge::execute_tokens(&tokens, &mut ctx).unwrap();
    drop(ctx);

    assert_eq!(
        script.statements(),
        [
            "ALTER TABLE PAINTING ADD COLUMN ARTIST_ID BIGINT",
            "ALTER TABLE PAINTING ADD FOREIGN KEY (ARTIST_ID) REFERENCES ARTIST (ID)",
        ]
    );
}

// generated column-only schema pairs; shared column names share a type
// so that every drift is expressible as a token

const ENTITY_NAMES: [&str; 4] = ["ARTIST", "PAINTING", "GALLERY", "EXHIBIT"];
const COLUMN_POOL: [(&str, SqlType); 6] = [
    ("ID", SqlType::BigInt),
    ("NAME", SqlType::Varchar),
    ("CODE", SqlType::Char),
    ("CREATED_AT", SqlType::Timestamp),
    ("ACTIVE", SqlType::Boolean),
    ("WEIGHT", SqlType::Double),
];

#[derive(Debug, Clone)]
struct ColumnSpec {
    pool_index: usize,
    mandatory: bool,
    length: u32,
}

fn arb_columns() -> impl Strategy<Value = Vec<ColumnSpec>> {
    proptest::collection::vec(
        (
            0usize..COLUMN_POOL.len(),
            any::<bool>(),
            prop_oneof![Just(10u32), Just(20u32)],
        )
            .prop_map(|(pool_index, mandatory, length)| ColumnSpec {
                pool_index,
                mandatory,
                length,
            }),
        1..5,
    )
}

fn arb_schema() -> impl Strategy<Value = Schema> {
    proptest::collection::vec(proptest::option::of(arb_columns()), ENTITY_NAMES.len()).prop_map(
        |per_entity| {
            let mut schema = Schema::new();
            for (name, specs) in ENTITY_NAMES.iter().zip(per_entity) {
                let Some(specs) = specs else { continue };
                let mut entity = Entity::new(*name);
                for (i, spec) in specs.iter().enumerate() {
                    let (col_name, sql_type) = COLUMN_POOL[spec.pool_index];
                    if entity.find_column(col_name).is_some() {
                        continue;
                    }
                    let mut column = Column::new(col_name, sql_type);
                    column.mandatory = spec.mandatory;
                    if sql_type.is_character() {
                        column.max_length = Some(spec.length);
                    }
                    // first column carries the primary key
                    if i == 0 {
                        column.primary_key = true;
                        column.mandatory = true;
                    }
                    entity
                        .add_column(column)
                        .expect("pool guarantees unique names");
                }
                schema
                    .add_entity(entity)
                    .expect("entity names are unique by construction");
            }
            schema
        },
    )
}

proptest! {
    #[test]
    fn diff_of_identical_schemas_is_empty(schema in arb_schema()) {
        let tokens = diff(&schema, &schema);
        prop_assert!(tokens.is_empty(), "unexpected tokens: {tokens:?}");
    }

    #[test]
    fn any_pair_of_schemas_converges(existing in arb_schema(), detected in arb_schema()) {
        let tokens = diff(&existing, &detected);
        let mut model = existing.clone();
        resolve_model_side(&tokens, &mut model);
        prop_assert!(
            model.structurally_equal(&detected),
            "model did not converge; tokens: {tokens:?}"
        );
    }

    #[test]
    fn database_side_resolution_converges(existing in arb_schema(), detected in arb_schema()) {
        let tokens = diff(&existing, &detected);
        let mut database = detected.clone();
        resolve_database_side(&tokens, &mut database);
        prop_assert!(
            database.structurally_equal(&existing),
            "database did not converge; tokens: {tokens:?}"
        );
    }

    #[test]
    fn plans_are_deterministic(existing in arb_schema(), detected in arb_schema()) {
        prop_assert_eq!(diff(&existing, &detected), diff(&existing, &detected));
    }
}
