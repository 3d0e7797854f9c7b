//! Dependency-aware token ordering.
//!
//! Only to-database tokens have an ordering relation: their DDL must
//! respect structural dependencies (create a table before adding a
//! relationship that references it, drop relationships before dropping
//! the table that owns them). To-model tokens carry no DDL dependency
//! and stay in their relative positions; the sort never fails on an
//! incomparable pair.

use crate::token::{Direction, Token};

/// Sort tokens into a deterministic execution order.
///
/// To-database tokens are ordered by `(dependency rank, token value)` —
/// the rank encodes creates before alters before drops, the value is a
/// stable tie-break so output is identical across runs. To-model tokens
/// keep their original positions.
pub fn sort_tokens(tokens: &mut Vec<Token>) {
    let drained: Vec<Token> = std::mem::take(tokens);
    let mut slots: Vec<Option<Token>> = Vec::with_capacity(drained.len());
    let mut db_tokens: Vec<Token> = Vec::new();

    for token in drained {
        if token.direction() == Direction::ToDatabase {
            slots.push(None);
            db_tokens.push(token);
        } else {
            slots.push(Some(token));
        }
    }

    // stable: equal (rank, value) pairs keep their diff-emission order,
    // which already sequences add-column before set-value before
    // set-not-null for the same column
    db_tokens.sort_by(|a, b| {
        (a.dependency_rank(), a.token_value()).cmp(&(b.dependency_rank(), b.token_value()))
    });

    let mut ordered = db_tokens.into_iter();
    for slot in slots {
        match slot {
            Some(token) => tokens.push(token),
            None => {
                if let Some(token) = ordered.next() {
                    tokens.push(token);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{MergerFactory, StandardMergerFactory};
    use dbmerge_schema::{Column, Entity, Relationship, SqlType};

    fn entity(name: &str) -> Entity {
        Entity::new(name).column(Column::new("ID", SqlType::BigInt).pk())
    }

    #[test]
    fn creates_precede_alters_precede_drops() {
        let factory = StandardMergerFactory;
        let artist = entity("ARTIST");
        let gallery = entity("GALLERY");
        let column = Column::new("NAME", SqlType::Varchar);
        let rel = Relationship::new("artist", "PAINTING", "ARTIST").join("ARTIST_ID", "ID");

        let mut tokens = vec![
            factory.drop_table_to_db(&gallery),
            factory.add_column_to_db(&artist, &column),
            factory.drop_relationship_to_db(&rel),
            factory.add_relationship_to_db(&rel),
            factory.create_table_to_db(&artist),
        ];
        sort_tokens(&mut tokens);

        let names: Vec<&str> = tokens.iter().map(|t| t.token_name()).collect();
        assert_eq!(
            names,
            [
                "Create Table",
                "Add Column",
                "Add Relationship",
                "Drop Relationship",
                "Drop Table",
            ]
        );
    }

    #[test]
    fn fk_column_is_added_before_its_relationship() {
        let factory = StandardMergerFactory;
        let painting = entity("PAINTING");
        let artist_id = Column::new("ARTIST_ID", SqlType::BigInt).fk();
        let rel = Relationship::new("artist", "PAINTING", "ARTIST").join("ARTIST_ID", "ID");

        let mut tokens = vec![
            factory.add_relationship_to_db(&rel),
            factory.add_column_to_db(&painting, &artist_id),
        ];
        sort_tokens(&mut tokens);

        let names: Vec<&str> = tokens.iter().map(|t| t.token_name()).collect();
        assert_eq!(names, ["Add Column", "Add Relationship"]);
    }

    #[test]
    fn create_table_precedes_add_relationship_for_a_new_entity() {
        let factory = StandardMergerFactory;
        let artist = entity("ARTIST");
        let rel = Relationship::new("paintings", "ARTIST", "PAINTING").join("ID", "ARTIST_ID");

        let mut tokens = vec![
            factory.add_relationship_to_db(&rel),
            factory.create_table_to_db(&artist),
        ];
        sort_tokens(&mut tokens);

        assert_eq!(tokens[0].token_name(), "Create Table");
        assert_eq!(tokens[1].token_name(), "Add Relationship");
    }

    #[test]
    fn tie_break_is_the_token_value() {
        let factory = StandardMergerFactory;
        let mut tokens = vec![
            factory.create_table_to_db(&entity("ZOO")),
            factory.create_table_to_db(&entity("ARTIST")),
            factory.create_table_to_db(&entity("PAINTING")),
        ];
        sort_tokens(&mut tokens);

        let values: Vec<String> = tokens.iter().map(|t| t.token_value()).collect();
        assert_eq!(values, ["ARTIST", "PAINTING", "ZOO"]);
    }

    #[test]
    fn to_model_tokens_keep_their_relative_positions() {
        let factory = StandardMergerFactory;
        let artist = entity("ARTIST");
        let gallery = entity("GALLERY");

        let mut tokens = vec![
            factory.drop_table_to_model(&gallery),
            factory.drop_table_to_db(&artist),
            factory.create_table_to_model(&artist),
            factory.create_table_to_db(&gallery),
        ];
        sort_tokens(&mut tokens);

        // to-model tokens stay at indices 0 and 2; to-db tokens reorder
        // among themselves (create before drop)
        assert_eq!(tokens[0].direction(), Direction::ToModel);
        assert_eq!(tokens[0].token_name(), "Drop Table");
        assert_eq!(tokens[1].token_name(), "Create Table");
        assert_eq!(tokens[1].direction(), Direction::ToDatabase);
        assert_eq!(tokens[2].direction(), Direction::ToModel);
        assert_eq!(tokens[2].token_name(), "Create Table");
        assert_eq!(tokens[3].token_name(), "Drop Table");
        assert_eq!(tokens[3].direction(), Direction::ToDatabase);
    }

    #[test]
    fn column_fixup_sequence_survives_sorting() {
        let factory = StandardMergerFactory;
        let artist = entity("ARTIST");
        let column = Column::new("NAME", SqlType::Varchar).not_null();

        let mut tokens = vec![
            factory.add_column_to_db(&artist, &column),
            factory.set_value_for_null_to_db(&artist, &column, "'unknown'".into()),
            factory.set_not_null_to_db(&artist, &column),
        ];
        sort_tokens(&mut tokens);

        let names: Vec<&str> = tokens.iter().map(|t| t.token_name()).collect();
        assert_eq!(names, ["Add Column", "Set Value For Null", "Set Not Null"]);
    }
}
