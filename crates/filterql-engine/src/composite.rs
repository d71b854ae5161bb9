//! Composite identity (spec §4.8): a value-based identity for entities
//! declaring more than one id field, and the predicate builder that compiles
//! a batch of ids (simple or composite) into a backend predicate.

use filterql_core::query_builder::{CriteriaBuilder, Path, Predicate};
use filterql_core::Value;

/// Large `IN` sets are chunked to this many values per clause (spec §4.7
/// "Large IN sets: batched to a maximum of 500 values per IN clause").
pub const MAX_IN_CLAUSE: usize = 500;

/// Parent ids are partitioned into batches of this size before issuing one
/// sub-query per batch (spec §4.7 step 4).
pub const MAX_PARENT_BATCH: usize = 1000;

/// A value-based identity composed of one or more scalar fields (GLOSSARY
/// "Composite key"). A single-field id is represented as a one-element key
/// rather than a special case, so every code path downstream treats simple
/// and composite identity uniformly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompositeKey(pub Vec<Value>);

impl CompositeKey {
    pub fn single(value: Value) -> Self {
        Self(vec![value])
    }
}

/// Split `items` into chunks of at most `batch_size`. Empty input yields no
/// batches at all, matching spec §4.7 step 4's "Terminate early if the set
/// is empty".
pub fn partition_batches<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    items.chunks(batch_size.max(1)).map(<[T]>::to_vec).collect()
}

/// Builds the `WHERE id IN (...)` / composite-OR-of-AND predicate for a
/// batch of ids (spec §4.8).
///
/// `id_paths` is the dotted path (relative to `root`) for each component of
/// the id, in the same order as each `CompositeKey`'s elements. For a
/// simple (single-field) id this is the field name itself; for a composite
/// parent id reached through an association field it is
/// `"<associationField>.<parentIdField>"` per component.
pub struct IdPredicateBuilder;

impl IdPredicateBuilder {
    pub fn build(
        root: &dyn Path,
        builder: &dyn CriteriaBuilder,
        id_paths: &[String],
        ids: &[CompositeKey],
    ) -> Box<dyn Predicate> {
        if ids.is_empty() || id_paths.is_empty() {
            // Empty id set ⇒ always-false predicate (spec §4.8).
            return builder.disjunction();
        }

        if id_paths.len() == 1 {
            let path = crate::path::nested_path(root, &id_paths[0]);
            let values: Vec<Value> = ids.iter().map(|k| k.0[0].clone()).collect();
            if values.len() <= MAX_IN_CLAUSE {
                return builder.in_list(path.as_ref(), &values, false);
            }
            let clauses: Vec<Box<dyn Predicate>> = values
                .chunks(MAX_IN_CLAUSE)
                .map(|chunk| builder.in_list(path.as_ref(), chunk, false))
                .collect();
            return builder.or(clauses);
        }

        let terms: Vec<Box<dyn Predicate>> = ids
            .iter()
            .map(|key| {
                let eq_terms: Vec<Box<dyn Predicate>> = id_paths
                    .iter()
                    .zip(key.0.iter())
                    .map(|(path, value)| {
                        let p = crate::path::nested_path(root, path);
                        builder.equal(p.as_ref(), value)
                    })
                    .collect();
                builder.and(eq_terms)
            })
            .collect();
        builder.or(terms)
    }
}
