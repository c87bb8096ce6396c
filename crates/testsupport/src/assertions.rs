//! Custom assertion helpers for testing.

use common::{DbResult, Tuple};
use pretty_assertions::assert_eq;
use types::Field;

/// Field values of each tuple, in order.
pub fn field_rows<'a>(tuples: impl IntoIterator<Item = &'a Tuple>) -> Vec<Vec<Field>> {
    tuples.into_iter().map(|t| t.fields().to_vec()).collect()
}

/// First column of each tuple as an integer.
///
/// Panics if a first column is not an `Int`.
pub fn first_ints<'a>(tuples: impl IntoIterator<Item = &'a Tuple>) -> Vec<i32> {
    tuples
        .into_iter()
        .map(|t| {
            t.field(0)
                .ok()
                .and_then(Field::as_int)
                .expect("first column is an int")
        })
        .collect()
}

/// Assert that `tuples` carry exactly `expected`, in order.
pub fn assert_rows(tuples: &[Tuple], expected: &[Vec<Field>]) {
    assert_eq!(field_rows(tuples), expected);
}

/// Assert that an operation returns an error containing a specific substring.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let result: Result<(), common::DbError> =
///     Err(common::DbError::Catalog("unknown table 'x'".into()));
/// assert_error_contains(result, "unknown table");
/// ```
pub fn assert_error_contains<T>(result: DbResult<T>, expected_msg: &str) {
    match result {
        Ok(_) => panic!("expected error containing '{expected_msg}', got Ok"),
        Err(err) => {
            let msg = err.to_string();
            assert!(
                msg.contains(expected_msg),
                "expected error containing '{expected_msg}', got: {msg}"
            );
        }
    }
}
