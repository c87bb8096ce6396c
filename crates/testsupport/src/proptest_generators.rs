//! Property-based test generators using proptest.
//!
//! Strategies for schemas, fields, tuples and page occupancy patterns.

use std::sync::Arc;

use common::{TdItem, Tuple, TupleDesc};
use proptest::prelude::*;
use types::{Field, STRING_LEN, Type};

pub fn arb_type() -> impl Strategy<Value = Type> {
    prop_oneof![Just(Type::Int), Just(Type::String)]
}

/// Strategy for a value of type `ty`. Strings stay within the encoded width.
pub fn arb_field(ty: Type) -> BoxedStrategy<Field> {
    match ty {
        Type::Int => any::<i32>().prop_map(Field::Int).boxed(),
        Type::String => proptest::string::string_regex(&format!("[a-zA-Z0-9 ]{{0,{STRING_LEN}}}"))
            .expect("valid regex")
            .prop_map(Field::String)
            .boxed(),
    }
}

/// Strategy for schemas of 1 to `max_fields` columns, some of them unnamed.
pub fn arb_tuple_desc(max_fields: usize) -> impl Strategy<Value = Arc<TupleDesc>> {
    prop::collection::vec(
        (arb_type(), prop::option::weighted(0.8, "[a-z]{1,8}")),
        1..=max_fields.max(1),
    )
    .prop_map(|cols| {
        let items = cols
            .into_iter()
            .map(|(ty, name)| TdItem { ty, name })
            .collect();
        Arc::new(TupleDesc::from_items(items).expect("non-empty schema"))
    })
}

/// Strategy for tuples conforming to `desc`.
///
/// # Example
///
/// ```
/// use proptest::prelude::*;
/// use testsupport::{fixtures::emp_desc, proptest_generators::arb_tuple};
///
/// proptest! {
///     #[test]
///     fn tuples_match_schema(tuple in arb_tuple(emp_desc())) {
///         prop_assert_eq!(tuple.fields().len(), 3);
///     }
/// }
/// ```
pub fn arb_tuple(desc: Arc<TupleDesc>) -> impl Strategy<Value = Tuple> {
    let fields: Vec<_> = desc.types().map(arb_field).collect();
    fields.prop_map(move |fields| Tuple::new(desc.clone(), fields).expect("fields match schema"))
}

/// Strategy for pages of exactly `num_slots` slots, each free or holding a tuple.
pub fn arb_page_slots(
    desc: Arc<TupleDesc>,
    num_slots: usize,
) -> impl Strategy<Value = Vec<Option<Tuple>>> {
    prop::collection::vec(prop::option::of(arb_tuple(desc)), num_slots)
}

/// Strategy for files of up to `max_pages` pages of `num_slots` slots each.
pub fn arb_pages(
    desc: Arc<TupleDesc>,
    num_slots: usize,
    max_pages: usize,
) -> impl Strategy<Value = Vec<Vec<Option<Tuple>>>> {
    prop::collection::vec(arb_page_slots(desc, num_slots), 0..=max_pages)
}
