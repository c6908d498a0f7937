use bson::{Bson, Document};
use docsync::query::{Combinator, MongoDialect, Operator, Query, condition, conjunction, render};
use proptest::prelude::*;
use proptest::test_runner::{Config, FileFailurePersistence};

fn arb_operator() -> impl Strategy<Value = Operator> {
    proptest::sample::select(Operator::ALL.to_vec())
}

fn arb_combinator() -> impl Strategy<Value = Combinator> {
    prop_oneof![Just(Combinator::And), Just(Combinator::Or), Just(Combinator::Not)]
}

fn arb_query() -> impl Strategy<Value = Query> {
    let leaf = (arb_operator(), "[a-z]{1,8}", any::<i64>())
        .prop_map(|(op, f, v)| condition(op, f, v));
    leaf.prop_recursive(4, 32, 4, |inner| {
        (arb_combinator(), proptest::collection::vec(inner, 0..4))
            .prop_map(|(c, ops)| conjunction(c, ops))
    })
}

/// Independent reading of a rendered document back into its shape.
fn shape_matches(q: &Query, native: &Document) -> bool {
    match q {
        Query::Condition(c) => {
            let Some(Bson::Document(pred)) = native.get(&c.field) else { return false };
            let token = MongoDialect::operator_token(c.operator);
            native.len() == 1 && pred.len() == 1 && pred.get(token) == Some(&c.value)
        }
        Query::Conjunction(c) => {
            let token = MongoDialect::combinator_token(c.combinator);
            let Some(Bson::Array(items)) = native.get(token) else { return false };
            native.len() == 1
                && items.len() == c.operands.len()
                && c.operands.iter().zip(items).all(|(op, item)| match item {
                    Bson::Document(d) => shape_matches(op, d),
                    _ => false,
                })
        }
    }
}

proptest! {
    #![proptest_config(Config {
        cases: 128,
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource("proptest-regressions"))),
        ..Config::default()
    })]

    #[test]
    fn prop_render_is_structural(q in arb_query()) {
        let native = render(Some(&q), &MongoDialect);
        prop_assert!(shape_matches(&q, &native));
    }

    #[test]
    fn prop_render_is_deterministic(q in arb_query()) {
        prop_assert_eq!(render(Some(&q), &MongoDialect), render(Some(&q.clone()), &MongoDialect));
    }
}
