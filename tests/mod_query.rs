use bson::{Bson, doc};
use docsync::query::{
    Combinator, Dialect, Direction, MongoDialect, Operator, Query, and, condition, contains, equals,
    exists, field, matches_pattern, missing, not, or, order_by, render, render_sort,
};

#[test]
fn every_operator_renders_its_token() {
    let expected = [
        (Operator::Equals, "$eq"),
        (Operator::NotEqual, "$ne"),
        (Operator::GreaterThan, "$gt"),
        (Operator::GreaterOrEqual, "$gte"),
        (Operator::LessThan, "$lt"),
        (Operator::LessOrEqual, "$lte"),
        (Operator::Contains, "$in"),
        (Operator::NotContains, "$nin"),
        (Operator::Exists, "$exists"),
        (Operator::MatchesPattern, "$regex"),
    ];
    assert_eq!(expected.len(), Operator::ALL.len());
    for (op, token) in expected {
        let q = condition(op, "f", 1);
        let mut inner = bson::Document::new();
        inner.insert(token, 1);
        assert_eq!(render(Some(&q), &MongoDialect), doc! { "f": inner }, "{op:?}");
    }
}

#[test]
fn combinators_wrap_rendered_operands() {
    let a = equals("a", 1);
    let b = field("b").greater_than(2);
    for (q, token) in [
        (and(vec![a.clone(), b.clone()]), "$and"),
        (or(vec![a.clone(), b.clone()]), "$or"),
        (not(vec![a.clone(), b.clone()]), "$nor"),
    ] {
        let rendered = render(Some(&q), &MongoDialect);
        let operands = vec![
            Bson::Document(render(Some(&a), &MongoDialect)),
            Bson::Document(render(Some(&b), &MongoDialect)),
        ];
        let mut want = bson::Document::new();
        want.insert(token, operands);
        assert_eq!(rendered, want);
    }
}

#[test]
fn renderer_never_inspects_values() {
    let q = and(vec![
        contains("courtDivisionCode", vec!["081", "091"]),
        exists("caseId"),
        missing("unassignedOn"),
        matches_pattern("name", "(?i)^jane doe$"),
    ]);
    assert_eq!(
        render(Some(&q), &MongoDialect),
        doc! { "$and": [
            { "courtDivisionCode": { "$in": ["081", "091"] } },
            { "caseId": { "$exists": true } },
            { "unassignedOn": { "$exists": false } },
            { "name": { "$regex": "(?i)^jane doe$" } },
        ]}
    );
}

#[test]
fn empty_query_is_match_all() {
    assert_eq!(render(None, &MongoDialect), MongoDialect.match_all());
}

#[test]
fn sort_renders_directions() {
    let sort = order_by(vec![
        ("orderDate".to_string(), Direction::Ascending),
        ("caseId".to_string(), Direction::Descending),
    ]);
    assert_eq!(render_sort(&sort, &MongoDialect), doc! { "orderDate": 1, "caseId": -1 });
}

#[test]
fn query_nodes_carry_explicit_kind() {
    let q = and(vec![equals("caseId", "091-900001")]);
    let v = serde_json::to_value(&q).unwrap();
    assert_eq!(v["kind"], "conjunction");
    assert_eq!(v["combinator"], "AND");
    assert_eq!(v["operands"][0]["kind"], "condition");
    assert_eq!(v["operands"][0]["operator"], "EQUALS");
    assert_eq!(v["operands"][0]["fieldName"], "caseId");
    let back: Query = serde_json::from_value(v).unwrap();
    assert_eq!(back, q);
}

#[test]
fn unknown_tokens_are_rejected_at_decode() {
    let bad_op = serde_json::json!({ "kind": "condition", "operator": "LIKE", "fieldName": "a", "value": 1 });
    assert!(serde_json::from_value::<Query>(bad_op).is_err());
    let bad_comb = serde_json::json!({ "kind": "conjunction", "combinator": "XOR", "operands": [] });
    assert!(serde_json::from_value::<Query>(bad_comb).is_err());
    let no_kind = serde_json::json!({ "operator": "EQUALS", "fieldName": "a", "value": 1 });
    assert!(serde_json::from_value::<Query>(no_kind).is_err());
}

#[test]
fn node_count_counts_every_level() {
    let q = or(vec![equals("a", 1), and(vec![equals("b", 2), not(vec![equals("c", 3)])])]);
    assert_eq!(q.node_count(), 6);
    assert!(matches!(q, Query::Conjunction(ref c) if c.combinator == Combinator::Or));
}
