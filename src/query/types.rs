use bson::Bson;
use serde::{Deserialize, Serialize};

/// Single-field predicate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    NotContains,
    Exists,
    MatchesPattern,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Equals,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::GreaterOrEqual,
        Operator::LessThan,
        Operator::LessOrEqual,
        Operator::Contains,
        Operator::NotContains,
        Operator::Exists,
        Operator::MatchesPattern,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    And,
    Or,
    Not,
}

/// Leaf node: `field <operator> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub operator: Operator,
    #[serde(rename = "fieldName")]
    pub field: String,
    pub value: Bson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conjunction {
    pub combinator: Combinator,
    pub operands: Vec<Query>,
}

/// A filter tree. The node kind is fixed at construction and carried as an
/// explicit `kind` discriminator when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Query {
    Condition(Condition),
    Conjunction(Conjunction),
}

impl Query {
    pub fn is_condition(&self) -> bool {
        matches!(self, Query::Condition(_))
    }

    pub fn is_conjunction(&self) -> bool {
        matches!(self, Query::Conjunction(_))
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Query::Condition(_) => 1,
            Query::Conjunction(c) => 1 + c.operands.iter().map(Query::node_count).sum::<usize>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedAttribute(pub String, pub Direction);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub attributes: Vec<SortedAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub skip: usize,
}
