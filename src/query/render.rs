use bson::{Bson, Document};

use super::types::{Combinator, Condition, Direction, Operator, Query, Sort};

/// Target store query language.
///
/// `render` drives the recursion; a dialect only supplies the shape of a
/// leaf, of a group of already-rendered operands, and of the empty query.
pub trait Dialect {
    type Native;

    fn match_all(&self) -> Self::Native;
    fn condition(&self, condition: &Condition) -> Self::Native;
    fn conjunction(&self, combinator: Combinator, operands: Vec<Self::Native>) -> Self::Native;
    fn sort(&self, sort: &Sort) -> Self::Native;
}

/// Translates a query tree into the dialect's native form. `None` matches
/// everything.
pub fn render<D: Dialect>(query: Option<&Query>, dialect: &D) -> D::Native {
    match query {
        None => dialect.match_all(),
        Some(q) => render_node(q, dialect),
    }
}

pub fn render_sort<D: Dialect>(sort: &Sort, dialect: &D) -> D::Native {
    dialect.sort(sort)
}

fn render_node<D: Dialect>(query: &Query, dialect: &D) -> D::Native {
    match query {
        Query::Condition(c) => dialect.condition(c),
        Query::Conjunction(c) => {
            let operands = c.operands.iter().map(|q| render_node(q, dialect)).collect();
            dialect.conjunction(c.combinator, operands)
        }
    }
}

/// MongoDB-compatible filter documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDialect;

impl MongoDialect {
    pub fn operator_token(op: Operator) -> &'static str {
        match op {
            Operator::Equals => "$eq",
            Operator::NotEqual => "$ne",
            Operator::GreaterThan => "$gt",
            Operator::GreaterOrEqual => "$gte",
            Operator::LessThan => "$lt",
            Operator::LessOrEqual => "$lte",
            Operator::Contains => "$in",
            Operator::NotContains => "$nin",
            Operator::Exists => "$exists",
            Operator::MatchesPattern => "$regex",
        }
    }

    pub fn combinator_token(combinator: Combinator) -> &'static str {
        match combinator {
            Combinator::And => "$and",
            Combinator::Or => "$or",
            Combinator::Not => "$nor",
        }
    }
}

impl Dialect for MongoDialect {
    type Native = Document;

    fn match_all(&self) -> Document {
        Document::new()
    }

    fn condition(&self, condition: &Condition) -> Document {
        let mut predicate = Document::new();
        predicate.insert(Self::operator_token(condition.operator), condition.value.clone());
        let mut out = Document::new();
        out.insert(condition.field.clone(), predicate);
        out
    }

    fn conjunction(&self, combinator: Combinator, operands: Vec<Document>) -> Document {
        let operands: Vec<Bson> = operands.into_iter().map(Bson::Document).collect();
        let mut out = Document::new();
        out.insert(Self::combinator_token(combinator), operands);
        out
    }

    fn sort(&self, sort: &Sort) -> Document {
        let mut out = Document::new();
        for attr in &sort.attributes {
            let dir = match attr.1 {
                Direction::Ascending => 1,
                Direction::Descending => -1,
            };
            out.insert(attr.0.clone(), dir);
        }
        out
    }
}
