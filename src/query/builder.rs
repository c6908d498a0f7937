//! Constructors for [`Query`] trees.
//!
//! ```
//! use docsync::query::{and, equals, field, or};
//!
//! let q = or(vec![
//!     equals("caseId", "091-900001"),
//!     and(vec![field("status").not_equal("closed"), field("chapter").equals("7")]),
//! ]);
//! assert!(q.is_conjunction());
//! ```

use bson::Bson;

use super::types::{
    Combinator, Condition, Conjunction, Direction, Operator, Query, Sort, SortedAttribute,
};

pub fn condition(operator: Operator, field: impl Into<String>, value: impl Into<Bson>) -> Query {
    Query::Condition(Condition { operator, field: field.into(), value: value.into() })
}

pub fn conjunction(combinator: Combinator, operands: impl IntoIterator<Item = Query>) -> Query {
    Query::Conjunction(Conjunction { combinator, operands: operands.into_iter().collect() })
}

pub fn equals(field: impl Into<String>, value: impl Into<Bson>) -> Query {
    condition(Operator::Equals, field, value)
}

pub fn not_equal(field: impl Into<String>, value: impl Into<Bson>) -> Query {
    condition(Operator::NotEqual, field, value)
}

pub fn greater_than(field: impl Into<String>, value: impl Into<Bson>) -> Query {
    condition(Operator::GreaterThan, field, value)
}

pub fn greater_or_equal(field: impl Into<String>, value: impl Into<Bson>) -> Query {
    condition(Operator::GreaterOrEqual, field, value)
}

pub fn less_than(field: impl Into<String>, value: impl Into<Bson>) -> Query {
    condition(Operator::LessThan, field, value)
}

pub fn less_or_equal(field: impl Into<String>, value: impl Into<Bson>) -> Query {
    condition(Operator::LessOrEqual, field, value)
}

/// Field value is one of `values`.
pub fn contains<I, V>(field: impl Into<String>, values: I) -> Query
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
    condition(Operator::Contains, field, Bson::Array(values))
}

/// Field value is none of `values`.
pub fn not_contains<I, V>(field: impl Into<String>, values: I) -> Query
where
    I: IntoIterator<Item = V>,
    V: Into<Bson>,
{
    let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
    condition(Operator::NotContains, field, Bson::Array(values))
}

pub fn exists(field: impl Into<String>) -> Query {
    condition(Operator::Exists, field, true)
}

/// Field is absent from the document.
pub fn missing(field: impl Into<String>) -> Query {
    condition(Operator::Exists, field, false)
}

pub fn matches_pattern(field: impl Into<String>, pattern: impl Into<String>) -> Query {
    condition(Operator::MatchesPattern, field, pattern.into())
}

pub fn and(operands: impl IntoIterator<Item = Query>) -> Query {
    conjunction(Combinator::And, operands)
}

pub fn or(operands: impl IntoIterator<Item = Query>) -> Query {
    conjunction(Combinator::Or, operands)
}

pub fn not(operands: impl IntoIterator<Item = Query>) -> Query {
    conjunction(Combinator::Not, operands)
}

pub fn build(query: Query) -> Query {
    query
}

pub fn order_by(attributes: impl IntoIterator<Item = (String, Direction)>) -> Sort {
    Sort {
        attributes: attributes.into_iter().map(|(f, d)| SortedAttribute(f, d)).collect(),
    }
}

/// Field-first construction: `field("name").equals("x")`.
pub fn field(name: impl Into<String>) -> FieldRef {
    FieldRef { name: name.into() }
}

#[derive(Debug, Clone)]
pub struct FieldRef {
    name: String,
}

impl FieldRef {
    pub fn equals(&self, value: impl Into<Bson>) -> Query {
        equals(self.name.clone(), value)
    }

    pub fn not_equal(&self, value: impl Into<Bson>) -> Query {
        not_equal(self.name.clone(), value)
    }

    pub fn greater_than(&self, value: impl Into<Bson>) -> Query {
        greater_than(self.name.clone(), value)
    }

    pub fn greater_or_equal(&self, value: impl Into<Bson>) -> Query {
        greater_or_equal(self.name.clone(), value)
    }

    pub fn less_than(&self, value: impl Into<Bson>) -> Query {
        less_than(self.name.clone(), value)
    }

    pub fn less_or_equal(&self, value: impl Into<Bson>) -> Query {
        less_or_equal(self.name.clone(), value)
    }

    pub fn contains<I, V>(&self, values: I) -> Query
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        contains(self.name.clone(), values)
    }

    pub fn not_contains<I, V>(&self, values: I) -> Query
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        not_contains(self.name.clone(), values)
    }

    pub fn exists(&self) -> Query {
        exists(self.name.clone())
    }

    pub fn missing(&self) -> Query {
        missing(self.name.clone())
    }

    pub fn matches_pattern(&self, pattern: impl Into<String>) -> Query {
        matches_pattern(self.name.clone(), pattern)
    }

    pub fn ascending(&self) -> (String, Direction) {
        (self.name.clone(), Direction::Ascending)
    }

    pub fn descending(&self) -> (String, Direction) {
        (self.name.clone(), Direction::Descending)
    }
}
