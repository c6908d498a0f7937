use bson::{Bson, Document};
use regex::Regex;
use std::cmp::Ordering;

use crate::errors::DriverError;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Compiled form of a native filter document.
#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    Regex { path: String, pattern: Regex },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

/// Parses a MongoDB-style filter document.
///
/// # Errors
/// Returns `DriverError::Command` for unsupported operators or malformed operands.
pub fn parse_filter(doc: &Document) -> Result<Filter, DriverError> {
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(parse_group(key, value)?)),
            "$or" => clauses.push(Filter::Or(parse_group(key, value)?)),
            "$nor" => clauses.push(Filter::Nor(parse_group(key, value)?)),
            k if k.starts_with('$') => {
                return Err(DriverError::Command(format!("unknown top-level operator {k}")));
            }
            path => match value {
                Bson::Document(ops) if is_operator_doc(ops) => {
                    for (op, operand) in ops {
                        clauses.push(parse_operator(path, op, operand)?);
                    }
                }
                literal => clauses.push(Filter::Cmp {
                    path: path.to_string(),
                    op: CmpOp::Eq,
                    value: literal.clone(),
                }),
            },
        }
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

/// Parses a `{ field: 1 | -1 }` sort document.
///
/// # Errors
/// Returns `DriverError::Command` when a direction is not `1` or `-1`.
pub fn parse_sort(doc: &Document) -> Result<Vec<SortSpec>, DriverError> {
    let mut out = Vec::with_capacity(doc.len());
    for (field, dir) in doc {
        let order = match dir {
            Bson::Int32(1) | Bson::Int64(1) => Order::Asc,
            Bson::Int32(-1) | Bson::Int64(-1) => Order::Desc,
            other => {
                return Err(DriverError::Command(format!("bad sort direction for {field}: {other}")));
            }
        };
        out.push(SortSpec { field: field.clone(), order });
    }
    if out.len() > MAX_SORT_FIELDS {
        return Err(DriverError::Command(format!(
            "sort has {} fields; at most {MAX_SORT_FIELDS} are allowed",
            out.len()
        )));
    }
    Ok(out)
}

fn is_operator_doc(doc: &Document) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}

fn parse_group(key: &str, value: &Bson) -> Result<Vec<Filter>, DriverError> {
    let Bson::Array(items) = value else {
        return Err(DriverError::Command(format!("{key} requires an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_filter(d),
            other => Err(DriverError::Command(format!("{key} operand is not a document: {other}"))),
        })
        .collect()
}

fn parse_operator(path: &str, op: &str, operand: &Bson) -> Result<Filter, DriverError> {
    let path = path.to_string();
    let cmp = |op: CmpOp| -> Result<Filter, DriverError> {
        Ok(Filter::Cmp { path: path.clone(), op, value: operand.clone() })
    };
    match op {
        "$eq" => cmp(CmpOp::Eq),
        "$ne" => cmp(CmpOp::Ne),
        "$gt" => cmp(CmpOp::Gt),
        "$gte" => cmp(CmpOp::Gte),
        "$lt" => cmp(CmpOp::Lt),
        "$lte" => cmp(CmpOp::Lte),
        "$in" | "$nin" => {
            let Bson::Array(values) = operand else {
                return Err(DriverError::Command(format!("{op} requires an array")));
            };
            if values.len() > MAX_IN_SET {
                return Err(DriverError::Command(format!(
                    "{op} on {path} has {} values; at most {MAX_IN_SET} are allowed",
                    values.len()
                )));
            }
            let values = values.clone();
            if op == "$in" { Ok(Filter::In { path, values }) } else { Ok(Filter::Nin { path, values }) }
        }
        "$exists" => {
            let exists = match operand {
                Bson::Boolean(b) => *b,
                Bson::Int32(i) => *i != 0,
                Bson::Int64(i) => *i != 0,
                Bson::Null => false,
                _ => true,
            };
            Ok(Filter::Exists { path, exists })
        }
        "$regex" => {
            let source = match operand {
                Bson::String(s) => s.clone(),
                Bson::RegularExpression(r) => {
                    if r.options.as_str().contains('i') {
                        format!("(?i){}", r.pattern.as_str())
                    } else {
                        r.pattern.as_str().to_string()
                    }
                }
                other => return Err(DriverError::Command(format!("$regex requires a string: {other}"))),
            };
            let pattern = Regex::new(&source)
                .map_err(|e| DriverError::Command(format!("invalid $regex {source}: {e}")))?;
            Ok(Filter::Regex { path, pattern })
        }
        other => Err(DriverError::Command(format!("unsupported operator {other}"))),
    }
}

pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Cmp { path, op, value } => {
            if let Some(v) = get_path(doc, path) {
                match op {
                    CmpOp::Eq => values_equal(v, value),
                    CmpOp::Ne => !values_equal(v, value),
                    CmpOp::Gt => comparable(v, value) && compare_bson(v, value) == Ordering::Greater,
                    CmpOp::Gte => comparable(v, value) && compare_bson(v, value) != Ordering::Less,
                    CmpOp::Lt => comparable(v, value) && compare_bson(v, value) == Ordering::Less,
                    CmpOp::Lte => comparable(v, value) && compare_bson(v, value) != Ordering::Greater,
                }
            } else {
                // A missing field is "not equal" to anything.
                *op == CmpOp::Ne
            }
        }
        Filter::Regex { path, pattern } => match get_path(doc, path) {
            Some(Bson::String(s)) => pattern.is_match(s),
            _ => false,
        },
    }
}

pub fn compare_docs(a: &Document, b: &Document, sort: &[SortSpec]) -> Ordering {
    for s in sort {
        let va = get_path(a, &s.field);
        let vb = get_path(b, &s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().any(|x| values_equal(v, x))
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return compare_bson(a, b) == Ordering::Equal;
    }
    a == b
}

// Range operators only match values of the same type class.
fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_num(a) && is_num(b)) || type_rank(a) == type_rank(b)
}

fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() > MAX_PATH_DEPTH {
        return None;
    }
    let (last, parents) = parts.split_last()?;
    let mut cur = doc;
    for part in parents {
        match cur.get(*part) {
            Some(Bson::Document(d)) => cur = d,
            _ => return None,
        }
    }
    cur.get(*last)
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        _ => f64::NAN,
    }
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::Binary(_) => 5,
        Bson::ObjectId(_) => 6,
        Bson::Boolean(_) => 7,
        Bson::DateTime(_) => 8,
        Bson::Timestamp(_) => 9,
        Bson::RegularExpression(_) => 10,
        Bson::DbPointer(_) => 11,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 12,
        Bson::MinKey => 13,
        Bson::MaxKey => 14,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn implicit_equality_and_operator_docs() {
        let d = doc! { "name": "Jane Doe", "age": 40 };
        let f = parse_filter(&doc! { "name": "Jane Doe", "age": { "$gte": 40, "$lt": 41 } }).unwrap();
        assert!(eval_filter(&d, &f));
    }

    #[test]
    fn ne_matches_missing_field() {
        let d = doc! { "a": 1 };
        let f = parse_filter(&doc! { "b": { "$ne": 2 } }).unwrap();
        assert!(eval_filter(&d, &f));
    }

    #[test]
    fn dotted_paths() {
        let d = doc! { "party": { "name": "x" } };
        let f = parse_filter(&doc! { "party.name": { "$eq": "x" } }).unwrap();
        assert!(eval_filter(&d, &f));
        let f = parse_filter(&doc! { "party.missing": { "$exists": true } }).unwrap();
        assert!(!eval_filter(&d, &f));
    }

    #[test]
    fn range_does_not_cross_types() {
        let d = doc! { "a": "10" };
        let f = parse_filter(&doc! { "a": { "$gt": 5 } }).unwrap();
        assert!(!eval_filter(&d, &f));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(parse_filter(&doc! { "a": { "$near": 1 } }).is_err());
        assert!(parse_filter(&doc! { "$where": "x" }).is_err());
    }

    #[test]
    fn oversized_set_and_sort_are_rejected_not_truncated() {
        let wide: Vec<i32> = (0..=MAX_IN_SET as i32).collect();
        let err = parse_filter(&doc! { "a": { "$in": wide.clone() } }).unwrap_err();
        assert!(matches!(err, DriverError::Command(_)));
        assert!(parse_filter(&doc! { "a": { "$nin": wide } }).is_err());
        let full: Vec<i32> = (0..MAX_IN_SET as i32).collect();
        let f = parse_filter(&doc! { "a": { "$in": full } }).unwrap();
        assert!(eval_filter(&doc! { "a": MAX_IN_SET as i32 - 1 }, &f));

        let mut sort = Document::new();
        for i in 0..=MAX_SORT_FIELDS {
            sort.insert(format!("f{i}"), 1);
        }
        assert!(matches!(parse_sort(&sort).unwrap_err(), DriverError::Command(_)));
        sort.remove(&format!("f{MAX_SORT_FIELDS}"));
        assert_eq!(parse_sort(&sort).unwrap().len(), MAX_SORT_FIELDS);
    }
}
