// Portable query representation and its rendering into store dialects.
mod builder;
mod render;
mod types;

pub use builder::{
    FieldRef, and, build, condition, conjunction, contains, equals, exists, field,
    greater_or_equal, greater_than, less_or_equal, less_than, matches_pattern, missing, not,
    not_contains, not_equal, or, order_by,
};
pub use render::{Dialect, MongoDialect, render, render_sort};
pub use types::{
    Combinator, Condition, Conjunction, Direction, Operator, Pagination, Query, Sort,
    SortedAttribute,
};
