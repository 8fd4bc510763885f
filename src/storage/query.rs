// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filter, sort and pagination over JSON records.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A predicate on one top-level field of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value.
    Eq(&'static str, Value),
    /// Field is an array containing the value.
    Contains(&'static str, Value),
    /// Field equals one of the values.
    In(&'static str, Vec<Value>),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(field, value.into())
    }

    pub fn contains(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Contains(field, value.into())
    }

    pub fn one_of<V: Into<Value>>(
        field: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => doc.get(field) == Some(expected),
            Filter::Contains(field, expected) => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(expected)),
            Filter::In(field, allowed) => doc.get(field).is_some_and(|v| allowed.contains(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_desc(mut self, field: &'static str) -> Self {
        self.sort = Some(Sort {
            field,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Filters, sorts (stable), then slices `docs`.
    ///
    /// Input order is the tiebreak for equal sort keys.
    pub fn apply(&self, docs: Vec<Value>) -> Vec<Value> {
        let mut matched: Vec<Value> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.get(sort.field), b.get(sort.field));
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let page = matched.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

/// Orders JSON scalars; RFC 3339 strings compare as instants.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), Some(v)) if !v.is_null() => Ordering::Less,
        (Some(v), None | Some(Value::Null)) if !v.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Value> {
        vec![
            json!({
                "id": "a",
                "author": "u1",
                "tagList": ["rust", "db"],
                "createdAt": "2026-01-01T10:00:00Z",
            }),
            json!({
                "id": "b",
                "author": "u2",
                "tagList": ["go"],
                "createdAt": "2026-01-01T10:00:00.5Z",
            }),
            json!({"id": "c", "author": "u1", "tagList": [], "createdAt": "2026-01-02T09:00:00Z"}),
        ]
    }

    fn ids(docs: &[Value]) -> Vec<&str> {
        docs.iter().map(|d| d["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn filters_combine_with_and() {
        let query = FindQuery::new()
            .filter(Filter::eq("author", "u1"))
            .filter(Filter::contains("tagList", "rust"));
        assert_eq!(ids(&query.apply(docs())), vec!["a"]);
    }

    #[test]
    fn one_of_matches_any_value() {
        let query = FindQuery::new().filter(Filter::one_of("id", ["a", "c", "zzz"]));
        assert_eq!(ids(&query.apply(docs())), vec!["a", "c"]);
    }

    #[test]
    fn timestamps_sort_as_instants_not_strings() {
        // "…00Z" sorts after "…00.5Z" lexically; as instants it is earlier.
        let query = FindQuery::new().sort_desc("createdAt");
        assert_eq!(ids(&query.apply(docs())), vec!["c", "b", "a"]);
    }

    #[test]
    fn pagination_applies_after_sort() {
        let query = FindQuery::new().sort_desc("createdAt").offset(1).limit(1);
        assert_eq!(ids(&query.apply(docs())), vec!["b"]);
    }

    #[test]
    fn missing_field_never_matches() {
        let query = FindQuery::new().filter(Filter::contains("nope", "x"));
        assert!(query.apply(docs()).is_empty());
    }
}
