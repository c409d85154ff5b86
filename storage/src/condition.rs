//! Predicate used to enumerate primary keys without a secondary index.
//!
//! A [`Condition`] is a conjunction of per-field comparisons plus an
//! optional `(offset, count)` window, evaluated entry-by-entry against the
//! full key space of a table -- there is no index to narrow the scan, which
//! is exactly the tradeoff this crate's Non-goals call out.

use crate::entry::Entry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    StartsWith,
    EndsWith,
    Contains,
}

#[derive(Debug, Clone)]
struct Comparison {
    field: String,
    op: Op,
    value: String,
}

impl Comparison {
    fn matches(&self, entry: &Entry) -> bool {
        let Ok(actual) = entry.get_field(&self.field) else {
            return false;
        };
        match self.op {
            Op::Eq => actual == self.value,
            Op::Ne => actual != self.value,
            Op::Gt => actual > self.value.as_str(),
            Op::Ge => actual >= self.value.as_str(),
            Op::Lt => actual < self.value.as_str(),
            Op::Le => actual <= self.value.as_str(),
            Op::StartsWith => actual.starts_with(&self.value),
            Op::EndsWith => actual.ends_with(&self.value),
            Op::Contains => actual.contains(&self.value),
        }
    }
}

/// Builds up with `eq`/`ne`/`gt`/... and an optional `limit`, then applied
/// with [`Condition::matches`] / [`Condition::limit`].
#[derive(Debug, Clone, Default)]
pub struct Condition {
    comparisons: Vec<Comparison>,
    offset: usize,
    count: Option<usize>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: impl Into<String>, op: Op, value: impl Into<String>) -> Self {
        self.comparisons.push(Comparison {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Ne, value)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Gt, value)
    }

    pub fn ge(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Ge, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Lt, value)
    }

    pub fn le(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Le, value)
    }

    pub fn starts_with(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::StartsWith, value)
    }

    pub fn ends_with(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::EndsWith, value)
    }

    pub fn contains(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Contains, value)
    }

    /// Skips `offset` matches and caps the result at `count` beyond that,
    /// applied in key iteration order after every comparison passes.
    pub fn limit(mut self, offset: usize, count: usize) -> Self {
        self.offset = offset;
        self.count = Some(count);
        self
    }

    /// True iff `entry` satisfies every comparison. The limit window is
    /// applied separately by the caller over the stream of matches, since it
    /// depends on how many prior entries already matched.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.comparisons.iter().all(|c| c.matches(entry))
    }

    pub fn window(&self) -> (usize, Option<usize>) {
        (self.offset, self.count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table_info::TableInfo;
    use std::sync::Arc;

    fn schema() -> Arc<TableInfo> {
        TableInfo::new("t_test", vec!["key".into(), "value".into()]).unwrap()
    }

    fn entry_with(value: &str) -> Entry {
        let mut e = Entry::new(schema(), 0);
        e.set_field("value", value).unwrap();
        e
    }

    #[test]
    fn eq_matches_exact_value() {
        let cond = Condition::new().eq("value", "abc");
        assert!(cond.matches(&entry_with("abc")));
        assert!(!cond.matches(&entry_with("abd")));
    }

    #[test]
    fn conjunction_requires_every_comparison() {
        let cond = Condition::new().ge("value", "a").lt("value", "m");
        assert!(cond.matches(&entry_with("abc")));
        assert!(!cond.matches(&entry_with("z")));
    }

    #[test]
    fn starts_with_and_contains() {
        let cond = Condition::new().starts_with("value", "pre").contains("value", "fix");
        assert!(cond.matches(&entry_with("prefixed")));
        assert!(!cond.matches(&entry_with("preamble")));
    }

    #[test]
    fn limit_window_is_recorded_not_enforced_here() {
        let cond = Condition::new().limit(5, 10);
        assert_eq!(cond.window(), (5, Some(10)));
    }
}
