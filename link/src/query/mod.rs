//! Read queries over a table and the planner that maps them onto the
//! cheapest storage operation.

pub mod planner;

use crate::models::{AttributeValue, Filter, FilterOperator, SortOrder};

pub use planner::{plan, ReadPlan};

/// Filters, order and limit of a read.
///
/// `Query` is a value: every modifier returns a new query and leaves the
/// original untouched. Adding a filter equal to one already present has no
/// effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<Filter>,
    order: SortOrder,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
        self
    }

    fn compare(
        self,
        operator: FilterOperator,
        attribute: &str,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.filter(Filter::new(operator, attribute, value))
    }

    pub fn equals(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::Equals, attribute, value)
    }

    pub fn not_equal(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::NotEqual, attribute, value)
    }

    pub fn greater_than(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::GreaterThan, attribute, value)
    }

    pub fn greater_equal(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::GreaterEqual, attribute, value)
    }

    pub fn less_than(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::LessThan, attribute, value)
    }

    pub fn less_equal(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::LessEqual, attribute, value)
    }

    pub fn begins_with(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::BeginsWith, attribute, value)
    }

    pub fn contains(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::Contains, attribute, value)
    }

    pub fn not_contains(self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.compare(FilterOperator::NotContains, attribute, value)
    }

    pub fn null(self, attribute: &str) -> Self {
        self.filter(Filter::null(attribute))
    }

    pub fn not_null(self, attribute: &str) -> Self {
        self.filter(Filter::not_null(attribute))
    }

    pub fn between(
        self,
        attribute: &str,
        start: impl Into<AttributeValue>,
        end: impl Into<AttributeValue>,
    ) -> Self {
        self.filter(Filter::between(attribute, start, end))
    }

    /// Sort results ascending by the table's sort key.
    pub fn asc(mut self) -> Self {
        self.order = SortOrder::Ascending;
        self
    }

    pub fn desc(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn max_items(&self) -> Option<usize> {
        self.limit
    }

    /// Whether an equality filter on `attribute` is present.
    pub fn has_equality_on(&self, attribute: &str) -> bool {
        self.filters.iter().any(|f| f.is_equality_on(attribute))
    }
}
