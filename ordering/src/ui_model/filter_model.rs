use sqlx::Arguments;
use sqlx::postgres::PgArguments;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl FilterValue {
    pub fn bind(&self, args: &mut PgArguments) -> Result<(), sqlx::Error> {
        match self {
            FilterValue::Int(v) => args.add(*v),
            FilterValue::Bool(v) => args.add(*v),
            FilterValue::Text(v) => args.add(v.clone()),
        }
        .map_err(sqlx::Error::Encode)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

/// One optional equality condition. `field` is always a column name chosen
/// by code, never taken from a request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterItem {
    pub field: &'static str,
    pub value: Option<FilterValue>,
}

impl FilterItem {
    pub fn new<V: Into<FilterValue>>(field: &'static str, value: Option<V>) -> Self {
        Self {
            field,
            value: value.map(Into::into),
        }
    }
}

/// Ordered set of optional equality conditions. Items without a value are
/// skipped; zero and the empty string still count as values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    items: Vec<FilterItem>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter_item(&mut self, item: FilterItem) -> &mut Self {
        self.items.push(item);
        self
    }

    /// Builder form of `add_filter_item` for a value that is always present.
    pub fn with<V: Into<FilterValue>>(mut self, field: &'static str, value: V) -> Self {
        self.items.push(FilterItem::new(field, Some(value)));
        self
    }

    pub fn has_conditions(&self) -> bool {
        self.items.iter().any(|item| item.value.is_some())
    }

    pub fn to_predicate(&self) -> Predicate {
        self.to_predicate_from(1)
    }

    /// Renders `WHERE a = $n AND b = $n+1 ...` with placeholders numbered from
    /// `first_index`, in insertion order.
    pub fn to_predicate_from(&self, first_index: usize) -> Predicate {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        for item in &self.items {
            if let Some(value) = &item.value {
                conditions.push(format!("{} = ${}", item.field, first_index + values.len()));
                values.push(value.clone());
            }
        }

        if conditions.is_empty() {
            return Predicate::default();
        }

        Predicate {
            clause: format!("WHERE {}", conditions.join(" AND ")),
            values,
        }
    }
}

/// SQL `WHERE` fragment plus the values for its placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub clause: String,
    pub values: Vec<FilterValue>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    pub fn bind(&self, args: &mut PgArguments) -> Result<(), sqlx::Error> {
        self.values.iter().try_for_each(|value| value.bind(args))
    }
}
