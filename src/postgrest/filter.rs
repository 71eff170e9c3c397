//! Filter expressions for record store queries

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// Greater than
    Gt,

    /// Greater than or equal to
    Gte,

    /// Less than
    Lt,

    /// Less than or equal to
    Lte,

    /// In a list of values
    In,

    /// Is (null / true / false)
    Is,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::Is => "is",
        }
    }
}

/// A single `column op value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<T: ToString>(column: &str, operator: FilterOperator, value: T) -> Self {
        Self {
            column: column.to_string(),
            operator,
            values: vec![value.to_string()],
        }
    }

    pub fn eq<T: ToString>(column: &str, value: T) -> Self {
        Self::new(column, FilterOperator::Eq, value)
    }

    pub fn gte<T: ToString>(column: &str, value: T) -> Self {
        Self::new(column, FilterOperator::Gte, value)
    }

    pub fn lte<T: ToString>(column: &str, value: T) -> Self {
        Self::new(column, FilterOperator::Lte, value)
    }

    pub fn in_list<T: ToString>(column: &str, values: &[T]) -> Self {
        Self {
            column: column.to_string(),
            operator: FilterOperator::In,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// The single operand, or the first of an `in` list
    pub fn value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }

    /// Render as a PostgREST query pair
    pub fn to_param(&self) -> (String, String) {
        let rendered = match self.operator {
            FilterOperator::In => format!("in.({})", self.values.join(",")),
            op => format!("{}.{}", op.as_str(), self.value()),
        };
        (self.column.clone(), rendered)
    }
}
