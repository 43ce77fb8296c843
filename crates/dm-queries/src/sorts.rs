//! Sort Orders
//!
//! Sort orders define the ORDER BY part of a compiled query.

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// Column name or SQL expression, rendered verbatim
    pub expression: String,
    pub direction: SortDirection,
}

impl SortCriterion {
    pub fn new(expression: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            expression: expression.into(),
            direction,
        }
    }

    pub fn asc(expression: impl Into<String>) -> Self {
        Self::new(expression, SortDirection::Asc)
    }

    pub fn desc(expression: impl Into<String>) -> Self {
        Self::new(expression, SortDirection::Desc)
    }

    pub fn to_sql(&self) -> String {
        format!("{} {}", self.expression, self.direction.as_sql())
    }
}

/// Ordered list of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    pub fn add(&mut self, criterion: SortCriterion) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Render as `a ASC, b DESC`; `None` when empty
    pub fn to_sql(&self) -> Option<String> {
        if self.criteria.is_empty() {
            return None;
        }
        Some(
            self.criteria
                .iter()
                .map(SortCriterion::to_sql)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}
