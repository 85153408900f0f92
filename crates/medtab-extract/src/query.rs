use std::cmp::Ordering;
use std::str::FromStr;

use crate::dataset::{Cell, CellValue, TypedDataset};
use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CompareOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
        }
    }

    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Eq => left == right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(String),
    Contains(String),
    Numeric(CompareOp, f64),
}

impl Condition {
    /// Numeric conditions only match numbers and range midpoints; text and
    /// empty cells never match them.
    #[must_use]
    pub fn matches(&self, cell: &Cell) -> bool {
        match self {
            Self::Equals(value) => cell.text() == value,
            Self::Contains(needle) => cell.text().contains(needle.as_str()),
            Self::Numeric(op, threshold) => cell
                .value()
                .numeric()
                .is_some_and(|value| op.apply(value, *threshold)),
        }
    }
}

fn unquote(value: &str) -> Option<&str> {
    let value = value.trim();
    ['\'', '"'].iter().find_map(|quote| {
        value
            .strip_prefix(*quote)
            .and_then(|rest| rest.strip_suffix(*quote))
    })
}

fn parse_threshold(value: &str) -> Option<f64> {
    value.trim().replace(',', "").parse::<f64>().ok()
}

const OPERATORS: [(&str, CompareOp); 6] = [
    ("<=", CompareOp::Le),
    (">=", CompareOp::Ge),
    ("==", CompareOp::Eq),
    ("<", CompareOp::Lt),
    (">", CompareOp::Gt),
    ("=", CompareOp::Eq),
];

impl FromStr for Condition {
    type Err = ExtractError;

    /// Parses `> 5`, `<= 3.5`, `== 'Normal'`, `= 14.2` or `contains High`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();

        let lowered = spec.to_ascii_lowercase();
        if let Some(rest) = lowered.strip_prefix("contains")
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            let needle = spec["contains".len()..].trim();
            let needle = unquote(needle).unwrap_or(needle);
            if needle.is_empty() {
                return Err(ExtractError::InvalidCondition(
                    "contains needs a value".to_string(),
                ));
            }
            return Ok(Self::Contains(needle.to_string()));
        }

        let (op, rest) = OPERATORS
            .iter()
            .find_map(|(token, op)| spec.strip_prefix(token).map(|rest| (*op, rest.trim())))
            .ok_or_else(|| {
                ExtractError::InvalidCondition(format!(
                    "'{spec}' must start with <, <=, >, >=, ==, = or contains"
                ))
            })?;

        if rest.is_empty() {
            return Err(ExtractError::InvalidCondition(format!(
                "'{spec}' has no value after the operator"
            )));
        }

        if let Some(quoted) = unquote(rest) {
            return if op == CompareOp::Eq {
                Ok(Self::Equals(quoted.to_string()))
            } else {
                Err(ExtractError::InvalidCondition(format!(
                    "'{spec}' compares text with {}",
                    op.as_str()
                )))
            };
        }

        match (parse_threshold(rest), op) {
            (Some(threshold), _) => Ok(Self::Numeric(op, threshold)),
            (None, CompareOp::Eq) => Ok(Self::Equals(rest.to_string())),
            (None, _) => Err(ExtractError::InvalidCondition(format!(
                "'{rest}' is not a number"
            ))),
        }
    }
}

fn column_index(dataset: &TypedDataset, column: &str) -> Result<usize, ExtractError> {
    dataset
        .column_index(column)
        .ok_or_else(|| ExtractError::UnknownColumn(column.to_string()))
}

/// Returns a view with the rows whose `column` cell matches, in their
/// original relative order.
pub fn filter(
    dataset: &TypedDataset,
    column: &str,
    condition: &Condition,
) -> Result<TypedDataset, ExtractError> {
    let index = column_index(dataset, column)?;
    let rows = dataset
        .shared_rows()
        .iter()
        .filter(|row| row.get(index).is_some_and(|cell| condition.matches(cell)))
        .cloned()
        .collect();
    Ok(dataset.view(rows))
}

fn rank(cell: Option<&Cell>) -> u8 {
    match cell.map(Cell::value) {
        Some(CellValue::Number { .. } | CellValue::Range { .. }) => 0,
        Some(CellValue::Text(_)) => 1,
        Some(CellValue::Empty) | None => 2,
    }
}

fn compare_cells(left: Option<&Cell>, right: Option<&Cell>, ascending: bool) -> Ordering {
    let (left_rank, right_rank) = (rank(left), rank(right));
    if left_rank != right_rank {
        return left_rank.cmp(&right_rank);
    }

    let ordering = match (left, right) {
        (Some(left), Some(right)) => match (left.value().numeric(), right.value().numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => left.text().cmp(right.text()),
        },
        _ => Ordering::Equal,
    };

    if ascending { ordering } else { ordering.reverse() }
}

/// Stable sort by one column. Numbers and ranges (by midpoint) come first,
/// then text, then empty cells; `ascending` only flips the order inside each
/// of those groups.
pub fn sort(
    dataset: &TypedDataset,
    column: &str,
    ascending: bool,
) -> Result<TypedDataset, ExtractError> {
    let index = column_index(dataset, column)?;
    let mut rows = dataset.shared_rows().to_vec();
    rows.sort_by(|left, right| compare_cells(left.get(index), right.get(index), ascending));
    Ok(dataset.view(rows))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub column: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub ascending: bool,
}

/// A filter and/or sort to apply to a dataset, filter first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filter: Option<FilterSpec>,
    pub sort: Option<SortSpec>,
}

impl QuerySpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.sort.is_none()
    }

    pub fn apply(&self, dataset: &TypedDataset) -> Result<TypedDataset, ExtractError> {
        let mut view = match &self.filter {
            Some(spec) => filter(dataset, &spec.column, &spec.condition)?,
            None => dataset.clone(),
        };
        if let Some(spec) = &self.sort {
            view = sort(&view, &spec.column, spec.ascending)?;
        }
        Ok(view)
    }
}
