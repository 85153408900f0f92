use std::collections::HashSet;

use crate::error::ExtractError;
use crate::model::{Column, ColumnSpec};
use crate::options::ExtractOptions;

/// Whitespace runs at least this wide separate columns; single spaces never do.
pub(crate) const MIN_SEPARATOR_WIDTH: usize = 2;

/// A run of text between column separators, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

pub(crate) fn split_segments(line: &str) -> Vec<Segment> {
    let chars = line.chars().collect::<Vec<_>>();
    let mut segments = Vec::new();
    let mut index = 0_usize;

    while index < chars.len() {
        if chars[index].is_whitespace() {
            index += 1;
            continue;
        }

        let start = index;
        let mut end = index;
        while index < chars.len() {
            if chars[index].is_whitespace() {
                let run_start = index;
                while index < chars.len() && chars[index].is_whitespace() {
                    index += 1;
                }
                if index - run_start >= MIN_SEPARATOR_WIDTH {
                    break;
                }
            } else {
                index += 1;
                end = index;
            }
        }

        segments.push(Segment {
            start,
            end,
            text: chars[start..end].iter().collect(),
        });
    }

    segments
}

pub(crate) fn unique_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 2_usize;
        while seen.contains(&candidate) {
            candidate = format!("{name}_{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

/// Derives the column layout from a header line.
///
/// Each column starts right after a separator run (the first at offset 0) and
/// ends where the next column starts, so the columns tile the whole line. The
/// last column is open-ended.
pub fn detect_columns(header: &str, options: &ExtractOptions) -> Result<ColumnSpec, ExtractError> {
    let segments = split_segments(header);
    if segments.len() < 2 {
        return Err(ExtractError::MalformedHeader {
            header: header.trim().to_string(),
        });
    }

    if segments.len() > options.max_columns {
        return Err(ExtractError::TooManyColumns {
            found: segments.len(),
            limit: options.max_columns,
        });
    }

    let names = unique_names(segments.iter().map(|segment| segment.text.clone()));
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| Column {
            name,
            start: if index == 0 { 0 } else { segments[index].start },
            end: segments.get(index + 1).map(|next| next.start),
        })
        .collect::<Vec<_>>();

    tracing::debug!(columns = columns.len(), "detected header columns");
    Ok(ColumnSpec::new(columns))
}
