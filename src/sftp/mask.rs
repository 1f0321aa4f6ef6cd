//! Transfer filter masks
//!
//! A mask has the shape `include[|exclude]`. Each part is a list of patterns
//! separated by `;` or `,`. Patterns without `/` match the file name, patterns
//! containing `/` match the path relative to the pulled directory (with or
//! without a leading `/`), and
//! patterns ending in `/` match any parent directory. The include part may
//! also carry modification-time constraints such as `>today` or
//! `<=2024-03-31`, either on their own or attached to a pattern (`*.csv>today`).
//!
//! Matching is case-insensitive. An empty mask matches every file.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use glob::{MatchOptions, Pattern};
use thiserror::Error;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid time constraint '{0}'")]
    InvalidConstraint(String),

    #[error("Time constraints are not allowed after '|': '{0}'")]
    ConstraintInExclude(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    After,
    AtOrAfter,
    Before,
    AtOrBefore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateRef {
    Today,
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TimeConstraint {
    comparison: Comparison,
    date: DateRef,
}

impl TimeConstraint {
    fn parse(raw: &str) -> Result<Self, MaskError> {
        let (comparison, rest) = if let Some(rest) = raw.strip_prefix(">=") {
            (Comparison::AtOrAfter, rest)
        } else if let Some(rest) = raw.strip_prefix("<=") {
            (Comparison::AtOrBefore, rest)
        } else if let Some(rest) = raw.strip_prefix('>') {
            (Comparison::After, rest)
        } else if let Some(rest) = raw.strip_prefix('<') {
            (Comparison::Before, rest)
        } else {
            return Err(MaskError::InvalidConstraint(raw.to_string()));
        };

        let rest = rest.trim();
        let date = if rest.eq_ignore_ascii_case("today") {
            DateRef::Today
        } else {
            NaiveDate::parse_from_str(rest, "%Y-%m-%d")
                .map(DateRef::Date)
                .map_err(|_| MaskError::InvalidConstraint(raw.to_string()))?
        };

        Ok(Self { comparison, date })
    }

    fn holds(&self, modified: Option<NaiveDateTime>, today: NaiveDate) -> bool {
        let Some(modified) = modified else {
            return false;
        };
        let date = match self.date {
            DateRef::Today => today,
            DateRef::Date(d) => d,
        };
        let start = date.and_time(NaiveTime::MIN);

        match self.comparison {
            Comparison::After => modified > start,
            Comparison::AtOrAfter => modified >= start,
            Comparison::Before => modified < start,
            Comparison::AtOrBefore => match date.checked_add_days(Days::new(1)) {
                Some(next) => modified < next.and_time(NaiveTime::MIN),
                None => true,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum PathPattern {
    /// Matched against the final path component
    Name(Pattern),
    /// Matched against the whole relative path
    Path(Pattern),
    /// Matched against every parent directory component
    Directory(Pattern),
}

impl PathPattern {
    fn parse(raw: &str) -> Result<Self, MaskError> {
        let compile = |p: &str| {
            Pattern::new(p).map_err(|e| MaskError::InvalidPattern {
                pattern: raw.to_string(),
                reason: e.to_string(),
            })
        };

        if let Some(dir) = raw.strip_suffix('/') {
            Ok(PathPattern::Directory(compile(dir)?))
        } else if raw.contains('/') {
            Ok(PathPattern::Path(compile(raw)?))
        } else {
            Ok(PathPattern::Name(compile(raw)?))
        }
    }

    fn matches(&self, relative_path: &str) -> bool {
        match self {
            PathPattern::Name(p) => {
                let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
                p.matches_with(name, MATCH_OPTIONS)
            }
            // Paths are rooted at the pulled directory, so `*/Reports/*`
            // also catches a top-level `Reports/`
            PathPattern::Path(p) => {
                p.matches_with(relative_path, MATCH_OPTIONS)
                    || p.matches_with(&format!("/{}", relative_path), MATCH_OPTIONS)
            }
            PathPattern::Directory(p) => {
                let mut parts: Vec<&str> = relative_path.split('/').collect();
                parts.pop();
                parts.iter().any(|d| p.matches_with(d, MATCH_OPTIONS))
            }
        }
    }
}

/// Parsed transfer filter
#[derive(Debug, Clone, Default)]
pub struct FileMask {
    source: String,
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
    constraints: Vec<TimeConstraint>,
}

impl FileMask {
    /// Mask that lets every file through
    pub fn any() -> Self {
        Self::default()
    }

    pub fn parse(mask: &str) -> Result<Self, MaskError> {
        let (include_part, exclude_part) = match mask.split_once('|') {
            Some((include, exclude)) => (include, Some(exclude)),
            None => (mask, None),
        };

        let mut parsed = FileMask {
            source: mask.trim().to_string(),
            ..Default::default()
        };

        for token in tokens(include_part) {
            let (glob_part, constraint) = split_constraint(token)?;
            if let Some(constraint) = constraint {
                parsed.constraints.push(constraint);
            }
            if !glob_part.is_empty() {
                parsed.include.push(PathPattern::parse(glob_part)?);
            }
        }

        if let Some(exclude_part) = exclude_part {
            for token in tokens(exclude_part) {
                let (glob_part, constraint) = split_constraint(token)?;
                if constraint.is_some() {
                    return Err(MaskError::ConstraintInExclude(token.to_string()));
                }
                if !glob_part.is_empty() {
                    parsed.exclude.push(PathPattern::parse(glob_part)?);
                }
            }
        }

        Ok(parsed)
    }

    /// The mask as it was written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn has_time_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    /// Test a file against the mask.
    ///
    /// `relative_path` is `/`-separated and relative to the pulled directory;
    /// `today` anchors the `today` keyword.
    pub fn matches(
        &self,
        relative_path: &str,
        modified: Option<NaiveDateTime>,
        today: NaiveDate,
    ) -> bool {
        if !self.constraints.iter().all(|c| c.holds(modified, today)) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(relative_path)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(relative_path))
    }
}

fn tokens(part: &str) -> impl Iterator<Item = &str> {
    part.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn split_constraint(token: &str) -> Result<(&str, Option<TimeConstraint>), MaskError> {
    match token.find(['<', '>']) {
        None => Ok((token, None)),
        Some(idx) => {
            let (glob_part, constraint) = token.split_at(idx);
            Ok((glob_part.trim(), Some(TimeConstraint::parse(constraint)?)))
        }
    }
}
