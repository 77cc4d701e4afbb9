//! Column role resolution.
//!
//! Entity and time columns are found by name through one declarative table:
//! each role maps to an ordered list of keyword sets and a single function
//! resolves any role against a dataset. The first keyword set with a match
//! wins; within a set the first matching column in dataset order wins.

use serde::Serialize;

use crate::data::{Column, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Entity,
    Time,
}

/// How a keyword is compared against a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Any name token equals the keyword (`firm_id` matches `id`).
    Token,
    /// The whole lowercased name equals the keyword. Used for one-letter
    /// keywords, which would otherwise match far too many names.
    Exact,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordSet {
    pub mode: MatchMode,
    pub keywords: &'static [&'static str],
}

const ENTITY_KEYWORDS: &[KeywordSet] = &[
    KeywordSet {
        mode: MatchMode::Token,
        keywords: &["entity", "firm", "company", "individual"],
    },
    KeywordSet {
        mode: MatchMode::Token,
        keywords: &["id"],
    },
    KeywordSet {
        mode: MatchMode::Exact,
        keywords: &["n"],
    },
];

const TIME_KEYWORDS: &[KeywordSet] = &[
    KeywordSet {
        mode: MatchMode::Token,
        keywords: &["date", "time"],
    },
    KeywordSet {
        mode: MatchMode::Token,
        keywords: &["period", "year", "month"],
    },
    KeywordSet {
        mode: MatchMode::Exact,
        keywords: &["t"],
    },
];

impl Role {
    pub fn keyword_sets(self) -> &'static [KeywordSet] {
        match self {
            Role::Entity => ENTITY_KEYWORDS,
            Role::Time => TIME_KEYWORDS,
        }
    }
}

/// Lowercased name tokens, split on non-alphanumerics and camelCase humps.
///
/// `firmID` -> `["firm", "id"]`, `fiscal-Year` -> `["fiscal", "year"]`.
pub fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

impl KeywordSet {
    pub fn matches(&self, name: &str) -> bool {
        match self.mode {
            MatchMode::Exact => {
                let lowered = name.trim().to_lowercase();
                self.keywords.iter().any(|k| *k == lowered)
            }
            MatchMode::Token => tokenize(name)
                .iter()
                .any(|token| self.keywords.iter().any(|k| *k == token.as_str())),
        }
    }
}

/// Whether a column name matches any keyword set of `role`.
pub fn name_matches(role: Role, name: &str) -> bool {
    role.keyword_sets().iter().any(|set| set.matches(name))
}

/// Resolve `role` to a column, skipping the names in `exclude`.
///
/// The time role falls back to the first date-time typed column.
pub fn resolve_role<'a>(dataset: &'a Dataset, role: Role, exclude: &[&str]) -> Option<&'a Column> {
    let candidates = || {
        dataset
            .columns()
            .iter()
            .filter(move |c| !exclude.contains(&c.name.as_str()))
    };

    for set in role.keyword_sets() {
        if let Some(column) = candidates().find(|c| set.matches(&c.name)) {
            return Some(column);
        }
    }

    match role {
        Role::Time => candidates().find(|c| c.is_datetime()),
        Role::Entity => None,
    }
}

/// Entity and time columns of a dataset. The two never resolve to the same column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedRoles {
    pub entity: Option<String>,
    pub time: Option<String>,
}

impl ResolvedRoles {
    pub fn resolve(dataset: &Dataset) -> Self {
        let entity = resolve_role(dataset, Role::Entity, &[]).map(|c| c.name.clone());
        let exclude: Vec<&str> = entity.as_deref().into_iter().collect();
        let time = resolve_role(dataset, Role::Time, &exclude).map(|c| c.name.clone());
        Self { entity, time }
    }

    pub fn is_role_column(&self, name: &str) -> bool {
        self.entity.as_deref() == Some(name) || self.time.as_deref() == Some(name)
    }
}
