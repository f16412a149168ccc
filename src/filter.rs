//! Tag filters: `key:value` specifications turned into a volume predicate.
//!
//! A value is either a literal string or a bracketed list of alternatives,
//! `env:[prod,staging]` / `env:['prod', "staging"]`. The list syntax is parsed
//! explicitly; anything that is not bracketed is taken verbatim, while a
//! bracketed value that fails to parse is an error (never silently
//! downgraded to a string).
//!
//! Two interpretations:
//! - inclusive (default): keys become provider filter names `tag:<key>` and
//!   the filtering happens server-side;
//! - inverted ("reverse tags"): keys stay bare and the filter expands into a
//!   blacklist of `(key, value)` pairs evaluated locally.

use std::collections::{BTreeMap, BTreeSet};

use crate::cloud::ProviderFilters;
use crate::consts::PROVIDER_TAG_FILTER_PREFIX;
use crate::error::{MonkeyError, Result};
use crate::model::Volume;

/// Accepted value(s) for one tag key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagValue {
    One(String),
    AnyOf(Vec<String>),
}

impl TagValue {
    /// Parse a filter value. Bracketed values must be well-formed lists.
    pub fn parse(raw: &str) -> std::result::Result<TagValue, String> {
        let s = raw.trim();
        match s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            Some(body) => parse_list(body).map(TagValue::AnyOf),
            None => Ok(TagValue::One(unquote(s).to_string())),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            TagValue::One(v) => vec![v.as_str()],
            TagValue::AnyOf(vs) => vs.iter().map(|v| v.as_str()).collect(),
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            TagValue::One(v) => v == value,
            TagValue::AnyOf(vs) => vs.iter().any(|v| v == value),
        }
    }
}

/// Items of `a, 'b', "c,d"`; a trailing comma is tolerated, empty items are not.
fn parse_list(body: &str) -> std::result::Result<Vec<String>, String> {
    let mut items = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;
    let mut closed = false;

    for c in body.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
                closed = true;
            } else {
                cur.push(c);
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                if quoted || !cur.trim().is_empty() {
                    return Err(format!("unexpected quote in list [{body}]"));
                }
                cur.clear();
                quote = Some(c);
                quoted = true;
            }
            ',' => {
                if !quoted && cur.trim().is_empty() {
                    return Err(format!("empty item in list [{body}]"));
                }
                items.push(take_item(&mut cur, quoted));
                quoted = false;
                closed = false;
            }
            c if closed => {
                if !c.is_whitespace() {
                    return Err(format!("unexpected `{c}` after quoted item in list [{body}]"));
                }
            }
            _ => cur.push(c),
        }
    }
    if quote.is_some() {
        return Err(format!("unterminated quote in list [{body}]"));
    }
    if quoted || !cur.trim().is_empty() {
        items.push(take_item(&mut cur, quoted));
    }
    Ok(items)
}

/// `'prod'` / `"prod"` -> `prod`; one matching pair only.
fn unquote(s: &str) -> &str {
    for q in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn take_item(cur: &mut String, quoted: bool) -> String {
    let item = if quoted {
        cur.clone()
    } else {
        cur.trim().to_string()
    };
    cur.clear();
    item
}

/// Parsed filter specification (immutable once built).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagFilter {
    entries: BTreeMap<String, TagValue>,
    inverted: bool,
}

impl TagFilter {
    /// Parse `key:value` entries. A key given twice keeps its last value.
    pub fn parse<S: AsRef<str>>(specs: &[S], inverted: bool) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for spec in specs {
            let entry = spec.as_ref();
            let parts: Vec<&str> = entry.split(':').collect();
            if parts.len() != 2 {
                return Err(MonkeyError::invalid_filter(
                    entry,
                    format!("expected key:value, got `{entry}` ({} part(s))", parts.len()),
                ));
            }
            let key = parts[0].trim();
            let raw = parts[1].trim();
            if key.is_empty() || raw.is_empty() {
                return Err(MonkeyError::invalid_filter(
                    entry,
                    format!("both key and value are required in `{entry}`"),
                ));
            }
            let value = TagValue::parse(raw).map_err(|m| MonkeyError::invalid_filter(entry, m))?;
            entries.insert(key.to_string(), value);
        }
        Ok(Self { entries, inverted })
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Value for a bare tag key.
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries.get(key)
    }

    /// Effective filter keys: `tag:<key>` in inclusive mode, bare when inverted.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .keys()
            .map(|k| {
                if self.inverted {
                    k.clone()
                } else {
                    format!("{PROVIDER_TAG_FILTER_PREFIX}{k}")
                }
            })
            .collect()
    }

    /// Server-side filters for inclusive selection.
    pub fn provider_filters(&self) -> ProviderFilters {
        let mut out = ProviderFilters::new();
        for (k, v) in &self.entries {
            out.insert(
                format!("{PROVIDER_TAG_FILTER_PREFIX}{k}"),
                v.values().into_iter().map(str::to_string).collect(),
            );
        }
        out
    }

    /// Flat blacklist: one `(key, value)` pair per accepted value.
    pub fn exclusion_set(&self) -> BTreeSet<(String, String)> {
        let mut out = BTreeSet::new();
        for (k, v) in &self.entries {
            for value in v.values() {
                out.insert((k.clone(), value.to_string()));
            }
        }
        out
    }

    /// Inclusive semantics: every key present on the volume with an accepted value.
    pub fn matches(&self, volume: &Volume) -> bool {
        self.entries.iter().all(|(k, v)| {
            volume
                .tags
                .get(k)
                .map_or(false, |tag_value| v.accepts(tag_value))
        })
    }

    /// Inverted semantics: at least one of the volume's tag pairs is blacklisted.
    pub fn excludes(&self, volume: &Volume) -> bool {
        volume
            .tags
            .iter()
            .any(|(k, value)| self.entries.get(k).map_or(false, |v| v.accepts(value)))
    }
}
