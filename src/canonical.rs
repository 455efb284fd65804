use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CanonicalizeError;
use crate::filter::ParameterFilterSet;

/// One `&`-delimited fragment of a query string.
///
/// Both fields borrow from the query; `key` is always a prefix of `raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter<'a> {
    pub key: &'a str,
    pub raw: &'a str,
}

impl<'a> Parameter<'a> {
    fn from_fragment(fragment: &'a str) -> Parameter<'a> {
        let key = match fragment.find('=') {
            Some(equal) => &fragment[..equal],
            None => fragment,
        };

        Parameter { key, raw: fragment }
    }

    /// Empty keys are never filtered.
    pub fn is_filtered_by(&self, filter: &ParameterFilterSet) -> bool {
        !self.key.is_empty() && filter.contains(self.key)
    }
}

/// Comparator used to put parameters into canonical order.
///
/// `Lexicographic` is a case-insensitive total order on key, then raw; its
/// output is a fixed point of canonicalization.
/// `Compatible` keeps the historical prefix comparison with its forced
/// tie-break, so canonical strings (and every cache key derived from them)
/// stay byte-identical to those produced by earlier deployments. It is not
/// transitive: canonicalizing its output again may reorder prefix-related keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Compatible,
    #[default]
    Lexicographic,
}

/// The three per-request facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalResult {
    has_args: bool,
    is_args: bool,
    canonical: String,
}

impl CanonicalResult {
    /// The query string was non-empty.
    pub fn has_args(&self) -> bool {
        self.has_args
    }

    /// At least one parameter survived filtering.
    pub fn is_args(&self) -> bool {
        self.is_args
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn into_canonical(self) -> String {
        self.canonical
    }
}

pub fn parse(query: &str) -> Result<Vec<Parameter<'_>>, CanonicalizeError> {
    let mut params = Vec::new();

    if query.is_empty() {
        return Ok(params);
    }

    let fragments = query.bytes().filter(|&b| b == b'&').count() + 1;
    params.try_reserve_exact(fragments)?;
    params.extend(query.split('&').map(Parameter::from_fragment));

    Ok(params)
}

pub fn sort(params: &mut [Parameter<'_>], order: SortOrder) -> Result<(), CanonicalizeError> {
    match order {
        SortOrder::Compatible => {
            let mut scratch = Vec::new();
            scratch.try_reserve_exact(params.len() / 2)?;
            merge_sort(params, &mut scratch);
        }
        SortOrder::Lexicographic => params.sort_by(compare_lexicographic),
    }

    Ok(())
}

pub fn filter(params: &mut Vec<Parameter<'_>>, filter: &ParameterFilterSet) {
    if filter.is_empty() {
        return;
    }
    params.retain(|param| !param.is_filtered_by(filter));
}

pub fn serialize(params: &[Parameter<'_>]) -> Result<String, CanonicalizeError> {
    let len = params.iter().map(|p| p.raw.len()).sum::<usize>() + params.len().saturating_sub(1);

    let mut out = String::new();
    out.try_reserve_exact(len)?;

    for (idx, param) in params.iter().enumerate() {
        if idx > 0 {
            out.push('&');
        }
        out.push_str(param.raw);
    }

    Ok(out)
}

pub fn canonicalize(
    query: &str,
    filter_set: Option<&ParameterFilterSet>,
    order: SortOrder,
) -> Result<CanonicalResult, CanonicalizeError> {
    if query.is_empty() {
        return Ok(CanonicalResult::default());
    }

    let mut params = parse(query)?;
    let parsed = params.len();

    sort(&mut params, order)?;

    if let Some(filter_set) = filter_set {
        filter(&mut params, filter_set);
    }

    let canonical = serialize(&params)?;

    trace!(parsed, kept = params.len(), ?order, "canonicalized query arguments");

    Ok(CanonicalResult {
        has_args: true,
        is_args: !params.is_empty(),
        canonical,
    })
}

/// Case-insensitive compare of the first `min(a.len(), b.len())` bytes.
/// A NUL byte ends the comparison as equal.
fn prefix_casecmp(a: &str, b: &str) -> Ordering {
    for (&c1, &c2) in a.as_bytes().iter().zip(b.as_bytes()) {
        let (c1, c2) = (c1.to_ascii_lowercase(), c2.to_ascii_lowercase());
        if c1 != c2 {
            return c1.cmp(&c2);
        }
        if c1 == 0 {
            return Ordering::Equal;
        }
    }

    Ordering::Equal
}

/// Never returns `Equal`; prefix-equal parameters report the first as less.
/// Not a consistent total order, so it must only drive [`merge_sort`].
pub(crate) fn compare_compatible(a: &Parameter<'_>, b: &Parameter<'_>) -> Ordering {
    prefix_casecmp(a.key, b.key)
        .then_with(|| prefix_casecmp(a.raw, b.raw))
        .then(Ordering::Less)
}

fn casecmp(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

pub(crate) fn compare_lexicographic(a: &Parameter<'_>, b: &Parameter<'_>) -> Ordering {
    casecmp(a.key, b.key)
        .then_with(|| casecmp(a.raw, b.raw))
        .then_with(|| a.raw.cmp(b.raw))
}

// Top-down merge sort splitting at len / 2 and preferring the left run unless
// it compares Greater. `scratch` must hold at least items.len() / 2 elements.
fn merge_sort<'a>(items: &mut [Parameter<'a>], scratch: &mut Vec<Parameter<'a>>) {
    let len = items.len();
    if len < 2 {
        return;
    }

    let mid = len / 2;
    merge_sort(&mut items[..mid], scratch);
    merge_sort(&mut items[mid..], scratch);

    scratch.clear();
    scratch.extend_from_slice(&items[..mid]);

    let (mut left, mut right, mut out) = (0, mid, 0);

    while left < scratch.len() && right < len {
        if compare_compatible(&scratch[left], &items[right]) != Ordering::Greater {
            items[out] = scratch[left];
            left += 1;
        } else {
            items[out] = items[right];
            right += 1;
        }
        out += 1;
    }

    for param in &scratch[left..] {
        items[out] = *param;
        out += 1;
    }
}
