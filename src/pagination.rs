//! Pagination-metadata resolution.
//!
//! Backends disagree on where pagination metadata lives and what its fields
//! are called. The resolver probes candidate locations in a fixed priority
//! order, accepts the first candidate that produces a usable count, and
//! otherwise infers a conservative "may have more" estimate from the
//! returned page itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical pagination state, recomputed on every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
  pub page: u64,
  pub limit: u64,
  pub total: u64,
  pub total_pages: u64,
}

impl Default for PageState {
  fn default() -> Self {
    Self {
      page: 1,
      limit: 10,
      total: 0,
      total_pages: 0,
    }
  }
}

impl PageState {
  pub fn with_limit(limit: u64) -> Self {
    Self {
      limit,
      ..Self::default()
    }
  }

  pub fn has_next_page(&self) -> bool {
    self.page < self.total_pages
  }
}

/// Read a numeric field, coercing strings since some backends quote numbers.
fn num(value: Option<&Value>) -> Option<u64> {
  let value = value?;
  if let Some(n) = value.as_u64() {
    return Some(n);
  }
  if let Some(f) = value.as_f64() {
    return Some(f.max(0.0) as u64);
  }
  value.as_str()?.trim().parse().ok()
}

/// First present field wins within each synonym group.
fn first_num(candidate: &Value, names: &[&str]) -> Option<u64> {
  names.iter().find_map(|name| num(candidate.get(name)))
}

fn ceil_div(total: u64, limit: u64) -> u64 {
  if limit == 0 {
    1
  } else {
    total.div_ceil(limit).max(1)
  }
}

/// Resolve a [`PageState`] from whichever metadata shape the backend supplied.
///
/// Candidate locations are probed in priority order: `pagination`,
/// `meta.pagination`, `data.pagination`, `meta`, the payload root. A
/// candidate is accepted only when it yields a non-zero total or page count;
/// whichever of the two is missing is cross-derived. With no usable
/// metadata, the total is inferred from the returned item count, assuming
/// one more page when the page came back exactly full.
pub fn resolve(requested_page: u64, requested_limit: u64, returned_len: u64, raw: &Value) -> PageState {
  let candidates = [
    raw.get("pagination"),
    raw.pointer("/meta/pagination"),
    raw.pointer("/data/pagination"),
    raw.get("meta"),
    Some(raw),
  ];

  for candidate in candidates.into_iter().flatten() {
    let usable = candidate.as_object().is_some_and(|m| !m.is_empty());
    if !usable {
      continue;
    }

    let page = first_num(candidate, &["current_page", "page"]).unwrap_or(requested_page.max(1));
    let limit = first_num(candidate, &["per_page", "limit"]).unwrap_or(requested_limit.max(1));
    let mut total = first_num(candidate, &["total", "total_data", "totalCount", "count"]).unwrap_or(0);
    let mut total_pages = first_num(candidate, &["total_pages", "total_page", "pages"]).unwrap_or(0);

    if total == 0 && total_pages == 0 {
      continue;
    }

    if total == 0 {
      total = total_pages * limit;
    }
    if total_pages == 0 {
      total_pages = ceil_div(total, limit);
    }

    return PageState {
      page,
      limit,
      total,
      total_pages,
    };
  }

  // No metadata anywhere: infer from the page itself. A full page is
  // assumed to hide at least one more, so the UI can offer a next page.
  let page = requested_page.max(1);
  let limit = requested_limit.max(1);
  let mut total = (page - 1) * limit + returned_len;
  if returned_len == limit {
    total += limit;
  }

  PageState {
    page,
    limit,
    total,
    total_pages: ceil_div(total, limit),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn resolves_standard_pagination_block() {
    let raw = json!({"pagination": {"current_page": 2, "per_page": 10, "total": 25}});
    let state = resolve(1, 10, 10, &raw);
    assert_eq!(
      state,
      PageState {
        page: 2,
        limit: 10,
        total: 25,
        total_pages: 3
      }
    );
  }

  #[test]
  fn heuristic_full_page_assumes_more() {
    let state = resolve(1, 10, 10, &json!({}));
    assert_eq!(state.total, 20);
    assert_eq!(state.total_pages, 2);
    assert!(state.has_next_page());
  }

  #[test]
  fn heuristic_partial_page_is_exact() {
    let state = resolve(3, 10, 4, &json!({"bookings": []}));
    assert_eq!(state.total, 24);
    assert_eq!(state.total_pages, 3);
    assert!(!state.has_next_page());
  }

  #[test]
  fn cross_derives_total_from_pages() {
    let raw = json!({"meta": {"page": 1, "limit": 5, "total_page": 4}});
    let state = resolve(1, 5, 5, &raw);
    assert_eq!(state.total, 20);
    assert_eq!(state.total_pages, 4);
  }

  #[test]
  fn nested_meta_pagination_beats_plain_meta() {
    let raw = json!({
      "meta": {
        "pagination": {"current_page": 3, "per_page": 20, "total": 100},
        "total": 7
      }
    });
    let state = resolve(1, 10, 20, &raw);
    assert_eq!(state.page, 3);
    assert_eq!(state.limit, 20);
    assert_eq!(state.total, 100);
    assert_eq!(state.total_pages, 5);
  }

  #[test]
  fn zero_count_candidate_is_skipped() {
    // The pagination block has no usable count, so the teacher-service
    // style block further in wins.
    let raw = json!({
      "pagination": {"note": "present but empty of counts"},
      "meta": {"total_data": 12, "limit": 10}
    });
    let state = resolve(1, 10, 10, &raw);
    assert_eq!(state.total, 12);
    assert_eq!(state.total_pages, 2);
  }

  #[test]
  fn string_numbers_are_coerced() {
    let raw = json!({"pagination": {"current_page": "2", "limit": "10", "total": "21"}});
    let state = resolve(1, 10, 10, &raw);
    assert_eq!(state.page, 2);
    assert_eq!(state.total, 21);
    assert_eq!(state.total_pages, 3);
  }

  #[test]
  fn root_object_counts_as_last_candidate() {
    let raw = json!({"total": 31, "limit": 10, "page": 4});
    let state = resolve(4, 10, 1, &raw);
    assert_eq!(state.total, 31);
    assert_eq!(state.total_pages, 4);
    assert_eq!(state.page, 4);
  }
}
