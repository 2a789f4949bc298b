//! Endpoint normalization.
//!
//! Every endpoint string a caller hands to the client goes through
//! [`clean_endpoint`] before it is used as a cache key or joined onto the
//! configured base URL. Against a base ending in `/api`, `"api/dogs/"`,
//! `"/dogs"` and `"dogs"` all refer to the same resource.

use tracing::warn;

/// Strip surrounding slashes and duplicate slashes from an endpoint.
///
/// This is the key form used by the missing-endpoint set and the fallback
/// table; it never touches an `api/` prefix.
pub fn normalize_endpoint(endpoint: &str) -> String {
  collapse_slashes(endpoint.trim().trim_matches('/'))
}

/// Normalize an endpoint relative to `base`.
///
/// A single leading `api/` is dropped only when `base` already ends in
/// `/api`; against any other base it is a real path segment.
pub fn clean_endpoint(base: &str, endpoint: &str) -> String {
  let normalized = normalize_endpoint(endpoint);
  if !base_ends_in_api(base) {
    return normalized;
  }

  if normalized == "api" {
    String::new()
  } else if let Some(rest) = normalized.strip_prefix("api/") {
    rest.to_string()
  } else {
    normalized
  }
}

/// Build the absolute URL for an endpoint under `base`.
///
/// Malformed input is never rejected here; a bad URL surfaces later as a
/// transport error. A result that still contains `/api/api/` is logged since
/// it points at a caller passing a doubled prefix.
pub fn format_api_url(base: &str, endpoint: &str) -> String {
  let trimmed_base = base.trim().trim_end_matches('/');
  let cleaned = clean_endpoint(base, endpoint);

  let joined = if cleaned.is_empty() {
    trimmed_base.to_string()
  } else {
    format!("{}/{}", trimmed_base, cleaned)
  };

  let url = collapse_slashes(&joined);
  if url.contains("/api/api/") {
    warn!(url = %url, endpoint, "Duplicate /api/ segment in formatted URL");
  }
  url
}

/// Recover the cleaned endpoint from an absolute URL, if it lives under `base`.
///
/// The result equals [`clean_endpoint`] of the endpoint the URL was
/// formatted from.
pub fn endpoint_from_url(base: &str, url: &str) -> Option<String> {
  let base = collapse_slashes(base.trim().trim_end_matches('/'));
  let url = collapse_slashes(url.trim());

  let rest = url.strip_prefix(&base)?;
  // "https://host/api" must not match "https://host/apiary"
  if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
    return None;
  }
  Some(normalize_endpoint(rest))
}

/// Path part of a cleaned endpoint, without any query string.
pub fn endpoint_path(endpoint: &str) -> &str {
  endpoint
    .split_once('?')
    .map(|(path, _)| path)
    .unwrap_or(endpoint)
    .trim_end_matches('/')
}

fn base_ends_in_api(base: &str) -> bool {
  base.trim().trim_end_matches('/').ends_with("/api")
}

/// Collapse runs of `/` into one, leaving the `//` after a URL scheme alone.
fn collapse_slashes(input: &str) -> String {
  let (scheme, rest) = match input.find("://") {
    Some(idx) => input.split_at(idx + 3),
    None => ("", input),
  };

  let mut out = String::with_capacity(input.len());
  out.push_str(scheme);

  let mut previous_slash = false;
  for c in rest.chars() {
    if c == '/' {
      if previous_slash {
        continue;
      }
      previous_slash = true;
    } else {
      previous_slash = false;
    }
    out.push(c);
  }
  out
}
