//! Deploy-time resource manifest and request-key normalization.

use std::collections::BTreeMap;

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Manifest key for the root document.
pub const ROOT_KEY: &str = "/";

/// Immutable mapping from normalized resource path to content fingerprint,
/// supplied once per deployed version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest(BTreeMap<String, String>);

impl ResourceManifest {
  /// Build a manifest from path/fingerprint pairs.
  pub fn new(entries: BTreeMap<String, String>) -> Self {
    Self(entries)
  }

  /// Whether the manifest covers the given key.
  pub fn contains(&self, key: &str) -> bool {
    self.0.contains_key(key)
  }

  /// Fingerprint recorded for the given key.
  pub fn fingerprint(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(|s| s.as_str())
  }

  /// All manifest keys.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(|s| s.as_str())
  }

  /// Number of resources in the manifest.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether the manifest is empty.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Serialize for snapshot persistence.
  pub fn to_json(&self) -> Result<Vec<u8>> {
    serde_json::to_vec(self).map_err(|e| eyre!("Failed to serialize manifest: {}", e))
  }

  /// Deserialize a persisted snapshot.
  pub fn from_json(bytes: &[u8]) -> Result<Self> {
    serde_json::from_slice(bytes).map_err(|e| eyre!("Failed to parse manifest snapshot: {}", e))
  }
}

impl FromIterator<(String, String)> for ResourceManifest {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Normalize a request URL to a manifest key relative to the serving origin.
///
/// Returns `None` for URLs the worker must not intercept: foreign origins,
/// unparseable URLs, and fragment navigation below the root document.
///
/// - the bare origin, an empty path, and fragment-routed root URLs
///   (`origin/#...`) all map to [`ROOT_KEY`]
/// - a `?v=` cache-busting marker is stripped
/// - any other query string stays part of the key, so it falls outside the
///   manifest and is left for default handling
pub fn normalize_key(url: &str, origin: &Url) -> Option<String> {
  let parsed = Url::parse(url).ok()?;
  if parsed.origin() != origin.origin() {
    return None;
  }

  if parsed.fragment().is_some() && parsed.path() != "/" {
    return None;
  }

  let mut key = parsed.path().trim_start_matches('/').to_string();
  match parsed.query() {
    // Cache-busting marker, not part of the resource identity
    Some(q) if q.starts_with("v=") => {}
    Some(q) => {
      key.push('?');
      key.push_str(q);
    }
    None => {}
  }

  if key.is_empty() {
    return Some(ROOT_KEY.to_string());
  }

  Some(key)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn origin() -> Url {
    Url::parse("https://app.example.com").unwrap()
  }

  fn manifest(entries: &[(&str, &str)]) -> ResourceManifest {
    entries
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_plain_resource_path() {
    assert_eq!(
      normalize_key("https://app.example.com/app.js", &origin()),
      Some("app.js".to_string())
    );
    assert_eq!(
      normalize_key("https://app.example.com/assets/images/logo.png", &origin()),
      Some("assets/images/logo.png".to_string())
    );
  }

  #[test]
  fn test_bare_origin_maps_to_root() {
    assert_eq!(
      normalize_key("https://app.example.com", &origin()),
      Some(ROOT_KEY.to_string())
    );
    assert_eq!(
      normalize_key("https://app.example.com/", &origin()),
      Some(ROOT_KEY.to_string())
    );
  }

  #[test]
  fn test_fragment_routed_url_maps_to_root() {
    assert_eq!(
      normalize_key("https://app.example.com/#/settings", &origin()),
      Some(ROOT_KEY.to_string())
    );
  }

  #[test]
  fn test_fragment_below_root_is_not_intercepted() {
    assert_eq!(
      normalize_key("https://app.example.com/docs.html#intro", &origin()),
      None
    );
  }

  #[test]
  fn test_cache_busting_marker_is_stripped() {
    assert_eq!(
      normalize_key("https://app.example.com/index.html?v=abc123", &origin()),
      Some("index.html".to_string())
    );
  }

  #[test]
  fn test_other_query_strings_stay_in_the_key() {
    assert_eq!(
      normalize_key("https://app.example.com/search?q=cats", &origin()),
      Some("search?q=cats".to_string())
    );
  }

  #[test]
  fn test_foreign_origin_is_rejected() {
    assert_eq!(normalize_key("https://evil.example.com/app.js", &origin()), None);
    assert_eq!(normalize_key("http://app.example.com/app.js", &origin()), None);
    assert_eq!(normalize_key("not a url", &origin()), None);
  }

  #[test]
  fn test_snapshot_round_trip() {
    let manifest = manifest(&[("/", "aaa"), ("app.js", "bbb")]);
    let bytes = manifest.to_json().unwrap();
    assert_eq!(ResourceManifest::from_json(&bytes).unwrap(), manifest);
  }

  #[test]
  fn test_snapshot_rejects_garbage() {
    assert!(ResourceManifest::from_json(b"not json").is_err());
  }
}
