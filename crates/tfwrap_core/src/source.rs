//! Module source resolution.
//!
//! Turns a user-supplied module reference into a location the fetcher can
//! clone or read. Resolution is a pure string transform: nothing here checks
//! that the location exists.
//!
//! Recognised forms:
//!
//! - `org/name/provider` registry references, mapped onto
//!   `https://<host>/<org>/terraform-<provider>-<name>.git`
//! - scheme-qualified URLs (`https://...`, `git::ssh://...`, `git@host:org/repo`)
//! - bare host paths (`github.com/org/repo`), prefixed with `https://`
//! - local paths (`./modules/vpc`, `/opt/modules/vpc`)
//!
//! Any of these may carry a `//sub/path` suffix naming a directory inside
//! the repository.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::model::{ResolvedLocation, SourceKind};

/// Registry hosts that may prefix a three-segment reference.
const REGISTRY_HOSTS: [&str; 2] = ["registry.terraform.io", "registry.opentofu.org"];

fn forced_getter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9]+)::(.+)$").expect("valid getter regex"))
}

fn url_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("valid scheme regex"))
}

fn scp_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.-]+@[\w.-]+:").expect("valid scp regex"))
}

/// Resolves module references against a default source host.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    default_host: String,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new("github.com")
    }
}

impl SourceResolver {
    pub fn new(default_host: impl Into<String>) -> Self {
        Self {
            default_host: default_host.into(),
        }
    }

    pub fn default_host(&self) -> &str {
        &self.default_host
    }

    /// Resolve a raw module reference.
    pub fn resolve(&self, raw_source: &str) -> ResolvedLocation {
        let (module_source, sub_path) = split_sub_path(raw_source.trim());

        let (sub_path, sub_query) = match sub_path {
            Some(sub) => {
                let (path, query) = split_query(sub);
                let path = path.trim_matches('/');
                ((!path.is_empty()).then(|| path.to_string()), query)
            }
            None => (None, None),
        };

        let (module_source, source_query) = split_query(module_source);
        let pinned_ref = source_query
            .or(sub_query)
            .and_then(ref_from_query);

        let (fetch_location, kind) = self.locate(module_source);

        debug!(
            "Resolved {} -> {} ({}){}",
            raw_source,
            fetch_location,
            kind,
            sub_path
                .as_deref()
                .map(|s| format!(" sub-path {}", s))
                .unwrap_or_default()
        );

        ResolvedLocation {
            fetch_location,
            sub_path,
            pinned_ref,
            kind,
        }
    }

    fn locate(&self, module_source: &str) -> (String, SourceKind) {
        if let Some(caps) = forced_getter().captures(module_source) {
            return (caps[2].to_string(), SourceKind::Git);
        }

        if url_scheme().is_match(module_source) || scp_like().is_match(module_source) {
            return (module_source.to_string(), SourceKind::Git);
        }

        if is_local_path(module_source) {
            return (module_source.to_string(), SourceKind::Local);
        }

        let segments: Vec<&str> = module_source.split('/').filter(|s| !s.is_empty()).collect();

        if let Some(registry) = registry_segments(&segments) {
            let [org, name, provider] = registry;
            return (
                format!(
                    "https://{}/{}/terraform-{}-{}.git",
                    self.default_host, org, provider, name
                ),
                SourceKind::Registry,
            );
        }

        if segments.first().is_some_and(|first| first.contains('.')) {
            return (format!("https://{}", module_source), SourceKind::Git);
        }

        let path = segments.join("/");
        let suffix = if path.ends_with(".git") { "" } else { ".git" };
        (
            format!("https://{}/{}{}", self.default_host, path, suffix),
            SourceKind::Git,
        )
    }
}

/// Whether `source` is an scp-style `user@host:path` address.
pub(crate) fn is_scp_like(source: &str) -> bool {
    scp_like().is_match(source)
}

/// Derive the wrapper name used when the caller gives none.
///
/// Registry references use their module name segment; everything else uses
/// the last path segment (of the sub-path when there is one) minus `.git`.
pub fn default_wrapper_name(raw_source: &str) -> String {
    let (module_source, sub_path) = split_sub_path(raw_source.trim());
    let (module_source, _) = split_query(module_source);

    if let Some(sub) = sub_path {
        let (sub, _) = split_query(sub);
        if let Some(last) = sub.split('/').filter(|s| !s.is_empty()).last() {
            return last.to_string();
        }
    }

    let bare = forced_getter()
        .captures(module_source)
        .and_then(|caps| caps.get(2))
        .map_or(module_source, |m| m.as_str());

    let is_qualified = url_scheme().is_match(bare) || scp_like().is_match(bare);
    if !is_qualified && !is_local_path(bare) {
        let segments: Vec<&str> = bare.split('/').filter(|s| !s.is_empty()).collect();
        if let Some([_, name, _]) = registry_segments(&segments) {
            return name.to_string();
        }
    }

    let last = bare
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." {
        "module".to_string()
    } else {
        name.to_string()
    }
}

/// Split `source//sub/path`, ignoring the `//` of a URL scheme.
fn split_sub_path(raw: &str) -> (&str, Option<&str>) {
    let search_from = raw.find("://").map_or(0, |i| i + 3);
    match raw[search_from..].find("//") {
        Some(i) => {
            let at = search_from + i;
            (&raw[..at], Some(&raw[at + 2..]))
        }
        None => (raw, None),
    }
}

fn split_query(value: &str) -> (&str, Option<&str>) {
    match value.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (value, None),
    }
}

fn ref_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| match pair.split_once('=') {
        Some(("ref", value)) if !value.is_empty() => Some(value.to_string()),
        Some((key, _)) => {
            debug!("Ignoring source query parameter '{}'", key);
            None
        }
        None => None,
    })
}

fn is_local_path(source: &str) -> bool {
    source.starts_with("./")
        || source.starts_with("../")
        || source.starts_with('/')
        || source == "."
        || source == ".."
}

/// `org/name/provider`, optionally behind a known registry host.
fn registry_segments<'a>(segments: &[&'a str]) -> Option<[&'a str; 3]> {
    match segments {
        [org, name, provider] if !org.contains('.') => Some([*org, *name, *provider]),
        [host, org, name, provider] if REGISTRY_HOSTS.contains(host) => {
            Some([*org, *name, *provider])
        }
        _ => None,
    }
}
