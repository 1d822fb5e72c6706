//! Path based routing of module requests.
//!
//! Rules are stored in a tree keyed by path segment. Resolving a path walks
//! the tree as far as the path's segments match and returns the deepest
//! explicit (non-[FilterRule::Default]) rule seen on the way, falling back
//! to the root rule. Unset segments therefore inherit their nearest
//! explicit ancestor.
//!
//! A rule may be qualified by version prefixes, in which case it only
//! applies to versions starting with one of them.
//!
//! ### Filter file format
//!
//! ```text
//! # comments and blank lines are ignored
//! -                             # root rule: exclude everything...
//! + github.com/a                # ...but serve github.com/a
//! - github.com/a/b              # ...except github.com/a/b
//! D golang.org/x                # delegate to the direct proxy
//! - github.com/c v0.,v1.0       # exclude only v0.* and v1.0* of this
//! ```

use modproxy_api::*;
use std::collections::HashMap;

/// How requests for a module path should be handled.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum FilterRule {
    /// Inherit from the nearest ancestor rule. Never a resolved answer.
    #[default]
    Default,

    /// Serve the module from this proxy.
    Include,

    /// Refuse to serve the module.
    Exclude,

    /// Delegate the module to a remote proxy.
    Direct,
}

#[derive(Debug, Default)]
struct Node {
    rule: FilterRule,
    versions: Vec<String>,
    children: HashMap<String, Node>,
}

impl Node {
    fn applies_to(&self, version: Option<&str>) -> bool {
        if self.versions.is_empty() {
            return true;
        }
        match version {
            Some(version) => {
                self.versions.iter().any(|v| version.starts_with(v.as_str()))
            }
            None => false,
        }
    }
}

/// A longest-prefix-match rule tree over module paths.
///
/// Rules are added through `&mut self`, after which the filter can be
/// shared (e.g. in an `Arc`) and queried concurrently.
#[derive(Debug)]
pub struct Filter {
    root: Node,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Filter {
    /// An empty filter that includes everything.
    pub fn new() -> Self {
        Self {
            root: Node {
                rule: FilterRule::Include,
                ..Default::default()
            },
        }
    }

    /// Set the rule for a path. An empty path sets the root rule.
    pub fn add_rule(&mut self, path: &str, rule: FilterRule) {
        self.add_rule_with_versions(path, rule, Vec::new());
    }

    /// Set the rule for a path, applying only to versions starting with
    /// one of `versions`. An empty list applies to all versions.
    pub fn add_rule_with_versions(
        &mut self,
        path: &str,
        rule: FilterRule,
        versions: Vec<String>,
    ) {
        let mut node = &mut self.root;
        for seg in segments(path) {
            node = node.children.entry(seg.to_string()).or_default();
        }
        node.rule = rule;
        node.versions = versions;
    }

    /// Resolve the rule for a module path, ignoring version-qualified
    /// rules.
    pub fn rule(&self, path: &str) -> FilterRule {
        self.resolve(path, None)
    }

    /// Resolve the rule for a specific version of a module path.
    pub fn rule_for_version(&self, path: &str, version: &str) -> FilterRule {
        self.resolve(path, Some(version))
    }

    fn resolve(&self, path: &str, version: Option<&str>) -> FilterRule {
        let mut found = FilterRule::Default;
        let mut node = &self.root;
        for seg in segments(path) {
            node = match node.children.get(seg) {
                Some(child) => child,
                None => break,
            };
            if node.rule != FilterRule::Default && node.applies_to(version) {
                found = node.rule;
            }
        }

        if found == FilterRule::Default {
            found = self.root.rule;
        }

        if found == FilterRule::Default {
            FilterRule::Include
        } else {
            found
        }
    }

    /// Build a filter from the contents of a filter file.
    pub fn parse(text: &str) -> ProxyResult<Self> {
        let mut filter = Self::new();

        for (idx, line) in text.lines().enumerate() {
            let line = match line.find('#') {
                Some(at) => &line[..at],
                None => line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let mut cols = line.split_whitespace();
            let rule = match cols.next() {
                Some("+") => FilterRule::Include,
                Some("-") => FilterRule::Exclude,
                Some("D") => FilterRule::Direct,
                other => {
                    return Err(ProxyError::bad_request(format!(
                        "filter line {}: invalid rule {other:?}",
                        idx + 1
                    )));
                }
            };
            let path = cols.next().unwrap_or("");
            let versions = cols
                .next()
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            if cols.next().is_some() {
                return Err(ProxyError::bad_request(format!(
                    "filter line {}: too many columns",
                    idx + 1
                )));
            }

            filter.add_rule_with_versions(path, rule, versions);
        }

        Ok(filter)
    }
}
