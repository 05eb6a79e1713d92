//! Request matching logic.
//!
//! Compiles declarative [`RequestMatcher`]s into a form that can be checked
//! against outbound requests without re-parsing patterns per request.

use crate::config::{HeaderMatcher, PathMatcher, QueryMatcher, RequestMatcher};
use crate::error::ConfigurationError;
use crate::transport::OutboundRequest;
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::collections::HashMap;

/// A request matcher with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    /// Upper-cased methods (empty = any)
    methods: Vec<String>,
    path: Option<CompiledPathMatcher>,
    query: Vec<(String, ValueMatcher)>,
    headers: Vec<(String, ValueMatcher)>,
}

#[derive(Debug, Clone)]
enum CompiledPathMatcher {
    Exact(String),
    Prefix(String),
    Regex(Regex),
    Glob(GlobMatcher),
}

#[derive(Debug, Clone)]
enum ValueMatcher {
    Exact(String),
    Regex(Regex),
    Contains(String),
    Present,
    Absent,
}

impl ValueMatcher {
    fn matches(&self, value: Option<&str>) -> bool {
        match self {
            ValueMatcher::Exact(expected) => value == Some(expected.as_str()),
            ValueMatcher::Regex(regex) => value.map(|v| regex.is_match(v)).unwrap_or(false),
            ValueMatcher::Contains(needle) => {
                value.map(|v| v.contains(needle.as_str())).unwrap_or(false)
            }
            ValueMatcher::Present => value.is_some(),
            ValueMatcher::Absent => value.is_none(),
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, ConfigurationError> {
    Regex::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
        kind: "regex",
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, ConfigurationError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| ConfigurationError::InvalidPattern {
            kind: "glob",
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

impl CompiledMatcher {
    /// Compile a declarative matcher, rejecting invalid patterns.
    pub fn compile(matcher: &RequestMatcher) -> Result<Self, ConfigurationError> {
        let path = match &matcher.path {
            None => None,
            Some(PathMatcher::Exact { value }) => Some(CompiledPathMatcher::Exact(value.clone())),
            Some(PathMatcher::Prefix { value }) => Some(CompiledPathMatcher::Prefix(value.clone())),
            Some(PathMatcher::Regex { pattern }) => {
                Some(CompiledPathMatcher::Regex(compile_regex(pattern)?))
            }
            Some(PathMatcher::Glob { pattern }) => {
                Some(CompiledPathMatcher::Glob(compile_glob(pattern)?))
            }
        };

        let mut query = Vec::with_capacity(matcher.query.len());
        for (name, qm) in &matcher.query {
            let compiled = match qm {
                QueryMatcher::Exact { value } => ValueMatcher::Exact(value.clone()),
                QueryMatcher::Regex { pattern } => ValueMatcher::Regex(compile_regex(pattern)?),
                QueryMatcher::Present => ValueMatcher::Present,
                QueryMatcher::Absent => ValueMatcher::Absent,
            };
            query.push((name.clone(), compiled));
        }

        let mut headers = Vec::with_capacity(matcher.headers.len());
        for (name, hm) in &matcher.headers {
            let compiled = match hm {
                HeaderMatcher::Exact { value } => ValueMatcher::Exact(value.clone()),
                HeaderMatcher::Regex { pattern } => ValueMatcher::Regex(compile_regex(pattern)?),
                HeaderMatcher::Contains { value } => ValueMatcher::Contains(value.clone()),
                HeaderMatcher::Present => ValueMatcher::Present,
                HeaderMatcher::Absent => ValueMatcher::Absent,
            };
            headers.push((name.clone(), compiled));
        }

        Ok(Self {
            methods: matcher.method.iter().map(|m| m.to_uppercase()).collect(),
            path,
            query,
            headers,
        })
    }

    /// Check a request against every configured criterion.
    pub fn matches(&self, request: &OutboundRequest) -> bool {
        if !self.methods.is_empty() {
            let method = request.method().as_str();
            if !self.methods.iter().any(|m| m.eq_ignore_ascii_case(method)) {
                return false;
            }
        }

        if let Some(path_matcher) = &self.path {
            if !matches_path(path_matcher, request.path()) {
                return false;
            }
        }

        if !self.query.is_empty() {
            let params: HashMap<String, String> = request
                .url()
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            for (name, matcher) in &self.query {
                if !matcher.matches(params.get(name).map(String::as_str)) {
                    return false;
                }
            }
        }

        // HeaderMap lookups are case-insensitive
        for (name, matcher) in &self.headers {
            let value = request
                .headers()
                .get(name.as_str())
                .and_then(|v| v.to_str().ok());
            if !matcher.matches(value) {
                return false;
            }
        }

        true
    }
}

fn matches_path(matcher: &CompiledPathMatcher, path: &str) -> bool {
    match matcher {
        CompiledPathMatcher::Exact(value) => path == value,
        CompiledPathMatcher::Prefix(value) => path.starts_with(value.as_str()),
        CompiledPathMatcher::Regex(regex) => regex.is_match(path),
        CompiledPathMatcher::Glob(glob) => glob.is_match(path),
    }
}
