//! Section paths and candidate key construction.
//!
//! A configuration value is addressed by a *section path* (an ordered list of
//! nested section names) plus a leaf key. For a single argument many candidate
//! locations are plausible, from the most specific
//! (`pipeline.sources.module.function`) down to the bare key. This module
//! builds that candidate list; the resolver walks it in order.

use std::fmt;

/// The component category an argument belongs to.
///
/// The category decides the outermost sections of the lookup path, e.g.
/// source arguments live under `sources.<module>.<function>` while
/// destination arguments live under `destination.<module>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Source,
    Destination,
    Schema,
    Extract,
    Normalize,
    Load,
}

impl Category {
    /// Maximal section list for this category, before truncation.
    /// Empty context names are skipped so a bare context degrades to the
    /// leaf key alone.
    fn sections(&self, ctx: &LookupContext) -> Vec<String> {
        let mut sections = Vec::new();
        let mut push = |s: &str| {
            if !s.is_empty() {
                sections.push(s.to_string());
            }
        };
        match self {
            Category::Source => {
                push("sources");
                push(&ctx.module_name);
                push(&ctx.function_name);
            }
            Category::Destination => {
                push("destination");
                push(&ctx.module_name);
            }
            Category::Schema => {
                push("schema");
                push(&ctx.module_name);
            }
            Category::Extract => push("extract"),
            Category::Normalize => push("normalize"),
            Category::Load => push("load"),
        }
        sections
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Source => "sources",
            Category::Destination => "destination",
            Category::Schema => "schema",
            Category::Extract => "extract",
            Category::Normalize => "normalize",
            Category::Load => "load",
        };
        write!(f, "{}", name)
    }
}

/// Identity of one resolution pass.
///
/// Constructed fresh per wrapped call and never mutated afterwards. There is
/// no ambient "current pipeline" state anywhere in the crate; the pipeline
/// name travels here or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupContext {
    pub pipeline_name: Option<String>,
    pub module_name: String,
    pub function_name: String,
    pub category: Category,
}

impl LookupContext {
    pub fn new(
        pipeline_name: Option<String>,
        module_name: impl Into<String>,
        function_name: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            pipeline_name,
            module_name: module_name.into(),
            function_name: function_name.into(),
            category,
        }
    }
}

/// An ordered list of nested section names. Most specific segment last;
/// truncation removes from the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SectionPath(Vec<String>);

impl SectionPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&[&str]> for SectionPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// One location to ask a provider about: a section path and a leaf key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    pub path: SectionPath,
    pub key: String,
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}.{}", self.path, self.key)
        }
    }
}

/// Builds the ordered candidate list for one lookup.
///
/// `group` holds the embedded argument-name segments (e.g. `["credentials"]`
/// when resolving a field of a structured `credentials` argument). The group
/// is always the innermost part of the path and survives truncation; only
/// the category sections are popped right to left. When a pipeline name is
/// set the whole truncation sequence is emitted twice, pipeline-qualified
/// first, so pipeline-scoped values always win.
///
/// The output is a strict total order by construction; no sorting happens.
pub fn candidates(ctx: &LookupContext, group: &[String], key: &str) -> Vec<CandidateKey> {
    let sections = ctx.category.sections(ctx);
    let mut out = Vec::new();
    if let Some(pipeline) = ctx.pipeline_name.as_deref() {
        truncation_pass(&mut out, Some(pipeline), &sections, group, key);
    }
    truncation_pass(&mut out, None, &sections, group, key);
    out
}

fn truncation_pass(
    out: &mut Vec<CandidateKey>,
    pipeline: Option<&str>,
    sections: &[String],
    group: &[String],
    key: &str,
) {
    // The pipeline segment is never popped within its own pass.
    for depth in (0..=sections.len()).rev() {
        let mut segments = Vec::with_capacity(1 + depth + group.len());
        if let Some(pipeline) = pipeline {
            segments.push(pipeline.to_string());
        }
        segments.extend(sections[..depth].iter().cloned());
        segments.extend(group.iter().cloned());
        out.push(CandidateKey {
            path: SectionPath::new(segments),
            key: key.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(candidates: &[CandidateKey]) -> Vec<String> {
        candidates.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn source_argument_candidates() {
        let ctx = LookupContext::new(None, "zendesk", "tickets", Category::Source);
        let cands = candidates(&ctx, &[], "api_url");
        assert_eq!(
            paths(&cands),
            vec![
                "sources.zendesk.tickets.api_url",
                "sources.zendesk.api_url",
                "sources.api_url",
                "api_url",
            ]
        );
    }

    #[test]
    fn pipeline_qualified_block_comes_first() {
        let ctx = LookupContext::new(
            Some("chess_games".to_string()),
            "zendesk",
            "tickets",
            Category::Source,
        );
        let cands = candidates(&ctx, &[], "api_url");
        assert_eq!(
            paths(&cands),
            vec![
                "chess_games.sources.zendesk.tickets.api_url",
                "chess_games.sources.zendesk.api_url",
                "chess_games.sources.api_url",
                "chess_games.api_url",
                "sources.zendesk.tickets.api_url",
                "sources.zendesk.api_url",
                "sources.api_url",
                "api_url",
            ]
        );
    }

    #[test]
    fn group_survives_truncation() {
        let ctx = LookupContext::new(
            Some("chess_games".to_string()),
            "postgres",
            "",
            Category::Destination,
        );
        let cands = candidates(&ctx, &["credentials".to_string()], "password");
        assert_eq!(
            paths(&cands),
            vec![
                "chess_games.destination.postgres.credentials.password",
                "chess_games.destination.credentials.password",
                "chess_games.credentials.password",
                "destination.postgres.credentials.password",
                "destination.credentials.password",
                "credentials.password",
            ]
        );
    }

    #[test]
    fn bare_context_degrades_to_leaf_key() {
        let ctx = LookupContext::new(None, "", "", Category::Extract);
        let cands = candidates(&ctx, &[], "workers");
        assert_eq!(paths(&cands), vec!["extract.workers", "workers"]);
    }

    #[test]
    fn candidate_generation_is_deterministic() {
        let ctx = LookupContext::new(
            Some("p1".to_string()),
            "mod",
            "func",
            Category::Source,
        );
        let a = candidates(&ctx, &["credentials".to_string()], "token");
        let b = candidates(&ctx, &["credentials".to_string()], "token");
        assert_eq!(a, b);
    }
}
