//! Progressive tool loader: picks a bounded, ranked subset of a tool catalog for one
//! LLM call, so a role is never handed its entire toolset at once.
//!
//! [`select_tools`] is a plain function of a [`ToolCatalog`] plus a [`Strategy`]; it
//! does not itself call [`crate::tool_source::ToolSource`] — the caller is expected to
//! have already fetched `list_tools()` and built the catalog from it plus whatever
//! `agent_profiles`/`tags` metadata the catalog source attaches.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

/// One entry in the tool catalog the loader selects from.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub server: String,
    pub description: Option<String>,
    pub input_schema: Value,
    pub tags: Vec<String>,
    pub agent_profiles: HashSet<String>,
}

/// The full set of tools a loader call selects from.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    pub tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }
}

/// Named selection policy; see module docs for the size/ranking contract of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Minimal,
    AgentProfile,
    Progressive,
    Full,
}

/// Tunables for one loader call.
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    pub max_tools_per_request: usize,
    pub minimal_cap: usize,
    pub agent_profile_cap: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_tools_per_request: 30,
            minimal_cap: 15,
            agent_profile_cap: 40,
        }
    }
}

/// A tool selected for this request, with its schema already converted to a
/// function-calling-safe form.
#[derive(Debug, Clone)]
pub struct SelectedTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Emitted when a tool was dropped because no safe schema translation exists.
#[derive(Debug, Clone)]
pub struct ToolLoadWarning {
    pub tool: String,
    pub reason: String,
}

/// Request-shaped inputs the loader ranks against.
pub struct SelectionRequest<'a> {
    pub role: &'a str,
    pub message: &'a str,
    pub subtask_description: Option<&'a str>,
    /// Per-tool prior-use counts within this workflow; missing entries count as 0.
    pub prior_use: &'a HashMap<String, u32>,
}

fn extract_keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

fn matches_tags(tool: &ToolDescriptor, keywords: &HashSet<String>) -> bool {
    tool.tags
        .iter()
        .any(|tag| keywords.contains(&tag.to_lowercase()))
}

fn matches_role(tool: &ToolDescriptor, role: &str) -> bool {
    tool.agent_profiles.contains(role)
}

/// Sort key: higher is better. Exact-tag match, then role-profile match, then
/// prior-use frequency, then reverse-alphabetical (so `sort_by_key` + `.rev()` on
/// name via `Reverse` yields alphabetical order as the final tiebreak).
fn rank_key(
    tool: &ToolDescriptor,
    keywords: &HashSet<String>,
    role: &str,
    prior_use: &HashMap<String, u32>,
) -> (bool, bool, u32, std::cmp::Reverse<String>) {
    (
        matches_tags(tool, keywords),
        matches_role(tool, role),
        *prior_use.get(&tool.name).unwrap_or(&0),
        std::cmp::Reverse(tool.name.clone()),
    )
}

fn sorted_by_rank<'a>(
    tools: &[&'a ToolDescriptor],
    keywords: &HashSet<String>,
    role: &str,
    prior_use: &HashMap<String, u32>,
) -> Vec<&'a ToolDescriptor> {
    let mut ranked: Vec<&ToolDescriptor> = tools.to_vec();
    ranked.sort_by(|a, b| {
        rank_key(b, keywords, role, prior_use).cmp(&rank_key(a, keywords, role, prior_use))
    });
    ranked
}

fn dedup_by_name<'a>(tools: Vec<&'a ToolDescriptor>) -> Vec<&'a ToolDescriptor> {
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .filter(|t| seen.insert(t.name.clone()))
        .collect()
}

fn candidates<'a>(catalog: &'a ToolCatalog, strategy: Strategy, request: &SelectionRequest, config: &LoaderConfig) -> Vec<&'a ToolDescriptor> {
    let keywords = extract_keywords(&format!(
        "{} {}",
        request.message,
        request.subtask_description.unwrap_or("")
    ));

    match strategy {
        Strategy::Minimal => {
            let matched: Vec<&ToolDescriptor> = catalog
                .tools
                .iter()
                .filter(|t| matches_tags(t, &keywords))
                .collect();
            let ranked = sorted_by_rank(&matched, &keywords, request.role, request.prior_use);
            dedup_by_name(ranked).into_iter().take(config.minimal_cap).collect()
        }
        Strategy::AgentProfile => {
            let matched: Vec<&ToolDescriptor> = catalog
                .tools
                .iter()
                .filter(|t| matches_role(t, request.role))
                .collect();
            let ranked = sorted_by_rank(&matched, &keywords, request.role, request.prior_use);
            ranked.into_iter().take(config.agent_profile_cap).collect()
        }
        Strategy::Progressive => {
            let minimal = candidates(catalog, Strategy::Minimal, request, config);
            let agent_profile = candidates(catalog, Strategy::AgentProfile, request, config);
            let union: Vec<&ToolDescriptor> =
                dedup_by_name(minimal.into_iter().chain(agent_profile).collect());
            sorted_by_rank(&union, &keywords, request.role, request.prior_use)
        }
        Strategy::Full => {
            let all: Vec<&ToolDescriptor> = catalog.tools.iter().collect();
            sorted_by_rank(&all, &keywords, request.role, request.prior_use)
        }
    }
}

/// Converts a JSON Schema input schema into a function-calling-safe form.
///
/// `oneOf`/`anyOf`/`allOf` unions aren't supported by every provider's function-
/// calling format; when present the schema is flattened to a permissive
/// `{"type": "object"}` with the union's shape folded into the description instead
/// of the schema itself, and a warning is returned.
fn convert_schema(tool: &ToolDescriptor) -> (Value, Option<ToolLoadWarning>) {
    let has_union = tool
        .input_schema
        .get("oneOf")
        .or_else(|| tool.input_schema.get("anyOf"))
        .or_else(|| tool.input_schema.get("allOf"))
        .is_some();

    if !has_union {
        return (tool.input_schema.clone(), None);
    }

    let flattened = serde_json::json!({
        "type": "object",
        "additionalProperties": true,
        "description": "schema simplified from a union type; see tool description for exact shape",
    });
    let warning = ToolLoadWarning {
        tool: tool.name.clone(),
        reason: "input schema used oneOf/anyOf/allOf, flattened to a permissive object".to_string(),
    };
    (flattened, Some(warning))
}

/// Selects and schema-converts tools per `strategy`, capped at
/// `config.max_tools_per_request`. Returns the selected tools in rank order plus any
/// warnings raised while converting schemas.
pub fn select_tools(
    catalog: &ToolCatalog,
    strategy: Strategy,
    request: &SelectionRequest,
    config: &LoaderConfig,
) -> (Vec<SelectedTool>, Vec<ToolLoadWarning>) {
    let picked = candidates(catalog, strategy, request, config);

    let mut selected = Vec::new();
    let mut warnings = Vec::new();
    for tool in picked.into_iter().take(config.max_tools_per_request) {
        let (input_schema, warning) = convert_schema(tool);
        if let Some(w) = warning {
            warnings.push(w);
        }
        selected.push(SelectedTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema,
        });
    }
    (selected, warnings)
}

/// Optional name → canonical-identifier lookup for well-known libraries, to avoid a
/// repeated LLM call resolving the same library reference within a workflow.
#[derive(Debug, Clone, Default)]
pub struct LibraryIdentifierCache {
    entries: HashMap<String, String>,
}

impl LibraryIdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, canonical_id: impl Into<String>) {
        self.entries.insert(name.into(), canonical_id.into());
    }

    /// Returns the canonical id and whether this was a cache hit.
    pub fn lookup(&self, name: &str) -> (Option<&str>, bool) {
        match self.entries.get(name) {
            Some(id) => (Some(id.as_str()), true),
            None => (None, false),
        }
    }
}
