//! Per-role system prompts: one YAML file under `prompts/*.yaml` per [`AgentRole`],
//! embedded at compile time and used unless `PROMPTS_DIR` (or an explicit directory)
//! overrides it. Canonical source of default prompt text is the embedded YAML, not a
//! Rust string constant, so the text can be edited without a rebuild of this module's
//! callers' expectations of what a "default" looks like.

use std::path::Path;

use serde::Deserialize;

use crate::state::AgentRole;

macro_rules! embed_role_prompt {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}

const EMBED_SUPERVISOR: &str = embed_role_prompt!("supervisor.yaml");
const EMBED_FEATURE_DEV: &str = embed_role_prompt!("feature_dev.yaml");
const EMBED_CODE_REVIEW: &str = embed_role_prompt!("code_review.yaml");
const EMBED_INFRASTRUCTURE: &str = embed_role_prompt!("infrastructure.yaml");
const EMBED_CICD: &str = embed_role_prompt!("cicd.yaml");
const EMBED_DOCUMENTATION: &str = embed_role_prompt!("documentation.yaml");

/// Error when loading role prompts from a directory.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompt file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
struct RolePromptFile {
    system_prompt: String,
}

fn role_file_name(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Supervisor => "supervisor.yaml",
        AgentRole::FeatureDev => "feature_dev.yaml",
        AgentRole::CodeReview => "code_review.yaml",
        AgentRole::Infrastructure => "infrastructure.yaml",
        AgentRole::Cicd => "cicd.yaml",
        AgentRole::Documentation => "documentation.yaml",
    }
}

fn embedded_default(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Supervisor => EMBED_SUPERVISOR,
        AgentRole::FeatureDev => EMBED_FEATURE_DEV,
        AgentRole::CodeReview => EMBED_CODE_REVIEW,
        AgentRole::Infrastructure => EMBED_INFRASTRUCTURE,
        AgentRole::Cicd => EMBED_CICD,
        AgentRole::Documentation => EMBED_DOCUMENTATION,
    }
}

/// Every role's resolved system prompt text.
#[derive(Debug, Clone, Default)]
pub struct RolePrompts {
    prompts: std::collections::HashMap<&'static str, String>,
}

impl RolePrompts {
    pub fn system_prompt(&self, role: AgentRole) -> &str {
        self.prompts
            .get(role.as_str())
            .map(|s| s.as_str())
            .unwrap_or_default()
    }
}

fn prompts_dir(dir: Option<&Path>) -> std::path::PathBuf {
    dir.map(std::path::PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from("prompts"))
    })
}

fn read_role_file(dir: &Path, name: &str) -> Result<Option<String>, LoadError> {
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };
    let file: RolePromptFile = serde_yaml::from_str(&content).map_err(|e| LoadError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(file.system_prompt))
}

/// Env var override per role, e.g. `SUPERVISOR_SYSTEM_PROMPT`.
fn env_override(role: AgentRole) -> Option<String> {
    let var = format!("{}_SYSTEM_PROMPT", role.as_str().to_uppercase().replace('-', "_"));
    std::env::var(var).ok()
}

const ALL_ROLES: [AgentRole; 6] = [
    AgentRole::Supervisor,
    AgentRole::FeatureDev,
    AgentRole::CodeReview,
    AgentRole::Infrastructure,
    AgentRole::Cicd,
    AgentRole::Documentation,
];

/// Loads role prompts from `dir` (or `PROMPTS_DIR`/`./prompts` if `None`), falling back to
/// the embedded default for any role whose file is missing, then applying env overrides.
pub fn load(dir: Option<&Path>) -> Result<RolePrompts, LoadError> {
    let base = prompts_dir(dir);
    if !base.exists() || !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }

    let mut prompts = std::collections::HashMap::new();
    for role in ALL_ROLES {
        let from_file = read_role_file(&base, role_file_name(role))?;
        let text = env_override(role)
            .or(from_file)
            .unwrap_or_else(|| default_text(role));
        prompts.insert(role.as_str(), text);
    }
    Ok(RolePrompts { prompts })
}

fn default_text(role: AgentRole) -> String {
    serde_yaml::from_str::<RolePromptFile>(embedded_default(role))
        .map(|f| f.system_prompt)
        .unwrap_or_default()
}

/// Resolves every role's prompt from the embedded YAML plus env overrides, without
/// touching the filesystem.
pub fn default_from_embedded() -> RolePrompts {
    let mut prompts = std::collections::HashMap::new();
    for role in ALL_ROLES {
        let text = env_override(role).unwrap_or_else(|| default_text(role));
        prompts.insert(role.as_str(), text);
    }
    RolePrompts { prompts }
}

/// Loads from `dir` if present, otherwise falls back to the embedded defaults.
pub fn load_or_default(dir: Option<&Path>) -> RolePrompts {
    load(dir).unwrap_or_else(|_| default_from_embedded())
}
