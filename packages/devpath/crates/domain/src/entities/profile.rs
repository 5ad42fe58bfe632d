use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::system::path_list::normalize_path;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("{tool}: unknown placeholder '{{{placeholder}}}'")]
    UnknownPlaceholder { tool: String, placeholder: String },
    #[error("{tool}: unterminated placeholder in '{template}'")]
    Unterminated { tool: String, template: String },
    #[error("{tool}: '{path}' has no ancestor {depth} levels up")]
    AncestorOutOfRange {
        tool: String,
        depth: usize,
        path: String,
    },
}

/// Operator-selectable subset of a profile's variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub vars: Vec<String>,
}

/// Extra settings applied when the executable lives under a matching
/// directory, e.g. `make.exe` shipped by MSYS2 rather than MinGW.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub marker: String,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub path: Vec<String>,
}

/// Variable templates for one tool.
///
/// Templates understand these placeholders:
/// `{root}`, `{root:N}`, `{name:N}`, `{home}`, `{appdata}`,
/// `{localappdata}`, `{username}` and `{env:NAME}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProfile {
    pub tool: String,
    /// Levels above the executable where the tool root sits. 1 is the
    /// executable's own directory.
    #[serde(default = "default_root_depth")]
    pub root_depth: usize,
    #[serde(default)]
    pub home_var: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub groups: Vec<VarGroup>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

fn default_root_depth() -> usize {
    1
}

/// Everything a tool needs written to the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnvironment {
    pub variables: BTreeMap<String, String>,
    /// PATH entries in the order they should be appended. The executable's
    /// directory always comes first.
    pub path_entries: Vec<String>,
}

impl ToolEnvironment {
    /// What a tool without a profile gets: its directory on PATH.
    pub fn executable_only(executable: &str) -> Self {
        Self {
            variables: BTreeMap::new(),
            path_entries: ancestor(executable, 1)
                .map(|dir| vec![dir.to_string()])
                .unwrap_or_default(),
        }
    }

    fn push_path(&mut self, entry: String) {
        let normalized = normalize_path(&entry);
        if normalized.is_empty() {
            return;
        }
        if self
            .path_entries
            .iter()
            .any(|existing| normalize_path(existing) == normalized)
        {
            return;
        }
        self.path_entries.push(entry);
    }
}

struct TemplateContext<'a> {
    tool: &'a str,
    executable: &'a str,
    root_depth: usize,
    env: &'a dyn Fn(&str) -> Option<String>,
}

impl ToolProfile {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            root_depth: default_root_depth(),
            home_var: None,
            vars: BTreeMap::new(),
            path: Vec::new(),
            groups: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// First variant whose marker appears in the executable's directory.
    pub fn active_variant(&self, executable: &str) -> Option<&Variant> {
        let dir = ancestor(executable, 1).unwrap_or(executable).to_lowercase();
        self.variants
            .iter()
            .find(|v| !v.marker.is_empty() && dir.contains(&v.marker.to_lowercase()))
    }

    /// Names of every variable the selected groups cover. `None` when no
    /// selection was made.
    fn selected_names(&self, groups: Option<&[String]>) -> Option<BTreeSet<String>> {
        let groups = groups?;
        Some(
            self.groups
                .iter()
                .filter(|g| groups.iter().any(|s| s.eq_ignore_ascii_case(&g.name)))
                .flat_map(|g| g.vars.iter().map(|v| v.to_uppercase()))
                .collect(),
        )
    }

    pub fn derive_variables(
        &self,
        executable: &str,
        env: &dyn Fn(&str) -> Option<String>,
        groups: Option<&[String]>,
    ) -> Result<BTreeMap<String, String>, TemplateError> {
        let ctx = self.context(executable, env);
        let selected = self.selected_names(groups);
        let keep = |name: &str| match &selected {
            Some(names) => names.contains(&name.to_uppercase()),
            None => true,
        };

        let mut out = BTreeMap::new();
        for (name, template) in &self.vars {
            if keep(name) {
                out.insert(name.clone(), render(template, &ctx)?);
            }
        }
        if let Some(variant) = self.active_variant(executable) {
            for (name, template) in &variant.vars {
                if keep(name) {
                    out.insert(name.clone(), render(template, &ctx)?);
                }
            }
        }
        Ok(out)
    }

    pub fn derive_environment(
        &self,
        executable: &str,
        env: &dyn Fn(&str) -> Option<String>,
        groups: Option<&[String]>,
    ) -> Result<ToolEnvironment, TemplateError> {
        let ctx = self.context(executable, env);
        let mut environment = ToolEnvironment::executable_only(executable);
        environment.variables = self.derive_variables(executable, env, groups)?;

        for template in &self.path {
            environment.push_path(render(template, &ctx)?);
        }
        if let Some(variant) = self.active_variant(executable) {
            for template in &variant.path {
                environment.push_path(render(template, &ctx)?);
            }
        }
        Ok(environment)
    }

    fn context<'a>(
        &'a self,
        executable: &'a str,
        env: &'a dyn Fn(&str) -> Option<String>,
    ) -> TemplateContext<'a> {
        TemplateContext {
            tool: &self.tool,
            executable,
            root_depth: self.root_depth,
            env,
        }
    }
}

fn render(template: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| TemplateError::Unterminated {
            tool: ctx.tool.to_string(),
            template: template.to_string(),
        })?;
        out.push_str(&resolve(&after[..end], ctx)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve(token: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let env = |name: &str| (ctx.env)(name).unwrap_or_default();
    let unknown = || TemplateError::UnknownPlaceholder {
        tool: ctx.tool.to_string(),
        placeholder: token.to_string(),
    };

    let (key, arg) = match token.split_once(':') {
        Some((key, arg)) => (key, Some(arg)),
        None => (token, None),
    };

    match (key, arg) {
        ("root", None) => ancestor_of(ctx, ctx.root_depth).map(str::to_string),
        ("root", Some(depth)) => {
            let depth = depth.parse().map_err(|_| unknown())?;
            ancestor_of(ctx, depth).map(str::to_string)
        }
        ("name", Some(depth)) => {
            let depth = depth.parse().map_err(|_| unknown())?;
            ancestor_of(ctx, depth).map(|p| file_name(p).to_string())
        }
        ("home", None) => Ok(env("USERPROFILE")),
        ("appdata", None) => Ok(env("APPDATA")),
        ("localappdata", None) => Ok(env("LOCALAPPDATA")),
        ("username", None) => Ok(env("USERNAME")),
        ("env", Some(name)) if !name.is_empty() => Ok(env(name)),
        _ => Err(unknown()),
    }
}

fn ancestor_of<'a>(ctx: &TemplateContext<'a>, depth: usize) -> Result<&'a str, TemplateError> {
    ancestor(ctx.executable, depth).ok_or_else(|| TemplateError::AncestorOutOfRange {
        tool: ctx.tool.to_string(),
        depth,
        path: ctx.executable.to_string(),
    })
}

/// Walks `levels` directories up from `path`, accepting both `\` and `/`.
/// A drive root keeps its separator (`C:\`).
pub fn ancestor(path: &str, levels: usize) -> Option<&str> {
    let mut current = path;
    for _ in 0..levels {
        let trimmed = current.trim_end_matches(['\\', '/']);
        let idx = trimmed.rfind(['\\', '/'])?;
        let parent = &trimmed[..idx];
        current = if parent.is_empty() || parent.ends_with(':') {
            &trimmed[..=idx]
        } else {
            parent
        };
    }
    Some(current)
}

fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['\\', '/']);
    match trimmed.rfind(['\\', '/']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
