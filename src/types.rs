//! Parsed taskfile document model.
//!
//! These types cover the minimum schema surface the resolver needs: the
//! schema version marker, variable bindings, the task map (only enough to
//! stamp provenance), and the include declarations that drive recursion.
//! Unknown fields are deliberately ignored; task-level validation belongs to
//! the execution engine, not the resolver.

use indexmap::IndexMap;
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;

/// A parsed taskfile.
#[derive(Debug, Clone, Deserialize)]
pub struct Taskfile {
    /// Schema version marker. Must be present or the document is rejected
    /// before any task or include is processed.
    #[serde(default, deserialize_with = "de_scalar_opt")]
    pub version: Option<String>,

    /// Top-level variable bindings, used when rendering include templates.
    #[serde(default)]
    pub vars: Vars,

    /// Named tasks. Null values are normalized to an empty task.
    #[serde(default)]
    pub tasks: Tasks,

    /// Include declarations, in document order.
    #[serde(default)]
    pub includes: Includes,

    /// Identity of the location this taskfile was loaded from. Stamped after
    /// parsing; never present in the document itself.
    #[serde(skip)]
    pub location: String,
}

/// A single task record.
///
/// Only the fields the resolver touches are modeled; everything else is
/// carried opaquely or ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    /// Human-readable description, surfaced by task listings.
    #[serde(default)]
    pub desc: Option<String>,

    /// Whether the task is hidden from listings.
    #[serde(default)]
    pub internal: bool,

    /// Command list, kept opaque for the execution engine.
    #[serde(default)]
    pub cmds: Vec<serde_yaml::Value>,

    /// Identity of the taskfile this task was defined in. Stamped after
    /// parsing unless an earlier merge step already set it.
    #[serde(skip)]
    pub taskfile: String,
}

/// The task map. Values may be null in the document (`mytask:`), which is
/// normalized to a default [`Task`].
#[derive(Debug, Clone, Default)]
pub struct Tasks(pub IndexMap<String, Task>);

impl<'de> Deserialize<'de> for Tasks {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: IndexMap<String, Option<Task>> = IndexMap::deserialize(deserializer)?;
        Ok(Tasks(
            raw.into_iter()
                .map(|(name, task)| (name, task.unwrap_or_default()))
                .collect(),
        ))
    }
}

/// An include declaration: a reference from one taskfile to another.
#[derive(Debug, Clone, Default)]
pub struct Include {
    /// Namespace label, taken from the includes map key.
    pub namespace: String,
    /// Target taskfile reference. May contain template expressions.
    pub taskfile: String,
    /// Base directory for the included tasks. May contain template
    /// expressions.
    pub dir: String,
    /// When set, a target that cannot be resolved is skipped instead of
    /// failing the run.
    pub optional: bool,
    /// When set, the included tasks are hidden from listings.
    pub internal: bool,
    /// When set, the included tasks are merged without a namespace prefix.
    pub flatten: bool,
    /// Alternative namespace labels.
    pub aliases: Vec<String>,
    /// Task names excluded from the include.
    pub excludes: Vec<String>,
    /// Variable bindings local to this include. May contain template
    /// expressions.
    pub vars: Vars,
}

/// Include declarations keyed by namespace, in document order.
#[derive(Debug, Clone, Default)]
pub struct Includes(pub IndexMap<String, Include>);

impl Includes {
    /// Iterate includes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Include> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Wire form of an include entry. The shorthand `ns: ./Taskfile.yml` is
/// equivalent to `ns: {taskfile: ./Taskfile.yml}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IncludeDef {
    Shorthand(String),
    Full(IncludeSpec),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IncludeSpec {
    taskfile: String,
    dir: String,
    optional: bool,
    internal: bool,
    flatten: bool,
    aliases: Vec<String>,
    excludes: Vec<String>,
    vars: Vars,
}

impl<'de> Deserialize<'de> for Includes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: IndexMap<String, IncludeDef> = IndexMap::deserialize(deserializer)?;
        let mut includes = IndexMap::with_capacity(raw.len());
        for (namespace, def) in raw {
            let include = match def {
                IncludeDef::Shorthand(taskfile) => Include {
                    namespace: namespace.clone(),
                    taskfile,
                    ..Include::default()
                },
                IncludeDef::Full(spec) => Include {
                    namespace: namespace.clone(),
                    taskfile: spec.taskfile,
                    dir: spec.dir,
                    optional: spec.optional,
                    internal: spec.internal,
                    flatten: spec.flatten,
                    aliases: spec.aliases,
                    excludes: spec.excludes,
                    vars: spec.vars,
                },
            };
            includes.insert(namespace, include);
        }
        Ok(Includes(includes))
    }
}

/// Ordered variable bindings. Scalar values are stringified on load; the
/// resolver only ever substitutes them into template expressions.
#[derive(Debug, Clone, Default)]
pub struct Vars(pub IndexMap<String, String>);

impl Vars {
    /// Capture the process environment as a variable set.
    pub fn environ() -> Self {
        Vars(std::env::vars().collect())
    }

    /// Merge `other` into `self`, with `other` taking precedence.
    pub fn merge(&mut self, other: &Vars) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<'de> Deserialize<'de> for Vars {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: IndexMap<String, serde_yaml::Value> = IndexMap::deserialize(deserializer)?;
        let mut vars = IndexMap::with_capacity(raw.len());
        for (name, value) in raw {
            let rendered = scalar_to_string(&value)
                .ok_or_else(|| D::Error::custom(format!("variable {name:?} is not a scalar")))?;
            vars.insert(name, rendered);
        }
        Ok(Vars(vars))
    }
}

/// Accept a scalar (string, number, or bool) where a string is expected.
/// Taskfiles commonly write `version: 3` as a bare number.
fn de_scalar_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a scalar value")),
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
