use std::path::Path;

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::Value;

use crate::config::EngineKind;
use crate::error::{GridError, Result};

const TEMPLATE_EXTENSION: &str = "hbs";

macro_rules! builtin {
    ($engine:expr, $dir:literal, $op:literal) => {
        (
            $engine,
            $op,
            include_str!(concat!("../../templates/", $dir, "/", $op, ".hbs")),
        )
    };
}

const BUILTIN: &[(EngineKind, &str, &str)] = &[
    builtin!(EngineKind::Slurm, "slurm", "squeue"),
    builtin!(EngineKind::Slurm, "slurm", "sbatch"),
    builtin!(EngineKind::Slurm, "slurm", "scancel"),
    builtin!(EngineKind::Slurm, "slurm", "sinfo"),
    builtin!(EngineKind::Slurm, "slurm", "scontrol_partition"),
    builtin!(EngineKind::Slurm, "slurm", "scontrol_show_node"),
    builtin!(EngineKind::Slurm, "slurm", "show_config"),
    builtin!(EngineKind::Slurm, "slurm", "ping"),
    builtin!(EngineKind::Slurm, "slurm", "sinfo_summary"),
    builtin!(EngineKind::Sge, "sge", "qstat"),
    builtin!(EngineKind::Sge, "sge", "qsub"),
    builtin!(EngineKind::Sge, "sge", "qdel"),
    builtin!(EngineKind::Sge, "sge", "qconf_list_queues"),
    builtin!(EngineKind::Sge, "sge", "qconf_show_queue"),
    builtin!(EngineKind::Sge, "sge", "qhost"),
    builtin!(EngineKind::Sge, "sge", "qping"),
];

fn key(engine: EngineKind, operation: &str) -> String {
    format!("{}/{}", engine, operation)
}

/// `{{join list ","}}`: renders an array with the given delimiter. A missing
/// or null value renders as nothing; a scalar renders as itself.
fn join_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let delimiter = h.param(1).and_then(|p| p.value().as_str()).unwrap_or(",");
    let rendered = match h.param(0).map(|p| p.value()) {
        None | Some(Value::Null) => String::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(delimiter),
        Some(other) => scalar_text(other),
    };
    out.write(&rendered)?;
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One command template per (engine, operation), read-only once built.
pub struct CommandTemplateStore {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for CommandTemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.registry.get_templates().keys().collect();
        names.sort();
        f.debug_struct("CommandTemplateStore")
            .field("templates", &names)
            .finish()
    }
}

impl Default for CommandTemplateStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl CommandTemplateStore {
    /// A store with no templates registered.
    pub fn empty() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("join", Box::new(join_helper));
        Self { registry }
    }

    /// The templates shipped with the crate for every engine.
    pub fn builtin() -> Result<Self> {
        let mut store = Self::empty();
        for (engine, operation, source) in BUILTIN {
            store.register(*engine, operation, source)?;
        }
        Ok(store)
    }

    /// Built-in templates, with any `<dir>/<engine>/<operation>.hbs` file replacing
    /// or adding to them.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut store = Self::builtin()?;
        for engine in [EngineKind::Slurm, EngineKind::Sge] {
            let engine_dir = dir.join(engine.as_str());
            if !engine_dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&engine_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                    continue;
                }
                let Some(operation) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let source = std::fs::read_to_string(&path)?;
                store.register(engine, operation, &source)?;
                tracing::info!(%engine, operation, path = %path.display(), "Loaded command template");
            }
        }
        Ok(store)
    }

    pub fn register(&mut self, engine: EngineKind, operation: &str, source: &str) -> Result<()> {
        let name = key(engine, operation);
        self.registry
            .register_template_string(&name, source)
            .map_err(|e| GridError::Template {
                name,
                reason: e.to_string(),
            })
    }

    pub fn contains(&self, engine: EngineKind, operation: &str) -> bool {
        self.registry.has_template(&key(engine, operation))
    }

    pub(crate) fn render(&self, engine: EngineKind, operation: &str, context: &Value) -> Result<String> {
        let name = key(engine, operation);
        if !self.registry.has_template(&name) {
            return Err(GridError::MissingTemplate {
                engine: engine.to_string(),
                operation: operation.to_string(),
            });
        }
        self.registry
            .render(&name, context)
            .map_err(|e| GridError::Template {
                name,
                reason: e.to_string(),
            })
    }
}
