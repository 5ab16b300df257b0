use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cmd::args::tokenize;
use crate::cmd::templates::CommandTemplateStore;
use crate::config::EngineKind;
use crate::error::{GridError, Result};

/// Named values rendered into one template instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandContext {
    values: Map<String, Value>,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert any serializable value (request objects, nested options).
    pub fn set_serialized<T: Serialize>(&mut self, name: &str, value: &T) -> Result<&mut Self> {
        let value = serde_json::to_value(value).map_err(|e| GridError::Template {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn as_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// Renders templates and splits the result into an argument vector.
///
/// No argument semantics are checked here; callers validate requests first.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    templates: Arc<CommandTemplateStore>,
}

impl CommandCompiler {
    pub fn new(templates: CommandTemplateStore) -> Self {
        Self {
            templates: Arc::new(templates),
        }
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self::new(CommandTemplateStore::builtin()?))
    }

    pub fn templates(&self) -> &CommandTemplateStore {
        &self.templates
    }

    pub fn compile(
        &self,
        engine: EngineKind,
        operation: &str,
        context: &CommandContext,
    ) -> Result<Vec<String>> {
        let rendered = self
            .templates
            .render(engine, operation, &context.as_value())?;
        let argv = tokenize(&rendered);
        if argv.is_empty() {
            return Err(GridError::Template {
                name: format!("{}/{}", engine, operation),
                reason: "template rendered an empty command".to_string(),
            });
        }
        tracing::debug!(%engine, operation, argv = ?argv, "Compiled command");
        Ok(argv)
    }
}
