//! Listing, choosing and activating contexts.

use std::fmt;

use dialoguer::{theme::ColorfulTheme, Select};
use log::debug;

use crate::access::ConfigStore;
use crate::clean::{self, KubeConfig};
use crate::error::SwitchError;

pub const PICK_PROMPT: &str = "Change Kubernetes context:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    /// Never prompts, and never switches without an explicit name.
    Batch,
}

impl Mode {
    pub fn from_batch(batch: bool) -> Self {
        if batch {
            Mode::Batch
        } else {
            Mode::Interactive
        }
    }
}

/// Rejects flag combinations that can't work together. Runs before any I/O.
pub fn check_flags(mode: Mode, shell: bool) -> Result<(), SwitchError> {
    if shell && mode == Mode::Batch {
        return Err(SwitchError::IncompatibleFlags);
    }
    Ok(())
}

/// Names of the usable contexts containing `filter`, sorted.
///
/// Fails only when the config has no contexts at all; a filter that matches
/// nothing gives an empty list.
pub fn filtered_context_names(
    config: &KubeConfig,
    filter: &str,
) -> Result<Vec<String>, SwitchError> {
    if config.contexts.is_empty() {
        return Err(SwitchError::NoContextsAvailable);
    }

    // BTreeMap keys are already unique and ordered.
    Ok(config
        .contexts
        .iter()
        .filter(|(name, ctx)| !name.is_empty() && ctx.is_some())
        .filter(|(name, _)| filter.is_empty() || name.contains(filter))
        .map(|(name, _)| name.clone())
        .collect())
}

/// Asks the operator to choose one of `names`.
pub trait Picker {
    fn pick(&self, names: &[String], message: &str, default: &str) -> Result<String, SwitchError>;
}

/// Single choice menu on the terminal.
#[derive(Debug, Default)]
pub struct DialoguerPicker;

impl Picker for DialoguerPicker {
    fn pick(&self, names: &[String], message: &str, default: &str) -> Result<String, SwitchError> {
        let theme = ColorfulTheme::default();
        let mut select = Select::with_theme(&theme).with_prompt(message).items(names);
        if let Some(idx) = names.iter().position(|name| name == default) {
            select = select.default(idx);
        }
        let idx = select.interact().map_err(SwitchError::PromptError)?;
        Ok(names[idx].clone())
    }
}

/// Decides which context to switch to. An empty result means "don't switch".
pub fn select_context(
    names: &[String],
    explicit: Option<&str>,
    mode: Mode,
    default: &str,
    picker: &dyn Picker,
) -> Result<String, SwitchError> {
    if let Some(name) = explicit {
        if !names.iter().any(|n| n == name) {
            return Err(SwitchError::InvalidArgument {
                value: name.to_string(),
                valid: names.to_vec(),
            });
        }
        return Ok(name.to_string());
    }

    if mode == Mode::Batch {
        return Ok(String::new());
    }

    match names {
        [] => Ok(String::new()),
        [only] => Ok(only.clone()),
        _ => picker.pick(names, PICK_PROMPT, default),
    }
}

/// What ended up active after [`apply_context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub namespace: String,
    pub context: String,
    pub server: String,
    pub switched: bool,
}

impl Report {
    /// Renders the summary line, passing each value through `highlight`.
    pub fn render(&self, highlight: impl Fn(&str) -> String) -> String {
        let lead = if self.switched { "Now using" } else { "Using" };
        format!(
            "{} namespace '{}' from context named '{}' on server '{}'.",
            lead,
            highlight(&self.namespace),
            highlight(&self.context),
            highlight(&self.server)
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(str::to_string))
    }
}

/// Makes `chosen` the current context and reports the result.
///
/// An empty name, or the context that is already current, only reports and
/// writes nothing. Otherwise the switched copy of `config` is persisted
/// through `store`; `config` itself is never modified.
pub fn apply_context(
    config: &KubeConfig,
    store: &impl ConfigStore,
    chosen: &str,
) -> Result<Report, SwitchError> {
    if chosen.is_empty() || chosen == config.current_context {
        return Ok(Report {
            namespace: config.current_namespace().to_string(),
            context: config.current_context.clone(),
            server: config.current_server().to_string(),
            switched: false,
        });
    }

    let ctx = config
        .context(chosen)
        .ok_or_else(|| SwitchError::ContextNotFound(chosen.to_string()))?;

    let updated = config.with_current_context(chosen);
    store.persist(config, &updated)?;
    debug!(
        "Switched current context from '{}' to '{}'",
        config.current_context, chosen
    );

    Ok(Report {
        namespace: clean::namespace(ctx).to_string(),
        context: updated.current_context,
        server: config.server(ctx).to_string(),
        switched: true,
    })
}
