//! Compile options.
//!
//! Built from defaults, from `KILN_*` environment variables, or from
//! `--key=value` arguments. An unrecognized value is logged and the default
//! kept.

use kiln_pack::machine::DEFAULT_BUDGET;
use kiln_pack::{DispatchStrategy, PackOptions};

/// Configuration for one compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Namespace of every emitted unit.
    pub namespace: String,
    /// Storage holding the runtime stacks.
    pub storage: String,
    pub dispatch: DispatchStrategy,
    /// Steps the reference machine may take before giving up.
    pub budget: u64,
    /// Log every unit the reference machine enters.
    pub trace: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        let pack = PackOptions::default();
        CompileOptions {
            namespace: pack.namespace,
            storage: pack.storage,
            dispatch: pack.dispatch,
            budget: DEFAULT_BUDGET,
            trace: false,
        }
    }
}

impl CompileOptions {
    /// Defaults overridden by `KILN_NAMESPACE`, `KILN_STORAGE`,
    /// `KILN_DISPATCH`, `KILN_BUDGET` and `KILN_TRACE`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`CompileOptions::from_env`], reading variables through `var`.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = CompileOptions::default();
        if let Some(namespace) = var("KILN_NAMESPACE") {
            options.namespace = namespace;
        }
        if let Some(storage) = var("KILN_STORAGE") {
            options.storage = storage;
        }
        if let Some(dispatch) = var("KILN_DISPATCH") {
            options.set_dispatch(&dispatch);
        }
        if let Some(budget) = var("KILN_BUDGET") {
            options.set_budget(&budget);
        }
        if let Some(trace) = var("KILN_TRACE") {
            options.trace = !matches!(trace.as_str(), "" | "0" | "false");
        }
        options
    }

    /// Defaults overridden by `--namespace=`, `--storage=`, `--dispatch=`,
    /// `--budget=` and `--trace`.
    pub fn parse_args(args: &[String]) -> Self {
        let mut options = CompileOptions::default();
        for arg in args {
            if let Some(namespace) = arg.strip_prefix("--namespace=") {
                options.namespace = namespace.to_owned();
            } else if let Some(storage) = arg.strip_prefix("--storage=") {
                options.storage = storage.to_owned();
            } else if let Some(dispatch) = arg.strip_prefix("--dispatch=") {
                options.set_dispatch(dispatch);
            } else if let Some(budget) = arg.strip_prefix("--budget=") {
                options.set_budget(budget);
            } else if arg == "--trace" {
                options.trace = true;
            } else {
                tracing::warn!(%arg, "unknown option ignored");
            }
        }
        options
    }

    fn set_dispatch(&mut self, value: &str) {
        match value {
            "linear" => self.dispatch = DispatchStrategy::Linear,
            "binary" => self.dispatch = DispatchStrategy::Binary,
            _ => tracing::warn!(value, "unknown dispatch strategy, options: linear, binary"),
        }
    }

    fn set_budget(&mut self, value: &str) {
        match value.parse() {
            Ok(budget) => self.budget = budget,
            Err(_) => tracing::warn!(value, "step budget is not a number"),
        }
    }

    /// The part of these options the packer reads.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            namespace: self.namespace.clone(),
            storage: self.storage.clone(),
            dispatch: self.dispatch,
        }
    }
}

#[cfg(test)]
mod tests;
