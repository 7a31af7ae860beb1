//! Kiln compiler driver.
//!
//! Wires the stages together:
//!
//! - [`CompileOptions`]: namespace, storage, dispatch strategy, machine
//!   budget and tracing, from defaults, the environment or arguments
//! - [`Session`]: the shared definition table and builtin tables; compiles
//!   one unit ([`Session::compile_unit`]) or many in parallel
//!   ([`Session::compile_units`]) and packs them ([`Session::link`])
//! - [`prelude`]: signatures of the builtin definitions
//! - [`init_tracing`]: log output for debugging the compiler itself

mod options;
mod pipeline;
mod prelude;

use std::sync::Once;

pub use options::CompileOptions;
pub use pipeline::{CompiledUnit, Compilation, PipelineError, Session};
pub use prelude::prelude;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Does nothing unless `RUST_LOG` is set (`RUST_LOG=kiln_elab=debug`,
/// `RUST_LOG=kiln_pack=trace`). With `KILN_LOG_TREE` also set, spans are
/// printed as an indented tree. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let installed = if std::env::var_os("KILN_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init()
        };
        if let Err(e) = installed {
            tracing::warn!("tracing already initialized ({e})");
        }
    });
}
