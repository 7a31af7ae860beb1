//! The per-unit pipeline and parallel compilation.
//!
//! ```text
//! SItem ──► elaborate ──► zonk ──► stage ──► defunctionalize ──┐
//! SItem ──► ...                                                 ├──► pack ──► Program
//! SItem ──► ...                                                ─┘
//! ```
//!
//! Units are independent: each gets its own normalizer and reads the
//! shared definition table, so [`Session::compile_units`] runs them on a
//! rayon pool. Only the closure tag counter is shared between them.

use std::sync::Arc;

use kiln_defun::{DefunError, Defunctionalized, Defunctionalizer, FunctionTable, TagCounter};
use kiln_diagnostic::{Diagnostic, ErrorCode};
use kiln_elab::{elaborate_item, zonk_item, zonk_types, Elaborated, TypeTable};
use kiln_ir::surface::SItem;
use kiln_ir::{DefTable, Item, Name};
use kiln_nbe::{Builtins, Normalizer};
use kiln_pack::machine::{Machine, MachineError};
use kiln_pack::{pack_program, LoweringTable, PackError, Program, UnitName};
use kiln_stage::{stage_item, StageError};
use rayon::prelude::*;

use crate::CompileOptions;

/// Stack size of compilation worker threads. Recursive passes grow the
/// stack on demand; a large initial stack makes that rare.
const WORKER_STACK: usize = 32 * 1024 * 1024;

/// Why a unit did not reach the packer, or why packing failed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Recoverable diagnostics from elaboration, sorted.
    #[error("elaboration reported {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),
    #[error("{} metavariable(s) left unsolved", .0.len())]
    Unsolved(Vec<Diagnostic>),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Defun(#[from] DefunError),
    #[error(transparent)]
    Pack(#[from] PackError),
}

impl PipelineError {
    /// Codes of everything reported, in report order.
    pub fn codes(&self) -> Vec<ErrorCode> {
        match self {
            PipelineError::Diagnostics(diagnostics) | PipelineError::Unsolved(diagnostics) => {
                diagnostics.iter().map(Diagnostic::code).collect()
            }
            PipelineError::Stage(err) => vec![err.code()],
            PipelineError::Defun(err) => vec![err.code()],
            PipelineError::Pack(err) => vec![err.code()],
        }
    }
}

/// One unit after the pipeline.
#[derive(Clone, Debug)]
pub struct CompiledUnit {
    /// The core item: zonked when zonking succeeded, as elaborated
    /// otherwise.
    pub item: Item,
    /// Type of every visited surface node.
    pub types: TypeTable,
    pub output: Result<Defunctionalized, PipelineError>,
}

impl CompiledUnit {
    pub fn error(&self) -> Option<&PipelineError> {
        self.output.as_ref().err()
    }
}

/// Every unit of one [`Session::compile_units`] call, in input order.
#[derive(Clone, Debug)]
pub struct Compilation {
    pub units: Vec<CompiledUnit>,
    /// Closure tags issued across all units.
    pub closures: i32,
}

impl Compilation {
    pub fn errors(&self) -> impl Iterator<Item = &PipelineError> {
        self.units.iter().filter_map(CompiledUnit::error)
    }
}

/// Shared inputs of a compilation: definitions from earlier units, the
/// builtin tables and the options.
pub struct Session {
    defs: Arc<DefTable>,
    builtins: Arc<Builtins>,
    lowering: LoweringTable,
    options: CompileOptions,
}

impl Session {
    /// A session with the default builtin tables.
    pub fn new(defs: DefTable, options: CompileOptions) -> Self {
        Session {
            defs: Arc::new(defs),
            builtins: Arc::new(Builtins::default()),
            lowering: LoweringTable::default(),
            options,
        }
    }

    #[must_use]
    pub fn with_tables(mut self, builtins: Builtins, lowering: LoweringTable) -> Self {
        self.builtins = Arc::new(builtins);
        self.lowering = lowering;
        self
    }

    pub fn defs(&self) -> &DefTable {
        &self.defs
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Make the definitions of a compiled unit visible to units compiled
    /// after this call.
    pub fn define(&mut self, unit: &CompiledUnit) {
        Arc::make_mut(&mut self.defs).insert_item(&unit.item);
    }

    /// Run one unit through the pipeline.
    ///
    /// Stops after elaboration when there are diagnostics, and after
    /// zonking when metavariables are left unsolved; the item and type
    /// table are returned either way.
    #[tracing::instrument(level = "debug", skip_all, fields(unit = %surface_name(item)))]
    pub fn compile_unit(&self, item: &SItem, tags: &TagCounter) -> CompiledUnit {
        let Elaborated {
            item: core,
            mut types,
            diagnostics,
            norm,
        } = elaborate_item(Arc::clone(&self.defs), Arc::clone(&self.builtins), item);
        zonk_types(&norm, &mut types);

        if !diagnostics.is_empty() {
            tracing::debug!(count = diagnostics.len(), "stopping after elaboration");
            return CompiledUnit {
                item: core,
                types,
                output: Err(PipelineError::Diagnostics(diagnostics.sorted())),
            };
        }
        let zonked = match zonk_item(&norm, core.clone()) {
            Ok(zonked) => zonked,
            Err(unsolved) => {
                return CompiledUnit {
                    item: core,
                    types,
                    output: Err(PipelineError::Unsolved(unsolved)),
                }
            }
        };
        let output = self.lower_unit(&norm, zonked.clone(), tags);
        CompiledUnit {
            item: zonked,
            types,
            output,
        }
    }

    fn lower_unit(
        &self,
        norm: &Normalizer,
        item: Item,
        tags: &TagCounter,
    ) -> Result<Defunctionalized, PipelineError> {
        let staged = stage_item(norm, item)?;
        let defun = Defunctionalizer::new(Arc::clone(&self.defs), tags).defunctionalize_item(staged)?;
        Ok(defun)
    }

    /// Compile independent units in parallel. Results come back in input
    /// order; closure tags are unique across the whole call.
    #[tracing::instrument(level = "debug", skip_all, fields(units = items.len()))]
    pub fn compile_units(&self, items: &[SItem]) -> Compilation {
        let tags = TagCounter::new();
        let units = rayon::ThreadPoolBuilder::new()
            .stack_size(WORKER_STACK)
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    items
                        .par_iter()
                        .map(|item| self.compile_unit(item, &tags))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), compiling sequentially");
                items
                    .iter()
                    .map(|item| self.compile_unit(item, &tags))
                    .collect()
            });
        Compilation {
            units,
            closures: tags.issued(),
        }
    }

    /// Pack every unit of `compilation` into one program. Fails with the
    /// first unit error, in input order.
    pub fn link(&self, compilation: &Compilation) -> Result<Program, PipelineError> {
        let mut items = Vec::with_capacity(compilation.units.len());
        let mut table = FunctionTable::new();
        for unit in &compilation.units {
            let defun = unit.output.as_ref().map_err(Clone::clone)?;
            items.push(defun.item.clone());
            table.merge(defun.table.clone());
        }
        let program = pack_program(
            &items,
            &table,
            &self.defs,
            &self.lowering,
            &self.options.pack_options(),
        )?;
        Ok(program)
    }

    /// [`Session::compile_units`] followed by [`Session::link`].
    pub fn compile_program(&self, items: &[SItem]) -> Result<Program, PipelineError> {
        self.link(&self.compile_units(items))
    }

    /// Execute `unit` of `program` on the reference machine within the
    /// step budget.
    pub fn run<'p>(&self, program: &'p Program, unit: &UnitName) -> Result<Machine<'p>, MachineError> {
        let mut machine = Machine::new(program).with_budget(self.options.budget);
        let result = machine.run(unit);
        if self.options.trace {
            for entered in machine.trace() {
                tracing::info!(unit = %entered, "entered");
            }
        }
        tracing::debug!(steps = machine.steps(), "run finished");
        result.map(|()| machine)
    }
}

fn surface_name(item: &SItem) -> Name {
    match item {
        SItem::Def(def) => def.name,
        SItem::Mod(module) => module.name,
        SItem::Test(test) => test.name,
    }
}
