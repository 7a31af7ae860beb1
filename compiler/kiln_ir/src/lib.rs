//! Kiln IR - core and surface representations.
//!
//! This crate contains the data structures every pipeline stage shares:
//! - [`Name`]s for interned identifiers
//! - [`Id`]s correlating diagnostics and types with surface nodes
//! - the core [`Term`], [`Pattern`] and [`Item`] trees (de Bruijn levels)
//! - the [`surface`] tree the parser produces
//! - the [`DefTable`] of elaborated definitions
//!
//! # Design Philosophy
//!
//! - **Levels, not indices**: a variable's number is the depth of its
//!   binder, so terms never need shifting when moved under binders.
//! - **Closed enums**: every pass is an exhaustive `match`; generic
//!   recursion goes through [`Term::try_map_children`].

pub mod arith;
mod id;
mod interner;
mod item;
mod modifiers;
mod name;
mod pattern;
pub mod surface;
pub mod term;
mod traverse;

pub use id::{Id, IdGen, Lvl, MetaId};
pub use interner::StringInterner;
pub use item::{Def, DefTable, Item, Module, ModuleKind, Test};
pub use modifiers::{EffectSet, Modifiers};
pub use name::Name;
pub use pattern::Pattern;
pub use term::{Binder, FunType, Param, Term};
