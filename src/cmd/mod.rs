//! Command compilation and execution.
//!
//! Every scheduler call goes through the same one-way pipeline:
//!
//! 1. [`CommandCompiler::compile`] renders the `(engine, operation)` template
//!    with a [`CommandContext`]
//! 2. [`tokenize`] splits the rendered text into an argument vector
//! 3. [`Execute::execute`] runs that vector as a process and captures a
//!    [`CommandResult`]
//!
//! The parsers in [`crate::parser`] then turn the result into entities.
//!
//! # Safety Note
//!
//! The executor never starts a shell. Quote characters that survive
//! tokenization are handed to the scheduler binary verbatim.

pub mod args;
pub mod compiler;
pub mod executor;
pub mod templates;

pub use args::{enclose_in_quotes, escape, escape_env, escape_quotes, quote, single_arg, tokenize};
pub use compiler::{CommandCompiler, CommandContext};
pub use executor::{CommandExecutor, CommandResult, Execute};
pub use templates::CommandTemplateStore;
