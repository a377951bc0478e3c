//! First-order mutant generation for JavaScript.
//!
//! Every mutant differs from the original program by exactly one change at
//! one syntax node: an operator swapped, a condition forced, a literal
//! emptied, a block or list cleared. Mutations are applied to the program
//! text as span patches and reverted with their inverse, so formatting
//! outside the mutated node is preserved.
//!
//! # Example
//!
//! ```
//! use js_mutation::{Mutator, MutantType};
//!
//! let mutants = Mutator::generate("let x = 1 + 2;", false).unwrap();
//! assert_eq!(mutants.len(), 1);
//! assert_eq!(mutants[0].mutant_type, MutantType::Arithmetic);
//! assert_eq!(mutants[0].mutated_program, "let x = 1 - 2;");
//! ```

pub mod catalog;
mod mutant;
mod mutator;
mod patch;

pub use mutant::{summarize, Mutant, MutantType};
pub use mutator::{MutationError, Mutator, MutatorOptions};
pub use patch::{Edit, Patch, PatchError};
