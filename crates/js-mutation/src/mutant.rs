//! Mutant records.

use serde::{Deserialize, Serialize};
use source_range::Range;
use std::collections::BTreeMap;
use std::fmt;

/// Category of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MutantType {
    /// A non-empty array literal or `new` argument list cleared.
    ArrayDecl,

    /// A compound assignment operator replaced.
    AssignExpr,

    /// An arithmetic operator replaced (for example `+` ↔ `-`).
    Arithmetic,

    /// A relational or equality operator replaced (for example `>` → `>=`).
    EqualityOp,

    /// A non-empty block cleared.
    BlockStmt,

    /// Every `?.` of an optional chain made non-optional.
    OptionalChain,

    /// A branch or loop condition forced or negated.
    Cond,

    /// A boolean literal negated.
    BooleanLiteral,

    /// A string, regex, bigint or template literal emptied or filled.
    StringLiteral,

    /// A logical operator replaced (for example `&&` → `||`).
    LogicalOp,

    /// A non-empty object literal cleared.
    ObjectLiteral,

    /// A unary `+` or `-` flipped.
    UnaryOp,

    /// An update expression toggled between prefix and postfix or between
    /// `++` and `--`.
    Update,
}

impl MutantType {
    /// All categories, in declaration order.
    pub const ALL: [MutantType; 13] = [
        MutantType::ArrayDecl,
        MutantType::AssignExpr,
        MutantType::Arithmetic,
        MutantType::EqualityOp,
        MutantType::BlockStmt,
        MutantType::OptionalChain,
        MutantType::Cond,
        MutantType::BooleanLiteral,
        MutantType::StringLiteral,
        MutantType::LogicalOp,
        MutantType::ObjectLiteral,
        MutantType::UnaryOp,
        MutantType::Update,
    ];

    /// Returns the name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutantType::ArrayDecl => "ArrayDecl",
            MutantType::AssignExpr => "AssignExpr",
            MutantType::Arithmetic => "Arithmetic",
            MutantType::EqualityOp => "EqualityOp",
            MutantType::BlockStmt => "BlockStmt",
            MutantType::OptionalChain => "OptionalChain",
            MutantType::Cond => "Cond",
            MutantType::BooleanLiteral => "BooleanLiteral",
            MutantType::StringLiteral => "StringLiteral",
            MutantType::LogicalOp => "LogicalOp",
            MutantType::ObjectLiteral => "ObjectLiteral",
            MutantType::UnaryOp => "UnaryOp",
            MutantType::Update => "Update",
        }
    }
}

impl fmt::Display for MutantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single first-order mutant of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutant {
    /// Identifier, contiguous from 1 in generation order.
    pub id: usize,

    /// Category of the mutation.
    #[serde(rename = "type")]
    pub mutant_type: MutantType,

    /// The whole program with the mutation applied.
    pub mutated_program: String,

    /// The program the mutant was derived from.
    pub original_program: String,

    /// Location of the mutated node in the original program.
    pub location: Range,

    /// Text of the mutated node after the mutation.
    pub mutated_fragment: String,
}

impl fmt::Display for Mutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} at {}: {}",
            self.id, self.mutant_type, self.location, self.mutated_fragment
        )
    }
}

/// Counts mutants per category. Categories without mutants are left out.
pub fn summarize(mutants: &[Mutant]) -> BTreeMap<MutantType, usize> {
    let mut counts = BTreeMap::new();
    for mutant in mutants {
        *counts.entry(mutant.mutant_type).or_insert(0) += 1;
    }
    counts
}
