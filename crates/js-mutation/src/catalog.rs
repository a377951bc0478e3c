//! Operator replacement tables.
//!
//! Each table maps an operator to the operators it is replaced with, in the
//! order the mutants are produced. Tables are consulted through [`lookup`].

use crate::mutant::MutantType;

/// An operator and its replacements.
pub type OperatorRow = (&'static str, &'static [&'static str]);

/// Compound assignments. Plain `=` is never mutated.
pub const ASSIGNMENT: &[OperatorRow] = &[
    ("+=", &["-="]),
    ("-=", &["+="]),
    ("*=", &["/="]),
    ("/=", &["*="]),
    ("%=", &["*="]),
    ("<<=", &[">>="]),
    (">>=", &["<<="]),
    ("&=", &["|="]),
    ("|=", &["&="]),
    ("??=", &["&&="]),
];

pub const ARITHMETIC: &[OperatorRow] = &[
    ("+", &["-"]),
    ("-", &["+"]),
    ("*", &["/", "%"]),
    ("/", &["*", "%"]),
    ("%", &["*", "/"]),
];

/// Relational and equality operators.
///
/// For the equality rows the second replacement toggles strictness.
pub const EQUALITY: &[OperatorRow] = &[
    (">", &[">=", "<="]),
    (">=", &[">", "<"]),
    ("<", &["<=", ">="]),
    ("<=", &["<", ">"]),
    ("==", &["!=", "==="]),
    ("!=", &["==", "!=="]),
    ("===", &["!==", "=="]),
    ("!==", &["===", "!="]),
];

pub const LOGICAL: &[OperatorRow] = &[
    ("&&", &["||", "??"]),
    ("||", &["&&", "??"]),
    ("??", &["&&", "||"]),
];

pub const UNARY: &[OperatorRow] = &[("+", &["-"]), ("-", &["+"])];

pub const UPDATE: &[OperatorRow] = &[("++", &["--"]), ("--", &["++"])];

/// Replacement for an empty string literal or template segment.
pub const EMPTY_STRING_SENTINEL: &str = "__PLRG__";

/// Returns the replacements for `op` in `table`.
pub fn lookup(table: &[OperatorRow], op: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|(from, _)| *from == op)
        .map(|(_, to)| *to)
        .unwrap_or(&[])
}

/// Returns the replacements for a binary operator and the category they
/// belong to.
pub fn binary(op: &str) -> Option<(MutantType, &'static [&'static str])> {
    [
        (MutantType::Arithmetic, ARITHMETIC),
        (MutantType::EqualityOp, EQUALITY),
        (MutantType::LogicalOp, LOGICAL),
    ]
    .into_iter()
    .map(|(ty, table)| (ty, lookup(table, op)))
    .find(|(_, to)| !to.is_empty())
}

/// Returns true for `==`, `!=`, `===` and `!==`.
pub fn is_equality(op: &str) -> bool {
    matches!(op, "==" | "!=" | "===" | "!==")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(ARITHMETIC, "*"), &["/", "%"]);
        assert_eq!(lookup(ASSIGNMENT, "="), &[] as &[&str]);
        assert_eq!(lookup(ASSIGNMENT, "**="), &[] as &[&str]);
    }

    #[test]
    fn test_binary_categories() {
        assert_eq!(binary("+").map(|(ty, _)| ty), Some(MutantType::Arithmetic));
        assert_eq!(binary(">").map(|(ty, _)| ty), Some(MutantType::EqualityOp));
        assert_eq!(binary("??").map(|(ty, _)| ty), Some(MutantType::LogicalOp));
        assert_eq!(binary("instanceof"), None);
        assert_eq!(binary("**"), None);
    }

    #[test]
    fn test_tables_never_map_to_self() {
        for table in [ASSIGNMENT, ARITHMETIC, EQUALITY, LOGICAL, UNARY, UPDATE] {
            for (from, to) in table {
                assert!(!to.contains(from), "{from} maps to itself");
            }
        }
    }
}
