//! The mutant generator.
//!
//! The generator walks the parsed program in pre-order. At every node it
//! applies each applicable transformation of the catalog as a [`Patch`] to
//! the working text, captures the result as a [`Mutant`] and immediately
//! applies the inverse patch, so mutations never compose and never leak into
//! the capture of siblings or children.

use crate::catalog::{self, EMPTY_STRING_SENTINEL};
use crate::mutant::{Mutant, MutantType};
use crate::patch::{Edit, Patch};
use js_syntax::{find_token, parse, Diagnostic, DiagnosticCode, ParseError, ParsedProgram};
use rustc_hash::FxHashSet;
use source_range::Span;
use swc_common::{Span as SwcSpan, Spanned};
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};
use thiserror::Error;

/// Errors that abort mutant generation.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Raised in strict mode when the working program was not restored.
    #[error("mutation was not reverted: {0}")]
    Invariant(String),
}

/// Options of a [`Mutator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorOptions {
    /// Calls to this function are neither mutated nor descended into.
    pub assertion_fn: String,
    /// Echo every mutant to stderr as it is produced.
    pub detail: bool,
    /// Turn invariant violations into [`MutationError::Invariant`].
    pub strict: bool,
    /// Re-parse every mutated program and diagnose the ones that fail.
    pub verify_syntax: bool,
}

impl Default for MutatorOptions {
    fn default() -> Self {
        Self {
            assertion_fn: "__assert__".to_string(),
            detail: false,
            strict: false,
            verify_syntax: false,
        }
    }
}

/// The mutants of one program.
#[derive(Debug)]
pub struct Mutator {
    source: String,
    mutants: Vec<Mutant>,
    diagnostics: Vec<Diagnostic>,
}

impl Mutator {
    /// Parses `source` and generates all of its first-order mutants.
    pub fn new(source: &str, options: MutatorOptions) -> Result<Self, MutationError> {
        let parsed = parse(source)?;

        let mut generator = Generator::new(&parsed, &options);
        parsed.program().visit_with(&mut generator);

        let Generator {
            working,
            mutants,
            mut diagnostics,
            ..
        } = generator;

        if working != source {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::InvariantViolation,
                "program text differs from the original after generation",
            ));
        }

        if options.strict {
            if let Some(violation) = diagnostics
                .iter()
                .find(|d| d.code == DiagnosticCode::InvariantViolation)
            {
                return Err(MutationError::Invariant(violation.message.clone()));
            }
        }

        if options.verify_syntax {
            for mutant in &mutants {
                if let Err(err) = parse(&mutant.mutated_program) {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticCode::InvalidMutant,
                        format!(
                            "mutant #{} ({}) does not parse: {err}",
                            mutant.id, mutant.mutant_type
                        ),
                    ));
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            mutants,
            diagnostics,
        })
    }

    /// Generates the mutants of `source` with default options.
    ///
    /// Diagnostics collected along the way are printed to stderr.
    pub fn generate(source: &str, detail: bool) -> Result<Vec<Mutant>, MutationError> {
        let options = MutatorOptions {
            detail,
            ..MutatorOptions::default()
        };
        let (mutants, diagnostics) = Self::new(source, options)?.into_parts();
        for diagnostic in &diagnostics {
            eprintln!("{}", diagnostic);
        }
        Ok(mutants)
    }

    /// The program the mutants were derived from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The mutants, in generation order.
    pub fn mutants(&self) -> &[Mutant] {
        &self.mutants
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_mutants(self) -> Vec<Mutant> {
        self.mutants
    }

    /// Splits the generator into its mutants and diagnostics.
    pub fn into_parts(self) -> (Vec<Mutant>, Vec<Diagnostic>) {
        (self.mutants, self.diagnostics)
    }
}

struct Generator<'a> {
    parsed: &'a ParsedProgram,
    options: &'a MutatorOptions,
    working: String,
    mutants: Vec<Mutant>,
    diagnostics: Vec<Diagnostic>,
    /// Inner links of optional chains already mutated through their outermost link.
    chain_links: FxHashSet<(u32, u32)>,
    /// Operator of the enclosing logical expression when the current node is
    /// its direct, unparenthesized operand.
    logical_parent: Option<BinaryOp>,
}

impl<'a> Generator<'a> {
    fn new(parsed: &'a ParsedProgram, options: &'a MutatorOptions) -> Self {
        Self {
            parsed,
            options,
            working: parsed.source().to_string(),
            mutants: Vec::new(),
            diagnostics: Vec::new(),
            chain_links: FxHashSet::default(),
            logical_parent: None,
        }
    }
}

fn span_key(span: SwcSpan) -> (u32, u32) {
    (span.lo.0, span.hi.0)
}

fn peel_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => peel_parens(&paren.expr),
        _ => expr,
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(peel_parens(expr), Expr::Lit(Lit::Null(_)))
}

fn literal_bool(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Lit(Lit::Bool(b)) => Some(b.value),
        _ => None,
    }
}

fn is_logical(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing
    )
}

fn logical_precedence(op: &str) -> u8 {
    match op {
        "&&" => 2,
        _ => 1,
    }
}

/// Returns true if a logical expression using `inner` must be parenthesized
/// to appear as a direct operand of one using `outer`.
fn needs_parens(inner: &str, outer: &str) -> bool {
    let mixes_nullish = (inner == "??") != (outer == "??");
    mixes_nullish || logical_precedence(inner) < logical_precedence(outer)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Returns true if `left` directly followed by `right` would lex differently.
fn fuses(left: char, right: char) -> bool {
    matches!(
        (left, right),
        ('+', '+') | ('-', '-') | ('/', '/') | ('/', '*')
    ) || (is_ident_char(left) && is_ident_char(right))
}

impl Generator<'_> {
    fn source(&self) -> &str {
        self.parsed.source()
    }

    fn span(&self, span: SwcSpan) -> Span {
        self.parsed.span(span)
    }

    fn token_after(&self, node: SwcSpan, token: &str) -> Option<Span> {
        find_token(self.source(), self.span(node).hi(), token)
    }

    /// Pads `text` with spaces where it would fuse with the text around `target`.
    fn padded(&self, target: Span, text: &str) -> String {
        let source = self.source();
        let before = source
            .get(..target.lo())
            .and_then(|s| s.chars().next_back());
        let after = source.get(target.hi()..).and_then(|s| s.chars().next());

        let mut out = String::with_capacity(text.len() + 2);
        if let (Some(before), Some(first)) = (before, text.chars().next()) {
            if fuses(before, first) {
                out.push(' ');
            }
        }
        out.push_str(text);
        if let (Some(last), Some(after)) = (text.chars().next_back(), after) {
            if fuses(last, after) {
                out.push(' ');
            }
        }
        out
    }

    /// Replaces `target` with `text` and captures the mutant of `node`.
    fn replace(&mut self, mutant_type: MutantType, node: SwcSpan, target: Span, text: &str) {
        let patch = Patch::single(target, self.padded(target, text));
        self.emit(mutant_type, node, patch);
    }

    /// Applies `patch`, records the mutant of `node` and reverts the patch.
    fn emit(&mut self, mutant_type: MutantType, node: SwcSpan, patch: Patch) {
        let node = self.span(node);
        let inverse = match patch.apply(&mut self.working) {
            Ok(inverse) => inverse,
            Err(err) => {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::InvariantViolation,
                        format!("could not apply {mutant_type} mutation: {err}"),
                    )
                    .with_span(node),
                );
                return;
            }
        };

        let unchanged = self.working == self.parsed.source();
        let end = (node.hi() as isize + patch.delta()) as usize;
        let fragment = self
            .working
            .get(node.lo()..end)
            .unwrap_or_default()
            .to_string();
        let mutated_program = self.working.clone();

        if let Err(err) = inverse.apply(&mut self.working) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::InvariantViolation,
                    format!("could not revert {mutant_type} mutation: {err}"),
                )
                .with_span(node),
            );
            self.working = self.parsed.source().to_string();
        }

        if unchanged {
            return;
        }

        let mutant = Mutant {
            id: self.mutants.len() + 1,
            mutant_type,
            mutated_program,
            original_program: self.parsed.source().to_string(),
            location: self.parsed.file().range(node),
            mutated_fragment: fragment,
        };
        if self.options.detail {
            eprintln!("{mutant}");
        }
        self.mutants.push(mutant);
    }

    /// Clears a non-empty list by replacing `target` with `empty`.
    fn clear(&mut self, mutant_type: MutantType, node: SwcSpan, target: Span, empty: &str) {
        self.emit(mutant_type, node, Patch::single(target, empty));
    }

    fn condition(&mut self, node: SwcSpan, test: &Expr) {
        let target = self.span(test.span());
        match literal_bool(test) {
            Some(value) => {
                let negated = if value { "false" } else { "true" };
                self.replace(MutantType::Cond, node, target, negated);
            }
            None => {
                self.replace(MutantType::Cond, node, target, "true");
                self.replace(MutantType::Cond, node, target, "false");
            }
        }
    }

    /// Loops are only ever forced to stop, never forced to spin.
    ///
    /// A literal `false` test already skips the body, so forcing it to stop
    /// changes nothing and it gets no mutant; a literal `true` test becomes
    /// `false` like any other test.
    fn loop_condition(&mut self, node: SwcSpan, test: &Expr) {
        if literal_bool(test) != Some(false) {
            let target = self.span(test.span());
            self.replace(MutantType::Cond, node, target, "false");
        }
    }

    /// Parenthesizes the operands and the node itself where replacing the
    /// operator of `n` with `replacement` would change how it groups.
    fn parenthesize(
        &self,
        n: &BinExpr,
        token: Edit,
        replacement: &str,
        parent: Option<BinaryOp>,
    ) -> Patch {
        let node = self.span(n.span);
        let wrap_node = parent.is_some_and(|parent| needs_parens(replacement, parent.as_str()));

        let mut patch = Patch::new();
        if wrap_node {
            patch.push(Edit::insert(node.lo(), "("));
        }
        let operand_edits = |patch: &mut Patch, operand: &Expr| {
            if let Expr::Bin(bin) = operand {
                if is_logical(bin.op) && needs_parens(bin.op.as_str(), replacement) {
                    let span = self.span(bin.span);
                    patch.push(Edit::insert(span.lo(), "("));
                    patch.push(Edit::insert(span.hi(), ")"));
                }
            }
        };
        operand_edits(&mut patch, &*n.left);
        patch.push(token);
        operand_edits(&mut patch, &*n.right);
        if wrap_node {
            patch.push(Edit::insert(node.hi(), ")"));
        }
        patch
    }

    /// Collects the `?.` tokens of `chain` and of every link it is built on.
    fn collect_chain(&mut self, chain: &OptChainExpr, patch: &mut Patch) {
        let (object, replacement) = match &*chain.base {
            OptChainBase::Member(member) => {
                let replacement = match member.prop {
                    MemberProp::Computed(_) => "",
                    _ => ".",
                };
                (&member.obj, replacement)
            }
            OptChainBase::Call(call) => (&call.callee, ""),
        };

        if chain.optional {
            if let Some(token) = self.token_after(object.span(), "?.") {
                patch.push(Edit::replace(token, replacement));
            }
        }

        self.collect_spine(object, patch);
    }

    /// Follows the object or callee links below an optional chain link.
    fn collect_spine(&mut self, expr: &Expr, patch: &mut Patch) {
        match expr {
            Expr::OptChain(link) => {
                self.chain_links.insert(span_key(link.span));
                self.collect_chain(link, patch);
            }
            Expr::Member(member) => self.collect_spine(&member.obj, patch),
            Expr::Call(CallExpr {
                callee: Callee::Expr(callee),
                ..
            }) => self.collect_spine(callee, patch),
            _ => {}
        }
    }

    /// Locates the text segments of a template literal.
    ///
    /// Returns `None` when a segment cannot be matched with the source.
    fn template_segments(&self, n: &Tpl) -> Option<Vec<Span>> {
        let source = self.source();
        let mut start = self.span(n.span).lo() + 1;
        let mut segments = Vec::with_capacity(n.quasis.len());

        for (i, quasi) in n.quasis.iter().enumerate() {
            if i > 0 {
                let expr = n.exprs.get(i - 1)?;
                start = self.token_after(expr.span(), "}")?.hi();
            }
            let end = start + quasi.raw.len();
            let delimiter = if i + 1 == n.quasis.len() { "`" } else { "${" };
            if source.get(end..end + delimiter.len())? != delimiter {
                return None;
            }
            segments.push(Span::new(start as u32, end as u32));
        }
        Some(segments)
    }

    fn template(&mut self, n: &Tpl) {
        let Some(segments) = self.template_segments(n) else {
            return;
        };

        if n.exprs.is_empty() {
            if let Some(segment) = segments.first() {
                let text = if segment.is_empty() {
                    EMPTY_STRING_SENTINEL
                } else {
                    ""
                };
                self.emit(
                    MutantType::StringLiteral,
                    n.span,
                    Patch::single(*segment, text),
                );
            }
            return;
        }

        for segment in segments.iter().filter(|segment| segment.is_empty()) {
            self.emit(
                MutantType::StringLiteral,
                n.span,
                Patch::single(*segment, EMPTY_STRING_SENTINEL),
            );
        }

        // Joining `$` with a following `{` would open a new interpolation.
        let opens_interpolation = n
            .quasis
            .windows(2)
            .any(|pair| pair[0].raw.ends_with('$') && pair[1].raw.starts_with('{'));
        if !opens_interpolation {
            let text: String = n.quasis.iter().map(|quasi| &*quasi.raw).collect();
            let target = self.span(n.span);
            self.emit(
                MutantType::StringLiteral,
                n.span,
                Patch::single(target, format!("`{text}`")),
            );
        }
    }
}

impl Visit for Generator<'_> {
    fn visit_array_lit(&mut self, n: &ArrayLit) {
        if !n.elems.is_empty() {
            let target = self.span(n.span);
            self.clear(MutantType::ArrayDecl, n.span, target, "[]");
        }
        n.visit_children_with(self);
    }

    fn visit_object_lit(&mut self, n: &ObjectLit) {
        if !n.props.is_empty() {
            let target = self.span(n.span);
            self.clear(MutantType::ObjectLiteral, n.span, target, "{}");
        }
        n.visit_children_with(self);
    }

    fn visit_new_expr(&mut self, n: &NewExpr) {
        if n.args.as_ref().is_some_and(|args| !args.is_empty()) {
            let target = Span::new(
                self.span(n.callee.span()).end,
                self.span(n.span).end,
            );
            self.clear(MutantType::ArrayDecl, n.span, target, "()");
        }
        n.visit_children_with(self);
    }

    fn visit_assign_expr(&mut self, n: &AssignExpr) {
        let op = n.op.as_str();
        let replacements = catalog::lookup(catalog::ASSIGNMENT, op);
        if !replacements.is_empty() {
            if let Some(token) = self.token_after(n.left.span(), op) {
                for replacement in replacements {
                    self.replace(MutantType::AssignExpr, n.span, token, replacement);
                }
            }
        }
        n.visit_children_with(self);
    }

    fn visit_bin_expr(&mut self, n: &BinExpr) {
        let parent = self.logical_parent.take();
        let op = n.op.as_str();

        if let Some((mutant_type, replacements)) = catalog::binary(op) {
            if let Some(token) = self.token_after(n.left.span(), op) {
                let strictness_applies =
                    !(is_null(&n.left) || is_null(&n.right)) || !catalog::is_equality(op);
                for (i, replacement) in replacements.iter().enumerate() {
                    if i == 1 && !strictness_applies {
                        continue;
                    }
                    let edit = Edit::replace(token, self.padded(token, replacement));
                    let patch = if mutant_type == MutantType::LogicalOp {
                        self.parenthesize(n, edit, replacement, parent)
                    } else {
                        let mut patch = Patch::new();
                        patch.push(edit);
                        patch
                    };
                    self.emit(mutant_type, n.span, patch);
                }
            }
        }

        for operand in [&n.left, &n.right] {
            self.logical_parent = match &**operand {
                Expr::Bin(_) if is_logical(n.op) => Some(n.op),
                _ => None,
            };
            operand.visit_with(self);
        }
        self.logical_parent = None;
    }

    fn visit_block_stmt(&mut self, n: &BlockStmt) {
        if !n.stmts.is_empty() {
            let target = self.span(n.span);
            self.clear(MutantType::BlockStmt, n.span, target, "{}");
        }
        n.visit_children_with(self);
    }

    fn visit_static_block(&mut self, n: &StaticBlock) {
        for stmt in &n.body.stmts {
            stmt.visit_with(self);
        }
    }

    fn visit_opt_chain_expr(&mut self, n: &OptChainExpr) {
        if !self.chain_links.contains(&span_key(n.span)) {
            let mut patch = Patch::new();
            self.collect_chain(n, &mut patch);
            if !patch.is_empty() {
                self.emit(MutantType::OptionalChain, n.span, patch);
            }
        }
        n.visit_children_with(self);
    }

    fn visit_cond_expr(&mut self, n: &CondExpr) {
        self.condition(n.span, &n.test);
        n.visit_children_with(self);
    }

    fn visit_if_stmt(&mut self, n: &IfStmt) {
        self.condition(n.span, &n.test);
        n.visit_children_with(self);
    }

    fn visit_while_stmt(&mut self, n: &WhileStmt) {
        self.loop_condition(n.span, &n.test);
        n.visit_children_with(self);
    }

    fn visit_do_while_stmt(&mut self, n: &DoWhileStmt) {
        self.loop_condition(n.span, &n.test);
        n.visit_children_with(self);
    }

    fn visit_for_stmt(&mut self, n: &ForStmt) {
        match &n.test {
            Some(test) => self.loop_condition(n.span, test),
            None => {
                let source = self.source();
                let lo = self.span(n.span).lo();
                let semi = find_token(source, lo + 3, "(").and_then(|paren| {
                    let after = match &n.init {
                        Some(init) => self.span(init.span()).hi(),
                        None => paren.hi(),
                    };
                    find_token(source, after, ";")
                });
                if let Some(semi) = semi {
                    self.emit(
                        MutantType::Cond,
                        n.span,
                        Patch::single(Span::empty(semi.end), "false"),
                    );
                }
            }
        }
        n.visit_children_with(self);
    }

    fn visit_lit(&mut self, n: &Lit) {
        let (mutant_type, span, text) = match n {
            Lit::Bool(b) => (
                MutantType::BooleanLiteral,
                b.span,
                if b.value { "false" } else { "true" },
            ),
            Lit::Str(s) => {
                let text = if u32::from(self.span(s.span).len()) == 2 {
                    "\"__PLRG__\""
                } else {
                    "\"\""
                };
                (MutantType::StringLiteral, s.span, text)
            }
            Lit::Regex(r) => (MutantType::StringLiteral, r.span, "\"\""),
            Lit::BigInt(b) => (MutantType::StringLiteral, b.span, "\"\""),
            _ => return,
        };
        let target = self.span(span);
        self.replace(mutant_type, span, target, text);
    }

    fn visit_tpl(&mut self, n: &Tpl) {
        self.template(n);
        n.visit_children_with(self);
    }

    fn visit_unary_expr(&mut self, n: &UnaryExpr) {
        let op = n.op.as_str();
        let node = self.span(n.span);
        let target = Span::new(node.start, node.start + text_len(op));
        for replacement in catalog::lookup(catalog::UNARY, op) {
            self.replace(MutantType::UnaryOp, n.span, target, replacement);
        }
        n.visit_children_with(self);
    }

    fn visit_update_expr(&mut self, n: &UpdateExpr) {
        let op = n.op.as_str();
        let node = self.span(n.span);
        let arg = self.parsed.text(n.arg.span()).to_string();

        let toggled = if n.prefix {
            format!("{arg}{op}")
        } else {
            format!("{op}{arg}")
        };
        self.replace(MutantType::Update, n.span, node, &toggled);

        let token = if n.prefix {
            Span::new(node.start, node.start + text_len(op))
        } else {
            Span::new(node.end - text_len(op), node.end)
        };
        for replacement in catalog::lookup(catalog::UPDATE, op) {
            self.replace(MutantType::Update, n.span, token, replacement);
        }
        n.visit_children_with(self);
    }

    fn visit_call_expr(&mut self, n: &CallExpr) {
        if let Callee::Expr(callee) = &n.callee {
            if let Expr::Ident(ident) = &**callee {
                if &*ident.sym == self.options.assertion_fn.as_str() {
                    return;
                }
            }
        }
        n.visit_children_with(self);
    }
}

fn text_len(text: &str) -> source_range::ByteOffset {
    source_range::ByteOffset::from(text.len() as u32)
}
