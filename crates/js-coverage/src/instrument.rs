//! Probe insertion.
//!
//! The instrumenter walks the parsed program once and records probe
//! insertions against original byte offsets. Each probe reports one id of one
//! category to the `__cov__` sink:
//!
//! - `__cov__.func.add(n)` at the top of every function body
//! - `__cov__.stmt.add(n)` before every non-declaration statement inside a
//!   block, and around every initializer and default value
//! - `__cov__.branch.add(n)` in every arm of `if`, `?:`, `switch` and around
//!   every non-logical operand of `&&`, `||` and `??`
//!
//! Non-block bodies are wrapped into blocks so a probe can precede them.

use crate::cover_set::{CoverageId, CoverageTarget};
use js_syntax::ParsedProgram;
use source_range::Rewriter;
use swc_common::{Span, Spanned};
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

/// The instrumented program and the targets of its three categories.
#[derive(Debug, Clone)]
pub struct Instrumented {
    /// The rewritten program text.
    pub program: String,
    /// Function targets.
    pub func: CoverageTarget,
    /// Statement targets.
    pub stmt: CoverageTarget,
    /// Branch targets.
    pub branch: CoverageTarget,
}

/// Instruments a parsed program.
pub fn instrument(parsed: &ParsedProgram) -> Instrumented {
    let mut instrumenter = Instrumenter {
        parsed,
        rewriter: Rewriter::new(),
        func: CoverageTarget::new(),
        stmt: CoverageTarget::new(),
        branch: CoverageTarget::new(),
    };
    parsed.program().visit_with(&mut instrumenter);

    let Instrumenter {
        rewriter,
        func,
        stmt,
        branch,
        ..
    } = instrumenter;

    Instrumented {
        program: rewriter.finish(parsed.source()),
        func,
        stmt,
        branch,
    }
}

struct Instrumenter<'a> {
    parsed: &'a ParsedProgram,
    rewriter: Rewriter,
    func: CoverageTarget,
    stmt: CoverageTarget,
    branch: CoverageTarget,
}

fn next_id(target: &mut CoverageTarget, parsed: &ParsedProgram, span: Span) -> CoverageId {
    let id = target.len() as CoverageId;
    target.insert(id, parsed.range(span));
    id
}

fn peel_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => peel_parens(&paren.expr),
        _ => expr,
    }
}

fn is_logical(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing
    )
}

fn is_loop(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::While(_) | Stmt::DoWhile(_) | Stmt::For(_) | Stmt::ForIn(_) | Stmt::ForOf(_)
    )
}

impl Instrumenter<'_> {
    fn lo(&self, span: Span) -> u32 {
        self.parsed.span(span).start.into()
    }

    fn hi(&self, span: Span) -> u32 {
        self.parsed.span(span).end.into()
    }

    fn func_id(&mut self, span: Span) -> CoverageId {
        next_id(&mut self.func, self.parsed, span)
    }

    fn stmt_id(&mut self, span: Span) -> CoverageId {
        next_id(&mut self.stmt, self.parsed, span)
    }

    fn branch_id(&mut self, span: Span) -> CoverageId {
        next_id(&mut self.branch, self.parsed, span)
    }

    /// Probes and visits a statement sequence.
    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if !matches!(stmt, Stmt::Decl(_)) {
                let sid = self.stmt_id(stmt.span());
                self.rewriter
                    .insert(self.lo(stmt.span()), format!("__cov__.stmt.add({sid}); "));
            }
            stmt.visit_with(self);
        }
    }

    /// Instruments a block body with `probe` as its first statement.
    fn walk_block(&mut self, block: &BlockStmt, probe: Option<String>) {
        if let Some(probe) = probe {
            self.rewriter.insert(self.lo(block.span) + 1, format!(" {probe}"));
        }
        self.walk_stmts(&block.stmts);
    }

    /// Instruments a body statement, wrapping it into a block if needed.
    fn walk_body(&mut self, body: &Stmt, probe: Option<String>) {
        if let Stmt::Block(block) = body {
            self.walk_block(block, probe);
            return;
        }

        let span = body.span();
        let opening = match probe {
            Some(probe) => format!("{{ {probe} "),
            None => "{ ".to_string(),
        };
        self.rewriter.insert(self.lo(span), opening);
        self.walk_stmts(std::slice::from_ref(body));
        self.rewriter.insert(self.hi(span), " }");
    }

    /// Wraps `expr` into `(probe, expr)` and visits it.
    fn wrap_expr(&mut self, expr: &Expr, probe: String) {
        let span = expr.span();
        self.rewriter.insert(self.lo(span), format!("({probe}, "));
        expr.visit_with(self);
        self.rewriter.insert(self.hi(span), ")");
    }

    fn walk_function_body(&mut self, span: Span, body: Option<&BlockStmt>) {
        let fid = self.func_id(span);
        if let Some(body) = body {
            self.walk_block(body, Some(format!("__cov__.func.add({fid});")));
        }
    }

    fn walk_logical_operand(&mut self, operand: &Expr) {
        let peeled = peel_parens(operand);
        if let Expr::Bin(bin) = peeled {
            if is_logical(bin.op) {
                operand.visit_with(self);
                return;
            }
        }
        let bid = self.branch_id(peeled.span());
        self.wrap_expr(operand, format!("__cov__.branch.add({bid})"));
    }
}

impl Visit for Instrumenter<'_> {
    fn visit_function(&mut self, n: &Function) {
        for param in &n.params {
            param.visit_with(self);
        }
        self.walk_function_body(n.span, n.body.as_ref());
    }

    fn visit_constructor(&mut self, n: &Constructor) {
        n.key.visit_with(self);
        for param in &n.params {
            param.visit_with(self);
        }
        self.walk_function_body(n.span, n.body.as_ref());
    }

    fn visit_getter_prop(&mut self, n: &GetterProp) {
        n.key.visit_with(self);
        self.walk_function_body(n.span, n.body.as_ref());
    }

    fn visit_setter_prop(&mut self, n: &SetterProp) {
        n.key.visit_with(self);
        n.param.visit_with(self);
        self.walk_function_body(n.span, n.body.as_ref());
    }

    fn visit_arrow_expr(&mut self, n: &ArrowExpr) {
        for param in &n.params {
            param.visit_with(self);
        }
        let fid = self.func_id(n.span);
        match &*n.body {
            BlockStmtOrExpr::BlockStmt(block) => {
                self.walk_block(block, Some(format!("__cov__.func.add({fid});")));
            }
            BlockStmtOrExpr::Expr(expr) => {
                let span = expr.span();
                let sid = self.stmt_id(span);
                self.rewriter.insert(
                    self.lo(span),
                    format!("{{ __cov__.func.add({fid}); __cov__.stmt.add({sid}); return "),
                );
                expr.visit_with(self);
                self.rewriter.insert(self.hi(span), "; }");
            }
        }
    }

    fn visit_var_declarator(&mut self, n: &VarDeclarator) {
        n.name.visit_with(self);
        if let Some(init) = &n.init {
            let sid = self.stmt_id(n.span);
            self.wrap_expr(init, format!("__cov__.stmt.add({sid})"));
        }
    }

    fn visit_assign_pat(&mut self, n: &AssignPat) {
        n.left.visit_with(self);
        let sid = self.stmt_id(n.right.span());
        self.wrap_expr(&n.right, format!("__cov__.stmt.add({sid})"));
    }

    fn visit_assign_pat_prop(&mut self, n: &AssignPatProp) {
        if let Some(value) = &n.value {
            let sid = self.stmt_id(value.span());
            self.wrap_expr(value, format!("__cov__.stmt.add({sid})"));
        }
    }

    fn visit_block_stmt(&mut self, n: &BlockStmt) {
        self.walk_stmts(&n.stmts);
    }

    fn visit_static_block(&mut self, n: &StaticBlock) {
        self.walk_stmts(&n.body.stmts);
    }

    fn visit_switch_stmt(&mut self, n: &SwitchStmt) {
        n.discriminant.visit_with(self);
        let source = self.parsed.source();
        for case in &n.cases {
            let bid = self.branch_id(case.span);
            let after_test = match &case.test {
                Some(test) => self.hi(test.span()),
                None => self.lo(case.span) + "default".len() as u32,
            };
            let probe_at = js_syntax::find_token(source, after_test as usize, ":")
                .map(|colon| u32::from(colon.end))
                .unwrap_or_else(|| self.hi(case.span));
            self.rewriter
                .insert(probe_at, format!(" __cov__.branch.add({bid});"));
            self.walk_stmts(&case.cons);
        }
    }

    fn visit_if_stmt(&mut self, n: &IfStmt) {
        n.test.visit_with(self);

        let bid = self.branch_id(n.span);
        self.walk_body(&n.cons, Some(format!("__cov__.branch.add({bid});")));

        let bid = self.branch_id(n.span);
        match &n.alt {
            Some(alt) => self.walk_body(alt, Some(format!("__cov__.branch.add({bid});"))),
            None => self.rewriter.insert(
                self.hi(n.span),
                format!(" else {{ __cov__.branch.add({bid}); }}"),
            ),
        }
    }

    fn visit_cond_expr(&mut self, n: &CondExpr) {
        n.test.visit_with(self);

        let bid = self.branch_id(n.span);
        self.wrap_expr(&n.cons, format!("__cov__.branch.add({bid})"));

        let bid = self.branch_id(n.span);
        self.wrap_expr(&n.alt, format!("__cov__.branch.add({bid})"));
    }

    fn visit_bin_expr(&mut self, n: &BinExpr) {
        if !is_logical(n.op) {
            n.visit_children_with(self);
            return;
        }
        self.walk_logical_operand(&n.left);
        self.walk_logical_operand(&n.right);
    }

    fn visit_labeled_stmt(&mut self, n: &LabeledStmt) {
        if is_loop(&n.body) {
            // `continue label` needs the loop directly under the label
            n.body.visit_with(self);
        } else {
            self.walk_body(&n.body, None);
        }
    }

    fn visit_while_stmt(&mut self, n: &WhileStmt) {
        n.test.visit_with(self);
        self.walk_body(&n.body, None);
    }

    fn visit_do_while_stmt(&mut self, n: &DoWhileStmt) {
        n.test.visit_with(self);
        self.walk_body(&n.body, None);
    }

    fn visit_for_stmt(&mut self, n: &ForStmt) {
        n.init.visit_with(self);
        n.test.visit_with(self);
        n.update.visit_with(self);
        self.walk_body(&n.body, None);
    }

    fn visit_for_in_stmt(&mut self, n: &ForInStmt) {
        n.right.visit_with(self);
        self.walk_body(&n.body, None);
    }

    fn visit_for_of_stmt(&mut self, n: &ForOfStmt) {
        n.right.visit_with(self);
        self.walk_body(&n.body, None);
    }
}
