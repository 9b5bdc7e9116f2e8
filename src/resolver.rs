//! Static resolver for rogscript
//!
//! Walks a parsed line once, before anything runs, and records for every
//! variable read and assignment how many scopes separate it from the scope
//! that declares the name. References found in no scope are left out of the
//! table and looked up in the global environment at run time.

use crate::ast::{Expr, FunctionDecl, NodeId, ObjectKey, Program, Stmt};
use crate::error::{ResolveError, ResolveErrorKind};
use crate::stack::ensure_sufficient_stack;
use crate::token::Span;
use std::collections::HashMap;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Side table from variable node to scope distance (0 = innermost)
pub type Locals = HashMap<NodeId, usize>;

/// Whether the code being resolved sits inside a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionContext {
    None,
    Function,
}

/// One frame per scope; `false` while a name is declared but its
/// initializer has not been resolved yet.
type Scope = HashMap<String, bool>;

/// Result of resolving one line
#[derive(Debug, Default)]
pub struct Resolution {
    pub locals: Locals,
    /// Entries of `locals` outside every function body. Nothing can
    /// evaluate them once the line has finished.
    pub top_level: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Vec<Scope>,
    resolution: Resolution,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a whole line.
    ///
    /// The outermost frame stands for the global environment the line runs
    /// in, so top-level declarations of the same line are checked like any
    /// other scope.
    pub fn resolve(self, program: &Program) -> Result<Locals> {
        self.resolve_line(program).map(|resolution| resolution.locals)
    }

    /// Like [`Resolver::resolve`], also reporting which entries belong to
    /// top-level code
    pub fn resolve_line(mut self, program: &Program) -> Result<Resolution> {
        self.begin_scope();
        self.resolve_stmts(&program.statements, FunctionContext::None)?;
        self.end_scope();

        tracing::trace!(
            resolved = self.resolution.locals.len(),
            top_level = self.resolution.top_level.len(),
            "resolved local references"
        );
        Ok(self.resolution)
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt], context: FunctionContext) -> Result<()> {
        for stmt in stmts {
            self.resolve_stmt(stmt, context)?;
        }
        Ok(())
    }

    fn resolve_block(&mut self, stmts: &[Stmt], context: FunctionContext) -> Result<()> {
        self.begin_scope();
        self.resolve_stmts(stmts, context)?;
        self.end_scope();
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &Stmt, context: FunctionContext) -> Result<()> {
        ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt, context))
    }

    fn resolve_stmt_inner(&mut self, stmt: &Stmt, context: FunctionContext) -> Result<()> {
        match stmt {
            Stmt::Expr { expr } => self.resolve_expr(expr, context),

            Stmt::Var { name, initializer, span } => {
                self.declare(name, *span)?;
                if let Some(init) = initializer {
                    self.resolve_expr(init, context)?;
                }
                self.define(name);
                Ok(())
            }

            Stmt::If { condition, then_branch, else_branch, .. } => {
                self.resolve_expr(condition, context)?;
                self.resolve_block(then_branch, context)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_block(else_branch, context)?;
                }
                Ok(())
            }

            Stmt::While { condition, body, .. } => {
                self.resolve_expr(condition, context)?;
                self.resolve_block(body, context)
            }

            Stmt::For { init, condition, increment, body, .. } => {
                // The loop header gets its own scope around every iteration
                self.begin_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init, context)?;
                }
                if let Some(condition) = condition {
                    self.resolve_expr(condition, context)?;
                }
                if let Some(increment) = increment {
                    self.resolve_expr(increment, context)?;
                }
                self.resolve_block(body, context)?;
                self.end_scope();
                Ok(())
            }

            Stmt::Return { value, span } => {
                if context == FunctionContext::None {
                    return Err(ResolveError::at(
                        ResolveErrorKind::InvalidReturnOutsideFunction,
                        *span,
                    ));
                }
                match value {
                    Some(value) => self.resolve_expr(value, context),
                    None => Ok(()),
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr, context: FunctionContext) -> Result<()> {
        ensure_sufficient_stack(|| self.resolve_expr_inner(expr, context))
    }

    fn resolve_expr_inner(&mut self, expr: &Expr, context: FunctionContext) -> Result<()> {
        match expr {
            Expr::Literal { .. } => Ok(()),

            Expr::Variable { id, name, span } => {
                let declared_not_defined = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(name))
                    .is_some_and(|defined| !defined);
                if declared_not_defined {
                    return Err(ResolveError::at(
                        ResolveErrorKind::ReadDuringInitialization(name.clone()),
                        *span,
                    ));
                }
                self.resolve_local(*id, name, context);
                Ok(())
            }

            Expr::Assign { id, name, value, .. } => {
                self.resolve_expr(value, context)?;
                self.resolve_local(*id, name, context);
                Ok(())
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left, context)?;
                self.resolve_expr(right, context)
            }

            Expr::Unary { operand, .. } => self.resolve_expr(operand, context),

            Expr::Grouping { expr, .. } => self.resolve_expr(expr, context),

            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee, context)?;
                for arg in args {
                    self.resolve_expr(arg, context)?;
                }
                Ok(())
            }

            Expr::Function { decl, span } => self.resolve_function(decl, *span),

            Expr::Array { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element, context)?;
                }
                Ok(())
            }

            Expr::Object { entries, .. } => {
                for (key, value) in entries {
                    if let ObjectKey::Computed(key) = key {
                        self.resolve_expr(key, context)?;
                    }
                    self.resolve_expr(value, context)?;
                }
                Ok(())
            }

            Expr::Get { object, key, .. } => {
                self.resolve_expr(object, context)?;
                self.resolve_expr(key, context)
            }
        }
    }

    /// Parameters and body share one scope. The body always resolves as
    /// function code, whatever context the literal itself appears in.
    fn resolve_function(&mut self, decl: &FunctionDecl, span: Span) -> Result<()> {
        self.begin_scope();
        for param in &decl.params {
            self.declare(param, span)?;
            self.define(param);
        }
        self.resolve_stmts(&decl.body, FunctionContext::Function)?;
        self.end_scope();
        Ok(())
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, span: Span) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name) {
                return Err(ResolveError::at(
                    ResolveErrorKind::ReassignedVariable(name.to_string()),
                    span,
                ));
            }
            scope.insert(name.to_string(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str, context: FunctionContext) {
        let found = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(name));
        if let Some(distance) = found {
            self.resolution.locals.insert(id, distance);
            if context == FunctionContext::None {
                self.resolution.top_level.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve(source: &str) -> Result<Locals> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        Resolver::new().resolve(&program)
    }

    fn resolve_err(source: &str) -> ResolveErrorKind {
        resolve(source).unwrap_err().kind
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            resolve_err("var a = a;"),
            ResolveErrorKind::ReadDuringInitialization("a".to_string())
        );
    }

    #[test]
    fn test_shadowing_outer_name_in_initializer_is_still_an_error() {
        assert_eq!(
            resolve_err("var a = 1; if (true) { var a = a + 1; }"),
            ResolveErrorKind::ReadDuringInitialization("a".to_string())
        );
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            resolve_err("var a = 1; var a = 2;"),
            ResolveErrorKind::ReassignedVariable("a".to_string())
        );
    }

    #[test]
    fn test_redeclaration_in_nested_scope_is_allowed() {
        assert!(resolve("var a = 1; while (false) { var a = 2; }").is_ok());
    }

    #[test]
    fn test_duplicate_parameters() {
        assert_eq!(
            resolve_err("var f = (x, x) => { };"),
            ResolveErrorKind::ReassignedVariable("x".to_string())
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(resolve_err("return 1;"), ResolveErrorKind::InvalidReturnOutsideFunction);
        assert_eq!(
            resolve_err("if (true) { return; }"),
            ResolveErrorKind::InvalidReturnOutsideFunction
        );
    }

    #[test]
    fn test_return_after_nested_function_is_still_inside() {
        let source = "var f = () => { var g = () => { return 1; }; return g(); };";
        assert!(resolve(source).is_ok());
    }

    #[test]
    fn test_distances() {
        // ids: a(0) in the body, b(1) in the body, then f(2) at top level
        let locals = resolve("var b = 1; var f = (a) => { return a + b; }; f;").unwrap();
        assert_eq!(locals.get(&0), Some(&0));
        assert_eq!(locals.get(&1), Some(&1));
        assert_eq!(locals.get(&2), Some(&0));
    }

    #[test]
    fn test_top_level_references_are_reported() {
        let tokens = Lexer::new("var b = 1; var f = (a) => { return a + b; }; f;")
            .tokenize()
            .unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let resolution = Resolver::new().resolve_line(&program).unwrap();
        assert_eq!(resolution.locals.len(), 3);
        assert_eq!(resolution.top_level, vec![2]);
    }

    #[test]
    fn test_unknown_names_are_global() {
        let locals = resolve("print(1);").unwrap();
        assert!(locals.is_empty());
    }
}
