//! Abstract Syntax Tree definitions for rogscript
//!
//! Represents the structure of a console line after parsing.

use crate::token::Span;
use std::rc::Rc;

/// A unique identifier for variable reference nodes.
///
/// The resolver keys its side table by these ids, so they must stay unique
/// for as long as any closure holding the node can still run.
pub type NodeId = usize;

/// Literal values that appear directly in source
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

/// Expression nodes
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal: 42, "hi", true, nil
    Literal { value: Literal, span: Span },

    /// Variable reference: foo
    Variable { id: NodeId, name: String, span: Span },

    /// Assignment: foo = expr
    Assign {
        id: NodeId,
        name: String,
        value: Box<Expr>,
        span: Span,
    },

    /// Binary operation: a + b, x < y
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },

    /// Unary operation: -x, !y
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// Short-circuit logic: a && b, x || y
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },

    /// Grouping: (expr)
    Grouping { expr: Box<Expr>, span: Span },

    /// Function call: foo(a, b)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// Function literal: (a, b) => { ... }
    Function { decl: Rc<FunctionDecl>, span: Span },

    /// Array literal: [a, b, c]
    Array { elements: Vec<Expr>, span: Span },

    /// Object literal: { name: a, "key": b, [expr]: c }
    Object {
        entries: Vec<(ObjectKey, Expr)>,
        span: Span,
    },

    /// Keyed access: obj[key], obj.name
    Get {
        object: Box<Expr>,
        key: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Variable { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Grouping { span, .. }
            | Expr::Call { span, .. }
            | Expr::Function { span, .. }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Get { span, .. } => *span,
        }
    }
}

/// Key of an object literal entry
#[derive(Debug, Clone)]
pub enum ObjectKey {
    /// Identifier or string literal key, known at parse time
    Named(String),
    /// `[expr]` key evaluated at run time
    Computed(Expr),
}

/// Parameters and body of a function literal.
///
/// Shared behind an `Rc` so closures can outlive the line that built them.
#[derive(Debug)]
pub struct FunctionDecl {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    Eq,       // ==
    Ne,       // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,  // -
    Not,  // !
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Statement nodes
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression statement
    Expr { expr: Expr },

    /// Variable declaration: var x = expr;
    Var {
        name: String,
        initializer: Option<Expr>,
        span: Span,
    },

    /// If statement: if (cond) { } else { }
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
        span: Span,
    },

    /// While loop: while (cond) { }
    While {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },

    /// C-style loop: for (init; cond; incr) { }
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Vec<Stmt>,
        span: Span,
    },

    /// Return statement: return expr;
    Return { value: Option<Expr>, span: Span },
}

/// A parsed console line
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}
