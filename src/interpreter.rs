//! Tree-walking interpreter for rogscript
//!
//! One interpreter is one console session: its global environment survives
//! from line to line, and so do closures created by earlier lines.

use crate::ast::{BinaryOp, Expr, Literal, LogicalOp, NodeId, ObjectKey, Program, Stmt, UnaryOp};
use crate::builtins;
use crate::config::Config;
use crate::environment::{EnvRef, Environment};
use crate::error::{RunError, RuntimeError, RuntimeErrorKind};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::stack::ensure_sufficient_stack;
use crate::token::Span;
use crate::value::{Callable, UserFunction, Value};
use indexmap::IndexMap;
use std::rc::Rc;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Outcome of a whole `run` call
pub type RunResult = std::result::Result<Value, RunError>;

/// How a statement finished
#[derive(Debug)]
enum Flow {
    Normal,
    /// A `return` is unwinding towards the nearest call boundary
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    next_node_id: NodeId,
    call_depth: usize,
    config: Config,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let globals = Environment::new();
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            next_node_id: 0,
            call_depth: 0,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install a native function as a global binding
    pub fn bind<F>(&mut self, name: &str, arity: usize, handler: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        tracing::debug!(name, arity, "binding native function");
        self.globals
            .borrow_mut()
            .define(name, Value::native(name, arity, handler));
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names()
    }

    /// Lex, parse, resolve and evaluate one line of source.
    ///
    /// Stops at the first failing stage. On success the value is that of
    /// the last top-level expression statement, or nil.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn run(&mut self, source: &str) -> RunResult {
        let tokens = Lexer::new(source).tokenize()?;
        tracing::debug!(tokens = tokens.len(), "scanned");

        let mut parser = Parser::with_id_offset(tokens, self.next_node_id);
        let program = parser.parse()?;
        self.next_node_id = parser.next_id();
        tracing::debug!(statements = program.statements.len(), "parsed");

        let resolution = Resolver::new().resolve_line(&program)?;
        tracing::debug!(locals = resolution.locals.len(), "resolved");
        self.locals.extend(resolution.locals);

        let result = self.interpret(&program);

        // Only function bodies outlive the line; the side table keeps
        // entries for the function literals entered so far
        for id in &resolution.top_level {
            self.locals.remove(id);
        }

        Ok(result?)
    }

    /// Execute an already resolved program in the global environment
    pub fn interpret(&mut self, program: &Program) -> Result<Value> {
        let mut last = Value::Nil;

        for stmt in &program.statements {
            let outcome = match stmt {
                Stmt::Expr { expr } => self.evaluate(expr),
                other => self.execute(other).map(|_| Value::Nil),
            };

            match outcome {
                Ok(value) => last = value,
                Err(err) => {
                    tracing::debug!(error = %err, "runtime error");
                    self.environment = Rc::clone(&self.globals);
                    self.call_depth = 0;
                    return Err(err);
                }
            }
        }

        Ok(last)
    }

    // ==================== Statements ====================

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expr { expr } => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer, .. } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(name.as_str(), value);
                Ok(Flow::Normal)
            }

            Stmt::If { condition, then_branch, else_branch, .. } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_block(then_branch, Environment::with_parent(&self.environment))
                } else if let Some(else_branch) = else_branch {
                    self.execute_block(else_branch, Environment::with_parent(&self.environment))
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body, .. } => {
                while self.evaluate(condition)?.is_truthy() {
                    let iteration = Environment::with_parent(&self.environment);
                    if let Flow::Return(value) = self.execute_block(body, iteration)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For { init, condition, increment, body, .. } => {
                let header = Environment::with_parent(&self.environment);
                self.with_environment(header, |this| {
                    if let Some(init) = init {
                        this.execute(init)?;
                    }

                    loop {
                        if let Some(condition) = condition {
                            if !this.evaluate(condition)?.is_truthy() {
                                break;
                            }
                        }

                        let iteration = Environment::with_parent(&this.environment);
                        if let Flow::Return(value) = this.execute_block(body, iteration)? {
                            return Ok(Flow::Return(value));
                        }

                        if let Some(increment) = increment {
                            this.evaluate(increment)?;
                        }
                    }

                    Ok(Flow::Normal)
                })
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `stmts` in `env`, stopping at the first `return`
    fn execute_block(&mut self, stmts: &[Stmt], env: EnvRef) -> Result<Flow> {
        self.with_environment(env, |this| {
            for stmt in stmts {
                if let Flow::Return(value) = this.execute(stmt)? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Normal)
        })
    }

    /// Swap in `env` as the current environment for the duration of `f`,
    /// restoring the previous one whether or not `f` fails.
    fn with_environment<T>(
        &mut self,
        env: EnvRef,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = f(self);
        self.environment = previous;
        result
    }

    // ==================== Expressions ====================

    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Nil => Value::Nil,
            }),

            Expr::Variable { id, name, span } => self.look_up_variable(*id, name, *span),

            Expr::Assign { id, name, value, span } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone(), *span)?;
                Ok(value)
            }

            Expr::Binary { left, op, right, span } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary_op(*op, left, right, *span)
            }

            Expr::Unary { op, operand, span } => {
                let operand = self.evaluate(operand)?;
                match op {
                    UnaryOp::Neg => match operand {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(bad_type("number", other.type_name().to_string(), *span)),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                }
            }

            Expr::Logical { left, op, right, .. } => {
                let left = self.evaluate(left)?;
                let short_circuits = match op {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Grouping { expr, .. } => self.evaluate(expr),

            Expr::Call { callee, args, span } => {
                let callee = self.evaluate(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg)?);
                }
                self.call_value(callee, values, *span)
            }

            Expr::Function { decl, .. } => {
                let function = UserFunction::new(Rc::clone(decl), Rc::clone(&self.environment));
                Ok(Value::Callable(Rc::new(Callable::User(function))))
            }

            Expr::Array { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::array(items))
            }

            Expr::Object { entries, span } => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key {
                        ObjectKey::Named(name) => name.clone(),
                        ObjectKey::Computed(expr) => {
                            let key = self.evaluate(expr)?;
                            object_key(&key, *span)?
                        }
                    };
                    let value = self.evaluate(value)?;
                    map.insert(key, value);
                }
                Ok(Value::object(map))
            }

            Expr::Get { object, key, span } => {
                let object = self.evaluate(object)?;
                let key = self.evaluate(key)?;
                get_property(&object, &key, *span)
            }
        }
    }

    fn look_up_variable(&self, id: NodeId, name: &str, span: Span) -> Result<Value> {
        let found = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        };

        found.ok_or_else(|| {
            RuntimeError::at(RuntimeErrorKind::VariableUsedBeforeDeclared(name.to_string()), span)
        })
    }

    fn assign_variable(&mut self, id: NodeId, name: &str, value: Value, span: Span) -> Result<()> {
        let assigned = match self.locals.get(&id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, name, value),
            None => self.globals.borrow_mut().assign(name, value),
        };

        if assigned {
            Ok(())
        } else {
            Err(RuntimeError::at(
                RuntimeErrorKind::VariableAssignedBeforeDefined(name.to_string()),
                span,
            ))
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, span: Span) -> Result<Value> {
        let callable = match callee {
            Value::Callable(callable) => callable,
            other => {
                return Err(RuntimeError::at(
                    RuntimeErrorKind::CannotCall(other.type_name()),
                    span,
                ))
            }
        };

        if args.len() != callable.arity() {
            return Err(RuntimeError::at(
                RuntimeErrorKind::IncorrectArgLength {
                    expected: callable.arity(),
                    got: args.len(),
                },
                span,
            ));
        }

        match &*callable {
            Callable::Native(native) => {
                tracing::trace!(name = %native.name, "calling native");
                (native.handler)(&args).map_err(|message| {
                    RuntimeError::at(
                        RuntimeErrorKind::NativeFailure {
                            name: native.name.clone(),
                            message,
                        },
                        span,
                    )
                })
            }
            Callable::User(function) => {
                if self.call_depth >= self.config.max_call_depth {
                    return Err(RuntimeError::at(
                        RuntimeErrorKind::StackOverflow(self.config.max_call_depth),
                        span,
                    ));
                }

                // Parent is the captured scope, not the caller's
                let frame = Environment::with_parent(&function.closure);
                {
                    let mut frame = frame.borrow_mut();
                    for (param, arg) in function.decl.params.iter().zip(args) {
                        frame.define(param.as_str(), arg);
                    }
                }

                self.call_depth += 1;
                let flow = self.execute_block(&function.decl.body, frame);
                self.call_depth -= 1;

                match flow? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Nil),
                }
            }
        }
    }
}

fn bad_type(expected: &'static str, found: String, span: Span) -> RuntimeError {
    RuntimeError::at(RuntimeErrorKind::BadType { expected, found }, span)
}

fn numbers(left: &Value, right: &Value, span: Span) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(bad_type(
            "numbers",
            format!("{} and {}", left.type_name(), right.type_name()),
            span,
        )),
    }
}

fn binary_op(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (left, right) => Err(bad_type(
                "two numbers or two strings",
                format!("{} and {}", left.type_name(), right.type_name()),
                span,
            )),
        },
        BinaryOp::Sub => numbers(&left, &right, span).map(|(a, b)| Value::Number(a - b)),
        BinaryOp::Mul => numbers(&left, &right, span).map(|(a, b)| Value::Number(a * b)),
        BinaryOp::Div => numbers(&left, &right, span).map(|(a, b)| Value::Number(a / b)),
        BinaryOp::Lt => numbers(&left, &right, span).map(|(a, b)| Value::Bool(a < b)),
        BinaryOp::Le => numbers(&left, &right, span).map(|(a, b)| Value::Bool(a <= b)),
        BinaryOp::Gt => numbers(&left, &right, span).map(|(a, b)| Value::Bool(a > b)),
        BinaryOp::Ge => numbers(&left, &right, span).map(|(a, b)| Value::Bool(a >= b)),
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
    }
}

/// Object keys are strings; numbers are accepted and rendered as text
fn object_key(key: &Value, span: Span) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(RuntimeError::at(
            RuntimeErrorKind::InvalidAccessType {
                key: other.type_name(),
                target: "object",
            },
            span,
        )),
    }
}

fn get_property(object: &Value, key: &Value, span: Span) -> Result<Value> {
    if let Value::String(name) = key {
        if let Some(method) = builtins::lookup(object, name) {
            return Ok(method);
        }
    }

    match object {
        Value::Array(items) => {
            let index = match key {
                Value::Number(n) => *n,
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                    RuntimeError::at(
                        RuntimeErrorKind::CannotAccessProperty {
                            property: s.clone(),
                            target: "array",
                        },
                        span,
                    )
                })?,
                other => {
                    return Err(RuntimeError::at(
                        RuntimeErrorKind::InvalidAccessType {
                            key: other.type_name(),
                            target: "array",
                        },
                        span,
                    ))
                }
            };

            let items = items.borrow();
            let in_bounds = index >= 0.0 && index.fract() == 0.0 && (index as usize) < items.len();
            if in_bounds {
                Ok(items[index as usize].clone())
            } else {
                Err(RuntimeError::at(
                    RuntimeErrorKind::BadIndex {
                        index: index.to_string(),
                        len: items.len(),
                    },
                    span,
                ))
            }
        }
        Value::Object(entries) => {
            let key = object_key(key, span)?;
            Ok(entries.borrow().get(&key).cloned().unwrap_or(Value::Nil))
        }
        other => Err(RuntimeError::at(
            RuntimeErrorKind::CannotAccessProperty {
                property: key.to_string(),
                target: other.type_name(),
            },
            span,
        )),
    }
}
