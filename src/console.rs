//! Default host adapter
//!
//! Wraps an interpreter the way an operator console uses it: a couple of
//! console natives are bound up front, each line is evaluated on its own,
//! and results are rendered as text for a terminal.

use crate::config::Config;
use crate::interpreter::{Interpreter, RunResult};
use crate::value::Value;
use colored::Colorize;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Console {
    interpreter: Interpreter,
}

impl Console {
    /// Console whose `print` writes to stdout
    pub fn new(config: Config) -> Self {
        Self::with_writer(config, std::io::stdout())
    }

    /// Console whose `print` writes to `writer`
    pub fn with_writer<W: Write + 'static>(config: Config, writer: W) -> Self {
        let mut interpreter = Interpreter::with_config(config);
        let out = Rc::new(RefCell::new(writer));

        interpreter.bind("print", 1, move |args| {
            let mut out = out.borrow_mut();
            writeln!(out, "{}", args[0]).map_err(|e| e.to_string())?;
            Ok(Value::Nil)
        });

        interpreter.bind("clock", 0, |_| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| Value::Number(elapsed.as_secs_f64()))
                .map_err(|e| e.to_string())
        });

        Self { interpreter }
    }

    /// Evaluate one console line; errors carry the line for caret display
    pub fn eval_line(&mut self, line: &str) -> RunResult {
        self.interpreter.run(line).map_err(|err| err.with_source(line))
    }

    /// Text to show for a result, or `None` when there is nothing to say
    pub fn render(&self, result: &RunResult) -> Option<String> {
        let color = self.interpreter.config().color;
        match result {
            Ok(Value::Nil) => None,
            Ok(value) if color => Some(format!("{} {}", "=>".dimmed(), value.to_string().cyan())),
            Ok(value) => Some(format!("=> {}", value)),
            Err(err) if color => Some(err.to_string().red().to_string()),
            Err(err) => Some(err.to_string()),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Access for hosts that bind their own natives
    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}
