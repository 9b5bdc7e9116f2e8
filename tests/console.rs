//! Host bridge and console adapter tests

use rogscript::{Config, Console, Interpreter, RunError, RuntimeErrorKind, Value};
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

/// Writer the test keeps a handle to after giving it to the console
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn runtime_kind(result: Result<Value, RunError>) -> RuntimeErrorKind {
    match result {
        Err(RunError::Runtime(err)) => err.kind,
        other => panic!("expected runtime error, got {:?}", other),
    }
}

fn interpreter_with_add() -> Interpreter {
    let mut interpreter = Interpreter::new();
    interpreter.bind("add", 2, |args| match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        _ => Err("add expects numbers".to_string()),
    });
    interpreter
}

#[test]
fn test_native_arity_is_exact() {
    let mut interpreter = interpreter_with_add();

    assert_eq!(
        runtime_kind(interpreter.run("add(1)")),
        RuntimeErrorKind::IncorrectArgLength { expected: 2, got: 1 }
    );
    assert_eq!(
        runtime_kind(interpreter.run("add(1, 2, 3)")),
        RuntimeErrorKind::IncorrectArgLength { expected: 2, got: 3 }
    );
    assert_eq!(interpreter.run("add(1, 2)"), Ok(Value::Number(3.0)));
}

#[test]
fn test_native_failure_carries_message() {
    let mut interpreter = interpreter_with_add();
    assert_eq!(
        runtime_kind(interpreter.run("add(\"a\", 1)")),
        RuntimeErrorKind::NativeFailure {
            name: "add".to_string(),
            message: "add expects numbers".to_string(),
        }
    );
}

#[test]
fn test_short_circuit_skips_native_side_effects() {
    let calls = Rc::new(Cell::new(0));
    let mut interpreter = Interpreter::new();
    let counter = Rc::clone(&calls);
    interpreter.bind("sideEffectCall", 0, move |_| {
        counter.set(counter.get() + 1);
        Ok(Value::Bool(true))
    });

    assert_eq!(interpreter.run("false && sideEffectCall()"), Ok(Value::Bool(false)));
    assert_eq!(interpreter.run("true || sideEffectCall()"), Ok(Value::Bool(true)));
    assert_eq!(calls.get(), 0);

    assert_eq!(interpreter.run("false || sideEffectCall()"), Ok(Value::Bool(true)));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_side_effects_before_error_are_kept() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::new();
    let sink = Rc::clone(&log);
    interpreter.bind("record", 1, move |args| {
        sink.borrow_mut().push(args[0].clone());
        Ok(Value::Nil)
    });

    let result = interpreter.run("record(1); record(2); 1 + nil; record(3);");
    assert!(matches!(result, Err(RunError::Runtime(_))));
    assert_eq!(*log.borrow(), vec![Value::Number(1.0), Value::Number(2.0)]);
}

#[test]
fn test_natives_are_first_class_values() {
    let mut interpreter = interpreter_with_add();
    assert_eq!(interpreter.run("var plus = add; plus(2, 2)"), Ok(Value::Number(4.0)));
}

#[test]
fn test_print_goes_to_console_writer() {
    let buffer = SharedBuffer::default();
    let mut console = Console::with_writer(Config::default(), buffer.clone());

    let result = console.eval_line("print(\"hp\"); print([1, 2]); print(nil);");
    assert_eq!(result, Ok(Value::Nil));
    assert_eq!(buffer.contents(), "hp\n[1, 2]\nnil\n");
}

#[test]
fn test_render_plain() {
    let config = Config::default().with_color(false);
    let mut console = Console::with_writer(config, SharedBuffer::default());

    let value = console.eval_line("1 + 2 * 3");
    assert_eq!(console.render(&value).as_deref(), Some("=> 7"));

    let nothing = console.eval_line("var x = 1;");
    assert_eq!(console.render(&nothing), None);

    let error = console.eval_line("x()");
    assert_eq!(
        console.render(&error).as_deref(),
        Some("[line 1:1] Error: can only call functions, got number\n  | x()\n  | ^")
    );
}

#[test]
fn test_clock_returns_number() {
    let mut console = Console::with_writer(Config::default(), SharedBuffer::default());
    match console.eval_line("clock()") {
        Ok(Value::Number(seconds)) => assert!(seconds > 0.0),
        other => panic!("expected number, got {:?}", other),
    }
}

#[test]
fn test_host_can_bind_more_natives() {
    let mut console = Console::with_writer(Config::default(), SharedBuffer::default());
    console
        .interpreter_mut()
        .bind("entityCount", 0, |_| Ok(Value::Number(12.0)));
    assert_eq!(console.eval_line("entityCount() > 10"), Ok(Value::Bool(true)));
}
