//! End-to-end behaviour of `run`, one stage failure at a time

use pretty_assertions::assert_eq;
use rogscript::{
    run, Interpreter, ParseErrorKind, ResolveErrorKind, RunError, RuntimeErrorKind,
    ScanErrorKind, Value,
};

fn resolve_kind(source: &str) -> ResolveErrorKind {
    match run(source) {
        Err(RunError::Resolve(err)) => err.kind,
        other => panic!("expected resolve error, got {:?}", other),
    }
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(run("1 + 2 * 3"), Ok(Value::Number(7.0)));
    assert_eq!(run("(1 + 2) * 3"), Ok(Value::Number(9.0)));
    assert_eq!(run("10 / 4"), Ok(Value::Number(2.5)));
}

#[test]
fn test_resolve_errors() {
    assert_eq!(
        resolve_kind("var a = a;"),
        ResolveErrorKind::ReadDuringInitialization("a".to_string())
    );
    assert_eq!(
        resolve_kind("var a = 1; var a = 2;"),
        ResolveErrorKind::ReassignedVariable("a".to_string())
    );
    assert_eq!(resolve_kind("return 1;"), ResolveErrorKind::InvalidReturnOutsideFunction);
}

#[test]
fn test_redeclaring_across_lines_is_allowed() {
    let mut interpreter = Interpreter::new();
    interpreter.run("var a = 1;").expect("first declaration");
    assert_eq!(interpreter.run("var a = 2; a"), Ok(Value::Number(2.0)));
}

#[test]
fn test_resolve_error_runs_nothing() {
    let mut interpreter = Interpreter::new();
    let result = interpreter.run("var ran = true; return 1;");
    assert!(matches!(result, Err(RunError::Resolve(_))));
    assert_eq!(interpreter.get_global("ran"), None);
}

#[test]
fn test_array_length_and_bad_index() {
    assert_eq!(run("[10,20,30].length()"), Ok(Value::Number(3.0)));
    match run("[10,20,30][5]") {
        Err(RunError::Runtime(err)) => {
            assert_eq!(
                err.kind,
                RuntimeErrorKind::BadIndex { index: "5".to_string(), len: 3 }
            );
        }
        other => panic!("expected bad index, got {:?}", other),
    }
}

#[test]
fn test_unterminated_string_is_one_scan_error() {
    match run("\"abc") {
        Err(RunError::Scan(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind, ScanErrorKind::UnterminatedString);
            assert_eq!(errors[0].line(), Some(1));
            assert_eq!(errors[0].column(), Some(1));
        }
        other => panic!("expected scan error, got {:?}", other),
    }
}

#[test]
fn test_scan_errors_stop_before_parsing() {
    match run("(1 + & 2") {
        Err(RunError::Scan(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind, ScanErrorKind::BadCharacter('&'));
        }
        other => panic!("expected scan error, got {:?}", other),
    }
}

#[test]
fn test_parse_error_aborts_whole_line() {
    let mut interpreter = Interpreter::new();
    match interpreter.run("var ok = 1; (2 + 3") {
        Err(RunError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::UnmatchedParen),
        other => panic!("expected parse error, got {:?}", other),
    }
    assert_eq!(interpreter.get_global("ok"), None);
}

#[test]
fn test_error_messages() {
    let err = run("var a = a;").unwrap_err();
    assert_eq!(err.stage(), "resolve");
    assert_eq!(
        err.to_string(),
        "[line 1:9] Error: cannot read 'a' in its own initializer"
    );
}

#[test]
fn test_comment_only_line_is_nil() {
    assert_eq!(run("// nothing here"), Ok(Value::Nil));
    assert_eq!(run(""), Ok(Value::Nil));
}

#[test]
fn test_self_referencing_arrays_compare() {
    assert_eq!(
        run("var a = []; a.push(a); var b = []; b.push(b); a == b"),
        Ok(Value::Bool(true))
    );
    assert_eq!(
        run("var a = [1]; a.push(a); var b = [2]; b.push(b); a == b"),
        Ok(Value::Bool(false))
    );
}
