use rogscript::run;
use rogscript::value::Value;
use rogscript::Interpreter;

#[test]
fn test_basic_closure() {
    let source = r#"
        var x = "global";
        var makeClosure = () => {
            var y = "captured";
            var inner = () => {
                return x + " " + y;
            };
            return inner;
        };
        var closure = makeClosure();
        closure()
    "#;
    let result = run(source).expect("Execution failed");
    match result {
        Value::String(s) => assert_eq!(s, "global captured"),
        _ => panic!("Expected string, got {:?}", result),
    }
}

#[test]
fn test_counter_captures_by_reference() {
    let mut interpreter = Interpreter::new();
    interpreter
        .run("var make = (x) => { return () => { x = x + 1; return x; }; };")
        .expect("define make");
    interpreter.run("var c = make(0);").expect("create counter");

    assert_eq!(interpreter.run("c()"), Ok(Value::Number(1.0)));
    assert_eq!(interpreter.run("c()"), Ok(Value::Number(2.0)));
}

#[test]
fn test_independent_counters() {
    let source = r#"
        var makeCounter = () => {
            var i = 0;
            return () => { i = i + 1; return i; };
        };
        var c1 = makeCounter();
        var c2 = makeCounter();
        var r1 = c1();
        var r2 = c1();
        var r3 = c2();
        [r1, r2, r3]
    "#;
    let result = run(source).expect("Execution failed");
    assert_eq!(result.to_string(), "[1, 2, 1]");
}

#[test]
fn test_closed_scope_outlives_call() {
    let source = r#"
        var outer = () => {
            var make = () => {
                var a = "first";
                return () => { return a; };
            };
            var f1 = make();
            return f1();
        };
        outer()
    "#;
    let result = run(source).expect("Execution failed");
    match result {
        Value::String(s) => assert_eq!(s, "first"),
        _ => panic!("Expected string, got {:?}", result),
    }
}

#[test]
fn test_closures_share_one_binding() {
    let source = r#"
        var pair = () => {
            var n = 0;
            return {
                inc: () => { n = n + 1; return n; },
                get: () => { return n; }
            };
        };
        var p = pair();
        p.inc();
        p.inc();
        p.get()
    "#;
    assert_eq!(run(source), Ok(Value::Number(2.0)));
}

#[test]
fn test_closure_survives_across_lines() {
    let mut interpreter = Interpreter::new();
    interpreter
        .run("var adder = (n) => { return (m) => { return n + m; }; };")
        .expect("define adder");
    interpreter.run("var add5 = adder(5);").expect("bind add5");
    // Later lines reuse node ids from a fresh parse; the old closure must
    // still find its variables
    interpreter.run("var n = 100; var m = 200;").expect("unrelated globals");
    assert_eq!(interpreter.run("add5(1)"), Ok(Value::Number(6.0)));
}

#[test]
fn test_function_values_as_arguments() {
    let source = r#"
        var apply = (f, v) => { return f(v); };
        apply((x) => { return x * 2; }, 21)
    "#;
    assert_eq!(run(source), Ok(Value::Number(42.0)));
}
