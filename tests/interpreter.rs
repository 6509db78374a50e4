use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use jlox::error::LoxError;
use jlox::interpreter::Interpreter;
use jlox::parser::Parser;
use jlox::resolver::Resolver;
use jlox::scanner;

/// `print` sink shared between the test and the interpreter.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Scan, parse, resolve, and interpret `source`, capturing everything it
/// prints.  Static errors panic the test; runtime errors are returned.
fn try_run(source: &str) -> Result<String, LoxError> {
    let (tokens, scan_errors) = scanner::scan(source);
    assert!(scan_errors.is_empty(), "scan errors: {:?}", scan_errors);

    let (statements, parse_errors) = Parser::new(tokens).parse();
    assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);

    let buffer = SharedBuffer::default();
    let mut interpreter = Interpreter::with_writer(Box::new(buffer.clone()));

    if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
        panic!("resolve errors: {:?}", errors);
    }

    interpreter.interpret(&statements)?;

    let bytes = buffer.0.borrow().clone();
    Ok(String::from_utf8(bytes).expect("interpreter output is UTF-8"))
}

fn run(source: &str) -> String {
    try_run(source).expect("program should succeed")
}

fn run_error(source: &str) -> String {
    try_run(source)
        .expect_err("program should fail at runtime")
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic() {
    assert_eq!(run("print 1 + 2;"), "3\n");
    assert_eq!(run("print 2 + 3 * 4;"), "14\n");
    assert_eq!(run("print (2 + 3) * 4;"), "20\n");
    assert_eq!(run("print 1 - 2 - 3;"), "-4\n");
}

#[test]
fn number_stringification() {
    assert_eq!(run("print 1.0;"), "1\n");
    assert_eq!(run("print 2.5;"), "2.5\n");
    assert_eq!(run("print 10 / 4;"), "2.5\n");
}

#[test]
fn division_follows_ieee_754() {
    assert_eq!(run("print 1 / 0;"), "inf\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn truthiness() {
    // Only nil and false are falsey; 0 and "" count as true.
    assert_eq!(run("print !!0;"), "true\n");
    assert_eq!(run("print !!\"\";"), "true\n");
    assert_eq!(run("print !!nil;"), "false\n");
    assert_eq!(run("print !!false;"), "false\n");
}

#[test]
fn equality() {
    assert_eq!(run("print nil == nil;"), "true\n");
    assert_eq!(run("print nil == 0;"), "false\n");
    assert_eq!(run("print 1 == 1;"), "true\n");
    assert_eq!(run("print \"a\" == \"a\";"), "true\n");
    assert_eq!(run("print 1 == \"1\";"), "false\n");
    assert_eq!(run("print 1 != 2;"), "true\n");
}

#[test]
fn functions_compare_by_identity() {
    assert_eq!(run("fun f() {} var g = f; print g == f;"), "true\n");
    assert_eq!(run("fun f() {} fun g() {} print f == g;"), "false\n");
}

#[test]
fn logical_operators_yield_the_operand() {
    assert_eq!(run("print nil or \"yes\";"), "yes\n");
    assert_eq!(run("print 1 and 2;"), "2\n");
    assert_eq!(run("print false and 2;"), "false\n");
}

#[test]
fn or_short_circuits() {
    let out = run("var called = false;
                   fun sideEffect() { called = true; return true; }
                   print true or sideEffect();
                   print called;");

    assert_eq!(out, "true\nfalse\n");
}

#[test]
fn and_short_circuits() {
    let out = run("var called = false;
                   fun sideEffect() { called = true; return false; }
                   print false and sideEffect();
                   print called;");

    assert_eq!(out, "false\nfalse\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Variables and scopes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn globals_may_be_redefined() {
    assert_eq!(run("var a = \"hi\"; var a = \"bye\"; print a;"), "bye\n");
}

#[test]
fn uninitialized_variables_are_nil() {
    assert_eq!(run("var a; print a;"), "nil\n");
}

#[test]
fn blocks_shadow_and_restore() {
    let out = run("{ var a = \"x\"; { var a = \"y\"; print a; } print a; }");

    assert_eq!(out, "y\nx\n");
}

#[test]
fn closures_capture_the_declaration_environment() {
    let out = run("fun makeCounter() {
                     var i = 0;
                     fun count() { i = i + 1; print i; }
                     return count;
                   }
                   var c = makeCounter();
                   c();
                   c();");

    assert_eq!(out, "1\n2\n");
}

#[test]
fn closures_are_stable_against_later_shadowing() {
    // The resolver freezes each reference to the binding visible at
    // declaration time, so both calls see the global.
    let out = run("var a = \"global\";
                   {
                     fun showA() { print a; }
                     showA();
                     var a = \"block\";
                     showA();
                   }");

    assert_eq!(out, "global\nglobal\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn if_else() {
    assert_eq!(run("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
    assert_eq!(run("if (nil) print \"yes\"; else print \"no\";"), "no\n");
}

#[test]
fn dangling_else_runs_with_the_inner_if() {
    assert_eq!(run("if (true) if (false) print 1; else print 2;"), "2\n");
}

#[test]
fn while_loop() {
    let out = run("var n = 3;
                   while (n > 0) {
                     print n;
                     n = n - 1;
                   }");

    assert_eq!(out, "3\n2\n1\n");
}

#[test]
fn for_loop_matches_manual_desugaring() {
    let for_version = run("for (var i = 0; i < 3; i = i + 1) print i;");

    let while_version = run("{
                               var i = 0;
                               while (i < 3) {
                                 {
                                   print i;
                                 }
                                 i = i + 1;
                               }
                             }");

    assert_eq!(for_version, "0\n1\n2\n");
    assert_eq!(for_version, while_version);
}

#[test]
fn return_unwinds_out_of_loops_and_blocks() {
    assert_eq!(run("fun f() { while (true) { return 1; } } print f();"), "1\n");
}

#[test]
fn falling_off_the_end_returns_nil() {
    assert_eq!(run("fun f() {} print f();"), "nil\n");
}

#[test]
fn recursion() {
    let out = run("fun fib(n) {
                     if (n < 2) return n;
                     return fib(n - 1) + fib(n - 2);
                   }
                   print fib(10);");

    assert_eq!(out, "55\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Classes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn this_refers_to_the_receiver() {
    let out = run("class Egotist {
                     speak() { print this; }
                   }
                   var e = Egotist();
                   e.speak();");

    assert_eq!(out, "Egotist instance\n");
}

#[test]
fn initializer_returns_the_instance() {
    assert_eq!(
        run("class Foo { init() { return; } } print Foo().init();"),
        "Foo instance\n"
    );
}

#[test]
fn reinvoking_init_yields_the_same_instance() {
    let out = run("class Foo { init() { this.x = 1; } }
                   var foo = Foo();
                   print foo.init() == foo;");

    assert_eq!(out, "true\n");
}

#[test]
fn initializer_arguments_set_up_state() {
    let out = run("class Person {
                     init(name) { this.name = name; }
                     sayName() { print this.name; }
                   }
                   Person(\"Jane\").sayName();");

    assert_eq!(out, "Jane\n");
}

#[test]
fn bound_methods_remember_their_receiver() {
    let out = run("class Person {
                     init(name) { this.name = name; }
                     sayName() { print this.name; }
                   }
                   var m = Person(\"Jane\").sayName;
                   m();");

    assert_eq!(out, "Jane\n");
}

#[test]
fn methods_mutate_per_instance_state() {
    let out = run("class Counter {
                     init() { this.count = 0; }
                     bump() { this.count = this.count + 1; return this.count; }
                   }
                   var a = Counter();
                   var b = Counter();
                   print a.bump();
                   print a.bump();
                   print b.bump();");

    assert_eq!(out, "1\n2\n1\n");
}

#[test]
fn fields_shadow_methods() {
    let out = run("class Box {
                     label() { return \"method\"; }
                   }
                   var box = Box();
                   print box.label() ;
                   box.label = \"field\";
                   print box.label;");

    assert_eq!(out, "method\nfield\n");
}

#[test]
fn set_expression_yields_the_assigned_value() {
    assert_eq!(run("class F {} var f = F(); print f.x = 42;"), "42\n");
}

#[test]
fn methods_may_construct_their_own_class() {
    let out = run("class Factory {
                     make() { return Factory(); }
                   }
                   print Factory().make();");

    assert_eq!(out, "Factory instance\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Values on display
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn callables_stringify() {
    assert_eq!(run("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(run("class C {} print C;"), "C\n");
    assert_eq!(run("print clock;"), "<native fn>\n");
}

#[test]
fn clock_returns_seconds() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn unary_minus_requires_a_number() {
    assert_eq!(run_error("print -\"x\";"), "Operand must be a number.\n[line 1]");
}

#[test]
fn plus_requires_matching_operands() {
    assert_eq!(
        run_error("print 1 + \"x\";"),
        "Operands must be two numbers or two strings.\n[line 1]"
    );
}

#[test]
fn comparison_requires_numbers() {
    assert_eq!(
        run_error("print \"a\" < \"b\";"),
        "Operands must be numbers.\n[line 1]"
    );
}

#[test]
fn undefined_global() {
    assert_eq!(
        run_error("print missing;"),
        "Undefined variable 'missing'.\n[line 1]"
    );
}

#[test]
fn undefined_global_assignment() {
    assert_eq!(
        run_error("missing = 1;"),
        "Undefined variable 'missing'.\n[line 1]"
    );
}

#[test]
fn arity_mismatch() {
    assert_eq!(
        run_error("fun f(a, b) {} f(1);"),
        "Expected 2 arguments but got 1.\n[line 1]"
    );
}

#[test]
fn only_callables_can_be_called() {
    assert_eq!(
        run_error("\"not a function\"();"),
        "Can only call functions and classes.\n[line 1]"
    );
}

#[test]
fn properties_require_instances() {
    assert_eq!(
        run_error("var x = 1; print x.y;"),
        "Only instances have properties.\n[line 1]"
    );
    assert_eq!(
        run_error("var x = 1; x.y = 2;"),
        "Only instances have fields.\n[line 1]"
    );
}

#[test]
fn undefined_property() {
    assert_eq!(
        run_error("class F {} print F().nope;"),
        "Undefined property 'nope'.\n[line 1]"
    );
}

#[test]
fn runtime_errors_report_the_offending_line() {
    let message = run_error("var a = 1;\nvar b = 2;\nprint a + \"x\";");

    assert_eq!(
        message,
        "Operands must be two numbers or two strings.\n[line 3]"
    );
}

#[test]
fn runtime_errors_abort_the_rest_of_the_run() {
    // The first print succeeds, the second blows up, the third never runs.
    let source = "print 1; print -\"x\"; print 2;";

    let (tokens, _) = scanner::scan(source);
    let (statements, _) = Parser::new(tokens).parse();

    let buffer = SharedBuffer::default();
    let mut interpreter = Interpreter::with_writer(Box::new(buffer.clone()));
    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("resolves cleanly");

    assert!(interpreter.interpret(&statements).is_err());

    let printed = String::from_utf8(buffer.0.borrow().clone()).unwrap();
    assert_eq!(printed, "1\n");
}
