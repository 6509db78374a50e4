use jlox::ast::{Expr, LiteralValue, Stmt};
use jlox::ast_printer::AstPrinter;
use jlox::error::LoxError;
use jlox::parser::Parser;
use jlox::scanner;

fn parse(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
    let (tokens, scan_errors) = scanner::scan(source);
    assert!(scan_errors.is_empty(), "scan errors: {:?}", scan_errors);

    Parser::new(tokens).parse()
}

fn parse_ok(source: &str) -> Vec<Stmt> {
    let (statements, errors) = parse(source);
    assert!(errors.is_empty(), "parse errors: {:?}", errors);

    statements
}

/// Parse a single expression statement and hand back its expression.
fn parse_expr(source: &str) -> Expr {
    let mut statements = parse_ok(&format!("{};", source));
    assert_eq!(statements.len(), 1);

    match statements.remove(0) {
        Stmt::Expression(expr) => expr,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

fn printed(source: &str) -> String {
    AstPrinter::print(&parse_expr(source))
}

fn error_messages(source: &str) -> Vec<String> {
    let (_, errors) = parse(source);
    errors.iter().map(ToString::to_string).collect()
}

// ─────────────────────────────────────────────────────────────────────────
// Precedence and associativity
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(printed("2 + 3 * 4"), "(+ 2.0 (* 3.0 4.0))");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(printed("(2 + 3) * 4"), "(* (group (+ 2.0 3.0)) 4.0)");
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(printed("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    assert_eq!(printed("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
}

#[test]
fn comparison_binds_tighter_than_equality() {
    assert_eq!(printed("1 < 2 == true"), "(== (< 1.0 2.0) true)");
}

#[test]
fn unary_is_right_associative() {
    assert_eq!(printed("!!ready"), "(! (! ready))");
    assert_eq!(printed("--n"), "(- (- n))");
}

#[test]
fn unary_minus_applies_to_whole_property_access() {
    assert_eq!(printed("-a.b"), "(- (get a b))");
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(printed("a or b and c"), "(or a (and b c))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(printed("a = b = 2"), "(= a (= b 2.0))");
}

#[test]
fn assignment_to_property_becomes_set() {
    assert_eq!(printed("a.b = 2"), "(set a b 2.0)");
}

#[test]
fn calls_and_gets_chain_left_to_right() {
    assert_eq!(printed("f(1)(2).g"), "(get (call (call f 1.0) 2.0) g)");
    assert_eq!(printed("this.x"), "(get this x)");
}

// ─────────────────────────────────────────────────────────────────────────
// Statements and declarations
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn for_loop_desugars_into_while() {
    let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");
    assert_eq!(statements.len(), 1);

    // { var i = 0; while (i < 3) { print i; i = i + 1; } }
    let outer = match &statements[0] {
        Stmt::Block(stmts) => stmts,
        other => panic!("expected block, got {:?}", other),
    };
    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let body = match &outer[1] {
        Stmt::While { body, .. } => body,
        other => panic!("expected while, got {:?}", other),
    };

    match body.as_ref() {
        Stmt::Block(inner) => {
            assert_eq!(inner.len(), 2);
            assert!(matches!(inner[0], Stmt::Print(_)));
            assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
        }
        other => panic!("expected block body, got {:?}", other),
    }
}

#[test]
fn empty_for_clauses_desugar_minimally() {
    let statements = parse_ok("for (;;) print 1;");

    // No initializer and no increment means no wrapping blocks, and the
    // missing condition becomes a literal `true`.
    match &statements[0] {
        Stmt::While { condition, body } => {
            assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
            assert!(matches!(body.as_ref(), Stmt::Print(_)));
        }
        other => panic!("expected while, got {:?}", other),
    }
}

#[test]
fn class_declaration_collects_methods() {
    let statements = parse_ok("class Foo { bar() { } init(a, b) { } }");

    match &statements[0] {
        Stmt::Class { name, methods } => {
            assert_eq!(name.lexeme, "Foo");
            assert_eq!(methods.len(), 2);
            assert_eq!(methods[0].name.lexeme, "bar");
            assert_eq!(methods[1].name.lexeme, "init");
            assert_eq!(methods[1].params.len(), 2);
        }
        other => panic!("expected class, got {:?}", other),
    }
}

#[test]
fn return_without_value() {
    let statements = parse_ok("fun f() { return; }");

    match &statements[0] {
        Stmt::Function(decl) => match &decl.body[0] {
            Stmt::Return { value, .. } => assert!(value.is_none()),
            other => panic!("expected return, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn dangling_else_binds_to_nearest_if() {
    let statements = parse_ok("if (a) if (b) print 1; else print 2;");

    match &statements[0] {
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            assert!(else_branch.is_none());
            assert!(matches!(
                then_branch.as_ref(),
                Stmt::If {
                    else_branch: Some(_),
                    ..
                }
            ));
        }
        other => panic!("expected if, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Errors and recovery
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn invalid_assignment_target_reports_without_synchronizing() {
    let (statements, errors) = parse("1 = 2;");

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at '=': Invalid assignment target."
    );

    // The parser keeps the left-hand side and carries on.
    assert_eq!(statements.len(), 1);
}

#[test]
fn missing_semicolon_is_reported_at_end() {
    let messages = error_messages("print 1");

    assert_eq!(messages, vec!["[line 1] Error at end: Expect ';' after value."]);
}

#[test]
fn synchronize_recovers_at_statement_boundary() {
    let (statements, errors) = parse("var = 1;\nprint 2;");

    // The bad declaration is discarded; the next statement parses fine.
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Expect variable name."));
    assert_eq!(statements.len(), 1);
    assert!(matches!(statements[0], Stmt::Print(_)));
}

#[test]
fn recovery_inside_blocks_keeps_the_block() {
    let (statements, errors) = parse("{ var = 1; print 2; }");

    assert_eq!(errors.len(), 1);

    match &statements[0] {
        Stmt::Block(inner) => {
            assert_eq!(inner.len(), 1);
            assert!(matches!(inner[0], Stmt::Print(_)));
        }
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn super_is_rejected_with_a_clear_message() {
    let messages = error_messages("print super.x;");

    assert!(
        messages
            .iter()
            .any(|m| m.contains("'super' expressions are not supported.")),
        "got: {:?}",
        messages
    );
}

#[test]
fn more_than_255_arguments_is_reported_but_parses() {
    let args = (0..256).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let (statements, errors) = parse(&format!("f({});", args));

    assert!(errors
        .iter()
        .any(|e| e.to_string().contains("Can't have more than 255 arguments.")));
    assert_eq!(statements.len(), 1);
}

#[test]
fn more_than_255_parameters_is_reported_but_parses() {
    let params = (0..256)
        .map(|i| format!("p{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let (statements, errors) = parse(&format!("fun f({}) {{ }}", params));

    assert!(errors
        .iter()
        .any(|e| e.to_string().contains("Can't have more than 255 parameters.")));
    assert_eq!(statements.len(), 1);
}
