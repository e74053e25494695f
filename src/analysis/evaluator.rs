use crate::analysis::{collector::Collector, value::Value};
use crate::language::ast::{BinaryExpr, BinaryOp, Expr, IfStmt, Literal, ReturnStmt, Stmt};

// Bound on lookup indirection: variable -> assignment, constant ->
// definition, call -> body. Cyclic programs degrade to unresolved
// instead of overflowing the stack.
const MAX_INDIRECTION: usize = 32;

/// Best-effort static resolution of expressions against the collected
/// top-level declarations. Every lookup re-scans the immutable buckets;
/// there is no environment to mutate, so resolving the same expression
/// twice always yields the same value.
pub struct Evaluator<'a> {
    decls: &'a Collector<'a>,
}

impl<'a> Evaluator<'a> {
    pub fn new(decls: &'a Collector<'a>) -> Self {
        Self { decls }
    }

    /// Never fails: anything that cannot be determined statically comes
    /// back as `Value::Null`.
    pub fn resolve(&self, expr: &Expr) -> Value {
        self.resolve_expr(expr, 0)
    }

    fn resolve_expr(&self, expr: &Expr, depth: usize) -> Value {
        match expr {
            Expr::Literal(Literal::String(value, _)) => Value::String(value.clone()),
            Expr::Literal(Literal::Int(value, _)) => Value::Int(*value),
            Expr::Variable(variable) => self.resolve_variable(&variable.name, depth),
            Expr::ConstFetch(name) => self.resolve_constant(&name.name, depth),
            Expr::Assign(assign) => self.resolve_expr(&assign.value, depth),
            Expr::Binary(binary) => self.resolve_binary(binary, depth),
            Expr::Call(call) => self.resolve_call(&call.name.name, depth),
        }
    }

    // The last assignment to a name shadows earlier ones.
    fn resolve_variable(&self, name: &str, depth: usize) -> Value {
        if depth >= MAX_INDIRECTION {
            return Value::Null;
        }
        for assign in self.decls.assignments.iter().rev() {
            if assign.target.name == name {
                return self.resolve_expr(&assign.value, depth + 1);
            }
        }
        Value::Null
    }

    fn resolve_constant(&self, name: &str, depth: usize) -> Value {
        if depth >= MAX_INDIRECTION {
            return Value::Null;
        }
        for define in &self.decls.defines {
            let Some(name_arg) = define.args.first() else {
                continue;
            };
            let Value::String(defined) = self.resolve_expr(name_arg, depth + 1) else {
                continue;
            };
            if defined != name {
                continue;
            }
            return match define.args.get(1) {
                Some(value_arg) => self.resolve_expr(value_arg, depth + 1),
                None => Value::Null,
            };
        }
        Value::Null
    }

    fn resolve_binary(&self, binary: &BinaryExpr, depth: usize) -> Value {
        let left = self.resolve_expr(&binary.left, depth);
        let right = self.resolve_expr(&binary.right, depth);
        match binary.op {
            BinaryOp::Concat => {
                let mut text = left.into_text();
                text.push_str(&right.into_text());
                Value::String(text)
            }
            BinaryOp::Equal => Value::Bool(left == right),
            BinaryOp::NotEqual => Value::Bool(left != right),
        }
    }

    fn resolve_call(&self, name: &str, depth: usize) -> Value {
        if depth >= MAX_INDIRECTION {
            return Value::Null;
        }
        for def in &self.decls.functions {
            if def.name.name == name {
                return self
                    .resolve_body(&def.body, depth + 1)
                    .unwrap_or(Value::Null);
            }
        }
        Value::Null
    }

    // Walks a statement sequence. `Some` means a `return` fired, possibly
    // one selected by a taken conditional branch; a body that never
    // returns resolves to nothing.
    fn resolve_body(&self, body: &[Stmt], depth: usize) -> Option<Value> {
        for stmt in body {
            match stmt {
                Stmt::Return(ret) => return Some(self.resolve_return(ret, depth)),
                Stmt::If(if_stmt) => {
                    if let Some(value) = self.resolve_if(if_stmt, depth) {
                        return Some(value);
                    }
                }
                Stmt::Expr(_) | Stmt::Function(_) => {}
            }
        }
        None
    }

    fn resolve_return(&self, ret: &ReturnStmt, depth: usize) -> Value {
        match &ret.expr {
            Some(expr) => self.resolve_expr(expr, depth),
            None => Value::Null,
        }
    }

    fn resolve_if(&self, if_stmt: &IfStmt, depth: usize) -> Option<Value> {
        if self.resolve_expr(&if_stmt.condition, depth).is_true() {
            self.resolve_body(&if_stmt.then_branch, depth)
        } else {
            match &if_stmt.else_branch {
                Some(body) => self.resolve_body(body, depth),
                None => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detector::DetectorConfig;
    use crate::language::parser::parse_source;

    fn resolve_in(source: &str, name: &str) -> Value {
        let parsed = parse_source(source);
        assert!(
            parsed.errors.is_empty(),
            "unexpected syntax errors: {:?}",
            parsed.errors
        );
        let config = DetectorConfig::default();
        let decls = Collector::collect(&parsed.program, &config);
        Evaluator::new(&decls).resolve_variable(name, 0)
    }

    #[test]
    fn string_literals_resolve_to_their_content() {
        assert_eq!(
            resolve_in("$v = \"Body text\";", "v"),
            Value::String("Body text".into())
        );
        assert_eq!(
            resolve_in("$v = 'single';", "v"),
            Value::String("single".into())
        );
    }

    #[test]
    fn integers_resolve_to_int() {
        assert_eq!(resolve_in("$v = 42;", "v"), Value::Int(42));
    }

    #[test]
    fn the_last_assignment_shadows_earlier_ones() {
        assert_eq!(
            resolve_in("$v = \"first\"; $v = \"second\";", "v"),
            Value::String("second".into())
        );
    }

    #[test]
    fn variables_chain_through_other_variables() {
        assert_eq!(
            resolve_in("$a = \"x\"; $b = $a;", "b"),
            Value::String("x".into())
        );
    }

    #[test]
    fn concatenation_joins_both_operands() {
        assert_eq!(
            resolve_in("$a = \"Hello\"; $b = \" World\"; $v = $a . $b;", "v"),
            Value::String("Hello World".into())
        );
    }

    #[test]
    fn concatenation_treats_unresolved_operands_as_empty() {
        assert_eq!(
            resolve_in("$v = \"a\" . $missing . \"b\";", "v"),
            Value::String("ab".into())
        );
    }

    #[test]
    fn constants_resolve_through_define() {
        assert_eq!(
            resolve_in("define(\"C\", \"X\"); $v = C;", "v"),
            Value::String("X".into())
        );
    }

    #[test]
    fn constant_names_can_themselves_be_computed() {
        assert_eq!(
            resolve_in("define(\"PRE\" . \"FIX\", \"X\"); $v = PREFIX;", "v"),
            Value::String("X".into())
        );
    }

    #[test]
    fn function_calls_inline_the_first_matching_definition() {
        assert_eq!(
            resolve_in(
                "define(\"C\", \"X\"); function f() { return C; } $v = f();",
                "v"
            ),
            Value::String("X".into())
        );
    }

    #[test]
    fn the_first_return_wins() {
        assert_eq!(
            resolve_in("function f() { return \"a\"; return \"b\"; } $v = f();", "v"),
            Value::String("a".into())
        );
    }

    #[test]
    fn a_function_without_a_return_is_unresolved() {
        assert_eq!(
            resolve_in("function f() { $x = \"a\"; } $v = f();", "v"),
            Value::Null
        );
    }

    #[test]
    fn conditionals_select_the_branch_by_equality() {
        assert_eq!(
            resolve_in(
                "define(\"MODE\", \"prod\");\n\
                 function subject() {\n\
                 if (MODE == \"prod\") { return \"Live\"; } else { return \"Test\"; }\n\
                 }\n\
                 $v = subject();",
                "v"
            ),
            Value::String("Live".into())
        );
        assert_eq!(
            resolve_in(
                "define(\"MODE\", \"dev\");\n\
                 function subject() {\n\
                 if (MODE == \"prod\") { return \"Live\"; } else { return \"Test\"; }\n\
                 }\n\
                 $v = subject();",
                "v"
            ),
            Value::String("Test".into())
        );
    }

    #[test]
    fn a_false_condition_without_else_falls_through() {
        assert_eq!(
            resolve_in(
                "function f() { if (\"a\" == \"b\") { return \"x\"; } return \"y\"; } $v = f();",
                "v"
            ),
            Value::String("y".into())
        );
    }

    #[test]
    fn mixed_kind_equality_is_false() {
        assert_eq!(resolve_in("$v = (\"1\" == 1);", "v"), Value::Bool(false));
        assert_eq!(resolve_in("$v = (1 == 1);", "v"), Value::Bool(true));
        assert_eq!(resolve_in("$v = (\"a\" != \"b\");", "v"), Value::Bool(true));
    }

    #[test]
    fn unknown_names_resolve_to_null() {
        assert_eq!(resolve_in("$v = $missing;", "v"), Value::Null);
        assert_eq!(resolve_in("$v = MISSING;", "v"), Value::Null);
        assert_eq!(resolve_in("$v = missing_fn();", "v"), Value::Null);
    }

    #[test]
    fn recursive_functions_degrade_to_null() {
        assert_eq!(
            resolve_in("function f() { return f(); } $v = f();", "v"),
            Value::Null
        );
    }

    #[test]
    fn cyclic_assignments_degrade_to_null() {
        assert_eq!(resolve_in("$a = $b; $b = $a;", "a"), Value::Null);
    }

    #[test]
    fn resolution_is_idempotent() {
        let parsed = parse_source("$a = \"x\"; $v = $a . \"y\";");
        assert!(parsed.errors.is_empty());
        let config = DetectorConfig::default();
        let decls = Collector::collect(&parsed.program, &config);
        let evaluator = Evaluator::new(&decls);
        let first = evaluator.resolve_variable("v", 0);
        let second = evaluator.resolve_variable("v", 0);
        assert_eq!(first, second);
        assert_eq!(first, Value::String("xy".into()));
    }

    #[test]
    fn concat_resolution_matches_operand_resolution() {
        let parsed = parse_source("$a = \"Hello\"; $b = \" World\"; $v = $a . $b;");
        assert!(parsed.errors.is_empty());
        let config = DetectorConfig::default();
        let decls = Collector::collect(&parsed.program, &config);
        let evaluator = Evaluator::new(&decls);
        let joined = evaluator.resolve_variable("v", 0).into_text();
        let left = evaluator.resolve_variable("a", 0).into_text();
        let right = evaluator.resolve_variable("b", 0).into_text();
        assert_eq!(joined, left + &right);
    }
}
