use crate::analysis::detector::DetectorConfig;
use crate::language::ast::{AssignExpr, CallExpr, Expr, FunctionDef, Program, Stmt};

/// Top-level declarations of interest, bucketed by kind in source order.
/// The pass is shallow: statement bodies are only visited later, when the
/// evaluator inlines a function call. Forward references are fine because
/// all resolution happens lazily against the finished buckets.
pub struct Collector<'a> {
    pub assignments: Vec<&'a AssignExpr>,
    pub functions: Vec<&'a FunctionDef>,
    pub defines: Vec<&'a CallExpr>,
    /// The target call's arguments, in literal argument position.
    pub target_args: Vec<&'a Expr>,
}

impl<'a> Collector<'a> {
    pub fn collect(program: &'a Program, config: &DetectorConfig) -> Self {
        let mut collector = Self {
            assignments: Vec::new(),
            functions: Vec::new(),
            defines: Vec::new(),
            target_args: Vec::new(),
        };
        for stmt in &program.statements {
            match stmt {
                Stmt::Expr(stmt) => collector.collect_expr(&stmt.expr, config),
                Stmt::Function(def) => collector.functions.push(def),
                Stmt::Return(_) | Stmt::If(_) => {}
            }
        }
        collector
    }

    fn collect_expr(&mut self, expr: &'a Expr, config: &DetectorConfig) {
        match expr {
            Expr::Assign(assign) => self.assignments.push(assign),
            Expr::Call(call) if call.name.name == config.define_builtin => {
                self.defines.push(call);
            }
            Expr::Call(call) if call.name.name == config.target_function => {
                // a later call to the target overwrites an earlier one
                self.target_args = call.args.iter().collect();
            }
            _ => {}
        }
    }
}
