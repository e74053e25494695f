use crate::analysis::{collector::Collector, evaluator::Evaluator};
use crate::language::{ast::Program, errors::SyntaxError, parser::parse_source};
use std::fmt;

/// Names the analysis keys on. Both builtins are configurable so the same
/// pass can track a wrapper like `mail_send` or a project-local constant
/// helper.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    pub target_function: String,
    pub define_builtin: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_function: "mb_send_mail".to_string(),
            define_builtin: "define".to_string(),
        }
    }
}

/// Statically recovered arguments of the target call. Roles that could not
/// be resolved are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detection {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Subject]:")?;
        writeln!(f, "{}", self.subject)?;
        writeln!(f, "[Body]:")?;
        write!(f, "{}", self.body)
    }
}

pub struct Detector {
    config: DetectorConfig,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Runs collection and evaluation over an already-parsed tree.
    /// Arguments map to roles by position: recipient, subject, body;
    /// anything past the third argument is ignored.
    pub fn detect(&self, program: &Program) -> Detection {
        let decls = Collector::collect(program, &self.config);
        let evaluator = Evaluator::new(&decls);
        let mut roles: [String; 3] = Default::default();
        for (index, argument) in decls.target_args.iter().copied().take(roles.len()).enumerate() {
            roles[index] = evaluator.resolve(argument).into_text();
        }
        let [recipient, subject, body] = roles;
        Detection {
            recipient,
            subject,
            body,
        }
    }

    /// Parse + detect. Syntax errors are returned alongside the detection
    /// and never block it; a malformed source just resolves to less.
    pub fn detect_source(&self, source: &str) -> (Detection, Vec<SyntaxError>) {
        let parsed = parse_source(source);
        (self.detect(&parsed.program), parsed.errors)
    }
}
