/// Result domain of the evaluator. `Null` stands for "statically
/// unresolved" and renders as the empty string everywhere a string is
/// expected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
}

impl Value {
    /// Branch conditions require an actual boolean `true`; every other
    /// value falls through to the `else` side.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Text the value contributes to a report or a concatenation,
    /// following PHP string conversion. Unresolved contributes nothing.
    pub fn into_text(self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(value) => value.to_string(),
            Value::String(value) => value,
        }
    }
}
