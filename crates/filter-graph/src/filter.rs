//! A single filter invocation and its arguments.

use std::fmt;

/// Characters that end an option value inside a filtergraph description.
const GRAPH_METACHARS: &[char] = &[',', ':', ';', '[', ']', '\'', '\\', '=', ' '];

/// Render a number the way it should appear in an argument: no trailing
/// `.0`, no exponent.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

/// Argument value of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Emitted exactly as given.
    Plain(String),
    /// Engine expression; single-quoted when it contains graph metacharacters.
    Expr(String),
    /// Filesystem path; escaped and single-quoted.
    Path(String),
}

impl Value {
    pub fn expr(expr: impl Into<String>) -> Self {
        Self::Expr(expr.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    fn render(&self, out: &mut String) {
        match self {
            Self::Plain(raw) => out.push_str(raw),
            Self::Expr(expr) => {
                if expr.contains(GRAPH_METACHARS) {
                    out.push('\'');
                    out.push_str(&expr.replace('\'', "'\\''"));
                    out.push('\'');
                } else {
                    out.push_str(expr);
                }
            }
            Self::Path(path) => {
                let escaped = path
                    .replace('\\', "\\\\")
                    .replace(':', "\\:")
                    .replace('\'', "\\'");
                out.push('\'');
                out.push_str(&escaped);
                out.push('\'');
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Plain(format_number(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Plain(value.to_string())
    }
}

/// One `key=value` or positional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterArg {
    pub key: Option<String>,
    pub value: Value,
}

/// A filter name plus its ordered arguments, e.g. `xfade=transition=fade:duration=1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a keyed argument.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(FilterArg {
            key: Some(key.into()),
            value: value.into(),
        });
        self
    }

    /// Append a positional argument.
    pub fn positional(mut self, value: impl Into<Value>) -> Self {
        self.args.push(FilterArg {
            key: None,
            value: value.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[FilterArg] {
        &self.args
    }

    /// Look up a keyed argument.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|arg| arg.key.as_deref() == Some(key))
            .map(|arg| &arg.value)
    }

    pub(crate) fn render(&self, out: &mut String) {
        out.push_str(&self.name);
        for (i, arg) in self.args.iter().enumerate() {
            out.push(if i == 0 { '=' } else { ':' });
            if let Some(key) = &arg.key {
                out.push_str(key);
                out.push('=');
            }
            arg.value.render(out);
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, "1")]
    #[case(0.5, "0.5")]
    #[case(-0.0, "0")]
    #[case(1.2, "1.2")]
    #[case(125.0, "125")]
    fn test_format_number(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(format_number(input), expected);
    }

    #[test]
    fn test_filter_without_args() {
        assert_eq!(Filter::new("hflip").to_string(), "hflip");
    }

    #[test]
    fn test_keyed_and_positional_args() {
        let filter = Filter::new("unsharp")
            .positional(5u32)
            .positional(5u32)
            .positional(1.5)
            .arg("chroma_amount", 0.0);
        assert_eq!(filter.to_string(), "unsharp=5:5:1.5:chroma_amount=0");
    }

    #[test]
    fn test_expression_is_quoted_when_needed() {
        let filter = Filter::new("zoompan")
            .arg("z", Value::expr("min(zoom+0.0015,1.2)"))
            .arg("x", Value::expr("iw/2"));
        assert_eq!(filter.to_string(), "zoompan=z='min(zoom+0.0015,1.2)':x=iw/2");
    }

    #[test]
    fn test_path_is_escaped() {
        let filter = Filter::new("subtitles").arg("filename", Value::path("C:\\subs\\it's.srt"));
        assert_eq!(
            filter.to_string(),
            "subtitles=filename='C\\:\\\\subs\\\\it\\'s.srt'"
        );
    }

    #[test]
    fn test_get_keyed_arg() {
        let filter = Filter::new("xfade").arg("offset", 4.0);
        assert_eq!(filter.get("offset"), Some(&Value::Plain("4".to_string())));
        assert_eq!(filter.get("duration"), None);
    }
}
