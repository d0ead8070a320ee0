//! Helper functions shared by every template engine
//!
//! Each engine adapts its own value type into [`FormatArg`] and forwards to
//! these, so `sprintf` and the case helpers behave the same in every template
//! language.

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use thiserror::Error;

/// Names under which the helpers are exposed to templates
pub const SPRINTF: &str = "sprintf";
pub const SNAKE_CASE: &str = "snake_case";
pub const KEBAB_CASE: &str = "kebab_case";
pub const CAMEL_CASE: &str = "camel_case";
pub const PASCAL_CASE: &str = "pascal_case";

/// Errors raised by `sprintf`
#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("missing argument for %{verb} at position {index}")]
    MissingArgument { verb: char, index: usize },
    #[error("{count} argument(s) left unused by the format string")]
    ExtraArguments { count: usize },
    #[error("%d expects an integer, got {value}")]
    NotAnInteger { value: String },
    #[error("unknown format verb %{verb}")]
    UnknownVerb { verb: char },
    #[error("format string ends with a lone '%'")]
    TrailingPercent,
}

/// A single argument to `sprintf`, independent of the engine's value type
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    Str(String),
    Int(i64),
    Float(f64),
    Other(String),
}

impl FormatArg {
    fn display(&self) -> String {
        match self {
            FormatArg::Str(s) | FormatArg::Other(s) => s.clone(),
            FormatArg::Int(i) => i.to_string(),
            FormatArg::Float(f) => f.to_string(),
        }
    }
}

impl From<&serde_json::Value> for FormatArg {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => FormatArg::Str(s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FormatArg::Int(i),
                None => FormatArg::Float(n.as_f64().unwrap_or_default()),
            },
            other => FormatArg::Other(other.to_string()),
        }
    }
}

/// printf-style formatting supporting `%s`, `%v`, `%d`, `%q` and `%%`
pub fn sprintf(format: &str, args: &[FormatArg]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(format.len());
    let mut next = 0;
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let verb = chars.next().ok_or(FormatError::TrailingPercent)?;
        if verb == '%' {
            out.push('%');
            continue;
        }
        let arg = args
            .get(next)
            .ok_or(FormatError::MissingArgument { verb, index: next })?;
        next += 1;
        match verb {
            's' | 'v' => out.push_str(&arg.display()),
            'q' => out.push_str(&format!("{:?}", arg.display())),
            'd' => match arg {
                FormatArg::Int(i) => out.push_str(&i.to_string()),
                other => {
                    return Err(FormatError::NotAnInteger {
                        value: other.display(),
                    })
                }
            },
            other => return Err(FormatError::UnknownVerb { verb: other }),
        }
    }

    if next < args.len() {
        return Err(FormatError::ExtraArguments {
            count: args.len() - next,
        });
    }
    Ok(out)
}

pub fn snake_case(s: &str) -> String {
    s.to_snake_case()
}

pub fn kebab_case(s: &str) -> String {
    s.to_kebab_case()
}

pub fn camel_case(s: &str) -> String {
    s.to_lower_camel_case()
}

pub fn pascal_case(s: &str) -> String {
    s.to_upper_camel_case()
}

/// Case helpers by exposed name, for engines that register them in a loop
pub fn case_helpers() -> [(&'static str, fn(&str) -> String); 4] {
    [
        (SNAKE_CASE, snake_case),
        (KEBAB_CASE, kebab_case),
        (CAMEL_CASE, camel_case),
        (PASCAL_CASE, pascal_case),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprintf_verbs() {
        let args = vec![
            FormatArg::Str("cd".to_string()),
            FormatArg::Int(42),
            FormatArg::Float(1.5),
        ];
        assert_eq!(
            sprintf("ab %q ef %d %v 100%%", &args).unwrap(),
            r#"ab "cd" ef 42 1.5 100%"#
        );
    }

    #[test]
    fn test_sprintf_argument_count_mismatch() {
        assert_eq!(
            sprintf("%s and %s", &[FormatArg::Str("a".to_string())]),
            Err(FormatError::MissingArgument { verb: 's', index: 1 })
        );
        assert_eq!(
            sprintf("none", &[FormatArg::Int(1)]),
            Err(FormatError::ExtraArguments { count: 1 })
        );
    }

    #[test]
    fn test_sprintf_rejects_bad_input() {
        assert!(matches!(
            sprintf("%d", &[FormatArg::Str("x".to_string())]),
            Err(FormatError::NotAnInteger { .. })
        ));
        assert_eq!(sprintf("50%", &[]), Err(FormatError::TrailingPercent));
        assert_eq!(
            sprintf("%x", &[FormatArg::Int(1)]),
            Err(FormatError::UnknownVerb { verb: 'x' })
        );
    }

    #[test]
    fn test_format_arg_from_json() {
        assert_eq!(FormatArg::from(&serde_json::json!(3)), FormatArg::Int(3));
        assert_eq!(FormatArg::from(&serde_json::json!("s")), FormatArg::Str("s".to_string()));
        assert_eq!(FormatArg::from(&serde_json::json!(true)), FormatArg::Other("true".to_string()));
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(snake_case("My Cool Project"), "my_cool_project");
        assert_eq!(kebab_case("My Cool Project"), "my-cool-project");
        assert_eq!(camel_case("my cool project"), "myCoolProject");
        assert_eq!(pascal_case("my_cool_project"), "MyCoolProject");
    }
}
