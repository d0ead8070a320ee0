//! Jinja template engine (`.jinja`, `.j2`) backed by minijinja

use std::io::Write;

use minijinja::value::{Rest, ValueKind};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior, Value};

use super::funcs::{self, FormatArg};
use super::store::TemplateStore;
use super::TemplateEngine;
use crate::document::Params;
use crate::error::SproutError;

/// Jinja engine with strict undefined handling and no auto-escaping
///
/// Sources live in a [`TemplateStore`] that doubles as the environment's
/// loader, so `{% extends %}` and `{% include %}` resolve against templates
/// registered earlier in the run and never touch the filesystem.
pub struct JinjaEngine {
    env: Environment<'static>,
    store: TemplateStore,
}

impl JinjaEngine {
    pub fn new() -> Self {
        let store = TemplateStore::new();
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);

        let loader = store.clone();
        env.set_loader(move |name| Ok(loader.get(name)));

        env.add_function(funcs::SPRINTF, sprintf);
        for (name, helper) in funcs::case_helpers() {
            env.add_function(name, move |s: String| helper(&s));
            env.add_filter(name, move |s: String| helper(&s));
        }

        Self { env, store }
    }
}

impl Default for JinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for JinjaEngine {
    fn register(&mut self, name: &str, body: &[u8]) -> Result<(), SproutError> {
        let source = std::str::from_utf8(body).map_err(|e| SproutError::parse(name, e))?;
        self.store.insert(name, source.to_string());
        // Drop any parsed copy cached under this name before reparsing
        self.env.remove_template(name);
        self.env
            .get_template(name)
            .map(|_| ())
            .map_err(|e| SproutError::parse(name, e))
    }

    fn render(&self, name: &str, data: &Params, out: &mut dyn Write) -> Result<(), SproutError> {
        if !self.store.contains(name) {
            return Err(SproutError::TemplateNotRegistered {
                name: name.to_string(),
            });
        }
        let template = self
            .env
            .get_template(name)
            .map_err(|e| SproutError::parse(name, e))?;
        let rendered = template
            .render(data)
            .map_err(|e| SproutError::execution(name, e))?;
        out.write_all(rendered.as_bytes())
            .map_err(|e| SproutError::execution(name, e))
    }
}

/// `{{ sprintf("%s-%d", name, count) }}`
fn sprintf(format: String, args: Rest<Value>) -> Result<String, Error> {
    let args = args.iter().map(to_format_arg).collect::<Result<Vec<_>, _>>()?;
    funcs::sprintf(&format, &args).map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Undefined arguments fail the render like any other missing variable
fn to_format_arg(value: &Value) -> Result<FormatArg, Error> {
    if value.is_undefined() {
        return Err(Error::new(
            ErrorKind::UndefinedError,
            "sprintf argument is undefined",
        ));
    }
    if let Some(s) = value.as_str() {
        return Ok(FormatArg::Str(s.to_string()));
    }
    if value.kind() == ValueKind::Number {
        if let Ok(i) = i64::try_from(value.clone()) {
            return Ok(FormatArg::Int(i));
        }
        if let Ok(f) = f64::try_from(value.clone()) {
            return Ok(FormatArg::Float(f));
        }
    }
    Ok(FormatArg::Other(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(engine: &JinjaEngine, name: &str, data: &Params) -> Result<String, SproutError> {
        let mut buf = Vec::new();
        engine.render(name, data, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_basic_rendering() {
        let mut engine = JinjaEngine::new();
        engine
            .register(
                "template_1",
                b"\n1. Constant\n2. {{ Value }}\n3. {{ Nested.Value }}\n4. {{ sprintf(\"ab %q ef\", \"cd\") }}\n<div attr=\"value\" />\n",
            )
            .unwrap();

        let data = json!({"Value": "abc", "Nested": {"Value": 5}});
        let output = render(&engine, "template_1", &data).unwrap();
        assert_eq!(
            output,
            "\n1. Constant\n2. abc\n3. 5\n4. ab \"cd\" ef\n<div attr=\"value\" />\n"
        );
    }

    #[test]
    fn test_extends_resolves_from_store() {
        let mut engine = JinjaEngine::new();
        engine
            .register(
                "template_1.jinja",
                b"HEADER\n{% block content %}{% endblock %}\nFOOTER\n",
            )
            .unwrap();
        engine
            .register(
                "template_2.jinja",
                b"{% extends \"template_1.jinja\" %}{% block content %}CONTENT{% endblock %}",
            )
            .unwrap();

        let output = render(&engine, "template_2.jinja", &json!({})).unwrap();
        assert_eq!(output, "HEADER\nCONTENT\nFOOTER\n");
    }

    #[test]
    fn test_include_resolves_from_store() {
        let mut engine = JinjaEngine::new();
        engine
            .register("partials/license.jinja", b"Copyright {{ Owner }}")
            .unwrap();
        engine
            .register("LICENSE.jinja", b"MIT\n{% include \"partials/license.jinja\" %}\n")
            .unwrap();

        let output = render(&engine, "LICENSE.jinja", &json!({"Owner": "Ada"})).unwrap();
        assert_eq!(output, "MIT\nCopyright Ada\n");
    }

    #[test]
    fn test_sprintf_missing_argument_fails() {
        let mut engine = JinjaEngine::new();
        engine.register("t", b"[{{ sprintf(\"%s\", Missing) }}]").unwrap();
        let err = render(&engine, "t", &json!({})).unwrap_err();
        assert!(matches!(err, SproutError::TemplateExecution { ref name, .. } if name == "t"));
    }

    #[test]
    fn test_reregister_replaces_body() {
        let mut engine = JinjaEngine::new();
        engine.register("t", b"first").unwrap();
        assert_eq!(render(&engine, "t", &json!({})).unwrap(), "first");
        engine.register("t", b"second").unwrap();
        assert_eq!(render(&engine, "t", &json!({})).unwrap(), "second");
    }

    #[test]
    fn test_case_filters_and_functions() {
        let mut engine = JinjaEngine::new();
        engine
            .register("t", b"{{ Name | kebab_case }} {{ pascal_case(Name) }}")
            .unwrap();
        let output = render(&engine, "t", &json!({"Name": "my cool app"})).unwrap();
        assert_eq!(output, "my-cool-app MyCoolApp");
    }

    #[test]
    fn test_missing_key_is_execution_error() {
        let mut engine = JinjaEngine::new();
        engine.register("t", b"{{ Missing.Field }}").unwrap();
        let err = render(&engine, "t", &json!({})).unwrap_err();
        assert!(matches!(err, SproutError::TemplateExecution { .. }));
    }

    #[test]
    fn test_syntax_error_at_registration() {
        let mut engine = JinjaEngine::new();
        let err = engine.register("bad", b"{% if x %}never closed").unwrap_err();
        assert!(matches!(err, SproutError::TemplateParse { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_unregistered_name() {
        let engine = JinjaEngine::new();
        let err = render(&engine, "ghost", &json!({})).unwrap_err();
        assert!(matches!(err, SproutError::TemplateNotRegistered { .. }));
    }
}
