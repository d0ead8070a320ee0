//! Handlebars template engine (`.hbs`, `.handlebars`)

use std::io::Write;

use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperDef, HelperResult, JsonTruthy, Output,
    PathAndJson, RenderContext, RenderErrorReason, Renderable,
};

use super::funcs::{self, FormatArg};
use super::TemplateEngine;
use crate::document::Params;
use crate::error::SproutError;

handlebars_helper!(SnakeCase: |s: str| funcs::snake_case(s));
handlebars_helper!(KebabCase: |s: str| funcs::kebab_case(s));
handlebars_helper!(CamelCase: |s: str| funcs::camel_case(s));
handlebars_helper!(PascalCase: |s: str| funcs::pascal_case(s));

/// Handlebars engine in strict mode with escaping disabled
///
/// Every registered template is also usable as a partial (`{{> name}}`), so
/// partial lookups only see templates registered earlier in the run.
///
/// Strict mode alone lets `{{#if Missing}}` fall through to the else branch,
/// so `if` and `unless` are replaced by versions that fail on a missing
/// condition.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("if", Box::new(StrictCondition { negate: false }));
        registry.register_helper("unless", Box::new(StrictCondition { negate: true }));
        registry.register_helper(funcs::SPRINTF, Box::new(sprintf_helper));
        registry.register_helper(funcs::SNAKE_CASE, Box::new(SnakeCase));
        registry.register_helper(funcs::KEBAB_CASE, Box::new(KebabCase));
        registry.register_helper(funcs::CAMEL_CASE, Box::new(CamelCase));
        registry.register_helper(funcs::PASCAL_CASE, Box::new(PascalCase));
        Self { registry }
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn register(&mut self, name: &str, body: &[u8]) -> Result<(), SproutError> {
        let source = std::str::from_utf8(body).map_err(|e| SproutError::parse(name, e))?;
        self.registry
            .register_template_string(name, source)
            .map_err(|e| SproutError::parse(name, e))
    }

    fn render(&self, name: &str, data: &Params, out: &mut dyn Write) -> Result<(), SproutError> {
        if !self.registry.has_template(name) {
            return Err(SproutError::TemplateNotRegistered {
                name: name.to_string(),
            });
        }
        self.registry
            .render_to_write(name, data, out)
            .map_err(|e| SproutError::execution(name, e))
    }
}

/// Block `if`/`unless` that treats a missing condition as an error
struct StrictCondition {
    negate: bool,
}

impl HelperDef for StrictCondition {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let name = if self.negate { "unless" } else { "if" };
        let param = h
            .param(0)
            .ok_or(RenderErrorReason::ParamNotFoundForIndex(name, 0))?;
        present(param)?;

        let include_zero = h
            .hash_get("includeZero")
            .and_then(|v| v.value().as_bool())
            .unwrap_or(false);
        let truthy = param.value().is_truthy(include_zero);
        let branch = if truthy != self.negate {
            h.template()
        } else {
            h.inverse()
        };
        match branch {
            Some(t) => t.render(r, ctx, rc, out),
            None => Ok(()),
        }
    }
}

fn present(param: &PathAndJson) -> Result<(), RenderErrorReason> {
    if param.is_value_missing() {
        return Err(RenderErrorReason::MissingVariable(
            param.relative_path().cloned(),
        ));
    }
    Ok(())
}

/// `{{sprintf "%s-%d" name count}}`
fn sprintf_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let format = h
        .param(0)
        .and_then(|p| p.value().as_str())
        .ok_or(RenderErrorReason::ParamNotFoundForIndex(funcs::SPRINTF, 0))?;
    let mut args = Vec::with_capacity(h.params().len());
    for param in h.params().iter().skip(1) {
        present(param)?;
        args.push(FormatArg::from(param.value()));
    }
    let formatted =
        funcs::sprintf(format, &args).map_err(|e| RenderErrorReason::Other(e.to_string()))?;
    out.write(&formatted)?;
    Ok(())
}
