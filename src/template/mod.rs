//! Pluggable template engines
//!
//! This module defines the [`TemplateEngine`] capability and the concrete
//! engines that implement it. An engine registers named template bodies and
//! renders them against the parameter document. Which engine a run uses is
//! decided by the plan's template extension through an [`EngineRegistry`].
//!
//! # Example
//!
//! ```rust
//! use sprout::template::{EngineRegistry, TemplateEngine};
//!
//! let registry = EngineRegistry::builtin();
//! let mut engine = registry.create(".hbs").unwrap();
//! engine.register("greeting", b"Hello {{Name}}").unwrap();
//!
//! let mut out = Vec::new();
//! engine
//!     .render("greeting", &serde_json::json!({"Name": "world"}), &mut out)
//!     .unwrap();
//! assert_eq!(out, b"Hello world");
//! ```

mod funcs;
mod hbs;
mod jinja;
mod registry;
mod store;

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};

pub use funcs::{sprintf, FormatArg, FormatError};
pub use hbs::HandlebarsEngine;
pub use jinja::JinjaEngine;
pub use registry::{EngineFactory, EngineRegistry};
pub use store::TemplateStore;

use crate::document::Params;
use crate::error::SproutError;

/// Reserved template name for the self-templated plan file
pub const CONFIG_TEMPLATE_NAME: &str = "__config__";

/// A templating language that can register and render named templates
///
/// Implementations must fail rather than substitute an empty value when a
/// template references a field missing from `data`.
pub trait TemplateEngine {
    /// Register (or replace) a template body under `name`
    fn register(&mut self, name: &str, body: &[u8]) -> Result<(), SproutError>;

    /// Render a previously registered template into `out`
    fn render(&self, name: &str, data: &Params, out: &mut dyn Write) -> Result<(), SproutError>;
}

/// Render a template into a fresh buffer, converting engine panics into errors
pub fn render_to_vec(
    engine: &dyn TemplateEngine,
    name: &str,
    data: &Params,
) -> Result<Vec<u8>, SproutError> {
    let mut buf = Vec::new();
    let result = panic::catch_unwind(AssertUnwindSafe(|| engine.render(name, data, &mut buf)));
    match result {
        Ok(rendered) => rendered.map(|_| buf),
        Err(payload) => Err(SproutError::execution(
            name,
            format!("template engine panicked: {}", panic_message(&*payload)),
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
