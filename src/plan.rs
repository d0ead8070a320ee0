//! Generation plan loading and the config-as-template bootstrap
//!
//! A plan file is itself a template: every field except
//! `templateTypeExtension` may reference the parameter document. Resolving it
//! is a linear sequence of stages, each consuming the previous one:
//!
//! 1. [`RawPlan::load`] decodes the file as-is to learn the template extension
//! 2. [`RawPlan::select_engine`] maps the extension to an engine factory
//! 3. [`EngineSelected::self_template`] re-reads the raw bytes and renders
//!    them against the parameters
//! 4. [`RenderedPlan::decode`] decodes the rendered text into the final plan
//!
//! Any stage failure aborts the run before the filesystem is touched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{self, Params};
use crate::error::SproutError;
use crate::template::{self, EngineFactory, EngineRegistry, CONFIG_TEMPLATE_NAME};

/// Which input directories map to which output directories, and which file
/// extension marks a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPlan {
    /// Extension (with leading dot) of files to render; never templated
    pub template_type_extension: String,
    /// Example parameter file shipped with the template, relative to the plan
    #[serde(default)]
    pub template_params_file_name: String,
    /// Input subdirectory (relative to the plan) -> output subdirectory
    /// (relative to the output root), iterated in sorted order
    #[serde(default)]
    pub directory_mapping: BTreeMap<String, String>,
}

/// Stage 1: the plan decoded without templating
#[derive(Debug, Clone)]
pub struct RawPlan {
    path: PathBuf,
    plan: GenerationPlan,
}

impl RawPlan {
    /// Read and decode the plan file, format chosen by extension
    pub fn load(path: &Path) -> Result<Self, SproutError> {
        let plan = document::load(path).map_err(|source| SproutError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            plan,
        })
    }

    /// The untemplated plan, e.g. to locate the example params file
    pub fn plan(&self) -> &GenerationPlan {
        &self.plan
    }

    /// Directory containing the plan; input subdirectories are relative to it
    pub fn input_root(&self) -> PathBuf {
        input_root(&self.path)
    }

    /// Stage 2: pick the engine for the plan's template extension
    pub fn select_engine(self, registry: &EngineRegistry) -> Result<EngineSelected, SproutError> {
        let factory = registry.get(&self.plan.template_type_extension)?;
        Ok(EngineSelected {
            path: self.path,
            extension: self.plan.template_type_extension,
            factory,
        })
    }
}

/// Stage 2 result: the engine is known, the plan is not yet trusted
pub struct EngineSelected {
    path: PathBuf,
    extension: String,
    factory: EngineFactory,
}

impl EngineSelected {
    /// Stage 3: render the plan file's raw bytes against the parameters
    pub fn self_template(self, params: &Params) -> Result<RenderedPlan, SproutError> {
        let raw = document::load_bytes(&self.path).map_err(|source| SproutError::ConfigLoad {
            path: self.path.clone(),
            source,
        })?;

        let mut engine = (self.factory)();
        engine.register(CONFIG_TEMPLATE_NAME, &raw)?;
        let rendered = template::render_to_vec(engine.as_ref(), CONFIG_TEMPLATE_NAME, params)?;
        debug!(
            "rendered plan {}:\n{}",
            self.path.display(),
            String::from_utf8_lossy(&rendered)
        );

        Ok(RenderedPlan {
            path: self.path,
            extension: self.extension,
            factory: self.factory,
            rendered,
        })
    }
}

/// Stage 3 result: the plan text with every expression resolved
pub struct RenderedPlan {
    path: PathBuf,
    extension: String,
    factory: EngineFactory,
    rendered: Vec<u8>,
}

impl RenderedPlan {
    /// Stage 4: decode the rendered text using the plan file's own format
    pub fn decode(self) -> Result<ResolvedPlan, SproutError> {
        let mut plan: GenerationPlan =
            document::from_bytes(&self.path, &self.rendered).map_err(|source| {
                SproutError::ConfigLoad {
                    path: self.path.clone(),
                    source,
                }
            })?;

        if plan.template_type_extension != self.extension {
            warn!(
                "ignoring templated templateTypeExtension {:?}, keeping {:?}",
                plan.template_type_extension, self.extension
            );
            plan.template_type_extension = self.extension;
        }

        Ok(ResolvedPlan {
            input_root: input_root(&self.path),
            plan,
            factory: self.factory,
        })
    }
}

/// Stage 4 result: the final plan plus the engine that renders its templates
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub plan: GenerationPlan,
    pub factory: EngineFactory,
    pub input_root: PathBuf,
}

/// Run every bootstrap stage in order
pub fn resolve(
    path: &Path,
    registry: &EngineRegistry,
    params: &Params,
) -> Result<ResolvedPlan, SproutError> {
    RawPlan::load(path)?
        .select_engine(registry)?
        .self_template(params)?
        .decode()
}

fn input_root(plan_path: &Path) -> PathBuf {
    match plan_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn write_plan(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_self_templated_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(
            dir.path(),
            "sprout.yaml",
            "templateTypeExtension: .hbs\ntemplateParamsFileName: params.yaml\ndirectoryMapping:\n  \"{{ProjectName}}\": \"out/{{ProjectName}}\"\n",
        );

        let resolved = resolve(
            &path,
            &EngineRegistry::builtin(),
            &json!({"ProjectName": "demo"}),
        )
        .unwrap();

        let expected: BTreeMap<String, String> =
            [("demo".to_string(), "out/demo".to_string())].into();
        assert_eq!(resolved.plan.directory_mapping, expected);
        assert_eq!(resolved.plan.template_params_file_name, "params.yaml");
        assert_eq!(resolved.input_root, dir.path());
    }

    #[test]
    fn test_toml_plan_with_jinja() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(
            dir.path(),
            "sprout.toml",
            "templateTypeExtension = \".jinja\"\n[directoryMapping]\nsrc = \"{{ Name | snake_case }}\"\n",
        );

        let resolved =
            resolve(&path, &EngineRegistry::builtin(), &json!({"Name": "My App"})).unwrap();
        assert_eq!(resolved.plan.directory_mapping["src"], "my_app");
    }

    #[test]
    fn test_unknown_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(dir.path(), "sprout.json", r#"{"templateTypeExtension": ".gotmpl"}"#);
        let err = resolve(&path, &EngineRegistry::builtin(), &json!({})).unwrap_err();
        assert!(matches!(err, SproutError::UnrecognizedEngine { .. }));
    }

    #[test]
    fn test_missing_plan_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RawPlan::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, SproutError::ConfigLoad { .. }));
    }

    #[test]
    fn test_missing_param_fails_self_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(
            dir.path(),
            "sprout.yaml",
            "templateTypeExtension: .hbs\ndirectoryMapping:\n  src: \"{{Undefined}}\"\n",
        );
        let err = resolve(&path, &EngineRegistry::builtin(), &json!({})).unwrap_err();
        assert!(
            matches!(err, SproutError::TemplateExecution { ref name, .. } if name == CONFIG_TEMPLATE_NAME)
        );
    }

    #[test]
    fn test_rendered_plan_must_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(
            dir.path(),
            "sprout.json",
            r#"{"templateTypeExtension": ".hbs", "directoryMapping": {{Mapping}}}"#,
        );
        // The raw text is not valid JSON, so the first stage already fails
        let err = resolve(&path, &EngineRegistry::builtin(), &json!({"Mapping": "{}"})).unwrap_err();
        assert!(matches!(err, SproutError::ConfigLoad { .. }));

        let path = write_plan(
            dir.path(),
            "broken.json",
            r#"{"templateTypeExtension": ".hbs", "directoryMapping": {"a": "{{Quote}}"}}"#,
        );
        let err =
            resolve(&path, &EngineRegistry::builtin(), &json!({"Quote": "\""})).unwrap_err();
        assert!(matches!(err, SproutError::ConfigLoad { .. }));
    }

    #[test]
    fn test_template_extension_is_not_templated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(
            dir.path(),
            "sprout.yaml",
            "templateTypeExtension: \".hbs{{Suffix}}\"\n",
        );
        // The raw extension is used as-is and is not a registered engine
        let err =
            resolve(&path, &EngineRegistry::builtin(), &json!({"Suffix": ""})).unwrap_err();
        assert!(matches!(err, SproutError::UnrecognizedEngine { ref extension } if extension == ".hbs{{Suffix}}"));
    }

    #[test]
    fn test_input_root_for_bare_file_name() {
        assert_eq!(input_root(Path::new("sprout.yaml")), PathBuf::from("."));
        assert_eq!(input_root(Path::new("tmpl/sprout.yaml")), PathBuf::from("tmpl"));
    }
}
