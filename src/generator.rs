//! Template tree rendering into an in-memory output set
//!
//! Generation never touches the output directory. Every mapping is walked,
//! every file rendered or copied, and all results collected in an
//! [`OutputSet`]. Only a run with zero errors gets to [`OutputSet::commit`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::Params;
use crate::error::SproutError;
use crate::plan::{GenerationPlan, ResolvedPlan};
use crate::template::{self, TemplateEngine};
use crate::walker;

/// Output files keyed by path relative to the output root
///
/// At most one source claims each path; a second claim is a collision, even
/// when the first claim was a template that rendered to nothing.
#[derive(Debug, Default)]
pub struct OutputSet {
    entries: BTreeMap<PathBuf, Vec<u8>>,
    suppressed: Vec<PathBuf>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, refusing to replace an existing one
    pub fn insert(&mut self, path: PathBuf, content: Vec<u8>) -> Result<(), SproutError> {
        self.claim(&path)?;
        self.entries.insert(path, content);
        Ok(())
    }

    /// Record a template that rendered empty, still claiming its path
    pub fn suppress(&mut self, path: PathBuf) -> Result<(), SproutError> {
        self.claim(&path)?;
        self.suppressed.push(path);
        Ok(())
    }

    fn claim(&self, path: &Path) -> Result<(), SproutError> {
        if self.entries.contains_key(path) || self.suppressed.iter().any(|p| p == path) {
            return Err(SproutError::OutputCollision {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Templates that rendered to nothing and were left out
    pub fn suppressed(&self) -> &[PathBuf] {
        &self.suppressed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry under `output_root` in path order
    ///
    /// Failures are collected and the remaining entries are still attempted,
    /// so a failing commit can leave some files written. Returns the paths
    /// that were written along with any errors.
    pub fn commit(&self, output_root: &Path) -> (Vec<PathBuf>, Vec<SproutError>) {
        let mut written = Vec::with_capacity(self.entries.len());
        let mut errors = Vec::new();

        for (path, content) in &self.entries {
            let full_path = output_root.join(path);
            if let Some(parent) = full_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    errors.push(SproutError::filesystem("create directory", parent, e));
                    continue;
                }
            }

            info!("writing file {}", full_path.display());
            if let Err(e) = fs::write(&full_path, content) {
                errors.push(SproutError::filesystem("write", full_path, e));
                continue;
            }
            written.push(path.clone());
        }

        (written, errors)
    }
}

/// Renders one resolved plan against a parameter document
pub struct Generator<'a> {
    engine: Box<dyn TemplateEngine>,
    plan: &'a GenerationPlan,
    input_root: &'a Path,
    params: &'a Params,
}

impl<'a> Generator<'a> {
    /// Create a generator with a fresh engine from the plan's factory
    pub fn new(resolved: &'a ResolvedPlan, params: &'a Params) -> Self {
        Self {
            engine: (resolved.factory)(),
            plan: &resolved.plan,
            input_root: &resolved.input_root,
            params,
        }
    }

    /// Create a generator around an explicit engine
    pub fn with_engine(
        engine: Box<dyn TemplateEngine>,
        plan: &'a GenerationPlan,
        input_root: &'a Path,
        params: &'a Params,
    ) -> Self {
        Self {
            engine,
            plan,
            input_root,
            params,
        }
    }

    /// Walk every mapping and build the output set
    ///
    /// Per-file failures are collected and processing continues, so the error
    /// list covers every independent problem. An input directory with no
    /// files stops generation immediately.
    pub fn generate(mut self) -> Result<OutputSet, Vec<SproutError>> {
        let mut outputs = OutputSet::new();
        let mut errors = Vec::new();

        let plan = self.plan;
        for (input_subdir, output_subdir) in &plan.directory_mapping {
            let input_dir = self.input_root.join(input_subdir);
            let files = walker::walk(&input_dir);
            if files.is_empty() {
                errors.push(SproutError::NoInputFiles { dir: input_dir });
                return Err(errors);
            }

            for relative in files {
                if let Err(e) =
                    self.process_file(&input_dir, &relative, Path::new(output_subdir), &mut outputs)
                {
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(outputs)
        } else {
            Err(errors)
        }
    }

    fn process_file(
        &mut self,
        input_dir: &Path,
        relative: &Path,
        output_subdir: &Path,
        outputs: &mut OutputSet,
    ) -> Result<(), SproutError> {
        let input_path = input_dir.join(relative);
        let contents =
            fs::read(&input_path).map_err(|e| SproutError::filesystem("read", &input_path, e))?;

        if !is_template(relative, &self.plan.template_type_extension) {
            debug!("copying {}", input_path.display());
            let output_path = normalize(&output_subdir.join(relative))?;
            return outputs.insert(output_path, contents);
        }

        let name = template_name(relative);
        self.engine.register(&name, &contents)?;
        let rendered = template::render_to_vec(self.engine.as_ref(), &name, self.params)?;
        let output_path = normalize(&output_subdir.join(relative.with_extension("")))?;
        if String::from_utf8_lossy(&rendered).trim().is_empty() {
            warn!("skipping output file with no output: {}", output_path.display());
            return outputs.suppress(output_path);
        }
        outputs.insert(output_path, rendered)
    }
}

fn is_template(path: &Path, template_extension: &str) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => template_extension.strip_prefix('.') == Some(ext),
        None => false,
    }
}

/// Templates are named by their path relative to the input directory
fn template_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Drop `.` components and reject paths that leave the output root
pub(crate) fn normalize(path: &Path) -> Result<PathBuf, SproutError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir if normalized.pop() => {}
            _ => {
                return Err(SproutError::OutsideOutputRoot {
                    path: path.to_path_buf(),
                })
            }
        }
    }
    Ok(normalized)
}
