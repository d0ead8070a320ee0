//! Sprout - scaffolding generator driven by template trees
//!
//! This library turns a directory of template files plus a parameter document
//! into a generated output tree. A plan file names the template extension and
//! maps input directories to output directories; the plan is itself rendered
//! against the parameters before it is used.
//!
//! A run happens in two phases. Generation renders everything in memory and
//! collects every error it finds. Only when generation is error-free does the
//! commit phase touch the output root: files from the previous run (listed in
//! the digest) are deleted, the new files are written, and a new digest is
//! recorded.
//!
//! # Example
//!
//! ```rust,no_run
//! use sprout::{run, EngineRegistry, SproutOptions};
//!
//! let options = SproutOptions::new("template/sprout.yaml", "out")
//!     .with_params_path("params.yaml");
//!
//! match run(&options, &EngineRegistry::builtin()) {
//!     Ok(summary) => println!("wrote {} files", summary.written.len()),
//!     Err(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
//! }
//! ```

pub mod digest;
pub mod document;
pub mod error;
pub mod generator;
pub mod plan;
pub mod template;
pub mod walker;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

pub use digest::{Digest, DigestTracker, DEFAULT_DIGEST_FILE};
pub use document::{DocumentError, Format, Params};
pub use error::{format_errors, SproutError};
pub use generator::{Generator, OutputSet};
pub use plan::{GenerationPlan, RawPlan, ResolvedPlan};
pub use template::{EngineRegistry, TemplateEngine};

/// Parameter file name used when none is given
pub const DEFAULT_PARAMS_FILE: &str = "params.yaml";

/// Options for a single pipeline run
#[derive(Debug, Clone)]
pub struct SproutOptions {
    /// Plan file; input directories are relative to its directory
    pub plan_path: PathBuf,
    /// Root of the generated tree
    pub output_root: PathBuf,
    /// Parameter document bound into every template
    pub params_path: PathBuf,
    /// Digest location, relative to the output root
    pub digest_path: PathBuf,
    /// Delete every existing non-hidden file under the output root first
    pub purge_existing: bool,
}

impl Default for SproutOptions {
    fn default() -> Self {
        Self {
            plan_path: PathBuf::new(),
            output_root: PathBuf::new(),
            params_path: PathBuf::from(DEFAULT_PARAMS_FILE),
            digest_path: PathBuf::from(DEFAULT_DIGEST_FILE),
            purge_existing: false,
        }
    }
}

impl SproutOptions {
    /// Create options for a plan and output root, other fields defaulted
    pub fn new(plan_path: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            plan_path: plan_path.into(),
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Set the parameter document path
    pub fn with_params_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.params_path = path.into();
        self
    }

    /// Set the digest path (relative to the output root)
    pub fn with_digest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.digest_path = path.into();
        self
    }

    /// Enable or disable purging of existing output
    pub fn with_purge_existing(mut self, purge: bool) -> Self {
        self.purge_existing = purge;
        self
    }
}

/// What a successful run did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Files written, relative to the output root, sorted
    pub written: Vec<PathBuf>,
    /// Stale files and emptied directories deleted before writing
    pub removed: Vec<PathBuf>,
    /// Templates that rendered to nothing
    pub suppressed: Vec<PathBuf>,
}

/// Outcome of looking for the parameter document
#[derive(Debug)]
pub enum ParamsStatus {
    /// The parameter document exists and was loaded
    Loaded(Params),
    /// It did not exist; the template's example params were copied in its place
    Created { from: PathBuf, to: PathBuf },
}

/// Load and decode a parameter document
pub fn load_params(path: &Path) -> Result<Params, SproutError> {
    document::load(path).map_err(|source| SproutError::ConfigLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the parameter document, or seed it from the template's example
///
/// When the document is missing, the plan's `templateParamsFileName` is copied
/// to the requested location so it can be customised before the next run.
pub fn prepare_params(options: &SproutOptions) -> Result<ParamsStatus, SproutError> {
    let source = match document::load(&options.params_path) {
        Ok(params) => return Ok(ParamsStatus::Loaded(params)),
        Err(source) => source,
    };
    let not_found = source.is_not_found();
    let load_error = SproutError::ConfigLoad {
        path: options.params_path.clone(),
        source,
    };
    if !not_found {
        return Err(load_error);
    }

    let raw = RawPlan::load(&options.plan_path)?;
    let example_name = &raw.plan().template_params_file_name;
    if example_name.is_empty() {
        return Err(load_error);
    }

    let from = raw.input_root().join(example_name);
    let to = options.params_path.clone();
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| SproutError::filesystem("create directory", parent, e))?;
    }
    fs::copy(&from, &to).map_err(|e| SproutError::filesystem("copy example params", &from, e))?;
    info!("created placeholder params at {}", to.display());
    Ok(ParamsStatus::Created { from, to })
}

/// Run the whole pipeline, loading parameters from `options.params_path`
pub fn run(options: &SproutOptions, registry: &EngineRegistry) -> Result<RunSummary, Vec<SproutError>> {
    let params = load_params(&options.params_path).map_err(|e| vec![e])?;
    run_with_params(options, registry, &params)
}

/// Run the whole pipeline with an already loaded parameter document
pub fn run_with_params(
    options: &SproutOptions,
    registry: &EngineRegistry,
    params: &Params,
) -> Result<RunSummary, Vec<SproutError>> {
    // Setup failures abort before anything on disk changes
    let resolved = plan::resolve(&options.plan_path, registry, params).map_err(|e| vec![e])?;
    let tracker = DigestTracker::new(&options.output_root, &options.digest_path);
    let previous = tracker.read().map_err(|e| vec![e])?;
    let digest_path = generator::normalize(tracker.digest_path()).map_err(|e| vec![e])?;

    let outputs = Generator::new(&resolved, params).generate()?;
    if outputs.contains(&digest_path) {
        return Err(vec![SproutError::OutputCollision { path: digest_path }]);
    }

    let mut errors = Vec::new();
    let mut stale: Vec<String> = previous.map(|d| d.entries().to_vec()).unwrap_or_default();
    if options.purge_existing {
        stale.extend(tracker.existing_entries(&kept_paths(options)));
    }
    stale.sort();
    stale.dedup();

    let cleanup = tracker.cleanup(&stale);
    errors.extend(cleanup.errors);

    let (written, commit_errors) = outputs.commit(&options.output_root);
    errors.extend(commit_errors);
    if let Err(e) = tracker.persist(written.iter().map(PathBuf::as_path)) {
        errors.push(e);
    }

    info!(
        "wrote {} file(s), removed {} stale path(s)",
        written.len(),
        cleanup.removed.len()
    );

    if errors.is_empty() {
        Ok(RunSummary {
            written,
            removed: cleanup.removed,
            suppressed: outputs.suppressed().to_vec(),
        })
    } else {
        Err(errors)
    }
}

/// Files under the output root that a purge must leave alone
fn kept_paths(options: &SproutOptions) -> Vec<PathBuf> {
    let (Ok(root), Ok(params)) = (
        options.output_root.canonicalize(),
        options.params_path.canonicalize(),
    ) else {
        return Vec::new();
    };
    params
        .strip_prefix(&root)
        .map(|p| vec![p.to_path_buf()])
        .unwrap_or_default()
}
