//! Load, validate, generate, write.
//!
//! Validation errors abort the run before any backend work starts, so a bad
//! schema never leaves partial output. After that, generation failures are per
//! class: the class is skipped for that backend and reported, everything else is
//! still written.

use crate::ast::Schema;
use crate::backend::{backend_by_name, Backend};
use crate::contract::{ClassPlan, GenError};
use crate::loader::{load_schema, LoadError};
use crate::validate::{has_errors, validate, Diagnostic};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("schema load failed: {0}")]
    Load(#[from] LoadError),
    #[error("schema has {} validation error(s)", .0.iter().filter(|d| d.is_error()).count())]
    Validation(Vec<Diagnostic>),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A backend and the directory its units are written under.
pub struct BackendTarget {
    pub backend: Box<dyn Backend>,
    pub out_dir: PathBuf,
}

impl BackendTarget {
    pub fn new(backend: Box<dyn Backend>, out_dir: impl Into<PathBuf>) -> Self {
        BackendTarget {
            backend,
            out_dir: out_dir.into(),
        }
    }

    /// Target for a backend looked up by name (`rust`, `java`).
    pub fn by_name(name: &str, out_dir: impl Into<PathBuf>) -> Option<Self> {
        backend_by_name(name).map(|b| BackendTarget::new(b, out_dir))
    }
}

/// One rendered file, path relative to the backend's output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedUnit {
    /// `None` for a backend index unit.
    pub class: Option<String>,
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFailure {
    pub backend: &'static str,
    pub class: String,
    pub error: GenError,
}

/// Output of one backend, in class declaration order.
#[derive(Debug, Clone)]
pub struct BackendOutput {
    pub backend: &'static str,
    pub units: Vec<GeneratedUnit>,
    pub failures: Vec<ClassFailure>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Warnings from loading and validation.
    pub diagnostics: Vec<Diagnostic>,
    pub written: Vec<PathBuf>,
    pub failures: Vec<ClassFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Load and validate. Any error-level diagnostic fails with [`PipelineError::Validation`]
/// carrying every diagnostic; otherwise the schema comes back with its warnings.
pub fn check(schema_text: &str) -> Result<(Schema, Vec<Diagnostic>), PipelineError> {
    let loaded = load_schema(schema_text)?;
    let mut diagnostics = loaded.diagnostics;
    diagnostics.extend(validate(&loaded.schema.registry));
    if has_errors(&diagnostics) {
        return Err(PipelineError::Validation(diagnostics));
    }
    for d in &diagnostics {
        warn!(class = %d.class, kind = d.kind.as_str(), "{}", d.message);
    }
    Ok((loaded.schema, diagnostics))
}

/// Render every class with every backend. Classes and backends are independent,
/// so all pairs run in parallel; output order follows the inputs.
pub fn generate(schema: &Schema, backends: &[&dyn Backend]) -> Vec<BackendOutput> {
    let classes: Vec<_> = schema.registry.iter().collect();
    let plans: Vec<Result<ClassPlan, GenError>> = classes
        .par_iter()
        .map(|c| ClassPlan::build(&schema.registry, c))
        .collect();

    let jobs: Vec<(usize, usize)> = (0..backends.len())
        .flat_map(|b| (0..classes.len()).map(move |c| (b, c)))
        .collect();
    let rendered: Vec<Result<GeneratedUnit, ClassFailure>> = jobs
        .par_iter()
        .map(|&(b, c)| {
            let backend = backends[b];
            let class = &classes[c].name;
            let config = schema.backend_config(backend.name());
            let text = plans[c]
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|plan| backend.render(plan, &config));
            match text {
                Ok(text) => {
                    debug!(backend = backend.name(), class = %class, bytes = text.len(), "rendered");
                    Ok(GeneratedUnit {
                        class: Some(class.clone()),
                        path: backend.file_path(class, &config),
                        text,
                    })
                }
                Err(error) => {
                    warn!(backend = backend.name(), class = %class, %error, "class skipped");
                    Err(ClassFailure {
                        backend: backend.name(),
                        class: class.clone(),
                        error,
                    })
                }
            }
        })
        .collect();

    let mut rendered = rendered.into_iter();
    backends
        .iter()
        .map(|backend| {
            let mut out = BackendOutput {
                backend: backend.name(),
                units: Vec::new(),
                failures: Vec::new(),
            };
            for result in rendered.by_ref().take(classes.len()) {
                match result {
                    Ok(unit) => out.units.push(unit),
                    Err(failure) => out.failures.push(failure),
                }
            }
            let index = {
                let names: Vec<&str> = out.units.iter().filter_map(|u| u.class.as_deref()).collect();
                backend.index(&names, &schema.backend_config(backend.name()))
            };
            if let Some((path, text)) = index {
                out.units.push(GeneratedUnit {
                    class: None,
                    path,
                    text,
                });
            }
            out
        })
        .collect()
}

/// Write units under `out_dir`, creating directories as needed.
pub fn write_units(out_dir: &Path, units: &[GeneratedUnit]) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::with_capacity(units.len());
    for unit in units {
        let path = out_dir.join(&unit.path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &unit.text).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

/// Full run over `targets`. Nothing is written unless validation passes.
pub fn run(schema_text: &str, targets: &[BackendTarget]) -> Result<RunReport, PipelineError> {
    let (schema, diagnostics) = check(schema_text)?;
    info!(
        classes = schema.registry.len(),
        backends = targets.len(),
        "generating"
    );
    let backends: Vec<&dyn Backend> = targets.iter().map(|t| t.backend.as_ref()).collect();
    let outputs = generate(&schema, &backends);

    let mut report = RunReport {
        diagnostics,
        ..RunReport::default()
    };
    for (target, output) in targets.iter().zip(outputs) {
        report.written.extend(write_units(&target.out_dir, &output.units)?);
        report.failures.extend(output.failures);
    }
    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        "done"
    );
    Ok(report)
}
