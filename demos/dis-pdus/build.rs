// Generate Rust PDUs from the bundled schemas into OUT_DIR.
//
// Each class becomes an inline module so the whole schema can be pulled in
// with a single `include!`.

use anyhow::{bail, Context, Result};
use pdugen::backend::rust::type_name;
use pdugen::pipeline::{check, generate};
use pdugen::{Backend, RustBackend};
use std::fmt::Write as _;
use std::path::PathBuf;

const SCHEMAS: [(&str, &str); 2] = [
    ("dis", "../../schemas/dis_subset.xml"),
    ("edge", "schemas/edge_cases.xml"),
];

fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    for (name, schema_path) in SCHEMAS {
        let path = manifest_dir.join(schema_path);
        println!("cargo:rerun-if-changed={}", path.display());

        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let (schema, _) = check(&text).with_context(|| format!("checking {}", path.display()))?;

        let backends: [&dyn Backend; 1] = [&RustBackend];
        let mut module = String::new();
        for output in generate(&schema, &backends) {
            if let Some(failure) = output.failures.first() {
                bail!("{}: {} [{}]", path.display(), failure.error, failure.class);
            }
            for unit in &output.units {
                let Some(class) = &unit.class else { continue };
                let module_name = unit
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .with_context(|| format!("unit path {}", unit.path.display()))?;
                writeln!(module, "pub mod {} {{", module_name)?;
                module.push_str(&unit.text);
                writeln!(module, "}}")?;
                writeln!(module, "pub use {}::{};", module_name, type_name(class))?;
                writeln!(module)?;
            }
        }
        std::fs::write(out_dir.join(format!("{}.rs", name)), module)?;
    }
    Ok(())
}
