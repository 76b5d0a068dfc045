//! Loader fuzz target: arbitrary text through load, validate and planning.
//! None of them may panic; bad input must come back as an error or diagnostics.
//! Build with: cargo fuzz run loader_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(loaded) = pdugen::load_schema(s) {
        let _ = pdugen::validate(&loaded.schema.registry);
        let _ = pdugen::contract::plan_all(&loaded.schema.registry);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run loader_fuzz");
}
