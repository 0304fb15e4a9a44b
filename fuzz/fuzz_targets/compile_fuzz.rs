//! Compile fuzz target: feed arbitrary bytes to the grammar compiler.
//! Compilation must not panic; it returns Ok(RuleList) or Err(Error).
//! Build with: cargo fuzz run compile_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let _ = ruleweave::compile(s);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run compile_fuzz");
}
