//! GitHub Actions secret masking.
//!
//! Inside Actions, every secret is registered with an `::add-mask::`
//! workflow command before anything else is printed. Elsewhere nothing is
//! written.

use std::io::Write;

/// Environment variable Actions sets to `"true"` on its runners.
pub const ACTIONS_ENV: &str = "GITHUB_ACTIONS";

/// Whether the process runs on an Actions runner.
pub fn running_in_actions() -> bool {
    std::env::var(ACTIONS_ENV).map(|v| v == "true").unwrap_or(false)
}

/// Write one mask directive per non-empty value.
pub fn write_masks<W, S>(out: &mut W, secrets: &[S], enabled: bool) -> std::io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    if !enabled {
        return Ok(());
    }
    for secret in secrets.iter().map(AsRef::as_ref).filter(|s| !s.is_empty()) {
        writeln!(out, "::add-mask::{}", secret)?;
    }
    out.flush()
}
