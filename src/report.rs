use std::io::{self, Write};

pub const TITLE_HEADER: &str = "=== TITLE ===";
pub const SUMMARY_HEADER: &str = "=== SUMMARY ===";
pub const CLOSING_RULE: &str = "==========================";

/// Writes the title and summary sections. The layout is consumed by other
/// tools, so spacing must not change: each body line ends with a trailing
/// space and is followed by a blank line.
pub fn write_report<W: Write>(out: &mut W, title: &str, summary: &str) -> io::Result<()> {
    writeln!(out, "{}", TITLE_HEADER)?;
    writeln!(out, "{} \n", title.trim())?;

    writeln!(out, "{}", SUMMARY_HEADER)?;
    writeln!(out, "{} \n", summary.trim())?;

    writeln!(out, "\n{}", CLOSING_RULE)?;
    Ok(())
}
