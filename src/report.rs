// Diagnostic error report
// Keeps the last failure (and the one before it) on disk for troubleshooting

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::LoginError;

pub const LAST_ERROR_FILE: &str = "LastError.txt";
pub const PREVIOUS_ERROR_FILE: &str = "PreviousError.txt";

const SEPARATOR: &str =
    "==================================================================================================================";

/// Directory holding the error reports
pub fn diagnostics_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("spsearch")
}

/// Write the error report, rotating an existing one to `PreviousError.txt`
///
/// Returns the path of the new report.
pub fn write_error_details(dir: &Path, command: &str, error: &anyhow::Error) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let out = dir.join(LAST_ERROR_FILE);
    if out.exists() {
        let previous = dir.join(PREVIOUS_ERROR_FILE);
        if previous.exists() {
            fs::remove_file(&previous)
                .with_context(|| format!("Failed to remove {}", previous.display()))?;
        }
        fs::rename(&out, &previous)
            .with_context(|| format!("Failed to rotate {}", out.display()))?;
    }

    let mut file =
        File::create(&out).with_context(|| format!("Failed to create {}", out.display()))?;
    write_details(&mut file, command, error)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    Ok(out)
}

fn write_details(w: &mut impl Write, command: &str, error: &anyhow::Error) -> io::Result<()> {
    let now = Local::now();

    writeln!(w, "{} request failed with an error: {}", command, error)?;
    writeln!(w)?;
    writeln!(
        w,
        "Time: {}, UTC Time: {}",
        now.format("%Y-%m-%d %H:%M:%S %:z"),
        now.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S")
    )?;
    if let Some(login_error) = error.downcast_ref::<LoginError>() {
        writeln!(w, "Category: {:?}", login_error.category())?;
    }
    writeln!(w)?;

    writeln!(w, "{}", SEPARATOR)?;
    writeln!(w, "ERROR SUMMARY")?;
    writeln!(w, "{}", SEPARATOR)?;
    for (level, cause) in error.chain().enumerate() {
        writeln!(w)?;
        writeln!(w, "[{}] {}", level + 1, cause)?;
    }

    writeln!(w)?;
    writeln!(w, "{}", SEPARATOR)?;
    writeln!(w, "ERROR DETAIL")?;
    writeln!(w, "{}", SEPARATOR)?;
    writeln!(w)?;
    writeln!(w, "{:?}", error)?;
    writeln!(w)?;
    writeln!(w, "{}", SEPARATOR)?;

    Ok(())
}
