//! CLI command for listing archive contents

use std::path::Path;

use anyhow::Context;

use crate::apk::ApkOperations;

/// Format byte size for human-readable output
fn format_size(bytes: u32) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}")
    }
}

pub fn execute(source: &Path, json: bool) -> anyhow::Result<()> {
    let entries = ApkOperations::list(source)
        .with_context(|| format!("Failed to read index of {}", source.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:>8}  {:#010X}  {}",
            format_size(entry.stored_size as u32),
            entry.offset,
            entry.name
        );
    }
    println!("{} entries", entries.len());

    Ok(())
}
