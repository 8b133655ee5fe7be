//! CLI command for verifying an archive

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::apk::{ApkOperations, ApkPhase};
use crate::cli::progress::{GEAR, print_done, print_step, short_name, simple_bar};

pub fn execute(source: &Path, quiet: bool) -> anyhow::Result<()> {
    let started = Instant::now();

    if !quiet {
        print_step(1, 1, GEAR, &format!("Verifying {}...", short_name(source)));
    }

    let pb = simple_bar(0, "Verifying");
    if quiet {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let report = ApkOperations::verify_with_progress(source, &|progress| {
        if progress.phase == ApkPhase::Verifying {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.current as u64);
        }
    });
    pb.finish_and_clear();

    let report = report.with_context(|| format!("{} failed verification", source.display()))?;

    println!(
        "{} entries OK ({} bytes decompressed)",
        report.entries, report.decompressed_bytes
    );
    if !quiet {
        print_done(started.elapsed());
    }

    Ok(())
}
