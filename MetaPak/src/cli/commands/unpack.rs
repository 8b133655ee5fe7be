//! CLI command for unpacking an archive

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::apk::{ApkOperations, ApkPhase, UnpackOptions};
use crate::cli::progress::{
    DISK, LOOKING_GLASS, print_done, print_step, report_entry, short_name, simple_bar,
};

pub fn execute(
    source: &Path,
    destination: Option<&Path>,
    keep_going: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let destination =
        destination.map_or_else(|| ApkOperations::default_unpack_dir(source), Path::to_path_buf);
    let options = UnpackOptions::new().with_keep_going(keep_going);

    if quiet {
        ApkOperations::unpack_with_options(source, destination.as_path(), &options, &|_| {})
            .with_context(|| format!("Failed to unpack {}", source.display()))?;
        return Ok(());
    }

    print_step(1, 2, LOOKING_GLASS, &format!("Reading {}...", short_name(source)));

    let pb = simple_bar(0, "Extracting");
    let result = ApkOperations::unpack_with_options(
        source,
        destination.as_path(),
        &options,
        &|progress| {
            if progress.phase == ApkPhase::ExtractingFiles {
                report_entry(&pb, "Extracting", progress);
            }
        },
    );
    pb.finish_and_clear();

    let result = result.with_context(|| format!("Failed to unpack {}", source.display()))?;

    print_step(
        2,
        2,
        DISK,
        &format!(
            "Wrote {} entries and {} to {}",
            result.entries.len(),
            short_name(&result.manifest_path),
            result.output_dir.display()
        ),
    );
    print_done(started.elapsed());

    Ok(())
}
