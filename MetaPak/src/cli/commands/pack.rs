//! CLI command for packing a directory into an archive

use std::path::Path;
use std::time::Instant;

use anyhow::Context;

use crate::apk::{ApkOperations, ApkPhase, PackOptions};
use crate::cli::progress::{
    DISK, PACKAGE, print_done, print_step, report_entry, short_name, simple_bar,
};

pub fn execute(
    source: &Path,
    destination: Option<&Path>,
    parallel: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let destination = match destination {
        Some(path) => path.to_path_buf(),
        None => ApkOperations::default_pack_path(source)
            .with_context(|| format!("Cannot name an archive for {}", source.display()))?,
    };
    let options = PackOptions::new().with_parallel(parallel);

    if quiet {
        ApkOperations::pack_with_options(source, destination.as_path(), &options, &|_| {})
            .with_context(|| format!("Failed to pack {}", source.display()))?;
        return Ok(());
    }

    print_step(1, 2, PACKAGE, &format!("Compressing {}...", short_name(source)));

    let pb = simple_bar(0, "Compressing");
    let result = ApkOperations::pack_with_options(
        source,
        destination.as_path(),
        &options,
        &|progress| match progress.phase {
            ApkPhase::CompressingFiles => report_entry(&pb, "Compressing", progress),
            ApkPhase::WritingBlocks | ApkPhase::WritingIndex => {
                pb.set_length(progress.total as u64);
                pb.set_position(progress.current as u64);
                pb.set_message(progress.phase.as_str());
            }
            _ => {}
        },
    );
    pb.finish_and_clear();

    let result = result.with_context(|| format!("Failed to pack {}", source.display()))?;

    print_step(
        2,
        2,
        DISK,
        &format!(
            "Wrote {} entries to {}",
            result.entries.len(),
            result.output_path.display()
        ),
    );
    print_done(started.elapsed());

    Ok(())
}
