//! CLI progress display utilities
//!
//! Step indicators with emojis, plus a progress bar that per-entry lines
//! are printed above.

use std::path::Path;
use std::time::Duration;

use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};

use crate::apk::ApkProgress;

// =============================================================================
// Emoji Constants (with ASCII fallbacks for terminals without emoji support)
// =============================================================================

/// Magnifying glass - for reading/scanning operations
pub static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
/// Package - for extraction/compression operations
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
/// Floppy disk - for writing/saving operations
pub static DISK: Emoji<'_, '_> = Emoji("💾 ", "");
/// Gear - for checking operations
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
/// Sparkles - for completion
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

// =============================================================================
// Step-Based Progress
// =============================================================================

/// Print a step indicator: `[1/3] 📦 Message...`
pub fn print_step(current: usize, total: usize, emoji: Emoji, msg: &str) {
    println!(
        "{} {}{}",
        style(format!("[{current}/{total}]")).bold().dim(),
        emoji,
        msg
    );
}

/// Print completion message: `✨ Done in 2s`
pub fn print_done(elapsed: Duration) {
    println!("{} Done in {}", SPARKLE, HumanDuration(elapsed));
}

// =============================================================================
// Progress Bars
// =============================================================================

/// Progress bar style for determinate progress
///
/// Format: `Extracting [████████░░░░░░░░] 50/100`
///
/// # Panics
/// Panics if the template string is invalid (this is a compile-time constant).
#[must_use]
pub fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
        .expect("valid template")
}

/// Create a progress bar; the length may be set later once it is known
#[must_use]
pub fn simple_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(bar_style());
    pb.set_message(msg.to_string());
    pb
}

/// Advance `pb` from an [`ApkProgress`] update, printing `verb <entry>` above the bar
///
/// A hidden bar (stderr not a terminal) drops `println`, so the line goes
/// straight to stdout instead.
pub fn report_entry(pb: &ProgressBar, verb: &str, progress: &ApkProgress) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.current as u64);
    pb.set_message(progress.phase.as_str());

    if let Some(line) = entry_line(verb, progress) {
        if pb.is_hidden() {
            println!("{line}");
        } else {
            pb.println(line);
        }
    }
}

/// Per-entry progress line, if the update names an entry
#[must_use]
pub fn entry_line(verb: &str, progress: &ApkProgress) -> Option<String> {
    progress
        .current_file
        .as_ref()
        .map(|name| format!("  {verb} {name}"))
}

/// Last path component for compact display
#[must_use]
pub fn short_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apk::ApkPhase;

    #[test]
    fn test_entry_line() {
        let named = ApkProgress::with_file(ApkPhase::ExtractingFiles, 2, 5, "ui/a.dds");
        assert_eq!(entry_line("Extracting", &named).as_deref(), Some("  Extracting ui/a.dds"));

        let unnamed = ApkProgress::new(ApkPhase::WritingIndex, 5, 5);
        assert_eq!(entry_line("Compressing", &unnamed), None);
    }

    #[test]
    fn test_hidden_bar_still_tracks_position() {
        let pb = ProgressBar::hidden();
        assert!(pb.is_hidden());

        let progress = ApkProgress::with_file(ApkPhase::CompressingFiles, 3, 7, "tex2.dds");
        report_entry(&pb, "Compressing", &progress);
        assert_eq!(pb.position(), 3);
        assert_eq!(pb.length(), Some(7));
    }
}
