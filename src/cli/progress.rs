//! Progress bar and summary reporting for CLI installs.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::format::{format_bytes, format_duration};
use crate::gate::InstallProgress;
use crate::key::RequestKey;
use crate::manifest::AssetManifest;
use crate::stats::InstallStats;
use crate::store::EntrySummary;

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Install progress rendered as an indicatif bar, one tick per asset.
pub struct InstallBar {
    bar: ProgressBar,
}

impl InstallBar {
    /// Creates a bar sized to the manifest.
    #[must_use]
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} assets - {msg}",
            )
            .expect("progress template is valid")
            .progress_chars("━━╌"),
        );
        Self { bar }
    }

    /// Clears the bar once install is over.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl InstallProgress for InstallBar {
    fn on_asset_fetched(&self, key: &RequestKey, bytes: u64) {
        self.bar.set_message(format!("{key} ({})", format_bytes(bytes)));
        self.bar.inc(1);
    }

    fn on_asset_failed(&self, key: &RequestKey, error: &str) {
        let _ = self
            .bar
            .println(format!("  {} {key}: {error}", style("FAILED").red()));
    }
}

/// Prints the manifest about to be pre-cached.
pub fn print_manifest(manifest: &AssetManifest, origin: &str, cache_name: &str) {
    println!("\n{SEPARATOR}");
    println!("Pre-caching {} asset(s) from {origin} into {cache_name}:", manifest.len());
    println!("{SEPARATOR}");
    for key in manifest {
        println!("  {key}");
    }
    println!("{SEPARATOR}\n");
}

/// Prints a summary of install statistics.
pub fn print_summary(stats: &InstallStats, cache_name: &str) {
    println!("\n{SEPARATOR}");
    println!("Install Summary");
    println!("{SEPARATOR}");
    println!("  Bucket:            {cache_name}");
    println!("  Assets cached:     {}", stats.assets_cached);
    println!("  Total size:        {}", format_bytes(stats.total_bytes));
    println!("  Total time:        {}", format_duration(stats.elapsed));
    println!(
        "  Average speed:     {}/s",
        format_bytes(stats.average_speed())
    );
    println!("{SEPARATOR}");
}

/// Prints bucket contents as a table.
pub fn print_entries(cache_name: &str, entries: &[EntrySummary]) {
    if entries.is_empty() {
        println!("Bucket {cache_name} is empty. Run `goatherd install` first.");
        return;
    }

    let total: u64 = entries.iter().map(|e| e.size).sum();

    println!("\n{SEPARATOR}");
    println!("Bucket {cache_name}:");
    println!("{SEPARATOR}");
    for entry in entries {
        println!(
            "  {:40} {:>10}  {}",
            entry.key,
            format_bytes(entry.size),
            entry.content_type.as_deref().unwrap_or("-"),
        );
    }
    println!("{SEPARATOR}");
    println!("  {} entr(ies), {} total", entries.len(), format_bytes(total));
    println!("{SEPARATOR}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_bar_tracks_assets() {
        let bar = InstallBar::new(5);
        assert_eq!(bar.bar.length(), Some(5));
        bar.on_asset_fetched(&RequestKey::new("/"), 128);
        assert_eq!(bar.bar.position(), 1);
        bar.finish();
    }
}
