//! Display utilities for progress bars, reports and prompts.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_io::{Action, ExecutionReport, ProgressCallback, ProgressEvent};

pub type ProgressBars = Arc<Mutex<HashMap<String, ProgressBar>>>;

/// Progress styles used while downloading and unpacking.
pub struct ProgressStyles {
    pub download: ProgressStyle,
    pub spinner: ProgressStyle,
    pub done: ProgressStyle,
}

impl Default for ProgressStyles {
    fn default() -> Self {
        Self {
            download: ProgressStyle::default_bar()
                .template(
                    "    {prefix:<16} {bar:25.cyan/dim} {bytes:>10}/{total_bytes:<10} {eta:>6}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("━━╸"),
            spinner: ProgressStyle::default_spinner()
                .template("    {prefix:<16} {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            done: ProgressStyle::default_spinner()
                .template("    {prefix:<16} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        }
    }
}

/// Create a progress callback that draws one bar per artifact.
pub fn create_progress_callback(
    multi: MultiProgress,
    styles: ProgressStyles,
) -> (Arc<ProgressCallback>, ProgressBars) {
    let bars: ProgressBars = Arc::new(Mutex::new(HashMap::new()));

    let bars_clone = bars.clone();
    let download_style = styles.download;
    let spinner_style = styles.spinner;
    let done_style = styles.done;

    let callback: Arc<ProgressCallback> = Arc::new(Box::new(move |event: ProgressEvent| {
        let Ok(mut bars) = bars_clone.lock() else {
            return;
        };
        match event {
            ProgressEvent::DownloadStarted { name, total_bytes } => {
                let pb = match total_bytes {
                    Some(total) => {
                        let pb = multi.add(ProgressBar::new(total));
                        pb.set_style(download_style.clone());
                        pb
                    }
                    None => {
                        let pb = multi.add(ProgressBar::new_spinner());
                        pb.set_style(spinner_style.clone());
                        pb.set_message("downloading...");
                        pb.enable_steady_tick(Duration::from_millis(80));
                        pb
                    }
                };
                pb.set_prefix(name.clone());
                bars.insert(name, pb);
            }
            ProgressEvent::DownloadProgress {
                name,
                downloaded,
                total_bytes,
            } => {
                if let Some(pb) = bars.get(&name) {
                    // The length is only known once the response headers arrive.
                    if let Some(total) = total_bytes
                        && pb.length() != Some(total)
                    {
                        pb.disable_steady_tick();
                        pb.set_length(total);
                        pb.set_style(download_style.clone());
                    }
                    pb.set_position(downloaded);
                }
            }
            ProgressEvent::DownloadCompleted { name, total_bytes } => {
                if let Some(pb) = bars.get(&name) {
                    pb.disable_steady_tick();
                    pb.set_style(done_style.clone());
                    pb.finish_with_message(format!(
                        "{} {}",
                        style("✓").green(),
                        format_bytes(total_bytes)
                    ));
                }
            }
            ProgressEvent::UnpackStarted { name } => {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style.clone());
                pb.set_prefix(name.clone());
                pb.set_message("unpacking...");
                pb.enable_steady_tick(Duration::from_millis(80));
                bars.insert(unpack_key(&name), pb);
            }
            ProgressEvent::UnpackCompleted { name } => {
                if let Some(pb) = bars.get(&unpack_key(&name)) {
                    pb.set_style(done_style.clone());
                    pb.finish_with_message(format!("{} unpacked", style("✓").green()));
                }
            }
        }
    }));

    (callback, bars)
}

fn unpack_key(name: &str) -> String {
    format!("{name}#unpack")
}

/// Finish any remaining progress bars.
pub fn finish_progress_bars(bars: &ProgressBars) {
    let Ok(bars) = bars.lock() else {
        return;
    };
    for pb in bars.values() {
        if !pb.is_finished() {
            pb.finish_and_clear();
        }
    }
}

/// Print the actions of an execution, one per line.
pub fn print_report(report: &ExecutionReport) {
    if report.dry_run {
        println!(
            "{} Dry run, nothing was changed. {} would:",
            style("==>").cyan().bold(),
            report.kind
        );
    }
    for action in &report.actions {
        println!("    {} {}", action_marker(action, report.dry_run), action);
    }
}

fn action_marker(action: &Action, dry_run: bool) -> String {
    if dry_run {
        return style("•").dim().to_string();
    }
    match action {
        Action::Remove { .. } | Action::RemoveExcept { .. } => style("✗").red().to_string(),
        _ => style("✓").green().to_string(),
    }
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> bool {
    eprint!("{prompt} [y/N]: ");
    if io::stderr().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    is_yes(&input)
}

pub(crate) fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Format bytes into a human-readable string (e.g., "1.5 GB").
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;
    use std::path::PathBuf;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_removals_are_marked_differently() {
        let remove = Action::Remove {
            path: PathBuf::from("/opt/app"),
        };
        let create = Action::CreateDir {
            path: PathBuf::from("/opt/app"),
        };
        assert_ne!(action_marker(&remove, false), action_marker(&create, false));
        assert_eq!(action_marker(&remove, true), action_marker(&create, true));
    }

    #[test]
    fn test_progress_callback_tracks_downloads_and_unpacks() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let (callback, bars) = create_progress_callback(multi, ProgressStyles::default());

        callback(ProgressEvent::DownloadStarted {
            name: "jre".to_string(),
            total_bytes: None,
        });
        callback(ProgressEvent::DownloadProgress {
            name: "jre".to_string(),
            downloaded: 10,
            total_bytes: Some(100),
        });
        {
            let bars = bars.lock().unwrap();
            assert_eq!(bars["jre"].length(), Some(100));
            assert_eq!(bars["jre"].position(), 10);
        }

        callback(ProgressEvent::DownloadCompleted {
            name: "jre".to_string(),
            total_bytes: 100,
        });
        callback(ProgressEvent::UnpackStarted {
            name: "jre".to_string(),
        });
        callback(ProgressEvent::UnpackCompleted {
            name: "jre".to_string(),
        });

        let guard = bars.lock().unwrap();
        assert_eq!(guard.len(), 2);
        assert!(guard.values().all(|pb| pb.is_finished()));
        drop(guard);

        finish_progress_bars(&bars);
    }
}
