//! CLI output formatting.
//!
//! Each format function is pure and returns lines, so it can be tested
//! without capturing stdout; `print_*` wrappers do the writing.
//!
//! ```text
//! ==> Resolving pages
//!     skip missing.html (not found)
//! ==> Composing pages
//! ==> Writing output
//!     001 index.html → out/index.html
//!     002 posts/hello.md → out/posts/hello.md
//!
//! Skipped
//!     missing.html: not found
//!
//! 2 pages written, 1 skipped, 0 failed → out
//! ```
//!
//! Paths are shown relative to the build root when possible.

use crate::pipeline::{BuildEvent, BuildState};
use crate::publish::PublishReport;
use crate::types::{BuildResult, Skipped};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Display `path` relative to `root`, falling back to the full path.
fn display_rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn skipped_line(skipped: &Skipped) -> String {
    match &skipped.path {
        Some(path) => format!(
            "{}: {} ({})",
            skipped.specifier,
            skipped.reason,
            path.display()
        ),
        None => format!("{}: {}", skipped.specifier, skipped.reason),
    }
}

/// Format one progress event. Events with nothing to show return no lines.
pub fn format_build_event(event: &BuildEvent, root: &Path) -> Vec<String> {
    match event {
        BuildEvent::State(state) => match state {
            BuildState::Resolving => vec!["==> Resolving pages".to_string()],
            BuildState::Composing => vec!["==> Composing pages".to_string()],
            BuildState::Materializing => vec!["==> Writing output".to_string()],
            BuildState::Idle
            | BuildState::ManifestLoaded
            | BuildState::Done
            | BuildState::Failed => Vec::new(),
        },
        BuildEvent::PageSkipped(skipped) => {
            vec![format!("    skip {}", skipped_line(skipped))]
        }
        BuildEvent::PageWritten {
            index,
            source,
            output,
        } => vec![format!(
            "    {} {} → {}",
            format_index(*index),
            display_rel(source, root),
            display_rel(output, root)
        )],
        BuildEvent::PageFailed(failed) => vec![format!(
            "    FAIL {}: {}",
            display_rel(&failed.source_path, root),
            failed.error
        )],
    }
}

/// Format the end-of-build report: skipped and failed entries, then totals.
pub fn format_build_summary(result: &BuildResult, root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !result.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for skipped in &result.skipped {
            lines.push(format!("    {}", skipped_line(skipped)));
        }
    }

    if !result.failed.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failed in &result.failed {
            lines.push(format!(
                "    {}: {}",
                display_rel(&failed.source_path, root),
                failed.error
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} → {}",
        result.summary(),
        display_rel(&result.output_dir, root)
    ));
    lines
}

pub fn format_publish_report(report: &PublishReport) -> Vec<String> {
    let noun = if report.files_copied == 1 { "file" } else { "files" };
    vec![format!(
        "==> Published {} {} to {}",
        report.files_copied, noun, report.destination
    )]
}

/// Print one progress event to stdout.
pub fn print_build_event(event: &BuildEvent, root: &Path) {
    for line in format_build_event(event, root) {
        println!("{}", line);
    }
}

/// Print the build summary to stdout.
pub fn print_build_summary(result: &BuildResult, root: &Path) {
    for line in format_build_summary(result, root) {
        println!("{}", line);
    }
}

pub fn print_publish_report(report: &PublishReport) {
    for line in format_publish_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Failed, SkipReason};
    use std::path::PathBuf;

    #[test]
    fn written_event_shows_index_and_relative_paths() {
        let root = Path::new("/site");
        let event = BuildEvent::PageWritten {
            index: 2,
            source: PathBuf::from("/site/posts/a.md"),
            output: PathBuf::from("/site/out/posts/a.md"),
        };
        assert_eq!(
            format_build_event(&event, root),
            vec!["    002 posts/a.md → out/posts/a.md"]
        );
    }

    #[test]
    fn quiet_states_produce_no_lines() {
        let root = Path::new("/site");
        assert!(format_build_event(&BuildEvent::State(BuildState::Idle), root).is_empty());
        assert!(format_build_event(&BuildEvent::State(BuildState::Done), root).is_empty());
        assert_eq!(
            format_build_event(&BuildEvent::State(BuildState::Resolving), root),
            vec!["==> Resolving pages"]
        );
    }

    #[test]
    fn skipped_event_includes_reason() {
        let event = BuildEvent::PageSkipped(Skipped::new("missing.html", SkipReason::NotFound));
        assert_eq!(
            format_build_event(&event, Path::new("/site")),
            vec!["    skip missing.html: not found"]
        );
    }

    #[test]
    fn clean_summary_is_one_line_after_blank() {
        let mut result = BuildResult::new("/site/out");
        result.written = 3;
        assert_eq!(
            format_build_summary(&result, Path::new("/site")),
            vec!["", "3 pages written, 0 skipped, 0 failed → out"]
        );
    }

    #[test]
    fn summary_lists_skipped_and_failed() {
        let mut result = BuildResult::new("/site/out");
        result.written = 1;
        result.skipped.push(
            Skipped::new("*.html", SkipReason::DuplicateOutputPath).with_path("index.html"),
        );
        result.failed.push(Failed {
            source_path: PathBuf::from("/site/broken.md"),
            error: "Failed to read page".into(),
        });

        let lines = format_build_summary(&result, Path::new("/site"));

        assert_eq!(
            lines,
            vec![
                "",
                "Skipped",
                "    *.html: duplicate output path (index.html)",
                "",
                "Failed",
                "    broken.md: Failed to read page",
                "",
                "1 page written, 1 skipped, 1 failed → out",
            ]
        );
    }

    #[test]
    fn publish_report_line() {
        let report = PublishReport {
            destination: "/srv/www".into(),
            files_copied: 1,
        };
        assert_eq!(
            format_publish_report(&report),
            vec!["==> Published 1 file to /srv/www"]
        );
    }
}
