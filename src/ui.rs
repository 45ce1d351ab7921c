//! Terminal reporting helpers.
//!
//! Pure display functions, separated from command logic so main stays
//! focused on orchestration.

use console::style;

use crate::analyzer::CommitState;
use crate::checker::CheckFailure;

/// Print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Print a success message with a green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Print a status message with a yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Print a check failure with its repair description.
pub fn display_check_failure(failure: &CheckFailure<'_>) {
    eprintln!(
        "{} {}",
        style("FAILED:").red().bold(),
        failure.description
    );
    let label = if failure.is_repairable() {
        style("repair:").cyan()
    } else {
        style("manual fix:").yellow()
    };
    eprintln!("  {} {}", label, failure.repair_description);
}

/// Print the interesting parts of a calculated commit state.
pub fn display_commit_state(state: &CommitState) {
    println!("{}", style(&state.version).bold());
    println!("  commit:              {}", state.commit);
    match &state.tagged_release {
        Some(version) => println!("  release tag:         {}", version),
        None => println!("  release tag:         (none)"),
    }
    println!("  calculated release:  {}", state.calculated_release);
    println!("  calculated pre:      {}", state.calculated_prerelease);
    println!("  commits since rel.:  {}", state.commits_since_release);
    println!(
        "  changes since rel.:  breaking={} feature={}",
        state.has_breaking_since_release, state.has_feature_since_release
    );
}
