use anyhow::Result;
use clap::{Parser, Subcommand};

use git_lineage::analyzer::StateCalculator;
use git_lineage::branches::{latest_branch_specs, master_branch_specs};
use git_lineage::catalog::ReleaseCatalog;
use git_lineage::checker::{check_and_repair, Checker, RemoteChecker, RepairOutcome};
use git_lineage::config::{self, Config};
use git_lineage::git::{Backend, Git2Backend};
use git_lineage::session::Session;
use git_lineage::ui;

#[derive(Parser)]
#[command(
    name = "git-lineage",
    about = "Derive semantic versions from git history and keep release lineage consistent"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate the version of a commit from its history
    Version {
        #[arg(default_value = "HEAD", help = "Commit, branch, or tag to calculate")]
        rev: String,

        #[arg(long, help = "Show the full calculated state")]
        detail: bool,
    },
    /// List releases in ascending version order
    Releases,
    /// Show the convention branches that should exist
    Branches,
    /// Run the consistency checks and report the first failure
    Check {
        #[arg(long, help = "Also check refs on the configured remote")]
        remote: bool,
    },
    /// Repair failures until the repository is clean or a failure needs
    /// manual intervention
    Repair,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let backend = match Git2Backend::open(".") {
        Ok(backend) => backend,
        Err(e) => {
            ui::display_error(&format!("Git repository error: {}", e));
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Version { rev, detail } => run_version(&backend, &config, &rev, detail),
        Command::Releases => run_releases(&backend, &config),
        Command::Branches => run_branches(&backend, &config),
        Command::Check { remote } => run_check(&backend, &config, remote),
        Command::Repair => run_repair(&backend, &config),
    }
}

fn run_version(backend: &Git2Backend, config: &Config, rev: &str, detail: bool) -> Result<()> {
    let session = Session::new(backend, config)?;
    let calculator = StateCalculator::new(&session);

    let commit = backend.resolve(rev)?;
    let state = calculator.calculate(commit)?;

    if detail {
        ui::display_commit_state(&state);
    } else {
        println!("{}", state.version);
    }

    Ok(())
}

fn run_releases(backend: &Git2Backend, config: &Config) -> Result<()> {
    let session = Session::new(backend, config)?;
    let catalog = ReleaseCatalog::build(&session)?;

    if catalog.ascending().is_empty() {
        ui::display_status("No releases found");
        return Ok(());
    }

    for release in catalog.ascending() {
        println!(
            "{}  {}  ({})",
            release.version, release.commit, release.tag_name
        );
    }

    Ok(())
}

fn run_branches(backend: &Git2Backend, config: &Config) -> Result<()> {
    let session = Session::new(backend, config)?;
    let catalog = ReleaseCatalog::build(&session)?;

    for spec in latest_branch_specs(&catalog) {
        println!("{}  ->  {}  (release {})", spec.name, spec.commit, spec.version);
    }
    for spec in master_branch_specs(&session, &catalog)? {
        println!("{}  ->  {}  (series {})", spec.name, spec.commit, spec.version);
    }

    Ok(())
}

fn run_check(backend: &Git2Backend, config: &Config, remote: bool) -> Result<()> {
    let session = Session::new(backend, config)?;
    let checker = Checker::new(&session);

    if let Some(failure) = checker.check()? {
        ui::display_check_failure(&failure);
        std::process::exit(1);
    }

    if remote {
        let remote_checker = RemoteChecker::new(&session, config.remote.clone());
        if let Some(failure) = remote_checker.check()? {
            ui::display_check_failure(&failure);
            std::process::exit(1);
        }
    }

    ui::display_success("Release lineage is consistent");
    Ok(())
}

fn run_repair(backend: &Git2Backend, config: &Config) -> Result<()> {
    match check_and_repair(backend, config)? {
        RepairOutcome::Clean { repairs } => {
            for repair in &repairs {
                ui::display_status(repair);
            }
            if repairs.is_empty() {
                ui::display_success("Release lineage is consistent; nothing to repair");
            } else {
                ui::display_success(&format!("Applied {} repair(s)", repairs.len()));
            }
            Ok(())
        }
        RepairOutcome::Fatal {
            description,
            repair_description,
            repairs,
        } => {
            for repair in &repairs {
                ui::display_status(repair);
            }
            ui::display_error(&description);
            ui::display_status(&format!("manual fix: {}", repair_description));
            std::process::exit(1);
        }
    }
}
