use crate::agents::{
    DeliveryAgent, DeliveryOutcome, DependencyUpdater, LockRefreshAgent, ProjectInfo,
    ProjectScannerAgent, RuntimePinAgent, SystemClock, WaitPolicy,
};
use crate::changes::ChangedFile;
use crate::error::{PipupError, Result};
use crate::repository::RepositoryFactory;
use crate::requirements::RequirementsFile;
use crate::settings::Settings;
use crate::source::ReleaseSource;
use crate::utils::PathValidator;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Execute the update workflow.
///
/// Returns the delivery outcome when `--merge` was requested and there was
/// something to deliver; the caller decides what a rejection means for the
/// exit code.
pub fn execute_update<P: AsRef<Path>>(
    project_path: P,
    merge: bool,
    repository: Option<&str>,
) -> Result<Option<DeliveryOutcome>> {
    if merge && repository.is_none() {
        return Err(PipupError::ProjectValidation(
            "--merge requires --repository".to_string(),
        ));
    }

    println!("{}", "Starting requirements update process...".cyan().bold());

    // Step 1: Validate project and settings
    println!("\n{}", "1. Validating project structure...".yellow());
    let (project_path, settings, project_info) = prepare(project_path.as_ref())?;
    println!("{}", "✓ Project structure is valid".green());

    // Step 2: Resolve requirements
    println!("\n{}", "2. Resolving requirements...".yellow());
    let source = RepositoryFactory::create_release_source(&settings)?;
    let resolved = resolve_requirements(&project_path, &project_info, &source)?;
    println!("{}", "✓ Resolution completed".green());

    // Step 3: Write changed files
    println!("\n{}", "3. Saving updated files...".yellow());
    let mut changed: Vec<ChangedFile> = Vec::new();
    for file in resolved.into_iter().filter(RequirementsFile::has_updates) {
        file.write(&project_path)?;
        println!("   • {}", file.path.display().to_string().bright_cyan());
        changed.push(ChangedFile::Requirements(file));
    }

    if let Some(lock_path) = project_info.lock_file.as_ref().filter(|_| settings.poetry) {
        println!("   Refreshing {}", lock_path.display());
        if let Some(lock) = LockRefreshAgent::new(&project_path).refresh()? {
            println!("   • {}", lock.path.display().to_string().bright_cyan());
            changed.push(ChangedFile::Lock(lock));
        }
    }

    if let Some(pin_path) = project_info
        .runtime_pin
        .as_ref()
        .filter(|_| settings.python_version)
    {
        if let Some(pin) = RuntimePinAgent::new(&project_path)?.bump()? {
            fs::write(project_path.join(pin_path), format!("{}\n", pin.current))?;
            println!("   • {}", pin.path.display().to_string().bright_cyan());
            changed.push(ChangedFile::RuntimePin(pin));
        }
    }

    if changed.is_empty() {
        println!("\n{}", "✨ No updates required".green().bold());
        return Ok(None);
    }

    print_changes(&changed);

    let Some(repository) = repository.filter(|_| merge) else {
        println!(
            "\n{}",
            "✨ Update process completed successfully!".green().bold()
        );
        return Ok(None);
    };

    // Step 4: Deliver
    println!(
        "\n{}",
        format!("4. Delivering changes to {repository}...").yellow()
    );
    let remote = RepositoryFactory::create_remote(repository)?;
    tracing::debug!("Using remote repository {}", remote.name());
    let clock = SystemClock;
    let outcome = DeliveryAgent::new(&remote, &clock, settings.workflows.clone())
        .with_policy(WaitPolicy::from_settings(&settings))
        .with_auto_tag(settings.auto_tag)
        .deliver(&changed)?;

    print_outcome(&outcome);
    Ok(Some(outcome))
}

/// Execute the check workflow (dry-run)
pub fn execute_check<P: AsRef<Path>>(project_path: P) -> Result<()> {
    println!("{}", "Checking for available updates...".cyan().bold());

    println!("\n{}", "1. Validating project structure...".yellow());
    let (project_path, settings, project_info) = prepare(project_path.as_ref())?;
    println!("{}", "✓ Project structure is valid".green());

    println!("\n{}", "2. Checking for available updates...".yellow());
    let source = RepositoryFactory::create_release_source(&settings)?;
    let resolved = resolve_requirements(&project_path, &project_info, &source)?;
    println!("{}", "✓ Check completed".green());

    let changed: Vec<ChangedFile> = resolved
        .into_iter()
        .filter(RequirementsFile::has_updates)
        .map(ChangedFile::Requirements)
        .collect();

    if changed.is_empty() {
        println!("\n{}", "✨ All requirements are up to date!".green().bold());
        return Ok(());
    }

    print_changes(&changed);
    Ok(())
}

fn prepare(project_path: &Path) -> Result<(PathBuf, Settings, ProjectInfo)> {
    let project_path = PathValidator::validate_project_path(project_path)?;
    let settings = Settings::load(&project_path)?;
    tracing::debug!("Using settings: {settings:?}");

    let project_info = ProjectScannerAgent::new(&project_path).scan(&settings)?;
    Ok((project_path, settings, project_info))
}

/// Reads and resolves every discovered requirements file. Nothing is
/// written; any lookup failure aborts before files are touched.
pub fn resolve_requirements(
    project_path: &Path,
    project_info: &ProjectInfo,
    source: &dyn ReleaseSource,
) -> Result<Vec<RequirementsFile>> {
    let files = project_info
        .requirement_files
        .iter()
        .map(|relative| RequirementsFile::read(project_path, relative))
        .collect::<Result<Vec<_>>>()?;

    DependencyUpdater::new(source)
        .with_progress(true)
        .update_all(&files)
}

fn print_changes(changed: &[ChangedFile]) {
    println!("\n{}", "📦 Updates:".cyan().bold());
    for file in changed {
        println!(
            "\n   {} ({})",
            file.path().display().to_string().bright_cyan(),
            file.change_count()
        );
        for line in file.detail().lines() {
            println!("     {}", line.green());
        }
    }
}

fn print_outcome(outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::NothingToDeliver => {
            println!("{}", "No changes needed delivering".yellow());
        }
        DeliveryOutcome::Merged {
            pull_request,
            sha,
            tag,
        } => {
            println!(
                "{}",
                format!("✓ Pull request #{pull_request} merged ({sha})").green()
            );
            if let Some(tag) = tag {
                println!("{}", format!("✓ Tagged {tag}").green());
            }
        }
        DeliveryOutcome::Rejected {
            pull_request,
            failed_checks,
        } => {
            println!(
                "{}",
                format!(
                    "✗ Pull request #{pull_request} rejected, failed checks: {}",
                    failed_checks.join(", ")
                )
                .red()
            );
        }
    }
}
