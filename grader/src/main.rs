//! Grading workspace orchestrator.
//!
//! Unpacks student submissions into `code/<student>/`, manages one isolated
//! environment per student, walks the roster from the shell and runs
//! single-student grading tasks against the course platform. Tasks keep each
//! assignment in its own `<assignment>/` directory; `--workspace` points the
//! other commands there.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use canvas::{Assignment, CanvasClient, GradingPlatform, PlatformRoster, spawn_roster_fetch};
use clap::{Parser, Subcommand, ValueEnum};
use grader::core::types::BatchReport;
use grader::error::GradingError;
use grader::exit_codes;
use grader::io::conda::CondaManager;
use grader::io::config::GradingConfig;
use grader::io::editor::CommandLauncher;
use grader::io::init::{InitOptions, InitOutcome, init_grading};
use grader::navigate::{SHELL_HOOK, ShellTarget};
use grader::orchestrator::Orchestrator;
use grader::pipeline::{TaskKind, TaskTarget};
use grader::submissions::submission_overview;
use tracing::debug;

type Grader = Orchestrator<CondaManager>;

#[derive(Parser)]
#[command(
    name = "grader",
    version,
    about = "Per-student environments and grading tasks for programming submissions"
)]
struct Cli {
    /// Work in one assignment's directory, as laid out by `grader task`
    /// (assignment name or directory name).
    #[arg(long, global = true, value_name = "ASSIGNMENT")]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `grading.toml` here and create the code and submissions directories.
    Init {
        /// Overwrite an existing configuration.
        #[arg(short, long)]
        force: bool,
    },
    /// Extract every `<student>_*.zip` submission into the code directory.
    Unpack,
    /// Print the students that have a code directory.
    Roster,
    /// Manage per-student environments.
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },
    /// Print shell directives for walking the roster.
    Shell {
        #[command(subcommand)]
        command: ShellCommand,
    },
    /// Fetch assignments and students from the course platform.
    Platform,
    /// Show each student's submission status, grade and comment counts.
    Submissions {
        /// Platform assignment id.
        #[arg(long)]
        assignment: u64,
    },
    /// Run one grading task for one student.
    Task {
        #[arg(value_enum)]
        kind: TaskArg,
        /// Platform assignment id.
        #[arg(long)]
        assignment: u64,
        /// Platform student id.
        #[arg(long)]
        student: u64,
    },
}

#[derive(Subcommand)]
enum EnvCommand {
    /// List managed environments and which students have one.
    List,
    /// Create missing environments; stops at the first failure.
    Create {
        /// Recreate environments that already exist.
        #[arg(short, long)]
        force: bool,
    },
    /// Remove every student's environment.
    Remove,
    /// Install each student's project into their environment.
    Install,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Go to the first student.
    Start,
    /// Go to the student after the one whose directory you are in.
    Next,
    /// Print the `grade` shell function that applies these directives.
    Hook,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TaskArg {
    Download,
    Unpack,
    CreateEnv,
    Open,
}

impl From<TaskArg> for TaskKind {
    fn from(arg: TaskArg) -> Self {
        match arg {
            TaskArg::Download => TaskKind::Download,
            TaskArg::Unpack => TaskKind::Unpack,
            TaskArg::CreateEnv => TaskKind::CreateEnvironment,
            TaskArg::Open => TaskKind::OpenForReview,
        }
    }
}

fn main() {
    grader::logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GradingError>() {
        Some(GradingError::NotInSession { .. }) => exit_codes::NOT_IN_SESSION,
        _ => exit_codes::INVALID,
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let workspace = cli.workspace.as_deref();
    let discover = || -> Result<Grader> {
        let orchestrator = Orchestrator::discover(&cwd)?;
        match workspace {
            Some(assignment) => orchestrator.for_assignment(assignment),
            None => Ok(orchestrator),
        }
    };
    match cli.command {
        Command::Init { force } => cmd_init(&cwd, force),
        Command::Unpack => Ok(print_batch(&discover()?.unpack_submissions()?)),
        Command::Roster => {
            for student in discover()?.roster()? {
                println!("{student}");
            }
            Ok(exit_codes::OK)
        }
        Command::Env { command } => {
            let orchestrator = discover()?;
            match command {
                EnvCommand::List => cmd_env_list(&orchestrator),
                EnvCommand::Create { force } => {
                    Ok(print_batch(&orchestrator.create_environments(force)?))
                }
                EnvCommand::Remove => Ok(print_batch(&orchestrator.remove_environments()?)),
                EnvCommand::Install => Ok(print_batch(&orchestrator.install_environments()?)),
            }
        }
        Command::Shell { command } => match command {
            ShellCommand::Hook => {
                print!("{SHELL_HOOK}");
                Ok(exit_codes::OK)
            }
            ShellCommand::Start => {
                let orchestrator = discover()?;
                print_directives(&orchestrator, &orchestrator.start()?)
            }
            ShellCommand::Next => {
                let orchestrator = discover()?;
                print_directives(&orchestrator, &orchestrator.next(&cwd)?)
            }
        },
        Command::Platform => cmd_platform(discover()?.config()),
        Command::Submissions { assignment } => cmd_submissions(discover()?.config(), assignment),
        Command::Task {
            kind,
            assignment,
            student,
        } => cmd_task(&discover()?, kind.into(), assignment, student),
    }
}

fn print_directives(orchestrator: &Grader, target: &ShellTarget) -> Result<i32> {
    debug!(student = %target.student, dir = %target.directory.display(), "shell target");
    print!("{}", orchestrator.directives(target));
    Ok(exit_codes::OK)
}

fn cmd_env_list(orchestrator: &Grader) -> Result<i32> {
    let listing = orchestrator.list_environments()?;
    println!("managed environments:");
    for name in &listing.managed {
        println!("  {name}");
    }
    println!("students:");
    for status in &listing.students {
        let state = if status.exists { "present" } else { "missing" };
        println!("  {}\t{}\t{state}", status.student, status.environment);
    }
    Ok(exit_codes::OK)
}

fn cmd_init(cwd: &Path, force: bool) -> Result<i32> {
    match init_grading(cwd, &InitOptions { force })? {
        InitOutcome::Created(paths) => {
            println!("wrote {}", paths.config_path.display());
            println!("code directory: {}", paths.code_dir.display());
            println!("submissions directory: {}", paths.submissions_dir.display());
        }
        InitOutcome::Existing(path) => {
            println!(
                "{} already exists; use --force to write a fresh one here",
                path.display()
            );
        }
    }
    Ok(exit_codes::OK)
}

/// Print one line per item; returns the batch exit code.
fn print_batch(report: &BatchReport) -> i32 {
    for item in &report.items {
        if item.outcome.is_failure() {
            println!("{}: FAILED: {}", item.student, item.outcome.message());
        } else {
            println!("{}: {}", item.student, item.outcome.message());
        }
    }
    if report.halted
        && let Some(last) = report.items.last()
    {
        eprintln!(
            "stopped at {}; remaining students were not processed",
            last.student
        );
    }
    if report.has_failures() {
        exit_codes::BATCH_FAILED
    } else {
        exit_codes::OK
    }
}

fn platform_client(config: &GradingConfig) -> Result<Arc<CanvasClient>> {
    config.canvas.validate()?;
    let client = CanvasClient::from_env(&config.canvas.server, &config.canvas.token_env)?;
    Ok(Arc::new(client))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")
}

async fn fetch_roster(
    platform: Arc<dyn GradingPlatform>,
    config: &GradingConfig,
) -> Result<PlatformRoster> {
    let fetch = spawn_roster_fetch(platform, config.canvas.query());
    let roster = fetch.join().await.context("fetch assignments and students")?;
    Ok(roster)
}

fn find_assignment(roster: &PlatformRoster, id: u64) -> Result<Assignment> {
    roster
        .assignment(id)
        .cloned()
        .ok_or_else(|| anyhow!("assignment {id} not found in the course"))
}

fn cmd_platform(config: &GradingConfig) -> Result<i32> {
    let platform = platform_client(config)?;
    let roster = runtime()?.block_on(fetch_roster(platform, config))?;
    println!("assignments:");
    for assignment in &roster.assignments {
        println!("  {}\t{}", assignment.id, assignment.name);
    }
    println!("students:");
    for student in &roster.students {
        println!("  {}\t{}", student.id, student.name);
    }
    Ok(exit_codes::OK)
}

fn cmd_task(
    orchestrator: &Grader,
    kind: TaskKind,
    assignment_id: u64,
    student_id: u64,
) -> Result<i32> {
    let config = orchestrator.config();
    let platform = platform_client(config)?;
    let launcher = CommandLauncher::new(config.editor.command.clone());

    let report = runtime()?.block_on(async {
        let roster = fetch_roster(platform.clone(), config).await?;
        let assignment = find_assignment(&roster, assignment_id)?;
        let student = roster
            .student(student_id)
            .cloned()
            .ok_or_else(|| anyhow!("student {student_id} not found in the course"))?;
        let target = TaskTarget::new(assignment, student);
        let pipeline = orchestrator.pipeline(&*platform, &launcher);
        anyhow::Ok(pipeline.execute(kind, &target).await)
    })?;

    println!("{}: {}", kind.title(), report.message);
    if report.success {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::TASK_FAILED)
    }
}

fn cmd_submissions(config: &GradingConfig, assignment_id: u64) -> Result<i32> {
    let platform = platform_client(config)?;
    let report = runtime()?.block_on(async {
        let roster = fetch_roster(platform.clone(), config).await?;
        let assignment = find_assignment(&roster, assignment_id)?;
        anyhow::Ok(submission_overview(&*platform, &assignment, &roster.students).await)
    })?;
    Ok(print_batch(&report))
}
