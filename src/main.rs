//! phlay - Phlay your commits onto Phabricator
//!
//! This is the command-line entry point.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use phlay::bridge::{Cinnabar, HashBridge};
use phlay::bugzilla::BugzillaClient;
use phlay::conduit::{find_repository, ConduitClient};
use phlay::config::{PhlayConfig, DEFAULT_BUGZILLA_URL};
use phlay::meta::{Enricher, MetaRecord, Planner};
use phlay::submit::{Progress, Submitter};
use phlay::vcs::{GitRepository, RemoteVcs};
use phlay::{PhlayError, PhlayResult};

#[derive(Parser, Debug)]
#[command(author, version, about = "Phlay your commits onto phabricator", long_about = None)]
struct Args {
    /// Commit to submit, or a `base..tip` range (either side defaults to HEAD)
    commit: String,

    /// Assume yes
    #[arg(short = 'y', long = "yes")]
    yes: bool,

    /// Enable verbose output; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Bugzilla instance to look bug numbers up on
    #[arg(long, env = "PHLAY_BUGZILLA_URL", default_value = DEFAULT_BUGZILLA_URL)]
    bugzilla_url: String,
}

/// Set up the tracing subscriber according to `-v` and `-q`.
fn configure_tracing(args: &Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_log::{AsLog, LogTracer};
    use tracing_subscriber::{filter::LevelFilter, EnvFilter};

    let level_filter = if args.quiet {
        LevelFilter::ERROR
    } else {
        match args.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // reqwest logs through the `log` crate
    LogTracer::builder()
        .with_max_level(level_filter.as_log())
        .init()?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("PHLAY_LOG")
        .from_env()?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = configure_tracing(&args) {
        eprintln!("Error initializing logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> PhlayResult<()> {
    let repo = GitRepository::discover(".")?;
    let config = PhlayConfig::new(repo.workdir()?)
        .assume_yes(args.yes)
        .bugzilla_url(&args.bugzilla_url);

    let remote = config.remote()?;
    let conduit = ConduitClient::new(remote.api.clone(), &remote.token)?;
    let repository = find_repository(&conduit, &remote.callsign)?;
    let bugzilla = BugzillaClient::new(config.bugzilla()?)?;
    debug!("submitting to {} ({})", repository.fields.name, repository.phid);

    let selection = repo.select(&args.commit)?;

    let mapping = match repo.remote_vcs() {
        RemoteVcs::Hg => {
            let mut bridge = HashBridge::new(Cinnabar::new(repo.workdir()?));
            bridge.populate(&repo, &selection.commits)?;
            Some(bridge.into_mapping())
        }
        RemoteVcs::Git => None,
    };

    let mut enricher = Enricher::new(&repo, &conduit, &bugzilla, repository.phid.clone());
    if let Some(mapping) = &mapping {
        enricher = enricher.with_mapping(mapping);
    }
    let mut records = enricher.enrich_all(&selection.commits)?;

    Planner::new(&repository, &remote.phabricator).plan_all(&mut records);
    for record in &records {
        print_record(record);
    }

    if !config.assume_yes && !confirm()? {
        return Err(PhlayError::Aborted);
    }

    Submitter::new(&repo, &conduit, &remote.phabricator).submit(
        &mut records,
        &selection.trailing,
        print_progress,
    )?;

    Ok(())
}

fn print_record(record: &MetaRecord) {
    println!();
    println!("{} {}", record.commit.id.short(), record.commit.summary());
    print!("{}", record.plan);
}

/// Ask before touching the server. An empty answer means yes.
fn confirm() -> io::Result<bool> {
    print!("\nContinue? (Y/n) ");
    io::stdout().flush()?;

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    println!();

    let answer = answer.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y")
}

fn print_progress(progress: Progress) {
    match progress {
        Progress::Uploaded { blob, phid } => {
            println!("Uploading binary blob {blob}");
            println!("  PHID = {phid}");
        }
        Progress::DiffCreated { title, uri } => {
            println!("Create Diff      {title}");
            println!("  Diff URI = {uri}");
        }
        Progress::RevisionEdited { created, title, uri } => {
            let status = if created { "Create Revision" } else { "Update Revision" };
            println!("{status}  {title}");
            println!("  Revision URI = {uri}");
        }
        Progress::HeadUpdated(head) => println!("Head updated to {head}"),
    }
}
