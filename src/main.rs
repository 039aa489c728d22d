//! Replays a recorded build against the retrieval client and prints what a
//! consumer would see.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use buildlink::codec::{BuildIdentitySerializer, Serializer};
use buildlink::controller::BuildController;
use buildlink::error::{BuildlinkError, Result};
use buildlink::model::{BasicProject, BuildEnvironment};
use buildlink::settings::ClientSettings;
use buildlink::transport::FixtureTransport;

#[derive(Debug, Parser)]
#[command(name = "buildlink", version, about = "Replay a recorded build model exchange.")]
struct Cli {
    /// Settings file (TOML, JSON or YAML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Recorded fixture with the raw graph and the answers per model.
    #[arg(long)]
    fixture: PathBuf,
    /// Encoded build identity record to decode and print.
    #[arg(long)]
    identity: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match ClientSettings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "replay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &ClientSettings) -> Result<()> {
    if let Some(path) = &cli.identity {
        let bytes = fs::read(path)?;
        let mut decoder = settings.codec.decoder(bytes.as_slice());
        let identity = BuildIdentitySerializer.read(&mut decoder)?;
        println!("identity record: {identity}");
    }

    let json = fs::read_to_string(&cli.fixture)?;
    let mut controller = BuildController::new(FixtureTransport::from_json(&json)?);
    if let Some(context) = settings.compatibility_context()? {
        info!(build = %context.build(), "compatibility context configured");
        controller = controller.with_compatibility(context);
    }

    let build = controller.get_build_model()?;
    match build.build_identifier() {
        Ok(id) => println!("build: {id}"),
        Err(BuildlinkError::UnsupportedCapability { .. }) => println!("build: <unidentified>"),
        Err(e) => return Err(e),
    }
    print_project(&build.root_project()?)?;

    if let Some(environment) = controller.find_model::<BuildEnvironment>()? {
        println!("engine version: {}", environment.engine_version()?);
    }
    Ok(())
}

fn print_project(project: &BasicProject) -> Result<()> {
    for (depth, project) in project.subtree()? {
        let identifier = match project.project_identifier() {
            Ok(id) => id.to_string(),
            Err(BuildlinkError::UnsupportedCapability { .. }) => "-".to_string(),
            Err(e) => return Err(e),
        };
        println!("{:indent$}{} {}", "", project.path()?, identifier, indent = depth * 2);
    }
    Ok(())
}
