use anyhow::{Context, Result};
use clap::Parser;
use export_solution::cli::{Cli, USAGE};
use export_solution::config::AppConfig;
use export_solution::export::{self, ExportError, ExportSolutionRequest, WebApiService};
use export_solution::timer::ElapsedTimer;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_not_ready_help() {
    println!("{}", USAGE);
    println!("Dynamics CRM Service not ready, please verify your connection string credentials.");
    println!("If Two Factor Authentication (2FA) is enabled on your AAD account please make sure");
    println!("you are using an app registration token in your connection string.");
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    println!("ExportSolution Version {}", env!("CARGO_PKG_VERSION"));
    println!();

    if !args.output_folder.is_dir() {
        println!("Please provide a valid output folder.");
        println!("{}", USAGE);
        anyhow::bail!(
            "Output folder does not exist: {}",
            args.output_folder.display()
        );
    }

    let config = AppConfig::load(&args.config)?;
    let connection = config.connection()?;
    let managed = args.managed();

    let folder_label = config
        .output_folder
        .as_deref()
        .unwrap_or(args.output_folder.as_path());
    let mut timer = ElapsedTimer::with_label(format!(
        "ExportSolution {} ({}) to {}",
        args.solution_name,
        if managed { "Managed" } else { "UNManaged" },
        folder_label.display()
    ));

    let request = ExportSolutionRequest::new(&args.solution_name, managed, args.include_settings);
    let result = WebApiService::connect(connection)
        .and_then(|service| export::export_to_folder(&service, &request, &args.output_folder));
    timer.stop();

    match result {
        Ok(outcome) => {
            println!(
                "ExportSolution {} {} {}",
                args.solution_name,
                outcome.path.display(),
                managed
            );
            println!("Wrote {} Bytes", outcome.bytes_written);
            timer.display();
            Ok(())
        }
        Err(ExportError::NotReady) => {
            print_not_ready_help();
            timer.display();
            Err(ExportError::NotReady).context("ExportSolution")
        }
        Err(e) => {
            tracing::error!("ExportSolution failed: {}", e);
            timer.display();
            Err(e).context("ExportSolution")
        }
    }
}
