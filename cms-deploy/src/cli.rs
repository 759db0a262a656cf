//! # cms-deploy CLI interface
//!
//! Command parsing and the async [`run`] entrypoint. Deployment logic lives in
//! `cms-deploy-core`; this module loads the config, wires the toolchain and
//! reports the outcome.
//!
//! [`run`] is public so integration tests can drive the CLI without spawning
//! the binary.

use crate::load_config::load_config;
use crate::toolchain::build_toolchain;
use anyhow::Result;
use clap::{Parser, Subcommand};
use cms_deploy_core::destination::resolve_destinations;
use cms_deploy_core::pipeline::PipelineReport;
use std::path::PathBuf;

/// Build and deploy a CMS web solution into its web roots.
#[derive(Parser)]
#[clap(
    name = "cms-deploy",
    version,
    about = "Publish, copy, transform and sync a CMS web solution into its web roots"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Run one pipeline step by name or task kind
    Step {
        /// Step name (e.g. `publish_source_projects:feature`) or task kind
        name: String,
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Print the web roots files are deployed to
    Destinations {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// List the pipeline's steps in run order
    Steps {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

fn print_report(report: &PipelineReport) {
    for outcome in &report.steps {
        match &outcome.error {
            Some(e) => println!("{}: tolerated failure ({e})", outcome.name),
            None => println!("{}: ok", outcome.name),
        }
    }
}

/// Async CLI entrypoint used by `main` and by integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run { config } => {
            let config = load_config(config)?;
            let pipeline = config.pipeline()?;
            let tools = build_toolchain(&config.tools);
            tracing::info!(command = "run", steps = pipeline.steps.len(), "Starting deployment");
            match pipeline.run(&config.paths, &tools).await {
                Ok(report) => {
                    tracing::info!(command = "run", ?report, "Deployment complete");
                    print_report(&report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Deployment failed");
                    Err(e.into())
                }
            }
        }
        Commands::Step { name, config } => {
            let config = load_config(config)?;
            let pipeline = config.pipeline()?;
            let tools = build_toolchain(&config.tools);
            tracing::info!(command = "step", step = %name, "Running single step");
            let report = pipeline.run_step(&name, &config.paths, &tools).await?;
            print_report(&report);
            Ok(())
        }
        Commands::Destinations { config } => {
            let config = load_config(config)?;
            for destination in resolve_destinations(&config.paths) {
                println!("{}", destination.display());
            }
            Ok(())
        }
        Commands::Steps { config } => {
            let config = load_config(config)?;
            let pipeline = config.pipeline()?;
            for (step, name) in pipeline.steps.iter().zip(pipeline.step_names()) {
                println!("{name}\t{:?}", step.policy());
            }
            Ok(())
        }
    }
}
