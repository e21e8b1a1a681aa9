use deplan_cli::commands::{self, PlanOptions};
use deplan_cli::logging;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "deplan",
    about = "Plan artifact deployments from feature catalogs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Resolve a deployment request into an ordered list of artifacts
    ///
    /// Features are expanded against the catalog(s), every referenced artifact
    /// is read from the repository directory, overrides are applied and the
    /// requirement graph is resolved. The plan is printed one artifact per
    /// line, sorted by location.
    ///
    /// Locations:
    ///   mvn:group/artifact/version[/ext[/classifier]]  - under --repo, maven layout
    ///   file:/path/to/bundle.jar                       - read directly
    ///
    /// Examples:
    ///   deplan plan --catalog features.toml --repo ./repo --feature web/1.0.0
    ///   deplan plan --catalog features.toml --request plan.toml --repo ./repo --json
    Plan {
        /// Feature catalog file (repeatable)
        #[arg(long, short = 'c', value_name = "FILE", required = true)]
        catalog: Vec<PathBuf>,

        /// Plan request file (features, bundles, overrides, metadata)
        #[arg(long, short = 'r', value_name = "FILE")]
        request: Option<PathBuf>,

        /// Artifact repository directory
        #[arg(long, value_name = "DIR", default_value = ".")]
        repo: PathBuf,

        /// Feature to install, as name[/version or range] (repeatable)
        #[arg(long, short = 'f', value_name = "SPEC")]
        feature: Vec<String>,

        /// Bundle location to install (repeatable)
        #[arg(long, short = 'b', value_name = "URI")]
        bundle: Vec<String>,

        /// Override location, optionally with ;range="[a,b)" (repeatable)
        #[arg(long, value_name = "URI")]
        r#override: Vec<String>,

        /// Config file (defaults to ~/.config/deplan/config.toml)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        /// Debug logging and the artifact list on stderr
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// List the features of one or more catalogs
    Features {
        /// Feature catalog file (repeatable)
        #[arg(long, short = 'c', value_name = "FILE", required = true)]
        catalog: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            catalog,
            request,
            repo,
            feature,
            bundle,
            r#override,
            config,
            json,
            verbose,
        } => {
            logging::init(verbose)?;
            commands::plan::run(PlanOptions {
                catalogs: catalog,
                request,
                repo,
                features: feature,
                bundles: bundle,
                overrides: r#override,
                config,
                json,
                verbose,
            })
            .await
        }
        Command::Features { catalog } => {
            logging::init(false)?;
            commands::features::run(&catalog)
        }
    }
}
