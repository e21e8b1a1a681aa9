//! `deplan plan`: expand, fetch, resolve and print the deployment plan

use anyhow::{Context, Result};
use deplan_core::{
    Collaborators, DeploymentBuilder, DeploymentPlan, DownloadListener, FetchedArtifact,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::repository::DirectoryRepository;
use crate::request::PlanFile;
use crate::{catalog, config};

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub catalogs: Vec<PathBuf>,
    pub request: Option<PathBuf>,
    pub repo: PathBuf,
    pub features: Vec<String>,
    pub bundles: Vec<String>,
    pub overrides: Vec<String>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct PlanEntry<'a> {
    uri: &'a str,
    name: &'a str,
    version: String,
}

pub async fn run(options: PlanOptions) -> Result<()> {
    let config = config::load_config(options.config.as_deref())?;
    let catalog = catalog::load_catalog(&options.catalogs)?;

    let mut file = match &options.request {
        Some(path) => PlanFile::load(path)?,
        None => PlanFile::default(),
    };
    file.extend(options.features, options.bundles, options.overrides);
    if file.is_empty() {
        anyhow::bail!("nothing to plan: pass --request or at least one --feature or --bundle");
    }
    let request = file.into_request()?;

    let repository = Arc::new(DirectoryRepository::new(&options.repo));
    let collaborators = Collaborators::new(repository.clone(), repository.clone())
        .with_packaged_reader(repository.clone())
        .with_protocol_handlers(repository);
    let mut builder = DeploymentBuilder::new(config.planner.clone(), catalog, collaborators);

    let listener: DownloadListener = Arc::new(|artifact: &FetchedArtifact, pending: usize| {
        tracing::debug!("Fetched {} ({} pending)", artifact.url, pending);
    });
    builder
        .submit(&request, Some(listener))
        .await
        .context("Failed to prepare deployment")?;

    let system = config.system.to_resource()?;
    let plan = builder
        .resolve(system, config.resolve_optional_imports)
        .context("Failed to resolve deployment")?;

    if options.verbose {
        eprintln!("Artifacts:");
        for (location, provider) in builder.providers() {
            eprintln!("  {} -> {}", location, provider.artifact().path.display());
        }
    }

    if options.json {
        println!("{}", render_json(&plan)?);
    } else {
        print!("{}", render_text(&plan));
    }
    Ok(())
}

fn entries(plan: &DeploymentPlan) -> Vec<PlanEntry<'_>> {
    plan.iter()
        .map(|(uri, resource)| PlanEntry {
            uri,
            name: resource.name(),
            version: resource.version().to_string(),
        })
        .collect()
}

/// One `uri  name/version` line per artifact, in plan order
pub fn render_text(plan: &DeploymentPlan) -> String {
    entries(plan)
        .iter()
        .map(|e| format!("{}  {}/{}\n", e.uri, e.name, e.version))
        .collect()
}

pub fn render_json(plan: &DeploymentPlan) -> Result<String> {
    serde_json::to_string_pretty(&entries(plan)).context("Failed to serialize plan")
}
