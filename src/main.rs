mod adapters;
mod config;
mod core;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{CliOverrides, Config};
use crate::core::{
    CodeExplorer, DiffTarget, GitCli, GitDiffExplorer, ProjectFileExplorer, Reviewer,
    RevisionFileExplorer,
};

#[derive(Parser)]
#[command(name = "ai-code-review")]
#[command(about = "Stream project files or git diffs to a local LLM and print its review", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Model name (defaults to devstral)")]
    model: Option<String>,

    #[arg(long, global = true, help = "Generation server host (defaults to localhost)")]
    host: Option<String>,

    #[arg(long, global = true, help = "Generation server port (defaults to 11434)")]
    port: Option<u16>,

    #[arg(long, global = true, help = "Replace the built-in system prompt")]
    prompt: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "SECS",
        help = "Give up when the server sends nothing for this long"
    )]
    timeout: Option<u64>,

    #[arg(
        short,
        long,
        global = true,
        help = "Also write the finished review to this file"
    )]
    output: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Review every matching file under a project directory")]
    Project {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long = "ext", value_name = "EXT", help = "File extension to include (repeatable)")]
        extensions: Vec<String>,

        #[arg(long, value_name = "BYTES")]
        max_file_size: Option<u64>,

        #[arg(long, help = "Honor .gitignore and skip hidden files")]
        respect_ignore: bool,

        #[arg(long, value_name = "GLOB", help = "Skip paths matching this pattern (repeatable)")]
        exclude: Vec<String>,
    },
    #[command(about = "Review a git diff against a base ref")]
    Diff {
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        #[arg(long, help = "Base branch/ref (defaults to main)")]
        base: Option<String>,

        #[arg(long, conflicts_with_all = ["staged", "working_tree"], help = "Head ref (defaults to HEAD)")]
        head: Option<String>,

        #[arg(long, conflicts_with = "working_tree", help = "Compare the base with the index")]
        staged: bool,

        #[arg(long, help = "Compare the base with the working tree")]
        working_tree: bool,

        #[arg(long, help = "Only review changes to this file")]
        file: Option<String>,
    },
    #[command(about = "Review files as they were at a revision")]
    Show {
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        #[arg(long, default_value = "HEAD")]
        rev: String,

        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring configuration file: {:#}", e);
        Config::default()
    });
    config.merge_with_cli(CliOverrides {
        model: cli.model,
        host: cli.host,
        port: cli.port,
        system_prompt: cli.prompt,
        read_timeout_secs: cli.timeout,
    });

    let explorer = build_explorer(cli.command, &config)?;
    review_command(explorer, &config, cli.output).await
}

async fn review_command(
    explorer: Box<dyn CodeExplorer>,
    config: &Config,
    output_path: Option<PathBuf>,
) -> Result<()> {
    info!(
        "Starting review with model {} at {}:{}",
        config.model, config.host, config.port
    );

    let generator = adapters::OllamaClient::new(config.model_config())?;
    let mut reviewer = Reviewer::new(explorer, Box::new(generator));
    if let Some(prompt) = &config.system_prompt {
        reviewer = reviewer.with_system_prompt(prompt.clone());
    }

    let review = reviewer.review().await?;

    if let Some(path) = output_path {
        tokio::fs::write(&path, &review)
            .await
            .with_context(|| format!("Failed to write review to {}", path.display()))?;
        info!("Review written to {}", path.display());
    }

    Ok(())
}

fn build_explorer(command: Commands, config: &Config) -> Result<Box<dyn CodeExplorer>> {
    match command {
        Commands::Project {
            path,
            extensions,
            max_file_size,
            respect_ignore,
            exclude,
        } => {
            let extensions = if extensions.is_empty() {
                config.extensions.clone()
            } else {
                extensions
            };
            let mut patterns = config.exclude.clone();
            patterns.extend(exclude);

            let explorer = ProjectFileExplorer::new(path)
                .with_extensions(extensions)
                .with_max_file_size(max_file_size.unwrap_or(config.max_file_size))
                .respect_ignore(config.respect_ignore || respect_ignore)
                .with_exclude(&patterns)?;
            Ok(Box::new(explorer))
        }
        Commands::Diff {
            repo,
            base,
            head,
            staged,
            working_tree,
            file,
        } => {
            let base = base.unwrap_or_else(|| config.base.clone());
            let target = diff_target(head, staged, working_tree, config);
            let mut explorer = GitDiffExplorer::new(GitCli::new(repo), base, target);
            if let Some(file) = file {
                explorer = explorer.only(file);
            }
            Ok(Box::new(explorer))
        }
        Commands::Show { repo, rev, paths } => Ok(Box::new(RevisionFileExplorer::new(
            GitCli::new(repo),
            rev,
            paths,
        ))),
    }
}

fn diff_target(
    head: Option<String>,
    staged: bool,
    working_tree: bool,
    config: &Config,
) -> DiffTarget {
    if staged {
        DiffTarget::Staged
    } else if working_tree {
        DiffTarget::WorkingTree
    } else {
        DiffTarget::Head(head.unwrap_or_else(|| config.head.clone()))
    }
}
