use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use courier::config::Config;
use courier::core::{DetachedSurface, LogNotifier};
use courier::utils::format_task_line;
use courier::{
    BatchRequest, ContainerId, FileStore, HttpFolderSnapshot, HttpTransfer, LocalFile, Orchestrator,
    RemoteClient, TaskJournal, TaskManager,
};

#[derive(Parser, Debug)]
#[command(name = "courier", version, about = "Upload files to cloud storage")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "courier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload files; names that already exist in the folder get a new version
    Upload {
        /// Destination folder id
        #[arg(long)]
        folder: Option<String>,
        /// Folder currently being viewed, defaults to --folder
        #[arg(long)]
        viewing: Option<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the persisted upload tasks
    List,
    /// Remove finished and failed tasks
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Can't load {}", cli.config.display()))?;

    let store = Arc::new(FileStore::new(&config.state_dir));
    let journal = TaskJournal::with_key(store, config.storage_key.clone());
    let handle = TaskManager::init(journal, config.restore_policy).await;
    let manager = handle.manager.clone();

    match cli.command {
        Command::Upload { folder, viewing, files } => {
            let mut local_files = Vec::with_capacity(files.len());
            for path in files {
                let file = LocalFile::from_path(&path)
                    .await
                    .with_context(|| format!("Can't read {}", path.display()))?;
                local_files.push(file);
            }

            let remote = RemoteClient::from_config(&config)?;
            let orchestrator = Orchestrator::new(
                manager.clone(),
                Arc::new(HttpTransfer::new(remote.clone())),
                Arc::new(HttpFolderSnapshot::new(remote)),
                Arc::new(LogNotifier),
                Arc::new(DetachedSurface),
            )
            .with_max_concurrent(config.max_concurrent);

            let mut request = BatchRequest::new(local_files);
            if let Some(viewing) = viewing.or_else(|| folder.clone()) {
                request = request.viewing(ContainerId::folder(viewing));
            }
            if let Some(folder) = folder {
                request = request.selected(ContainerId::folder(folder));
            }

            let report = orchestrator.upload_batch(request).await;
            for task_id in &report.task_ids {
                if let Some(task) = manager.get_task(*task_id).await? {
                    println!("{}", format_task_line(&task));
                }
            }
            println!(
                "{} created, {} updated, {} failed",
                report.created(),
                report.updated(),
                report.failed()
            );
        }
        Command::List => {
            for task in manager.tasks().await? {
                println!("{}", format_task_line(&task));
            }
        }
        Command::Clear => {
            let removed = manager.clear_completed().await?;
            println!("Removed {} tasks", removed);
        }
    }

    drop(manager);
    handle.dispose().await?;
    Ok(())
}
