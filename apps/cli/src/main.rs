use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wastudio_project::kind::file_name;
use wastudio_project::{
    ConfigStore, ContentStore, Directory, FileKind, JupyterStore, LocalStore, Node, Project,
    ServerSettings, StudioConfig,
};

const DEFAULT_CONFIG_FILE: &str = "wastudio.json";

#[derive(Parser)]
#[command(
    name = "wastudio-cli",
    about = "Inspect and edit a wastudio project tree",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑；預設為目前目錄下的 wastudio.json。 / Config file (defaults to ./wastudio.json).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 以本機資料夾作為內容來源。 / Serve content from a local directory.
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "server")]
    root: Option<PathBuf>,

    /// 筆記本伺服器位址（可含 token）。 / Notebook server address, optionally with `?token=`.
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    /// 日誌等級；RUST_LOG 優先。 / Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出資料夾內容。 / List the immediate children of a directory.
    Ls(LsArgs),
    /// 遞迴列出所有檔案。 / List every file below the root.
    List,
    /// 以萬用字元篩選檔案。 / List files matching a glob pattern.
    Glob(GlobArgs),
    /// 建立檔案（必要時建立上層資料夾）。 / Create a file, creating parent directories.
    NewFile(NewFileArgs),
    /// 建立資料夾。 / Create a directory path.
    Mkdir(PathArgs),
    /// 刪除檔案或資料夾。 / Delete a file or directory.
    Rm(PathArgs),
    /// 重新命名。 / Rename an entry in place.
    Mv(MoveArgs),
    /// 儲存筆記本伺服器設定。 / Save the notebook server address to the config.
    Connect(ConnectArgs),
}

#[derive(Args)]
struct LsArgs {
    /// 資料夾路徑；預設為根目錄。 / Directory path (defaults to the root).
    #[arg(value_name = "PATH")]
    path: Option<String>,
}

#[derive(Args)]
struct GlobArgs {
    /// 例如 `src/**/*.{rs,wat}`。 / Pattern such as `src/**/*.{rs,wat}`.
    #[arg(value_name = "PATTERN")]
    pattern: String,
}

#[derive(Args)]
struct NewFileArgs {
    #[arg(value_name = "PATH")]
    path: String,

    /// 建立 Jupyter 筆記本。 / Create a Jupyter notebook.
    #[arg(long)]
    notebook: bool,

    /// 名稱已存在時自動改名，而非沿用既有檔案。 / Pick a free name instead of reusing an existing file.
    #[arg(long)]
    allow_rename: bool,
}

#[derive(Args)]
struct PathArgs {
    #[arg(value_name = "PATH")]
    path: String,
}

#[derive(Args)]
struct MoveArgs {
    #[arg(value_name = "PATH")]
    path: String,

    /// 新名稱（不可包含 `/`）。 / New name within the same directory.
    #[arg(value_name = "NEW_NAME")]
    new_name: String,
}

#[derive(Args)]
struct ConnectArgs {
    /// 例如 `http://localhost:8888/?token=abc`。 / e.g. `http://localhost:8888/?token=abc`.
    #[arg(value_name = "URL")]
    url: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        config,
        root,
        server,
        log_level,
        command,
    } = Cli::parse();
    init_tracing(&log_level);

    let config_store = ConfigStore::new(resolve_path(
        config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
    )?);

    match command {
        Commands::Connect(args) => connect(&config_store, &args.url),
        command => {
            let config = config_store
                .load()
                .with_context(|| format!("load config {}", config_store.path().display()))?
                .unwrap_or_default();
            let store = open_store(root.as_deref(), server.as_deref(), &config)?;
            let project = Project::new(Some(store));

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("start async runtime")?;
            runtime.block_on(execute(&project, command))
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `--root` and `--server` win over the config; a local root is the fallback.
fn open_store(
    root: Option<&Path>,
    server: Option<&str>,
    config: &StudioConfig,
) -> Result<Rc<dyn ContentStore>> {
    if let Some(root) = root {
        return local_store(root);
    }
    if let Some(address) = server {
        let settings = ServerSettings::from_address(address)?;
        tracing::info!(server = %settings.base_url, "using notebook server");
        return Ok(Rc::new(JupyterStore::new(settings)));
    }
    if let Some(settings) = config.server_settings()? {
        tracing::info!(server = %settings.base_url, "using configured notebook server");
        return Ok(Rc::new(JupyterStore::new(settings)));
    }
    match &config.root {
        Some(root) => local_store(root),
        None => local_store(Path::new(".")),
    }
}

fn local_store(root: &Path) -> Result<Rc<dyn ContentStore>> {
    let root = resolve_path(root.to_path_buf())?;
    if !root.is_dir() {
        bail!("content root '{}' is not a directory", root.display());
    }
    tracing::info!(root = %root.display(), "using local content root");
    Ok(Rc::new(LocalStore::new(root)))
}

async fn execute(project: &Project, command: Commands) -> Result<()> {
    match command {
        Commands::Ls(args) => {
            let directory = open_directory(project, args.path.as_deref()).await?;
            let children = project
                .with_status("Listing", directory.children())
                .await?;
            for child in children {
                if child.is_directory() {
                    println!("{}/", child.name());
                } else {
                    println!("{}", child.name());
                }
            }
        }
        Commands::List => {
            let paths = project.with_status("Listing", project.root().list()).await?;
            for path in paths {
                println!("{path}");
            }
        }
        Commands::Glob(args) => {
            let paths = project
                .with_status("Searching", project.root().glob(&args.pattern))
                .await?;
            for path in paths {
                println!("{path}");
            }
        }
        Commands::NewFile(args) => {
            let kind = if args.notebook {
                FileKind::JupyterNotebook
            } else {
                FileKind::from_name(file_name(&args.path))
            };
            let file = project
                .with_status(
                    "Creating",
                    project
                        .root()
                        .new_file(&args.path, kind, false, args.allow_rename),
                )
                .await
                .with_context(|| format!("create {}", args.path))?;
            println!("{}", file.path());
        }
        Commands::Mkdir(args) => {
            let directory = project
                .with_status("Creating", project.root().new_directory(&args.path))
                .await
                .with_context(|| format!("create directory {}", args.path))?;
            println!("{}", directory.path());
        }
        Commands::Rm(args) => {
            let (parent, node) = locate(project, &args.path).await?;
            project
                .with_status("Deleting", parent.remove_file(&node))
                .await
                .with_context(|| format!("remove {}", args.path))?;
            println!("Removed {}", args.path);
        }
        Commands::Mv(args) => {
            let (parent, node) = locate(project, &args.path).await?;
            project
                .with_status("Renaming", parent.rename_file(&node, &args.new_name))
                .await
                .with_context(|| format!("rename {}", args.path))?;
            println!("{}", node.path());
        }
        Commands::Connect(args) => bail!("'connect {}' does not use a content store", args.url),
    }
    Ok(())
}

async fn open_directory(project: &Project, path: Option<&str>) -> Result<Directory> {
    let Some(path) = path.filter(|path| !path.trim_matches('/').is_empty()) else {
        return Ok(project.root().clone());
    };
    match project.root().get_file(path).await? {
        Some(Node::Directory(directory)) => Ok(directory),
        Some(Node::File(_)) => bail!("'{path}' is not a directory"),
        None => bail!("'{path}' does not exist"),
    }
}

async fn locate(project: &Project, path: &str) -> Result<(Directory, Node)> {
    let node = project
        .root()
        .get_file(path)
        .await?
        .ok_or_else(|| anyhow!("'{path}' does not exist"))?;
    let parent = node
        .parent()
        .ok_or_else(|| anyhow!("'{path}' is the project root"))?;
    Ok((parent, node))
}

fn connect(config_store: &ConfigStore, address: &str) -> Result<()> {
    let settings = ServerSettings::from_address(address)?;
    let mut config = config_store
        .load()
        .with_context(|| format!("load config {}", config_store.path().display()))?
        .unwrap_or_default();
    config.server = Some(address.trim().to_string());
    config_store
        .save(&config)
        .with_context(|| format!("save config {}", config_store.path().display()))?;
    println!("Server: {}", settings.base_url);
    println!("Websocket: {}", settings.ws_url);
    println!("Saved to {}", config_store.path().display());
    Ok(())
}

fn resolve_path(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
