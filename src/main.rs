use clap::{Parser, Subcommand};
use notebook_site::config::{SiteConfig, SitePaths};
use notebook_site::{config, convert, listing, output, server};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "notebook-site")]
#[command(about = "Publish Jupyter notebooks as a small website")]
#[command(long_about = "\
Publish Jupyter notebooks as a small website

Notebooks are converted once into JSON records of display items; the server
renders pages from those records.

Project layout (all paths configurable in config.toml):

  ./
  ├── config.toml                    # Optional, see 'notebook-site gen-config'
  ├── datasets/                      # Source notebooks
  │   ├── 05_Regresion_Logistica.ipynb
  │   └── 06_Visualizacion.ipynb
  ├── templates/notebooks/           # Records written by 'convert'
  │   └── 05_Regresion_Logistica.json
  └── static/notebooks/              # Images extracted from outputs
      └── 05_Regresion_Logistica/
          ├── img_1.png
          └── img_2.jpg

Logging goes to stderr and follows RUST_LOG (default: info, or debug when
server.debug is set).")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding config.toml; relative paths in the config resolve against it
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert notebooks into records (the whole notebook folder by default)
    Convert {
        /// Convert only this notebook file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List the notebooks in a folder
    List { folder: PathBuf },
    /// Serve the site over HTTP
    Serve,
    /// Remove markdown items from every stored record
    StripMarkdown,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert { file: Some(file) } => {
            let (_, paths) = setup(&cli.config_dir)?;
            let report = convert::convert_file(&file, &paths)?;
            output::print_conversion(&report, &cli.config_dir);
        }
        Command::Convert { file: None } => {
            let (site_config, paths) = setup(&cli.config_dir)?;
            println!("==> Converting {}", paths.notebooks_dir.display());
            let report = convert::convert_folder(&paths, &site_config.convert.targets)?;
            output::print_batch_report(&report, &cli.config_dir);
        }
        Command::List { folder } => {
            setup(&cli.config_dir)?;
            let listing = listing::list_notebooks(&folder)?;
            output::print_listing(&listing);
        }
        Command::Serve => {
            let (site_config, _) = setup(&cli.config_dir)?;
            if site_config.server.uses_default_secret() && !site_config.server.debug {
                tracing::warn!(
                    "server.secret_key is the development default; set NBSITE_SECRET_KEY"
                );
            }
            let state = server::AppState::new(site_config, &cli.config_dir);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(state))?;
        }
        Command::StripMarkdown => {
            let (_, paths) = setup(&cli.config_dir)?;
            let report = convert::strip_markdown(&paths.records_dir)?;
            output::print_strip_report(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load config, start logging, and resolve the configured directories.
fn setup(config_dir: &Path) -> Result<(SiteConfig, SitePaths), config::ConfigError> {
    let site_config = config::load_config(config_dir)?;
    init_tracing(site_config.server.debug);
    let paths = site_config.paths.resolve(config_dir);
    Ok((site_config, paths))
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "notebook_site=debug,tower_http=debug"
    } else {
        "notebook_site=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
