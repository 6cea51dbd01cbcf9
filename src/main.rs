//! `asset-revision` - resolve asset paths against revision manifests from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use asset_revision::{
    AssetFilter, AssetOptions, AssetRenderer, Config, FormatAsset, Formatter, ManifestService,
    OutputArgs, PatternFilter, RequestBase, ScopeFilter,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Resolve logical asset paths into cache-busted references.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Configuration file (JSON or YAML); discovered in the assets directory when omitted
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Public assets directory (default: current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    assets: Option<PathBuf>,

    /// Log resolution steps at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one asset through an output template
    #[command(visible_alias = "r")]
    Resolve {
        /// Logical asset path, relative to the assets directory
        path: String,

        /// Output template (default: configured format)
        #[arg(short, long)]
        format: Option<String>,

        /// Prefix with the base URL instead of the base path
        #[arg(long)]
        absolute: bool,

        /// Never report missing assets, manifests or revisions
        #[arg(long)]
        optional: bool,

        /// Path-only prefix of the current request
        #[arg(long, default_value = "")]
        base_path: String,

        /// Absolute URL prefix of the current request
        #[arg(long, default_value = "")]
        base_url: String,
    },

    /// Enumerate the entries of the manifest at the assets root
    #[command(visible_alias = "ls")]
    List {
        /// Only list entries whose path matches this regular expression
        #[arg(long)]
        filter: Option<String>,

        /// Only list entries below this directory
        #[arg(long)]
        scope: Option<String>,

        /// Output template for each entry
        #[arg(short, long, default_value = "%path%")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.assets.as_deref())?;

    match cli.command {
        Commands::Resolve {
            path,
            format,
            absolute,
            optional,
            base_path,
            base_url,
        } => {
            let mut args = OutputArgs::default()
                .with_need(!optional)
                .with_absolute(absolute);
            if let Some(format) = format {
                args = args.with_format(format);
            }

            let renderer = AssetRenderer::new(config);
            let output = renderer
                .render(&path, &args, &RequestBase::new(base_path, base_url))
                .with_context(|| format!("failed to resolve asset '{path}'"))?;
            println!("{output}");
        }
        Commands::List {
            filter,
            scope,
            format,
        } => list_assets(config, filter.as_deref(), scope.as_deref(), &format)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(config_file: Option<&Path>, assets: Option<&Path>) -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;

    let mut options = match config_file {
        Some(file) => {
            let mut options = AssetOptions::from_path(file)
                .with_context(|| format!("failed to load configuration from {}", file.display()))?;
            let config_dir = cwd.join(file.parent().unwrap_or(Path::new("")));
            let assets_path = Path::new(&options.assets_path);
            if !assets_path.is_absolute() {
                options.assets_path = config_dir.join(assets_path).to_string_lossy().into_owned();
            }
            options
        }
        None => {
            let dir = cwd.join(assets.unwrap_or(Path::new(".")));
            AssetOptions::discover(&dir)
                .with_context(|| format!("failed to discover configuration in {}", dir.display()))?
        }
    };

    if let Some(assets) = assets {
        options.assets_path = cwd.join(assets).to_string_lossy().into_owned();
    }

    Config::new(options).context("invalid asset configuration")
}

fn list_assets(
    config: Config,
    filter: Option<&str>,
    scope: Option<&str>,
    format: &str,
) -> Result<()> {
    let pattern = filter.map(PatternFilter::new).transpose()?;
    let scope = ScopeFilter::new(scope.unwrap_or_default());
    let selected = |path: &str| {
        scope.is_included(path) && pattern.as_ref().is_none_or(|pattern| pattern.is_included(path))
    };

    let service = ManifestService::new(config);
    let Some(manifest) = service.get_manifest(None, true)? else {
        bail!("no revision manifest found under {}", service.config().assets_root().display());
    };

    let formatter = Formatter::new(service.config(), &RequestBase::default());
    for (_, asset) in manifest.get_all(Some(&selected), false)? {
        println!("{}", formatter.format(&asset, format, false)?);
    }

    Ok(())
}
