use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use valog::config::{self, load_config};
use valog::layout::Layout;
use valog::output;
use valog::pipeline::{self, BuildOptions};
use valog::render::{TemplateId, TemplateSet};

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Ignore the build cache and re-render every article page
    #[arg(long)]
    no_cache: bool,

    /// Build from the saved issue snapshot instead of calling the GitHub API
    #[arg(long)]
    offline: bool,
}

#[derive(Parser)]
#[command(name = "valog")]
#[command(about = "Static blog generator for GitHub Issues")]
#[command(long_about = "\
Static blog generator for GitHub Issues

Every open issue of the repository becomes an article. Labels become tags,
the issue body is Markdown, and a line starting with !vml- is copied into the
page as raw HTML. The first such line is also the article's teaser.

Project structure:

  .
  ├── config.toml                  # Site config ([blog] is required)
  ├── template/
  │   ├── home.html                # Home page template
  │   └── article.html             # Article page template
  ├── static/                      # Copied to docs/static/
  ├── O-MD/                        # Build cache, issue snapshot, raw markdown
  └── docs/                        # Generated site
      ├── index.html
      ├── data.json
      └── article/<number>.html

Labels with a meaning (configurable in [special]):
  pinned    listed first on the home page
  top       listed right after pinned articles
  special   shown as a special card instead of in the list

Run 'valog gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file [default: <root>/config.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr (same as RUST_LOG=info)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch issues and generate the site
    Build(BuildArgs),
    /// Validate config.toml and templates without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = resolve_config_path(&cli.root, cli.config.as_deref());

    match cli.command {
        Command::Build(args) => {
            let options = BuildOptions {
                use_cache: !args.no_cache,
                offline: args.offline,
                today: Local::now().date_naive(),
            };
            println!("==> Building {}", cli.root.display());
            let (report, layout) =
                pipeline::run(&cli.root, &config_path, &options, pipeline::default_source)?;
            output::print_build_report(&report, &layout.home_page(), &layout.data_file);
            println!("==> Build complete: {}", layout.output_dir.display());
        }
        Command::Check => {
            println!("==> Checking {}", config_path.display());
            let config = load_config(&config_path)?;
            let layout = Layout::resolve(&cli.root, &config.paths);
            let templates = TemplateSet::load(&layout.templates_dir);
            let status: Vec<(PathBuf, bool)> = TemplateId::ALL
                .into_iter()
                .map(|id| (templates.path(id), templates.source(id).is_ok()))
                .collect();
            output::print_check_output(&config_path, &config, &status);
            if status.iter().any(|(_, found)| !found) {
                return Err("missing templates".into());
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the log subscriber. `--verbose` forces `info`; otherwise
/// `RUST_LOG` decides, defaulting to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => root.join("config.toml"),
    }
}
