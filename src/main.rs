use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use relboard_core::{OutputFormat, RelboardConfig};
use relboard_github::{GitHubClient, MarkdownCache, NoopMarkdownCache, SqliteMarkdownCache};
use relboard_web::render::TemplateRenderer;
use relboard_web::server::{self, AppState};
use relboard_web::service::ReleaseService;
use relboard_web::views::IndexView;

const CONFIG_FILE: &str = ".relboard.toml";

#[derive(Parser)]
#[command(
    name = "relboard",
    version,
    about = "Dashboard of GitHub releases",
    long_about = "Relboard shows the latest GitHub release of each configured repository,\n\
                   its release history, and who contributed to every release.\n\n\
                   Examples:\n  \
                     relboard init                 Create a .relboard.toml config file\n  \
                     relboard serve                Serve the dashboard on 127.0.0.1:5000\n  \
                     relboard latest --format json Print the latest releases as JSON\n  \
                     relboard doctor               Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .relboard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable summaries (default)\n  \
                         json  Machine-readable JSON"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the release dashboard over HTTP
    #[command(long_about = "Serve the release dashboard over HTTP.\n\n\
        The bind address comes from --bind, then RELBOARD_BIND, then [server] bind\n\
        in the config file.\n\n\
        Examples:\n  relboard serve\n  relboard serve --bind 0.0.0.0:8080")]
    Serve {
        /// Address to listen on (default: 127.0.0.1:5000)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the latest release of every configured repository
    Latest,
    /// Create a default .relboard.toml configuration file
    #[command(long_about = "Create a default .relboard.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .relboard.toml already exists.")]
    Init,
    /// Check your setup and environment
    #[command(long_about = "Check your setup and environment.\n\n\
        Runs diagnostics for the config file, configured repositories, GitHub\n\
        token, and markdown cache. Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mrelboard\x1b[0m v{version}, GitHub releases at a glance\n");
        println!("Quick start:");
        println!("  \x1b[36mrelboard init\x1b[0m      Create a .relboard.toml config file");
        println!("  \x1b[36mrelboard serve\x1b[0m     Serve the dashboard\n");
        println!("All commands:");
        println!("  \x1b[32mserve\x1b[0m     Serve the release dashboard over HTTP");
        println!("  \x1b[32mlatest\x1b[0m    Print the latest release per repository");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("relboard v{version}, GitHub releases at a glance\n");
        println!("Quick start:");
        println!("  relboard init      Create a .relboard.toml config file");
        println!("  relboard serve     Serve the dashboard\n");
        println!("All commands:");
        println!("  serve     Serve the release dashboard over HTTP");
        println!("  latest    Print the latest release per repository");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'relboard <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "relboard=debug,relboard_web=debug,relboard_github=debug,tower_http=debug"
    } else {
        "relboard=info,relboard_web=info,relboard_github=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RelboardConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(relboard_core::RelboardError::FileNotFound(path.to_path_buf()).into());
            }
            RelboardConfig::from_file(path)?
        }
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                RelboardConfig::from_file(default_path)?
            } else {
                RelboardConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

fn markdown_cache(config: &RelboardConfig) -> Result<Arc<dyn MarkdownCache>> {
    if !config.cache.enabled {
        return Ok(Arc::new(NoopMarkdownCache));
    }
    let cache = SqliteMarkdownCache::open(&config.cache.path)?;
    tracing::debug!(path = %config.cache.path.display(), "markdown cache opened");
    Ok(Arc::new(cache))
}

fn release_service(config: RelboardConfig) -> Result<ReleaseService> {
    let cache = markdown_cache(&config)?;
    let github = GitHubClient::new(&config.github, cache)?;
    if !github.is_authenticated() {
        tracing::warn!("no GitHub token configured, requests are rate limited");
    }
    Ok(ReleaseService::new(Arc::new(config), Arc::new(github)))
}

fn print_latest(view: &IndexView, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(view).into_diagnostic()?);
        }
        OutputFormat::Text => {
            if !view.not_empty {
                println!("No repositories configured. Run 'relboard init' to create a config.");
                return Ok(());
            }
            for card in &view.releases {
                let repo = &card.repository.full_name;
                match (&card.tag, &card.title) {
                    (Some(tag), Some(title)) => {
                        println!("{repo}  {tag}  {title}  [{}]  {}", card.status, card.created_at);
                        if !card.authors.is_empty() {
                            let logins: Vec<&str> =
                                card.authors.iter().map(|a| a.login.as_str()).collect();
                            println!("    authors: {}", logins.join(", "));
                        }
                    }
                    _ => println!("{repo}  no release information available"),
                }
            }
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

/// Doctor loads the config itself so a broken file is reported, not fatal.
fn run_doctor(config_path: Option<&Path>, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE));
    let config = if path.exists() {
        match RelboardConfig::from_file(path) {
            Ok(config) => {
                checks.push(CheckResult::pass(
                    "config_file",
                    format!("{} found", path.display()),
                ));
                config
            }
            Err(e) => {
                checks.push(CheckResult::fail(
                    "config_file",
                    format!("{} is invalid: {e}", path.display()),
                    "fix the TOML syntax or recreate it with 'relboard init'",
                ));
                RelboardConfig::default()
            }
        }
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            format!("{} not found", path.display()),
            "run 'relboard init' to create a default config",
        ));
        RelboardConfig::default()
    };

    // 2. Repositories
    match config.validate() {
        Ok(()) if config.repositories().is_empty() => checks.push(CheckResult::fail(
            "repositories",
            "no repositories configured",
            "add a [[repositories]] entry with owner and name",
        )),
        Ok(()) => checks.push(CheckResult::pass(
            "repositories",
            format!("{} configured", config.repositories().len()),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "repositories",
            e.to_string(),
            "fix the [[repositories]] entries in the config file",
        )),
    }

    // 3. GitHub token
    if config.github.resolve_token().is_some() {
        checks.push(CheckResult::pass("github_token", "token configured"));
    } else {
        checks.push(CheckResult::fail(
            "github_token",
            "GITHUB_TOKEN not set",
            "export GITHUB_TOKEN=... (anonymous requests are limited to 60 per hour)",
        ));
    }
    checks.push(CheckResult::info(
        "github_api",
        config.github.api_url.clone(),
    ));

    // 4. Markdown cache
    if !config.cache.enabled {
        checks.push(CheckResult::info("markdown_cache", "disabled"));
    } else if config.cache.path.exists() {
        match SqliteMarkdownCache::open(&config.cache.path).and_then(|cache| cache.len()) {
            Ok(entries) => checks.push(CheckResult::pass(
                "markdown_cache",
                format!("{} ({entries} entries)", config.cache.path.display()),
            )),
            Err(e) => checks.push(CheckResult::fail(
                "markdown_cache",
                e.to_string(),
                format!("delete {} to rebuild it", config.cache.path.display()),
            )),
        }
    } else {
        checks.push(CheckResult::info(
            "markdown_cache",
            format!(
                "{} not created yet (created on first render)",
                config.cache.path.display()
            ),
        ));
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let version = env!("CARGO_PKG_VERSION");
            println!("relboard v{version} environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Relboard Configuration

[github]
# Personal access token. Falls back to GITHUB_TOKEN, then GH_TOKEN.
# token = "ghp_..."
# api_url = "https://api.github.com"
# user_agent = "relboard"
# Releases per history page (1-100)
# page_size = 10

[server]
# bind = "127.0.0.1:5000"

[cache]
# Rendered release notes are cached in SQLite
# enabled = true
# path = ".relboard/markdown.db"

# One entry per repository shown on the dashboard
# [[repositories]]
# owner = "ritterim"
# name = "stuntman"
# description = "Library for impersonating users during development"
# id = "stuntman"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Serve { bind }) => {
            init_tracing(cli.verbose);
            let config = load_config(cli.config.as_deref())?;
            let bind = bind
                .or_else(|| std::env::var("RELBOARD_BIND").ok())
                .unwrap_or_else(|| config.server.bind.clone());
            tracing::info!(
                repositories = config.repositories().len(),
                "starting release dashboard"
            );

            let state = AppState::new(release_service(config)?, TemplateRenderer::new()?);
            server::serve(state, &bind).await?;
        }
        Some(Command::Latest) => {
            init_tracing(cli.verbose);
            let config = load_config(cli.config.as_deref())?;
            let service = release_service(config)?;
            let view = service.latest_releases().await;
            print_latest(&view, cli.format)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(cli.config.as_deref(), cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "relboard", &mut std::io::stdout());
        }
    }

    Ok(())
}
