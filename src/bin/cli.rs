use chmonitor::config::{AppConfig, ConfigOverrides, FileConfig};
use chmonitor::dsl::{QueryKind, QueryRegistry};
use chmonitor::executor::{ClientSettings, ReportOptions, Runner, SortSpec};
use chmonitor::menu::{Menu, MenuItem};
use chmonitor::render::{self, RenderContext};
use chmonitor::server::{self, AppState};
use chmonitor::{create_clickhouse_executor, DashboardError, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chmonitor")]
#[command(about = "Monitoring dashboard for ClickHouse clusters")]
#[command(version)]
struct Cli {
    /// YAML config file (defaults to ~/.config/chmonitor/config.yaml)
    #[arg(short, long, global = true, env = "CHMONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of query YAML files that override or extend the built-ins
    #[arg(short, long, global = true, env = "CHMONITOR_QUERIES_DIR")]
    queries: Option<PathBuf>,

    /// Server-side max_execution_time in seconds
    #[arg(long, global = true, env = "CLICKHOUSE_MAX_EXECUTION_TIME")]
    max_execution_time: Option<u64>,

    /// Concurrent chart queries per page
    #[arg(long, global = true, env = "CHMONITOR_PARALLELISM")]
    parallelism: Option<usize>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web dashboard
    Serve {
        #[arg(short, long, env = "CHMONITOR_LISTEN")]
        listen: Option<String>,

        #[arg(long, env = "EVENTS_TABLE_NAME")]
        events_table: Option<String>,

        #[arg(long, env = "DASHBOARD_TABLE_NAME")]
        dashboard_table: Option<String>,

        /// Do not create the dashboard and events tables at startup
        #[arg(long)]
        skip_tables: bool,
    },

    /// List every registered query
    List {
        #[arg(long)]
        charts: bool,
    },

    /// Show one query's definition
    Show { name: String },

    /// Run a report against a host and print the result
    Run {
        name: String,

        /// Request parameter as key=value; repeatable
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Named filter preset; repeatable
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        order: Option<String>,

        #[arg(long, default_value = "1")]
        page: u64,

        #[arg(long, default_value = "0")]
        host: usize,

        /// Print JSON rows instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate the query catalog
    Validate,

    /// Print the navigation menu
    Menu,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "chmonitor=debug,tower_http=debug"
    } else {
        "chmonitor=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        match &e {
            DashboardError::Fetch(fetch) => render::print_fetch_error(fetch),
            other => render::error(&other.to_string()),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut overrides = ConfigOverrides {
        queries_dir: cli.queries.clone(),
        max_execution_time: cli.max_execution_time,
        parallelism: cli.parallelism,
        ..Default::default()
    };
    if let Commands::Serve {
        listen,
        events_table,
        dashboard_table,
        ..
    } = &cli.command
    {
        overrides.listen = listen.clone();
        overrides.events_table = events_table.clone();
        overrides.dashboard_table = dashboard_table.clone();
    }
    let config = load_config(cli.config.as_ref(), overrides)?;

    match cli.command {
        Commands::Serve { skip_tables, .. } => cmd_serve(config, skip_tables).await,
        Commands::List { charts } => cmd_list(&config, charts),
        Commands::Show { name } => cmd_show(&config, &name),
        Commands::Run {
            name,
            params,
            filters,
            sort,
            order,
            page,
            host,
            json,
        } => {
            let sort = match sort {
                Some(column) => Some(SortSpec::parse(&column, order.as_deref())?),
                None => None,
            };
            let options = ReportOptions {
                filters,
                sort,
                page,
                page_size: 0,
            };
            cmd_run(&config, &name, params.into_iter().collect(), &options, host, json).await
        }
        Commands::Validate => cmd_validate(&config),
        Commands::Menu => cmd_menu(),
    }
}

fn load_config(path: Option<&PathBuf>, overrides: ConfigOverrides) -> Result<AppConfig> {
    let file = match path.cloned().or_else(FileConfig::default_path) {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };
    let env: HashMap<String, String> = std::env::vars().collect();
    AppConfig::resolve(file, overrides, &env)
}

async fn cmd_serve(config: AppConfig, skip_tables: bool) -> Result<()> {
    let registry = QueryRegistry::load(config.queries_dir.as_deref())?;
    let listen = config.listen;
    let state = Arc::new(AppState::new(config, registry)?);

    if !skip_tables {
        state.prepare_stores().await;
    }
    for host in &state.config.hosts {
        tracing::info!(id = host.id, name = %host.name, url = %host.url, "ClickHouse host");
    }
    server::serve(state, listen).await
}

fn cmd_list(config: &AppConfig, charts_only: bool) -> Result<()> {
    let registry = QueryRegistry::load(config.queries_dir.as_deref())?;

    let mut builder = Builder::default();
    builder.push_record(["name", "kind", "title", "tables"]);
    for query in registry.list() {
        if charts_only && !query.is_chart() {
            continue;
        }
        let kind = match query.kind {
            QueryKind::Table => "table",
            QueryKind::Chart => "chart",
        };
        let tables: Vec<&str> = query.dependencies.iter().map(String::as_str).collect();
        builder.push_record([
            query.name.clone(),
            kind.to_string(),
            query.title.clone(),
            tables.join(", "),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{}", table);
    println!(
        "{} queries, checksum {}",
        registry.len(),
        registry.checksum().dimmed()
    );
    Ok(())
}

fn cmd_show(config: &AppConfig, name: &str) -> Result<()> {
    let registry = QueryRegistry::load(config.queries_dir.as_deref())?;
    let query = registry.get(name)?;

    println!("{} {}", query.name.bold(), format!("({})", query.title).dimmed());
    if let Some(description) = &query.description {
        println!("{}", description);
    }
    println!();
    println!("{}", query.sql.trim());
    println!();

    if !query.placeholders.is_empty() {
        println!("{}", "Parameters:".bold());
        for placeholder in &query.placeholders {
            let default = query
                .default_params
                .get(&placeholder.name)
                .map(|v| format!(" = {}", v))
                .unwrap_or_default();
            let required = if query.required_params.contains(&placeholder.name) {
                " (required)".red().to_string()
            } else {
                String::new()
            };
            println!(
                "  {}: {}{}{}",
                placeholder.name, placeholder.param_type, default, required
            );
        }
    }
    if !query.filters.is_empty() {
        println!("{}", "Filters:".bold());
        for filter in &query.filters {
            println!("  {} ({}): {}", filter.name, filter.label, filter.condition.dimmed());
        }
    }
    if !query.related_charts.is_empty() {
        println!("{} {}", "Charts:".bold(), query.related_charts.join(", "));
    }
    Ok(())
}

async fn cmd_run(
    config: &AppConfig,
    name: &str,
    request: HashMap<String, String>,
    options: &ReportOptions,
    host: usize,
    json: bool,
) -> Result<()> {
    let registry = QueryRegistry::load(config.queries_dir.as_deref())?;
    let query = registry.get(name)?;
    let settings = ClientSettings {
        max_execution_time: config.max_execution_time,
        request_timeout: config.request_timeout,
    };
    let executor = create_clickhouse_executor(config.host(host)?, &settings)?;
    let runner = Runner::new(executor).with_parallelism(config.parallelism);

    let (outcome, has_more) = if query.is_chart() {
        (runner.run_chart(query, &request).await?.outcome, false)
    } else {
        let report = runner.run_report(query, &request, options).await?;
        (report.outcome, report.has_more)
    };
    let result = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.rows)?);
        return Ok(());
    }

    let columns = query.display_columns(&result.column_names()).to_vec();
    let ctx = RenderContext::new(host);
    println!(
        "{}",
        render::render_text_table(&columns, &result.rows, &query.column_formats, &ctx)
    );
    let mut summary = format!(
        "{} rows in {:.3}s",
        result.len(),
        result.statistics.elapsed
    );
    if has_more {
        summary.push_str(&format!(", more on page {}", options.page.max(1) + 1));
    }
    println!("{}", summary.dimmed());
    Ok(())
}

fn cmd_validate(config: &AppConfig) -> Result<()> {
    let registry = match QueryRegistry::load(config.queries_dir.as_deref()) {
        Ok(registry) => registry,
        Err(DashboardError::Validation(message)) => {
            for line in message.split("; ") {
                render::error(line);
            }
            return Err(DashboardError::Validation(
                "query catalog is invalid".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };

    let result = registry.validate();
    for warning in &result.warnings {
        render::warning(&warning.to_string());
    }
    render::success(&format!(
        "{} queries valid ({} charts)",
        registry.len(),
        registry.charts().count()
    ));

    let menu = Menu::builtin()?;
    let mut broken = 0;
    for path in menu.paths() {
        let name = path.trim_start_matches('/');
        if !name.is_empty() && registry.find(name).is_none() && !is_builtin_page(name) {
            render::warning(&format!("menu entry {} has no query", path));
            broken += 1;
        }
    }
    if broken == 0 {
        render::success("menu links resolve");
    }
    Ok(())
}

fn is_builtin_page(name: &str) -> bool {
    matches!(name, "overview" | "dashboard" | "explorer")
}

fn cmd_menu() -> Result<()> {
    let menu = Menu::builtin()?;
    for item in menu.items() {
        print_menu_item(item, 0);
    }
    Ok(())
}

fn print_menu_item(item: &MenuItem, depth: usize) {
    let indent = "  ".repeat(depth);
    match item.path() {
        Some(path) => println!("{}{} {}", indent, item.title, path.dimmed()),
        None => println!("{}{}", indent, item.title.bold()),
    }
    for child in &item.items {
        print_menu_item(child, depth + 1);
    }
}
