use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use estat::{Client, ClientConfig, Lang, Params, Table};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Fetch e-Stat tables and write them out as CSV or Parquet.
#[derive(Debug, Parser)]
#[command(name = "estat", version, about)]
struct Cli {
    /// Application id; falls back to JPESTAT_APP_ID, which may come from `.env` or DOTENV_PATH
    #[arg(long, global = true)]
    app_id: Option<String>,

    /// Response language, J or E; falls back to JPESTAT_LANG
    #[arg(long, global = true)]
    lang: Option<Lang>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// getStatsList: search the table catalogue
    List(ListArgs),
    /// getMetaInfo: table info, or the codes of one axis
    Meta(MetaArgs),
    /// getStatsData: observations, with axis columns relabeled
    Data(DataArgs),
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Output file
    #[arg(short, long)]
    out: PathBuf,

    /// Output format; inferred from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Extra query parameters as key=value, passed through unchanged
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    survey_years: Option<String>,
    #[arg(long)]
    stats_code: Option<String>,
    #[arg(long)]
    search_word: Option<String>,
    #[arg(long)]
    limit: Option<u64>,
    /// Keep only the basic descriptive columns
    #[arg(long)]
    basic: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct MetaArgs {
    #[arg(long)]
    stats_data_id: String,
    /// Write the codes of this axis (e.g. `area`, `cat01`) instead of the table info
    #[arg(long)]
    axis: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct DataArgs {
    #[arg(long)]
    stats_data_id: String,
    #[arg(long)]
    start_position: Option<u64>,
    #[arg(long)]
    limit: Option<u64>,
    /// Keep the raw `@axis` / `@unit` / `$` column names
    #[arg(long)]
    raw: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Parquet,
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => bail!("expected key=value, got `{}`", s),
    }
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.app_id {
        Some(id) => ClientConfig::new(id.clone())?,
        None => ClientConfig::from_env()?,
    };
    if let Some(lang) = cli.lang {
        config = config.with_lang(lang);
    }
    if let Some(base) = &cli.base_url {
        config = config.with_base_url(base)?;
    }
    Ok(config)
}

fn base_params(output: &OutputArgs) -> Params {
    output.params.iter().cloned().collect()
}

fn write_table(table: &Table, output: &OutputArgs) -> Result<()> {
    let format = output.format.unwrap_or_else(|| format_from_path(&output.out));
    let written = match format {
        Format::Csv => table.write_csv_file(&output.out),
        Format::Parquet => table.write_parquet(&output.out),
    };
    written.with_context(|| format!("writing {}", output.out.display()))?;
    info!(
        path = %output.out.display(),
        rows = table.len(),
        columns = table.width(),
        "wrote table"
    );
    Ok(())
}

fn format_from_path(path: &Path) -> Format {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => Format::Parquet,
        _ => Format::Csv,
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) configure client ─────────────────────────────────────────
    let cli = Cli::parse();
    if let Some(path) = estat::config::load_dotenv()? {
        info!(path = %path.display(), "loaded env file");
    }
    let config = build_config(&cli)?;
    info!(?config, "startup");
    let client = Client::new(config)?;

    // ─── 3) fetch & write ────────────────────────────────────────────
    match &cli.command {
        Command::List(args) => {
            let mut params = base_params(&args.output);
            if let Some(v) = &args.survey_years {
                params = params.survey_years(v.as_str());
            }
            if let Some(v) = &args.stats_code {
                params = params.stats_code(v.as_str());
            }
            if let Some(v) = &args.search_word {
                params = params.search_word(v.as_str());
            }
            if let Some(v) = args.limit {
                params = params.limit(v);
            }

            let list = client.get_stat_list(&params)?;
            let table = if args.basic {
                list.basic_info_table()
            } else {
                list.table()
            };
            if let Some(next) = list.next_key() {
                warn!(next_key = %next, "result truncated; rerun with -p startPosition={}", next);
            }
            write_table(&table, &args.output)?;
        }

        Command::Meta(args) => {
            let params = base_params(&args.output).stats_data_id(args.stats_data_id.as_str());
            let meta = client.get_meta_info(&params)?;
            let table = match &args.axis {
                Some(axis) => {
                    let Some(class) = meta.class_definition(axis) else {
                        bail!("{} has no axis `{}`", args.stats_data_id, axis);
                    };
                    let rows = class
                        .codes
                        .iter()
                        .map(|c| {
                            vec![
                                Some(c.code.clone()),
                                Some(c.label.clone()),
                                c.level.clone(),
                                c.unit.clone(),
                                c.parent_code.clone(),
                            ]
                        })
                        .collect();
                    Table::new(
                        ["code", "name", "level", "unit", "parentCode"]
                            .map(String::from)
                            .to_vec(),
                        rows,
                    )?
                }
                None => meta.table(),
            };
            write_table(&table, &args.output)?;
        }

        Command::Data(args) => {
            let mut params = base_params(&args.output).stats_data_id(args.stats_data_id.as_str());
            if let Some(v) = args.start_position {
                params = params.start_position(v);
            }
            if let Some(v) = args.limit {
                params = params.limit(v);
            }

            let data = client.get_stats_data(&params)?;
            let table = if args.raw {
                data.value_table()
            } else {
                data.column_modified_values_table(&client.remap_labels())
            };
            if let Some(next) = data.next_key() {
                warn!(next_key = %next, "result truncated; rerun with --start-position {}", next);
            }
            write_table(&table, &args.output)?;
        }
    }

    info!("all done");
    Ok(())
}
