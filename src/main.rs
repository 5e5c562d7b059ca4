use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use colored::Colorize;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use genai_scraper::{
    Config, Exporter, Listings, OpenAiExtractor, PageClient, PriceTable,
    ScrapeOutcome, ScrapeRequest, Scraper, Transport, DEFAULT_MODEL,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "genai-scraper",
    about = "Fetch a web page and extract the fields you describe with an LLM",
    version,
    after_help = "examples:\n  \
        genai-scraper https://example.com/rentals -f title -f price -f \"number of beds\"\n  \
        genai-scraper https://example.com/shop -f name -f price -m gpt-4o-2024-08-06 --json\n  \
        genai-scraper --list-models"
)]
struct Cli {
    /// Page to scrape.
    #[arg(required_unless_present = "list_models")]
    url: Option<String>,

    /// Field to extract, described in natural language. Repeatable.
    #[arg(long = "field", short = 'f', value_name = "FIELD")]
    fields: Vec<String>,

    /// Model used for extraction.
    #[arg(long, short, default_value = DEFAULT_MODEL)]
    model: String,

    /// Directory for output files (overrides SCRAPER_OUTPUT_DIR).
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Price table JSON file (overrides SCRAPER_PRICES).
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Do not write output files.
    #[arg(long)]
    no_save: bool,

    /// Print the extracted data as JSON instead of a table.
    #[arg(long, short)]
    json: bool,

    /// Print the known models and their prices.
    #[arg(long)]
    list_models: bool,

    /// More log output (-v info, -vv debug).
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "genai_scraper=info",
        _ => "genai_scraper=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn info(label: &str, value: &str) {
    println!("  {}: {}", label.dimmed(), value);
}

fn print_models(prices: &PriceTable) {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(vec![
        Cell::new("Model").fg(Color::AnsiValue(243)),
        Cell::new("Input $/1M").fg(Color::AnsiValue(243)),
        Cell::new("Output $/1M").fg(Color::AnsiValue(243)),
    ]);
    for model in prices.models() {
        if let Some(entry) = prices.get(model) {
            table.add_row(vec![
                Cell::new(model),
                Cell::new(format!("{:.3}", entry.input_per_million)).fg(Color::AnsiValue(109)),
                Cell::new(format!("{:.3}", entry.output_per_million)).fg(Color::AnsiValue(109)),
            ]);
        }
    }
    println!("{table}");
}

fn print_listings(listings: &Listings) {
    if listings.is_empty() {
        println!("{}", "No records extracted.".yellow());
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        listings
            .columns()
            .iter()
            .map(|c| Cell::new(c).fg(Color::AnsiValue(146))),
    );
    for record in listings.records() {
        table.add_row(
            listings
                .columns()
                .iter()
                .map(|c| Cell::new(record.get(c).unwrap_or(""))),
        );
    }
    println!("{table}");
}

fn print_outcome(outcome: &ScrapeOutcome, as_json: bool) -> anyhow::Result<()> {
    let page = &outcome.page;
    match outcome.fetch_error() {
        None => println!("{} Successfully crawled {}", "✔".green(), page.url),
        Some(err) => println!("{} {err}. Please double check.", "⚠".yellow()),
    }
    if let Some(title) = &page.title {
        info("Title", title);
    }
    if let Some(screenshot) = &page.screenshot_url {
        info("Screenshot", screenshot);
    }
    println!();

    if as_json {
        println!("{}", genai_scraper::to_json(&outcome.listings)?);
    } else {
        print_listings(&outcome.listings);
    }

    println!();
    println!("{}", "Token usage".bold());
    info("Input tokens", &outcome.usage.input_tokens.to_string());
    info("Output tokens", &outcome.usage.output_tokens.to_string());
    info(
        "Total cost",
        &format!("${:.4}", outcome.usage.total_cost).green().bold().to_string(),
    );

    if !outcome.files.is_empty() {
        println!();
        println!("{}", "Saved".bold());
        for file in &outcome.files {
            println!("  {}", file.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_models {
        let prices = match &cli.prices {
            Some(path) => PriceTable::load(path)?,
            None => PriceTable::default(),
        };
        print_models(&prices);
        return Ok(());
    }

    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(dir) = cli.output_dir.clone() {
        config.output_dir = dir;
    }
    if let Some(path) = cli.prices.clone() {
        config.prices_path = Some(path);
    }
    let prices = Arc::new(config.price_table()?);

    let fetcher = PageClient::new(
        Transport::builder(&config.firecrawl_api_key, &config.firecrawl_base_url)
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .build()?,
    );
    let extractor = OpenAiExtractor::new(
        Transport::builder(&config.openai_api_key, &config.openai_base_url)
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .build()?,
    );

    let mut scraper = Scraper::new(fetcher, extractor, prices);
    if !cli.no_save {
        scraper = scraper.with_exporter(Exporter::new(&config.output_dir));
    }

    let request = ScrapeRequest {
        url: cli.url.unwrap_or_default(),
        fields: cli.fields,
        model: cli.model,
    };

    let pb = spinner("Please wait... data is being scraped.");
    let result = scraper.scrape(&request).await;
    pb.finish_and_clear();

    let outcome = result.with_context(|| format!("scraping {}", request.url))?;
    print_outcome(&outcome, cli.json)
}
