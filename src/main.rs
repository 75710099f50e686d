use clap::Parser;
use menu_crawl::classifier::{DEFAULT_MENU_PROMPT, DEFAULT_NOISE_PROMPT, OpenAiChat};
use menu_crawl::render::WebDriverSessions;
use menu_crawl::results::MenuFormat;
use menu_crawl::{CrawlConfig, CrawlContext, CrawlError, SiteStatus, io, run_sites};
use std::sync::Arc;

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    if let Err(e) = run(&args).await {
        ::log::error!("Crawl failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), CrawlError> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = CrawlConfig::from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => CrawlConfig::from_env(),
    };
    args.apply_to(&mut config);
    ::log::debug!("Effective configuration: {:?}", config);

    let sites = io::load_sites(&args.input)?;
    let menu_types = io::load_vocabulary(&args.types)?;
    if let Some(path) = &args.formats {
        let formats = io::load_vocabulary(path)?;
        for code in formats.keys() {
            if MenuFormat::from_label(code) == MenuFormat::Integrated && code != "integrated" {
                ::log::warn!("Unknown menu format {:?} in {}", code, path.display());
            }
        }
        ::log::info!("{} menu formats known", formats.len());
    }

    let noise_prompt = io::load_prompt(config.noise_prompt_path.as_deref(), DEFAULT_NOISE_PROMPT)?;
    let menu_prompt = io::load_prompt(config.menu_prompt_path.as_deref(), DEFAULT_MENU_PROMPT)?;
    let model = OpenAiChat::new(&config.llm).map_err(|e| CrawlError::Config(e.to_string()))?;

    ::log::info!(
        "Using WebDriver at {} (set WEBDRIVER_URL to change it) and model {} at {}",
        config.webdriver_url,
        config.llm.model,
        config.llm.api_base
    );
    let sessions = Arc::new(WebDriverSessions::new(
        config.webdriver_url.clone(),
        config.timeouts.clone(),
    ));
    let ctx = Arc::new(CrawlContext::new(
        config,
        Arc::new(model),
        menu_types,
        &noise_prompt,
        &menu_prompt,
    )?);

    let start_time = std::time::Instant::now();
    let results = run_sites(sites, ctx, sessions).await;

    let site_count = results.len();
    let menu_count: usize = results.iter().map(|result| result.menus.len()).sum();
    let with_menus = results
        .iter()
        .filter(|result| result.status == SiteStatus::Ok)
        .count();
    io::save_results(&args.out, results).await?;

    ::log::info!(
        "Crawling complete - {} sites in {:.2} seconds",
        site_count,
        start_time.elapsed().as_secs_f64()
    );
    println!(
        "Crawled {} sites: {} menus found on {} sites",
        site_count, menu_count, with_menus
    );
    println!("Results written to {}", args.out.display());
    Ok(())
}
