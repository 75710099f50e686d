use clap::Parser;
use menu_crawl::CrawlConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "menu-crawl")]
#[command(about = "Crawls restaurant sites and reports the menus they publish")]
#[command(version)]
pub struct Args {
    /// Restaurant list: {"Restaurants": {"<name>": "<url>"}}
    #[arg(short, long, default_value = "input/restaurants.json")]
    pub input: PathBuf,

    /// Menu type vocabulary: {"menus": {"<code>": "<label>"}}
    #[arg(short, long, default_value = "input/menutypes.json")]
    pub types: PathBuf,

    /// Menu format vocabulary, same shape as the menu types
    #[arg(short, long)]
    pub formats: Option<PathBuf>,

    /// Where to write the results
    #[arg(short, long, default_value = "output/output.json")]
    pub out: PathBuf,

    /// System prompt for the menu classifier
    #[arg(short, long)]
    pub prompt: Option<PathBuf>,

    /// System prompt for the noise classifier
    #[arg(long)]
    pub noise_prompt: Option<PathBuf>,

    /// Maximum link depth followed from each site's start page
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// JSON configuration file, applied before the environment
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Number of sites crawled at the same time
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Wall-clock budget per site in seconds
    #[arg(long)]
    pub budget: Option<u64>,
}

impl Args {
    /// Apply the flags that were given on top of `config`
    pub fn apply_to(&self, config: &mut CrawlConfig) {
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        if let Some(webdriver) = &self.webdriver {
            config.webdriver_url = webdriver.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.site_concurrency = concurrency.max(1);
        }
        if let Some(budget) = self.budget {
            config.site_budget_secs = Some(budget);
        }
        if let Some(prompt) = &self.prompt {
            config.menu_prompt_path = Some(prompt.clone());
        }
        if let Some(prompt) = &self.noise_prompt {
            config.noise_prompt_path = Some(prompt.clone());
        }
    }
}
