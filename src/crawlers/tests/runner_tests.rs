use super::*;
use crate::crawlers::run_sites;
use crate::results::{Site, SiteStatus};

#[tokio::test]
async fn test_results_follow_input_order() {
    let browser = FakeBrowser::new()
        .page("https://alpha.example/", FakePage::linking(&["/kontakt"]))
        .page("https://beta.example/", FakePage::linking(&["/speisekarte"]))
        .page(
            "https://beta.example/speisekarte",
            FakePage::default().titled("Speisekarte"),
        );
    let chat = Arc::new(scripted_model());
    let config = CrawlConfig {
        site_concurrency: 2,
        ..CrawlConfig::default()
    };
    let ctx = Arc::new(context(config, chat));
    let sites = vec![
        Site::new("Alpha", "https://alpha.example/"),
        Site::new("Beta", "https://beta.example/"),
        Site::new("Gamma", "https://gamma.example/"),
    ];

    let results = run_sites(
        sites,
        ctx,
        Arc::new(FakeSessions {
            template: Some(browser),
        }),
    )
    .await;

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    assert_eq!(results[0].status, SiteStatus::NoMenusFound);
    assert_eq!(results[1].status, SiteStatus::Ok);
    assert_eq!(results[1].menus[0].link, "https://beta.example/speisekarte");
    // Unknown host: navigation fails, the run goes on
    assert_eq!(results[2].status, SiteStatus::NoMenusFound);
    assert!(results[2].warnings[0].starts_with("nav_error: "));
}

#[tokio::test]
async fn test_session_failure_is_a_site_warning() {
    let chat = Arc::new(scripted_model());
    let ctx = Arc::new(context(CrawlConfig::default(), chat.clone()));
    let sites = vec![
        Site::new("Alpha", "https://alpha.example/"),
        Site::new("Beta", "https://beta.example/"),
    ];

    let results = run_sites(sites, ctx, Arc::new(FakeSessions { template: None })).await;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.status, SiteStatus::NoMenusFound);
        assert_eq!(
            result.warnings,
            vec!["session_error: could not open webdriver session: connection refused"]
        );
    }
    assert_eq!(chat.calls(), 0);
}
