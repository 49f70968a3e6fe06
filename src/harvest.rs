use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::HarvestArgs;
use crate::discover;
use crate::download::{self, DownloadConfig};
use crate::driver::UiDriver;
use crate::fetch::Fetcher;
use crate::periods::PeriodSelector;
use crate::records::WorkList;
use crate::report;
use crate::session::{self, Credentials, SessionGuard};
use crate::webdriver::WebDriverUi;

/// Full pipeline: attach to the browser, log in, discover, download, report.
pub async fn run(args: HarvestArgs) -> anyhow::Result<()> {
    let ui = WebDriverUi::connect(&args.webdriver_url).await?;
    let driver: Arc<dyn UiDriver> = Arc::new(ui.clone());

    let outcome = run_with_driver(&driver, &args, false).await;
    if let Err(err) = ui.quit().await {
        tracing::warn!(error = %err, "webdriver session did not shut down cleanly");
    }
    outcome
}

/// Discovery only; the work list goes to stdout as JSON lines.
pub async fn discover(args: HarvestArgs) -> anyhow::Result<()> {
    let ui = WebDriverUi::connect(&args.webdriver_url).await?;
    let driver: Arc<dyn UiDriver> = Arc::new(ui.clone());

    let outcome = run_with_driver(&driver, &args, true).await;
    if let Err(err) = ui.quit().await {
        tracing::warn!(error = %err, "webdriver session did not shut down cleanly");
    }
    outcome
}

async fn run_with_driver(
    driver: &Arc<dyn UiDriver>,
    args: &HarvestArgs,
    discover_only: bool,
) -> anyhow::Result<()> {
    let nav_settle = Duration::from_millis(args.nav_settle_ms);
    let settle = Duration::from_millis(args.settle_ms);

    let guard = SessionGuard::new(
        driver.clone(),
        Credentials {
            username: args.username.clone(),
            password: args.password.clone(),
        },
        args.listing_url.clone(),
        nav_settle,
    );
    let periods = PeriodSelector::new(driver.clone(), settle);

    driver
        .navigate(&args.login_url)
        .await
        .context("open login page")?;
    tokio::time::sleep(nav_settle).await;
    guard.ensure_logged_in().await;

    // Belt-and-braces for portals that render the login form under a name
    // the field probe misses: the URL itself says we are still logged out.
    let url = driver.current_url().await.unwrap_or_default();
    if session::is_login_url(&url) {
        match guard.submit_credentials().await {
            Ok(()) => guard.recover_to_listing().await,
            Err(err) => tracing::warn!(error = %err, "startup login attempt failed"),
        }
    }

    let work = discover::discover_all(driver, &guard, &periods).await?;

    if discover_only {
        print_work_list(&work)?;
        return Ok(());
    }

    let fetcher = Fetcher::new()?;
    let config = DownloadConfig {
        root: args.download_root.clone(),
        settle,
        nav_settle,
        listing_marker: args.listing_marker.clone(),
    };
    let failures =
        download::download_all(driver, &guard, &periods, &fetcher, &work, &config).await;

    report::emit_report(&failures, &args.report)
}

fn print_work_list(work: &WorkList) -> anyhow::Result<()> {
    for record in work.iter() {
        let line = serde_json::to_string(record).context("serialize work list record")?;
        println!("{line}");
    }
    Ok(())
}
