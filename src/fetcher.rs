//! Page fetching: the only network boundary of the crawl.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::RuntimeFlavor;
use tracing::debug;

use crate::error::FetchFailure;
use crate::stealth;

/// URL of one page of a product's review listing.
pub fn review_page_url(product_url: &str, page: u32) -> String {
    let base = product_url.split('#').next().unwrap_or_default().trim_end_matches('/');
    format!("{}/reviews?page={}", base, page)
}

/// Retrieves the raw HTML of one review page.
///
/// Implementations block the crawl until the page is loaded or the timeout hits.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch(&self, product_url: &str, page: u32) -> Result<String, FetchFailure>;
}

/// Headless Chrome session reused for every page of the crawl.
pub struct ChromeFetcher {
    // Dropping the browser kills the Chrome process, so it lives as long as the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeFetcher {
    pub fn launch(page_load_timeout: Duration) -> anyhow::Result<Self> {
        let owned_args = stealth::chrome_args(stealth::DESKTOP_USER_AGENT);
        let args: Vec<&OsStr> = owned_args.iter().map(|a| a.as_os_str()).collect();

        let browser = Browser::new(LaunchOptions {
            headless: false, // new headless mode is requested via args
            window_size: Some(stealth::WINDOW_SIZE),
            args,
            idle_browser_timeout: page_load_timeout * 2,
            ..Default::default()
        })?;

        let tab = browser.new_tab()?;
        tab.set_default_timeout(page_load_timeout);
        tab.call_method(headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument {
            source: stealth::get_stealth_script(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })?;

        Ok(Self { _browser: browser, tab })
    }

    fn load(&self, url: &str) -> anyhow::Result<String> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        self.tab.get_content()
    }
}

impl PageFetcher for ChromeFetcher {
    async fn fetch(&self, product_url: &str, page: u32) -> Result<String, FetchFailure> {
        let url = review_page_url(product_url, page);
        debug!("Navigating to: {}", url);
        run_blocking(|| self.load(&url)).map_err(|e| FetchFailure::new(product_url, page, e))
    }
}

/// headless_chrome calls block the calling thread. On a multi-thread runtime the
/// worker is handed off first; elsewhere the call just runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Plain HTTP fetcher for listings that render their reviews server-side.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(page_load_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(stealth::DESKTOP_USER_AGENT)
            .timeout(page_load_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, product_url: &str, page: u32) -> Result<String, FetchFailure> {
        let url = review_page_url(product_url, page);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchFailure::new(product_url, page, e))?;

        response
            .text()
            .await
            .map_err(|e| FetchFailure::new(product_url, page, e))
    }
}

/// Fetcher selected at runtime from configuration.
pub enum AnyFetcher {
    Chrome(ChromeFetcher),
    Http(HttpFetcher),
}

impl PageFetcher for AnyFetcher {
    async fn fetch(&self, product_url: &str, page: u32) -> Result<String, FetchFailure> {
        match self {
            AnyFetcher::Chrome(f) => f.fetch(product_url, page).await,
            AnyFetcher::Http(f) => f.fetch(product_url, page).await,
        }
    }
}
