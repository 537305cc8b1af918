use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ArtistLocator, RawSong, StationProfile};
use async_trait::async_trait;
use fantoccini::{ClientBuilder, Locator};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const CHROME_ARGS: [&str; 8] = [
    "--headless=new",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--ignore-certificate-errors",
    "--window-size=1920,1080",
];

/// One way of reading a station's now-playing information.
///
/// `Ok(None)` means the page was read but the expected elements were absent.
#[async_trait]
pub trait SongSource: Send + Sync {
    async fn fetch_song(&self) -> Result<Option<RawSong>>;
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Scrape(format!("Invalid selector {}: {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Pulls the current title and artist out of a station page.
pub fn extract_song(html: &str, profile: &StationProfile) -> Result<Option<RawSong>> {
    let document = Html::parse_document(html);
    let title_selector = selector(profile.title_selector)?;

    let Some(title_element) = document.select(&title_selector).next() else {
        return Ok(None);
    };

    let artist_element = match &profile.artist {
        ArtistLocator::Selector(css) => document.select(&selector(css)?).next(),
        ArtistLocator::NextSibling(css) => {
            let artist_selector = selector(css)?;
            title_element
                .next_siblings()
                .find_map(ElementRef::wrap)
                .filter(|el| artist_selector.matches(el))
        }
    };

    let Some(artist_element) = artist_element else {
        return Ok(None);
    };

    let title = element_text(title_element);
    let artist = element_text(artist_element);
    if title.is_empty() || artist.is_empty() {
        return Ok(None);
    }

    Ok(Some(RawSong { title, artist }))
}

/// Plain HTTP fetch of the station page.
pub struct MarkupSource {
    profile: StationProfile,
    client: Client,
}

impl MarkupSource {
    pub fn new(profile: StationProfile, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { profile, client })
    }
}

#[async_trait]
impl SongSource for MarkupSource {
    async fn fetch_song(&self) -> Result<Option<RawSong>> {
        let response = self.client.get(self.profile.url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Scrape(format!(
                "{} returned status {}",
                self.profile.url,
                response.status()
            )));
        }

        let html = response.text().await?;
        extract_song(&html, &self.profile)
    }
}

/// Renders the station page in a WebDriver-controlled browser so that
/// script-inserted now-playing elements are present.
pub struct BrowserSource {
    profile: StationProfile,
    webdriver_url: String,
    browser_path: Option<String>,
    timeout: Duration,
}

impl BrowserSource {
    pub fn new(profile: StationProfile, config: &Config) -> Self {
        Self {
            profile,
            webdriver_url: config.webdriver_url.clone(),
            browser_path: config.browser_executable_path.clone(),
            timeout: config.fetch_timeout,
        }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut chrome = json!({ "args": CHROME_ARGS });
        if let Some(path) = &self.browser_path {
            chrome["binary"] = json!(path);
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        let mut caps = Map::new();
        caps.insert("goog:chromeOptions".to_string(), chrome);
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": timeout_ms, "script": timeout_ms }),
        );
        caps
    }

    async fn read_page(&self, client: &fantoccini::Client) -> Result<Option<RawSong>> {
        client.goto(self.profile.url).await.map_err(browser_error)?;
        client
            .wait()
            .at_most(self.timeout)
            .for_element(Locator::Css(self.profile.title_selector))
            .await
            .map_err(browser_error)?;

        let html = client.source().await.map_err(browser_error)?;
        extract_song(&html, &self.profile)
    }
}

fn browser_error(e: fantoccini::error::CmdError) -> AppError {
    AppError::Browser(e.to_string())
}

#[async_trait]
impl SongSource for BrowserSource {
    async fn fetch_song(&self) -> Result<Option<RawSong>> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| AppError::Browser(format!("Failed to start browser session: {}", e)))?;

        let result = self.read_page(&client).await;

        if let Err(e) = client.close().await {
            debug!("Failed to close browser session for {}: {}", self.profile.name, e);
        }

        result
    }
}
