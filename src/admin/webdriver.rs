//! W3C WebDriver client for chromedriver
//!
//! Only the handful of commands the admin passes need. Waiting is done by
//! polling, so the session keeps an implicit wait of zero.

use super::{AdminConsole, Confirmation, FieldHandle};
use crate::config::Settings;
use crate::error::{GeoSyncError, Result};
use async_trait::async_trait;
use geo_sync_common::{clean_select_label, FieldInput, FieldSelector, FormSpec, ReadMode};
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Key of an element reference in WebDriver responses
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const SELECT2_SEARCH: &str = ".select2-container--open .select2-search__field";
const SELECT2_OPTION: &str = "li.select2-results__option";

lazy_static::lazy_static! {
    static ref CHANGE_URL_RE: Regex = Regex::new(r"/(\d+)/change/").unwrap();
}

/// Object id from a Django admin change URL
pub fn object_id_from_url(url: &str) -> Option<String> {
    CHANGE_URL_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// New-session capabilities. `headless` only adds the headless switch.
pub fn capabilities(settings: &Settings) -> Value {
    let mut args = vec![
        "--window-size=1400,1000".to_string(),
        "--disable-gpu".to_string(),
    ];
    if settings.headless {
        args.push("--headless=new".to_string());
    }
    if let Some(dir) = &settings.chrome_profile_dir {
        args.push(format!("--user-data-dir={}", dir.display()));
    }

    let mut chrome = json!({ "args": args });
    if let Some(binary) = &settings.chrome_binary {
        chrome["binary"] = json!(binary.display().to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": chrome,
            }
        }
    })
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(str::to_string)
}

fn interaction(message: impl Into<String>) -> GeoSyncError {
    GeoSyncError::FormInteractionFailed(message.into())
}

pub struct WebDriverConsole {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    timeout: Duration,
    keep_open: bool,
}

impl WebDriverConsole {
    /// Start a browser session on the configured chromedriver
    pub async fn start(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let client = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(30))
            .build()?;
        let base_url = settings.webdriver_url.trim_end_matches('/').to_string();

        let response = client
            .post(format!("{}/session", base_url))
            .json(&capabilities(settings))
            .send()
            .await
            .map_err(|e| interaction(format!("chromedriver at {} not reachable: {}", base_url, e)))?;
        let body: Value = response.json().await?;
        let value = &body["value"];
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(interaction(format!(
                "cannot start browser: {}: {}",
                error,
                value["message"].as_str().unwrap_or_default()
            )));
        }
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| interaction("new session response has no sessionId"))?
            .to_string();

        let console = Self {
            client,
            base_url,
            session_id,
            timeout,
            keep_open: settings.keep_browser_open,
        };
        console
            .command(
                Method::POST,
                "timeouts",
                Some(json!({
                    "implicit": 0,
                    "pageLoad": timeout.as_millis() as u64,
                })),
            )
            .await?;

        tracing::info!(
            "Browser session {} started{}",
            console.session_id,
            if settings.headless { " (headless)" } else { "" }
        );
        Ok(console)
    }

    /// End the session unless the browser should stay open
    pub async fn close(self) -> Result<()> {
        if self.keep_open {
            tracing::info!("Leaving browser session {} open", self.session_id);
            return Ok(());
        }
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        self.client.delete(url).send().await?;
        tracing::debug!("Browser session {} closed", self.session_id);
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let mut payload: Value = response.json().await?;
        let value = payload["value"].take();

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            let message = value["message"].as_str().unwrap_or_default();
            let first_line = message.lines().next().unwrap_or_default();
            return Err(interaction(format!("{} ({}): {}", path, error, first_line)));
        }
        Ok(value)
    }

    async fn find_all(&self, scope: Option<&str>, using: &str, value: &str) -> Result<Vec<String>> {
        let path = match scope {
            Some(element) => format!("element/{}/elements", element),
            None => "elements".to_string(),
        };
        let found = self
            .command(Method::POST, &path, Some(json!({ "using": using, "value": value })))
            .await?;
        Ok(found
            .as_array()
            .map(|items| items.iter().filter_map(element_id).collect())
            .unwrap_or_default())
    }

    async fn find_now(&self, selector: &FieldSelector) -> Result<Option<String>> {
        let (using, value) = selector.locator();
        Ok(self.find_all(None, using, &value).await?.into_iter().next())
    }

    /// Poll until the selector matches or the timeout passes
    async fn wait_for(&self, selector: &FieldSelector) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(element) = self.find_now(selector).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(interaction(format!("element {} not found", selector)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn element_text(&self, element: &str) -> Result<String> {
        let text = self
            .command(Method::GET, &format!("element/{}/text", element), None)
            .await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    async fn click_element(&self, element: &str) -> Result<()> {
        self.command(Method::POST, &format!("element/{}/click", element), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn type_text(&self, element: &str, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("element/{}/value", element),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn choose_option(&self, select: &str, visible_text: &str) -> Result<()> {
        for option in self.find_all(Some(select), "css selector", "option").await? {
            if self.element_text(&option).await?.trim() == visible_text {
                return self.click_element(&option).await;
            }
        }
        Err(interaction(format!("no option {:?}", visible_text)))
    }

    /// Open a select2 widget, search and pick the matching result
    async fn choose_search_result(&self, widget: &str, search_text: &str, visible_text: &str) -> Result<()> {
        self.click_element(widget).await?;
        let search = self
            .wait_for(&FieldSelector::Css(SELECT2_SEARCH.to_string()))
            .await?;
        self.type_text(&search, search_text).await?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let options = self.find_all(None, "css selector", SELECT2_OPTION).await?;
            let mut partial = None;
            for option in options {
                let label = clean_select_label(&self.element_text(&option).await?);
                if label == visible_text {
                    return self.click_element(&option).await;
                }
                if partial.is_none() && label.contains(visible_text) {
                    partial = Some(option);
                }
            }
            if let Some(option) = partial {
                return self.click_element(&option).await;
            }
            if Instant::now() >= deadline {
                return Err(interaction(format!(
                    "no search result {:?} for {:?}",
                    visible_text, search_text
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_attribute(&self, element: &str, kind: &str, name: &str) -> Result<Option<String>> {
        let value = self
            .command(Method::GET, &format!("element/{}/{}/{}", element, kind, name), None)
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    /// Id of the saved object: from the URL, or from the link in the message
    async fn saved_object_id(&self, url: &str, message_element: &str) -> Option<String> {
        if let Some(id) = object_id_from_url(url) {
            return Some(id);
        }
        let links = self
            .find_all(Some(message_element), "css selector", "a")
            .await
            .ok()?;
        for link in links {
            if let Ok(Some(href)) = self.read_attribute(&link, "attribute", "href").await {
                if let Some(id) = object_id_from_url(&href) {
                    return Some(id);
                }
            }
        }
        None
    }
}

#[async_trait]
impl AdminConsole for WebDriverConsole {
    async fn open(&mut self, url: &str) -> Result<()> {
        tracing::debug!("Navigate {}", url);
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self.command(Method::GET, "url", None).await?;
        Ok(url.as_str().unwrap_or_default().to_string())
    }

    async fn locate(&mut self, selector: &FieldSelector) -> Result<FieldHandle> {
        let element = self.wait_for(selector).await?;
        Ok(FieldHandle {
            selector: selector.clone(),
            element,
        })
    }

    async fn fill(&mut self, field: &FieldHandle, input: &FieldInput) -> Result<()> {
        let filled = match input {
            FieldInput::Text { value } => {
                self.command(
                    Method::POST,
                    &format!("element/{}/clear", field.element),
                    Some(json!({})),
                )
                .await?;
                self.type_text(&field.element, value).await
            }
            FieldInput::Choice { visible_text } => {
                self.choose_option(&field.element, visible_text).await
            }
            FieldInput::Search {
                search_text,
                visible_text,
            } => {
                self.choose_search_result(&field.element, search_text, visible_text)
                    .await
            }
        };
        filled.map_err(|e| interaction(format!("{}: {}", field.selector, e)))
    }

    async fn click(&mut self, field: &FieldHandle) -> Result<()> {
        self.click_element(&field.element).await
    }

    async fn read(&mut self, field: &FieldHandle, mode: &ReadMode) -> Result<String> {
        let value = match mode {
            ReadMode::Value => self
                .read_attribute(&field.element, "property", "value")
                .await?
                .unwrap_or_default(),
            ReadMode::Text => self.element_text(&field.element).await?,
            ReadMode::Attribute(name) => {
                match self.read_attribute(&field.element, "attribute", name).await? {
                    Some(v) if !v.is_empty() => v,
                    _ => self.element_text(&field.element).await?,
                }
            }
        };
        Ok(value)
    }

    async fn submit(&mut self, form: &FormSpec) -> Result<Confirmation> {
        let button = self.wait_for(&form.submit).await?;
        self.click_element(&button).await?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(element) = self.find_now(&form.errors).await? {
                let text = self.element_text(&element).await?;
                return Err(interaction(format!(
                    "admin rejected the form: {}",
                    text.replace('\n', " ").trim()
                )));
            }
            if let Some(element) = self.find_now(&form.success).await? {
                let message = self.element_text(&element).await?.trim().to_string();
                let url = self.current_url().await?;
                let object_id = self.saved_object_id(&url, &element).await;
                return Ok(Confirmation {
                    message,
                    url,
                    object_id,
                });
            }
            if Instant::now() >= deadline {
                return Err(interaction("no confirmation after save"));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_object_id_from_url() {
        assert_eq!(
            object_id_from_url("https://c.example/admin/geo/region/6053839/change/"),
            Some("6053839".to_string())
        );
        assert_eq!(object_id_from_url("https://c.example/admin/geo/region/"), None);
    }

    #[test]
    fn test_headless_only_adds_switch() {
        let visible = Settings::default();
        let headless = Settings {
            headless: true,
            ..Default::default()
        };
        let mut a = capabilities(&visible);
        let b = capabilities(&headless);
        let args = a["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array_mut()
            .unwrap();
        args.push(json!("--headless=new"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_profile_and_binary() {
        let settings = Settings {
            chrome_binary: Some(PathBuf::from("/opt/chrome/chrome")),
            chrome_profile_dir: Some(PathBuf::from("/tmp/profile")),
            ..Default::default()
        };
        let caps = capabilities(&settings);
        let chrome = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"];
        assert_eq!(chrome["binary"], "/opt/chrome/chrome");
        assert!(chrome["args"]
            .as_array()
            .unwrap()
            .contains(&json!("--user-data-dir=/tmp/profile")));
    }
}
