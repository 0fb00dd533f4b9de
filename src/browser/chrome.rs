use crate::browser::{PageSession, RenderError};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const CLICK_TIMEOUT: Duration = Duration::from_secs(10);

/// A launched Chromium process and the task driving its CDP connection
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromeBrowser {
    /// Launches Chromium with the configured user agent and window mode
    pub async fn launch(config: &BrowserConfig) -> Result<Self, RenderError> {
        let mut builder = CdpConfig::builder()
            .arg(format!("--user-agent={}", config.user_agent))
            .request_timeout(config.navigation_timeout());

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(RenderError::Browser)?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| RenderError::Browser(format!("launch failed: {}", e)))?;

        // The handler must be polled for any CDP command to complete
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        tracing::info!(
            "Launched Chromium ({})",
            if config.headless { "headless" } else { "headful" }
        );

        Ok(Self {
            browser,
            handler,
            navigation_timeout: config.navigation_timeout(),
        })
    }

    /// Opens a new blank tab
    pub async fn new_session(&self) -> Result<ChromeSession, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(format!("could not open tab: {}", e)))?;

        Ok(ChromeSession {
            page,
            navigation_timeout: self.navigation_timeout,
        })
    }

    /// Shuts the browser down and stops the handler task
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        tracing::debug!("Browser closed");
    }
}

/// One Chromium tab
pub struct ChromeSession {
    page: Page,
    navigation_timeout: Duration,
}

impl ChromeSession {
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!("Failed to close tab: {}", e);
        }
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<(), RenderError> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok::<(), RenderError>(())
        };

        match timeout(self.navigation_timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                action: format!("loading {}", url),
                timeout: self.navigation_timeout,
            }),
        }
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        wait: Duration,
    ) -> Result<(), RenderError> {
        let deadline = Instant::now() + wait;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RenderError::Timeout {
                    action: format!("waiting for '{}'", selector),
                    timeout: wait,
                });
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Browser(format!("could not read content: {}", e)))
    }

    async fn click_text(&mut self, label: &str, exact: bool) -> Result<(), RenderError> {
        let candidates = self
            .page
            .find_elements("a, button")
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        for element in candidates {
            let text = match element.inner_text().await {
                Ok(Some(text)) => text,
                _ => continue,
            };
            let text = text.trim();
            let matched = if exact {
                text == label
            } else {
                text.contains(label)
            };
            if !matched {
                continue;
            }

            return match timeout(CLICK_TIMEOUT, element.click()).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(RenderError::Browser(format!(
                    "click on '{}' failed: {}",
                    label, e
                ))),
                Err(_) => Err(RenderError::Timeout {
                    action: format!("clicking '{}'", label),
                    timeout: CLICK_TIMEOUT,
                }),
            };
        }

        Err(RenderError::ElementNotFound(format!("text '{}'", label)))
    }

    async fn click_selector(&mut self, selector: &str) -> Result<(), RenderError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| RenderError::ElementNotFound(selector.to_string()))?;

        match timeout(CLICK_TIMEOUT, element.click()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Browser(format!(
                "click on '{}' failed: {}",
                selector, e
            ))),
            Err(_) => Err(RenderError::Timeout {
                action: format!("clicking '{}'", selector),
                timeout: CLICK_TIMEOUT,
            }),
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), RenderError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|e| RenderError::Browser(format!("scroll failed: {}", e)))?;
        Ok(())
    }
}
