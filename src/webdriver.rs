use crate::browser::{Browser, DriverError, Locator};
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tokio::runtime::Runtime;

const SCROLL_TO_BOTTOM: &str = "arguments[0].scrollTop = arguments[0].scrollHeight";

impl From<WebDriverError> for DriverError {
    fn from(e: WebDriverError) -> Self {
        DriverError::Driver(e.to_string())
    }
}

/// A Firefox session behind a WebDriver server (geckodriver).
///
/// The client is async; a private current-thread runtime drives it so the
/// engine stays blocking and single-threaded.
pub struct FirefoxSession {
    runtime: Runtime,
    driver: WebDriver,
}

impl FirefoxSession {
    pub fn connect(server_url: &str, headless: bool) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let driver = runtime.block_on(async {
            let mut caps = DesiredCapabilities::firefox();
            if headless {
                caps.set_headless()?;
            }
            let driver = WebDriver::new(server_url, caps).await?;
            driver.maximize_window().await?;
            Ok::<_, WebDriverError>(driver)
        })?;

        log::info!("Connected to WebDriver at {} (headless: {})", server_url, headless);
        Ok(Self { runtime, driver })
    }

    fn by(locator: &Locator) -> By {
        match locator {
            Locator::Css(selector) => By::Css(selector.as_str()),
            Locator::XPath(expression) => By::XPath(expression.as_str()),
        }
    }
}

impl Browser for FirefoxSession {
    type Element = WebElement;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.runtime.block_on(self.driver.goto(url))?;
        Ok(())
    }

    fn find_all(&mut self, locator: &Locator) -> Result<Vec<WebElement>, DriverError> {
        let by = Self::by(locator);
        Ok(self.runtime.block_on(self.driver.find_all(by))?)
    }

    fn text(&mut self, element: &WebElement) -> Result<String, DriverError> {
        Ok(self.runtime.block_on(element.text())?)
    }

    fn attr(&mut self, element: &WebElement, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.runtime.block_on(element.attr(name))?)
    }

    fn click(&mut self, element: &WebElement) -> Result<(), DriverError> {
        self.runtime.block_on(element.click())?;
        Ok(())
    }

    fn scroll(&mut self, container: &Locator) -> Result<(), DriverError> {
        let feed = self
            .find_all(container)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(container.to_string()))?;

        let driver = &self.driver;
        self.runtime.block_on(async {
            driver
                .execute(SCROLL_TO_BOTTOM, vec![feed.to_json()?])
                .await
                .map(|_| ())
        })?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        let url = self.runtime.block_on(self.driver.current_url())?;
        Ok(url.to_string())
    }

    fn quit(self) -> Result<(), DriverError> {
        let FirefoxSession { runtime, driver } = self;
        runtime.block_on(driver.quit())?;
        log::info!("Browser session closed");
        Ok(())
    }
}
