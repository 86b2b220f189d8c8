//! Shared HTTP access for the scrapers
use reqwest::blocking::Client;
use reqwest::Proxy;
use std::time::Duration;
use crate::errors::*;

/// Fetches pages for the scrapers and owns whatever session that takes
pub trait RequestDriver {
    fn fetch(&mut self, url: &str) -> Result<String>;

    /// Release the underlying session. The driver is not used afterwards.
    fn quit(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub proxies: Vec<String>,
    pub user_agents: Vec<String>,
    pub rotate_proxies: bool,
    pub rotate_user_agents: bool,
    /// Requests made with one proxy and user agent before moving to the next
    pub max_requests: usize,
    pub timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            proxies: vec![],
            user_agents: vec![],
            rotate_proxies: true,
            rotate_user_agents: true,
            max_requests: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking HTTP driver that switches proxy and user agent every `max_requests` requests
pub struct RotatingDriver {
    config: DriverConfig,
    client: Option<Client>,
    rotation: usize,
    requests_on_client: usize,
    total_requests: usize,
}

impl RotatingDriver {
    pub fn new(config: DriverConfig) -> Self {
        RotatingDriver {
            config: config,
            client: None,
            rotation: 0,
            requests_on_client: 0,
            total_requests: 0,
        }
    }

    fn pick<'a>(choices: &'a [String], rotate: bool, rotation: usize) -> Option<&'a str> {
        if choices.is_empty() {
            None
        } else if rotate {
            Some(choices[rotation % choices.len()].as_str())
        } else {
            Some(choices[0].as_str())
        }
    }

    pub fn current_proxy(&self) -> Option<&str> {
        Self::pick(&self.config.proxies, self.config.rotate_proxies, self.rotation)
    }

    pub fn current_user_agent(&self) -> Option<&str> {
        Self::pick(&self.config.user_agents, self.config.rotate_user_agents, self.rotation)
    }

    pub fn total_requests(&self) -> usize {
        self.total_requests
    }

    /// Client for the next request, rotating first if the budget is spent
    fn prepare(&mut self) -> Result<&Client> {
        let spent = self.requests_on_client >= ::std::cmp::max(1, self.config.max_requests);
        if self.client.is_some() && spent {
            self.rotation += 1;
            self.client = None;
        }
        if self.client.is_none() {
            let mut builder = Client::builder().timeout(self.config.timeout);
            if let Some(proxy) = self.current_proxy() {
                builder = builder.proxy(Proxy::all(proxy)?);
            }
            if let Some(agent) = self.current_user_agent() {
                builder = builder.user_agent(agent.to_string());
            }
            debug!("New session (rotation {}, proxy {:?}, user agent {:?})",
                self.rotation, self.current_proxy(), self.current_user_agent());
            self.client = Some(builder.build()?);
            self.requests_on_client = 0;
        }
        self.requests_on_client += 1;
        self.total_requests += 1;
        match self.client {
            Some(ref client) => Ok(client),
            None => Err(Error::Other("no HTTP session available".to_string())),
        }
    }
}

impl RequestDriver for RotatingDriver {
    fn fetch(&mut self, url: &str) -> Result<String> {
        let client = self.prepare()?;
        let response = client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    fn quit(&mut self) {
        if self.client.take().is_some() {
            info!("Closed the HTTP session after {} requests", self.total_requests);
        }
    }
}
