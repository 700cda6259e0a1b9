//! Waiting for the link to come back after a band switch

use crate::command::CommandRunner;
use crate::error::{AppError, Result};
use crate::logging::{LogLevel, Logger};
use crate::models::{Config, ProbeKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One lightweight reachability check
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, target: &str) -> bool;

    fn kind(&self) -> ProbeKind;
}

/// Single ICMP echo with a one second deadline
pub struct PingProbe {
    runner: Arc<dyn CommandRunner>,
}

impl PingProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ConnectivityProbe for PingProbe {
    async fn probe(&self, target: &str) -> bool {
        self.runner
            .run("ping", &["-c", "1", "-W", "1", target])
            .await
            .is_some()
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Ping
    }
}

/// HTTP HEAD; any response at all counts as reachable
pub struct HttpHeadProbe {
    client: reqwest::Client,
}

impl HttpHeadProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(crate::defaults::PROBE_TIMEOUT)
            .build()
            .map_err(|e| AppError::http(format!("failed to build probe client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpHeadProbe {
    async fn probe(&self, target: &str) -> bool {
        let url = if target.contains("://") {
            target.to_string()
        } else {
            format!("https://{}", target)
        };
        self.client.head(&url).send().await.is_ok()
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Http
    }
}

/// Build the probe selected in the configuration
pub fn probe_for(kind: ProbeKind, runner: Arc<dyn CommandRunner>) -> Result<Arc<dyn ConnectivityProbe>> {
    Ok(match kind {
        ProbeKind::Ping => Arc::new(PingProbe::new(runner)),
        ProbeKind::Http => Arc::new(HttpHeadProbe::new()?),
    })
}

/// Polls a probe on a fixed interval until it succeeds or the attempts run out
pub struct ConnectivityWaiter {
    probe: Arc<dyn ConnectivityProbe>,
    max_attempts: u32,
    interval: Duration,
    logger: Logger,
}

impl ConnectivityWaiter {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, max_attempts: u32, interval: Duration) -> Self {
        Self {
            probe,
            max_attempts,
            interval,
            logger: Logger::new("NET").with_level(LogLevel::Warn),
        }
    }

    pub fn from_config(probe: Arc<dyn ConnectivityProbe>, config: &Config) -> Self {
        Self::new(probe, config.max_attempts, config.probe_interval())
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger.named("NET");
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `true` on the first successful probe, `false` once every attempt failed
    pub async fn wait_for_connection(&self, target: &str) -> bool {
        for attempt in 1..=self.max_attempts {
            if self.probe.probe(target).await {
                self.logger.debug(&format!("{} reachable after {} attempt(s)", target, attempt))
                    .field("target", target)
                    .field("attempt", attempt)
                    .field("probe", self.probe.kind())
                    .log()
                    .await;
                return true;
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        self.logger.warn(&format!("Timed out waiting for {} after {} attempts", target, self.max_attempts))
            .field("target", target)
            .field("attempts", self.max_attempts)
            .field("probe", self.probe.kind())
            .log()
            .await;
        false
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Succeeds from the `succeed_on`-th probe onwards; `None` never succeeds
    pub struct CountingProbe {
        pub calls: AtomicU32,
        succeed_on: Option<u32>,
    }

    impl CountingProbe {
        pub fn succeeding_on(attempt: u32) -> Self {
            Self { calls: AtomicU32::new(0), succeed_on: Some(attempt) }
        }

        pub fn never() -> Self {
            Self { calls: AtomicU32::new(0), succeed_on: None }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectivityProbe for CountingProbe {
        async fn probe(&self, _target: &str) -> bool {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.succeed_on.is_some_and(|s| n >= s)
        }

        fn kind(&self) -> ProbeKind {
            ProbeKind::Ping
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::CountingProbe;
    use super::*;
    use crate::command::fake::FakeRunner;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FAST: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_returns_true_on_first_success() {
        let probe = Arc::new(CountingProbe::succeeding_on(3));
        let waiter = ConnectivityWaiter::new(probe.clone(), 30, FAST);
        assert!(waiter.wait_for_connection("8.8.8.8").await);
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let probe = Arc::new(CountingProbe::never());
        let waiter = ConnectivityWaiter::new(probe.clone(), 4, FAST);
        assert!(!waiter.wait_for_connection("8.8.8.8").await);
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test]
    async fn test_ping_probe_invocation() {
        let runner = Arc::new(FakeRunner::new().reply("ping -c 1 -W 1 8.8.8.8", "1 packets transmitted, 1 received"));
        let probe = PingProbe::new(runner.clone());
        assert!(probe.probe("8.8.8.8").await);
        assert!(!probe.probe("10.255.255.1").await);
    }

    #[tokio::test]
    async fn test_http_probe_accepts_any_response() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probe = HttpHeadProbe::new().unwrap();
        assert!(probe.probe(&server.uri()).await);
    }

    #[tokio::test]
    async fn test_http_probe_unreachable() {
        let probe = HttpHeadProbe::new().unwrap();
        assert!(!probe.probe("http://127.0.0.1:1").await);
    }
}
