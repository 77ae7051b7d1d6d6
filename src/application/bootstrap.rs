//! Bounded-retry connection to external dependencies at process start.
//!
//! Every dependency is probed up to [`RetryPolicy::max_attempts`] times with a
//! fixed pause between attempts. Exhaustion is fatal for the process; the
//! caller is expected to abort instead of serving with a partial set.

use std::fmt::Display;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

const SOURCE: &str = "reelhouse::bootstrap";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    /// Fixed pause between attempts; there is no backoff growth.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_MAX_ATTEMPTS).unwrap_or(NonZeroU32::MIN),
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl From<&crate::config::BootstrapSettings> for RetryPolicy {
    fn from(settings: &crate::config::BootstrapSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            interval: settings.interval,
        }
    }
}

/// A named dependency and the address it is reached at.
///
/// Passwords embedded in URL addresses are masked so the target can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    name: &'static str,
    address: String,
}

impl ConnectionTarget {
    pub fn new(name: &'static str, address: &str) -> Self {
        Self {
            name,
            address: redact(address),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

fn redact(address: &str) -> String {
    match Url::parse(address) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        _ => address.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{dependency} unreachable after {attempts} attempts: {last_error}")]
    Exhausted {
        dependency: &'static str,
        attempts: u32,
        last_error: String,
    },
    #[error("{dependency} setup failed: {message}")]
    Setup {
        dependency: &'static str,
        message: String,
    },
}

impl BootstrapError {
    pub fn setup(dependency: &'static str, message: impl Into<String>) -> Self {
        Self::Setup {
            dependency,
            message: message.into(),
        }
    }
}

/// Run `probe` until it yields a ready handle or the policy is exhausted.
///
/// The probe receives the 1-based attempt number. Sleeping happens only between
/// attempts, so success on attempt `k` takes `(k - 1) * interval` of waiting.
pub async fn connect<T, E, F, Fut>(
    target: &ConnectionTarget,
    policy: RetryPolicy,
    mut probe: F,
) -> Result<T, BootstrapError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.get();
    let mut attempt = 1;

    loop {
        info!(
            target = SOURCE,
            dependency = target.name(),
            address = target.address(),
            attempt,
            max_attempts,
            "Connecting to {} (attempt {attempt}/{max_attempts})",
            target.name()
        );

        match probe(attempt).await {
            Ok(handle) => {
                info!(
                    target = SOURCE,
                    dependency = target.name(),
                    attempt,
                    "{} ready",
                    target.name()
                );
                return Ok(handle);
            }
            Err(err) if attempt >= max_attempts => {
                error!(
                    target = SOURCE,
                    dependency = target.name(),
                    attempts = attempt,
                    error = %err,
                    "Giving up on {}",
                    target.name()
                );
                return Err(BootstrapError::Exhausted {
                    dependency: target.name(),
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }
            Err(err) => {
                warn!(
                    target = SOURCE,
                    dependency = target.name(),
                    attempt,
                    retry_in_ms = policy.interval.as_millis() as u64,
                    error = %err,
                    "{} not ready",
                    target.name()
                );
            }
        }

        tokio::time::sleep(policy.interval).await;
        attempt += 1;
    }
}

/// One external dependency brought up at startup.
#[async_trait]
pub trait StartupDependency: Send + Sync {
    type Handle: Send + Sync;
    type Error: Display + Send;

    fn target(&self) -> ConnectionTarget;

    /// Readiness probe; retried under the [`RetryPolicy`].
    async fn probe(&self) -> Result<Self::Handle, Self::Error>;

    /// Runs once after a successful probe. Failures are not retried.
    async fn prepare(&self, _handle: &Self::Handle) -> Result<(), Self::Error> {
        Ok(())
    }
}

async fn bring_up<D: StartupDependency>(
    dependency: &D,
    policy: RetryPolicy,
) -> Result<D::Handle, BootstrapError> {
    let target = dependency.target();
    let handle = connect(&target, policy, move |_| dependency.probe()).await?;

    dependency
        .prepare(&handle)
        .await
        .map_err(|err| BootstrapError::setup(target.name(), err.to_string()))?;

    Ok(handle)
}

/// Bring up the store, then the cache, then the event log.
///
/// The first dependency that stays unreachable or fails to prepare ends the
/// sequence; later ones are never contacted.
pub async fn establish_in_order<S, C, L>(
    store: &S,
    cache: &C,
    log: &L,
    policy: RetryPolicy,
) -> Result<(S::Handle, C::Handle, L::Handle), BootstrapError>
where
    S: StartupDependency,
    C: StartupDependency,
    L: StartupDependency,
{
    let store = bring_up(store, policy).await?;
    let cache = bring_up(cache, policy).await?;
    let log = bring_up(log, policy).await?;
    Ok((store, cache, log))
}
