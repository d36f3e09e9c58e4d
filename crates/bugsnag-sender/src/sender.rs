use crate::error::{DeliveryError, Result};
use crate::payload;
use bugsnag_core::{Configuration, ErrorReporter, Notification};
use reqwest::blocking::Client;
use reqwest::header;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use tracing::{debug, info, instrument, warn};

pub const DELIVERY_FAILED: &str = "Could not deliver notification, unexpected exception occurred.";
pub const CLIENT_BUILD_FAILED: &str = "Could not create HTTP client for notification delivery.";

const USER_AGENT: &str = concat!("bugsnag-sender/", env!("CARGO_PKG_VERSION"));

/// Outcome of a single [`Sender::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The endpoint answered. Non-2xx statuses are logged, not reported.
    Delivered { status: u16 },
    /// The request could not be completed; the reporter was told once.
    Failed,
    /// The sender was not started.
    Skipped,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

struct Running {
    client: Client,
    configuration: Arc<Configuration>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Running {
    fn deliver(&self, notification: &Notification) -> Result<u16> {
        let body = payload::encode(notification, &self.configuration)?;
        off_runtime(move || self.post(body)).map_err(|_| DeliveryError::Interrupted)?
    }

    fn post(&self, body: Vec<u8>) -> Result<u16> {
        let response = self
            .client
            .post(self.configuration.endpoint_with_protocol())
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Notify endpoint rejected notification");
        }
        Ok(status.as_u16())
    }
}

/// Delivers notifications to the configured endpoint.
///
/// A sender is created stopped. [`Sender::start`] validates the
/// configuration and prepares the HTTP client; [`Sender::send`] never
/// fails or panics on delivery problems, it hands them to the
/// [`ErrorReporter`] given at start.
///
/// Sends share a read lock and may run concurrently. `start` and `stop`
/// take the write lock, so they wait for in-flight sends to finish.
pub struct Sender {
    state: RwLock<Option<Running>>,
}

impl Sender {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// Starts the sender. An invalid configuration is reported through
    /// `reporter` and leaves the sender stopped. Starting an already started
    /// sender replaces its configuration and client.
    pub fn start(&self, configuration: Arc<Configuration>, reporter: Arc<dyn ErrorReporter>) {
        let mut state = self.write_state();

        if configuration.is_invalid() {
            configuration.add_errors(reporter.as_ref());
            *state = None;
            return;
        }

        let client = match off_runtime(|| build_client(&configuration)) {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                reporter.add_error_with_cause(CLIENT_BUILD_FAILED, &e);
                *state = None;
                return;
            }
            Err(_) => {
                reporter.add_error_with_cause(CLIENT_BUILD_FAILED, &DeliveryError::Interrupted);
                *state = None;
                return;
            }
        };

        info!(endpoint = %configuration.endpoint_with_protocol(), "Bugsnag sender started");
        *state = Some(Running {
            client,
            configuration,
            reporter,
        });
    }

    /// Stops the sender and releases its HTTP client. Idempotent.
    pub fn stop(&self) {
        if self.write_state().take().is_some() {
            info!("Bugsnag sender stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.read_state().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_started()
    }

    /// Posts `notification` to the endpoint. Every failure results in
    /// exactly one [`ErrorReporter::add_error_with_cause`] call.
    #[instrument(skip_all)]
    pub fn send(&self, notification: &Notification) -> Delivery {
        let state = self.read_state();
        let Some(running) = state.as_ref() else {
            debug!("Sender is not started, dropping notification");
            return Delivery::Skipped;
        };

        match running.deliver(notification) {
            Ok(status) => {
                debug!(status, "Notification delivered");
                Delivery::Delivered { status }
            }
            Err(e) => {
                running.reporter.add_error_with_cause(DELIVERY_FAILED, &e);
                Delivery::Failed
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<Running>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<Running>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("started", &self.is_started())
            .finish()
    }
}

fn build_client(configuration: &Configuration) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(configuration.connect_timeout())
        .timeout(configuration.timeout())
        .user_agent(USER_AGENT)
        .build()?)
}

/// Runs `f` on a scoped helper thread when the caller is inside a tokio
/// runtime, since the blocking client must not be built or used
/// there. Outside a runtime `f` runs inline.
fn off_runtime<T, F>(f: F) -> thread::Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        thread::scope(|scope| scope.spawn(f).join())
    } else {
        Ok(f())
    }
}
