use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use docqa_core::Health;
use docqa_logging::{docqa_debug, docqa_info, docqa_warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{lock, ControllerSettings, DocumentApi};

/// Polls the liveness endpoint while active.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn DocumentApi>,
    interval: Duration,
    state: Mutex<Shared>,
}

#[derive(Default)]
struct Shared {
    status: Health,
    checking: bool,
    session: Option<CancellationToken>,
}

impl HealthMonitor {
    /// A zero interval falls back to the default one.
    pub fn new(api: Arc<dyn DocumentApi>, settings: &ControllerSettings) -> Self {
        let interval = if settings.health_interval.is_zero() {
            let fallback = ControllerSettings::default().health_interval;
            docqa_warn!("Zero health interval, polling every {:?} instead", fallback);
            fallback
        } else {
            settings.health_interval
        };
        Self {
            inner: Arc::new(Inner {
                api,
                interval,
                state: Mutex::new(Shared::default()),
            }),
        }
    }

    pub fn status(&self) -> Health {
        lock(&self.inner.state).status
    }

    pub fn is_checking(&self) -> bool {
        lock(&self.inner.state).checking
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.state).session.is_some()
    }

    /// Polls now and then every interval until [`deactivate`](Self::deactivate).
    /// Must be called inside a tokio runtime.
    pub fn activate(&self) {
        let mut state = lock(&self.inner.state);
        if state.session.is_some() {
            return;
        }
        let token = CancellationToken::new();
        state.session = Some(token.clone());
        docqa_info!("Health polling every {:?}", self.inner.interval);
        tokio::spawn(poll_loop(Arc::downgrade(&self.inner), token));
    }

    /// Stops polling. No poll result is applied after this returns.
    pub fn deactivate(&self) {
        let mut state = lock(&self.inner.state);
        if let Some(token) = state.session.take() {
            token.cancel();
            state.checking = false;
            docqa_info!("Health polling stopped");
        }
    }

    /// One liveness request whose result is returned, not stored.
    pub async fn probe(&self) -> Health {
        probe(self.inner.api.as_ref()).await
    }
}

async fn probe(api: &dyn DocumentApi) -> Health {
    match api.health().await {
        Ok(report) => Health::from_reported(&report.status),
        Err(err) => {
            docqa_debug!("Health check failed ({}): {}", err.kind, err.message);
            Health::Down
        }
    }
}

async fn poll_loop(inner: Weak<Inner>, token: CancellationToken) {
    let Some(interval) = inner.upgrade().map(|inner| inner.interval) else {
        return;
    };
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let Some(monitor) = inner.upgrade() else {
            break;
        };

        {
            let mut state = lock(&monitor.state);
            if token.is_cancelled() {
                break;
            }
            state.checking = true;
        }

        let health = tokio::select! {
            _ = token.cancelled() => break,
            health = probe(monitor.api.as_ref()) => health,
        };

        let mut state = lock(&monitor.state);
        if token.is_cancelled() {
            break;
        }
        if state.status != health {
            docqa_info!("Service health {:?} -> {:?}", state.status, health);
        }
        state.status = health;
        state.checking = false;
    }
}
