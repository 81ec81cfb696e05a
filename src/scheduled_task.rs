use std::future::Future;
use std::sync::Arc;

use mongodb::Database;
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::{
        self,
        sync::{Mutex, Notify},
        task::JoinHandle,
        time::{interval, Duration, MissedTickBehavior},
    },
    Build, Orbit, Rocket,
};

use crate::config::Config;
use crate::model::db::vote::reconcile_has_voted;

/// A task that runs immediately and then once per period until cancelled.
/// It can also be triggered early.
pub struct PeriodicTask {
    handle: JoinHandle<()>,
    signal: Arc<Notify>,
}

impl PeriodicTask {
    /// Start running `task` every `period`. Runs never overlap; a slow run
    /// delays the next one.
    pub fn new<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let signal = Arc::new(Notify::new());
        let task_signal = signal.clone();
        let handle = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticks.tick() => {}
                    _ = task_signal.notified() => {}
                }
                task().await;
            }
        });
        Self { handle, signal }
    }

    /// Run the task now instead of waiting for the next period.
    pub fn trigger_now(&self) {
        self.signal.notify_one();
    }

    /// Stop the task, aborting any run in progress.
    pub async fn cancel(self) {
        self.handle.abort();
        // The only possible error is the cancellation we just asked for.
        let _ = self.handle.await;
    }
}

/// Shared handle on the has-voted reconciler, managed so routes can ask for an early run.
#[derive(Clone, Default)]
pub struct Reconciler(Arc<Mutex<Option<PeriodicTask>>>);

impl Reconciler {
    /// Reconcile `db` every `period`, replacing any task already running.
    pub async fn start(&self, db: Database, period: Duration) {
        let task = PeriodicTask::new(period, move || {
            let db = db.clone();
            async move {
                if let Err(err) = reconcile_has_voted(&db).await {
                    warn!("Has-voted reconciliation failed: {err}");
                }
            }
        });
        if let Some(previous) = self.0.lock().await.replace(task) {
            previous.cancel().await;
        }
    }

    /// Ask for a run now. Returns `false` if reconciliation is not running.
    pub async fn trigger_now(&self) -> bool {
        match &*self.0.lock().await {
            Some(task) => {
                task.trigger_now();
                true
            }
            None => false,
        }
    }

    /// Stop reconciling. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        match self.0.lock().await.take() {
            Some(task) => {
                task.cancel().await;
                true
            }
            None => false,
        }
    }
}

/// A fairing that keeps voters' has-voted flags in line with the recorded
/// voting sessions for as long as the server runs.
#[derive(Default)]
pub struct ReconcilerFairing {
    reconciler: Reconciler,
}

#[rocket::async_trait]
impl Fairing for ReconcilerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Has-voted reconciler",
            kind: Kind::Ignite | Kind::Liftoff | Kind::Shutdown,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        Ok(rocket.manage(self.reconciler.clone()))
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let (Some(config), Some(db)) = (rocket.state::<Config>(), rocket.state::<Database>()) else {
            error!("Reconciler cannot start without config and database");
            return;
        };
        let Some(period) = config.reconcile_interval() else {
            info!("Has-voted reconciliation disabled");
            return;
        };

        self.reconciler.start(db.clone(), period).await;
        info!("Reconciling has-voted flags every {}s", period.as_secs());
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        if self.reconciler.stop().await {
            info!("Stopped has-voted reconciler");
        }
    }
}
