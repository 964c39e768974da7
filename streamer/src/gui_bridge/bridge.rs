use crate::gui_bridge::model::DetectionSnapshot;
use log::{error, info};
use mmwcore::telemetry::MetricsRecorder;
use mmwcore::{PollOutcome, RadarConfigParams};
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

pub fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

/// Holds the latest detections and serves them over HTTP.
pub struct GuiBridge {
    state: Arc<RwLock<DetectionSnapshot>>,
    metrics: Arc<MetricsRecorder>,
    params: RadarConfigParams,
}

impl GuiBridge {
    pub fn new(params: RadarConfigParams, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DetectionSnapshot::default())),
            metrics,
            params,
        }
    }

    /// Start `GET /detections` and `GET /params` on a background thread.
    pub fn serve(&self, addr: SocketAddr) -> thread::JoinHandle<()> {
        let state = self.state.clone();
        let metrics = self.metrics.clone();
        let params = self.params;
        let state_filter = warp::any().map(move || state.clone());
        let metrics_filter = warp::any().map(move || metrics.clone());

        let detections_route = warp::path("detections")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter)
            .and(metrics_filter)
            .map(
                |state: Arc<RwLock<DetectionSnapshot>>, metrics: Arc<MetricsRecorder>| {
                    warp::reply::json(&current_snapshot(&state, &metrics))
                },
            );

        let params_route = warp::path("params")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&params));

        thread::spawn(move || {
            let routes = detections_route.or(params_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            info!("detection bridge listening on http://{}", addr);
            runtime.block_on(async move {
                warp::serve(routes).run(addr).await;
            });
        })
    }

    pub fn publish(&self, outcome: &PollOutcome) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.apply(outcome);
    }

    pub fn publish_status(&self, message: &str) {
        if let Ok(mut guard) = self.state.write() {
            guard.note = Some(message.to_string());
        }
        println!("[bridge] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> DetectionSnapshot {
        current_snapshot(&self.state, &self.metrics)
    }
}

fn current_snapshot(
    state: &RwLock<DetectionSnapshot>,
    metrics: &MetricsRecorder,
) -> DetectionSnapshot {
    let mut snapshot = match state.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    snapshot.counters = metrics.snapshot();
    snapshot
}
