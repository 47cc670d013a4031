use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::DashboardController;
use crate::fleet::{
    Decision, OverrideRequest, PredictionOptions, ServiceState, SystemStatus, Train,
};
use crate::planning::{PlanningApi, RemoteError};

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Call {
    GetStatus,
    GetInductionList,
    RefreshData,
    PredictInduction,
    OverrideTrain,
    ClearOverrides,
}

#[derive(Default)]
struct FakeState {
    trains: Vec<Train>,
    manual_overrides: u32,
    calls: Vec<Call>,
    override_requests: Vec<OverrideRequest>,
    prediction_requests: Vec<PredictionOptions>,
    failures: HashMap<Call, RemoteError>,
    panics: Vec<Call>,
    gate: Option<(Call, Receiver<()>)>,
}

/// In-memory planning service that behaves like the real one for overrides.
pub(crate) struct FakePlanningApi {
    state: Mutex<FakeState>,
}

impl FakePlanningApi {
    pub(crate) fn new(trains: Vec<Train>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                trains,
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub(crate) fn override_requests(&self) -> Vec<OverrideRequest> {
        self.lock().override_requests.clone()
    }

    pub(crate) fn prediction_requests(&self) -> Vec<PredictionOptions> {
        self.lock().prediction_requests.clone()
    }

    /// Make every later `call` fail with `error` until `recover` is called.
    pub(crate) fn fail(&self, call: Call, error: RemoteError) {
        self.lock().failures.insert(call, error);
    }

    /// Make every later `call` panic inside the worker until `recover` is called.
    pub(crate) fn panic_on(&self, call: Call) {
        self.lock().panics.push(call);
    }

    pub(crate) fn recover(&self, call: Call) {
        let mut state = self.lock();
        state.failures.remove(&call);
        state.panics.retain(|panicking| *panicking != call);
    }

    /// Hold the next `call` until the returned sender fires or is dropped.
    pub(crate) fn gate(&self, call: Call) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.lock().gate = Some((call, rx));
        tx
    }

    pub(crate) fn set_trains(&self, trains: Vec<Train>) {
        self.lock().trains = trains;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn enter(&self, call: Call) -> Result<(), RemoteError> {
        let gate = {
            let mut state = self.lock();
            state.calls.push(call);
            state.gate.take_if(|(gated, _)| *gated == call)
        };
        if let Some((_, release)) = gate {
            let _ = release.recv_timeout(GATE_TIMEOUT);
        }
        let (panics, failure) = {
            let state = self.lock();
            (state.panics.contains(&call), state.failures.get(&call).cloned())
        };
        if panics {
            panic!("planning api exploded during {call:?}");
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl PlanningApi for FakePlanningApi {
    fn get_status(&self) -> Result<SystemStatus, RemoteError> {
        self.enter(Call::GetStatus)?;
        let state = self.lock();
        Ok(SystemStatus {
            status: ServiceState::Running,
            trains_count: state.trains.len() as u32,
            ml_model_trained: true,
            optimization_completed: true,
            manual_overrides_count: state.manual_overrides,
            last_update: None,
        })
    }

    fn get_induction_list(&self) -> Result<Vec<Train>, RemoteError> {
        self.enter(Call::GetInductionList)?;
        Ok(self.lock().trains.clone())
    }

    fn refresh_data(&self) -> Result<(), RemoteError> {
        self.enter(Call::RefreshData)
    }

    fn predict_induction(&self, options: &PredictionOptions) -> Result<(), RemoteError> {
        self.lock().prediction_requests.push(*options);
        self.enter(Call::PredictInduction)
    }

    fn override_train(&self, request: &OverrideRequest) -> Result<(), RemoteError> {
        self.lock().override_requests.push(request.clone());
        self.enter(Call::OverrideTrain)?;
        let mut state = self.lock();
        if let Some(train) = state
            .trains
            .iter_mut()
            .find(|train| train.train_id == request.train_id)
        {
            train.final_decision = request.decision;
        }
        state.manual_overrides += 1;
        Ok(())
    }

    fn clear_overrides(&self) -> Result<(), RemoteError> {
        self.enter(Call::ClearOverrides)?;
        self.lock().manual_overrides = 0;
        Ok(())
    }
}

pub(crate) fn train(id: &str, fitness: f64, depot: &str, decision: Decision, orders: u32) -> Train {
    Train {
        train_id: id.to_string(),
        fitness_score: fitness,
        depot: depot.to_string(),
        final_decision: decision,
        open_work_orders: orders,
    }
}

pub(crate) fn fleet_of_two() -> Vec<Train> {
    vec![
        train("Train-101", 92.0, "Depot A", Decision::Induct, 1),
        train("Train-102", 79.0, "Depot B", Decision::Hold, 3),
    ]
}

/// Tick until the in-flight sync has been committed or failed.
pub(crate) fn settle(controller: &mut DashboardController, now: Instant) {
    for _ in 0..1000 {
        controller.tick(now);
        if !controller.is_busy() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("sync did not finish in time");
}
