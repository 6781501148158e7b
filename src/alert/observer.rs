//! Status observers: keep a view of the recurring alert state in sync with
//! controller events.

use log::info;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::controller::{AlertEvent, AlertLoopHandle, LoopState};

/// What a status display shows for the recurring alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusView {
    pub recurring_active: bool,
}

impl StatusView {
    pub fn from_state(state: LoopState) -> Self {
        Self {
            recurring_active: state == LoopState::Running,
        }
    }

    pub fn label(&self) -> &'static str {
        if self.recurring_active {
            "Recurring SMS: Active"
        } else {
            "Recurring SMS: Inactive"
        }
    }

    /// The stop control is only offered while the loop runs.
    pub fn show_stop_control(&self) -> bool {
        self.recurring_active
    }
}

pub struct StatusObserver {
    events: broadcast::Receiver<AlertEvent>,
    state: watch::Receiver<LoopState>,
    view: StatusView,
}

impl StatusObserver {
    /// Subscribe and take the current state as the initial view.
    pub fn attach(handle: &AlertLoopHandle) -> Self {
        let events = handle.subscribe();
        let state = handle.watch_state();
        let view = StatusView::from_state(*state.borrow());
        Self {
            events,
            state,
            view,
        }
    }

    pub fn view(&self) -> StatusView {
        self.view
    }

    /// Wait for the next state-change event and return the refreshed view.
    /// Returns `None` once the controller task is gone.
    pub async fn next_change(&mut self) -> Option<StatusView> {
        loop {
            tokio::select! {
                biased;
                event = self.events.recv() => {
                    match event {
                        Ok(AlertEvent::Started) => self.view = StatusView::from_state(LoopState::Running),
                        Ok(AlertEvent::Stopped) => self.view = StatusView::from_state(LoopState::Idle),
                        // Missed events: the watch channel still has the latest state.
                        Err(RecvError::Lagged(_)) => {
                            self.view = StatusView::from_state(*self.state.borrow_and_update())
                        }
                        Err(RecvError::Closed) => return None,
                    }
                    return Some(self.view);
                }
                // Handles keep the event channel open; the state channel
                // closes when the controller task exits.
                changed = self.state.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

/// Log every status change until the controller shuts down.
pub fn spawn_status_logger(handle: &AlertLoopHandle) -> JoinHandle<()> {
    let mut observer = StatusObserver::attach(handle);
    info!("{}", observer.view().label());
    tokio::spawn(async move {
        while let Some(view) = observer.next_change().await {
            info!("{}", view.label());
        }
    })
}
