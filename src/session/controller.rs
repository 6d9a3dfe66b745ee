//! Top-level session state machine.
//!
//! `Idle -(trigger)-> Begin -> Running -(trigger)-> Finish -> Idle`
//!
//! Triggers only move the state and wake the controller; `Begin` and `Finish`
//! are carried out by whichever thread calls [`SessionController::step`], one
//! at a time. A trigger that arrives while the controller is in `Begin` or
//! `Finish` is ignored. [`SessionController::run`] parks on the trigger until
//! one arrives.

use super::indicator::StatusIndicator;
use super::report::{device_name, SessionReport, StepReporter};
use crate::config::PipelineMode;
use crate::error::FatalError;
use crate::pipeline::Pipeline;
use crate::sensor::SampleSource;
use crate::stats::SharedPipelineStats;
use crate::sync::{PhaseState, Signal, StateCell};
use chrono::{DateTime, Utc};
use crossbeam_channel::{never, select, Receiver};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const FINISH_TIMEOUT: Duration = Duration::from_secs(5);

struct SessionShared {
    state: StateCell<PhaseState>,
    wake: Signal,
}

/// Cloneable handle for the external trigger (the button).
#[derive(Clone)]
pub struct SessionTrigger {
    shared: Arc<SessionShared>,
}

impl SessionTrigger {
    /// Deliver one trigger event. Returns `true` if it changed the state.
    pub fn press(&self) -> bool {
        let mut accepted = false;
        self.shared.state.update(|s| match s {
            PhaseState::Idle => {
                accepted = true;
                Some(PhaseState::Begin)
            }
            PhaseState::Running => {
                accepted = true;
                Some(PhaseState::Finish)
            }
            PhaseState::Begin | PhaseState::Finish => None,
        });

        if accepted {
            self.shared.wake.notify();
        } else {
            tracing::debug!("Session: trigger ignored");
        }
        accepted
    }

    pub fn state(&self) -> PhaseState {
        self.shared.state.get()
    }
}

enum Wakeup {
    Trigger,
    Fatal(Option<FatalError>),
    Interrupt,
}

struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    steps_at_start: Option<u64>,
}

/// Drives the sample source and the active pipeline through sessions.
pub struct SessionController {
    shared: Arc<SessionShared>,
    source: SampleSource,
    pipeline: Box<dyn Pipeline>,
    indicator: Box<dyn StatusIndicator>,
    reporter: Option<Box<dyn StepReporter>>,
    stats: SharedPipelineStats,
    mode: PipelineMode,
    device: String,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(
        source: SampleSource,
        pipeline: Box<dyn Pipeline>,
        indicator: Box<dyn StatusIndicator>,
        mode: PipelineMode,
        stats: SharedPipelineStats,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                state: StateCell::new(PhaseState::Idle),
                wake: Signal::new(),
            }),
            source,
            pipeline,
            indicator,
            reporter: None,
            stats,
            mode,
            device: device_name(),
            active: None,
        }
    }

    /// Also send every finished session to `reporter`.
    pub fn with_reporter(mut self, reporter: Box<dyn StepReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn trigger(&self) -> SessionTrigger {
        SessionTrigger {
            shared: self.shared.clone(),
        }
    }

    pub fn state(&self) -> PhaseState {
        self.shared.state.get()
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    /// Wait up to `timeout` for a trigger, then carry out a pending
    /// `Begin` or `Finish`. Returns the report of a session that just ended.
    pub fn step(&mut self, timeout: Duration) -> Option<SessionReport> {
        self.shared.wake.wait_timeout(timeout);
        self.process()
    }

    /// Carry out a pending `Begin` or `Finish` without waiting.
    pub fn process(&mut self) -> Option<SessionReport> {
        match self.state() {
            PhaseState::Begin => {
                self.begin();
                None
            }
            PhaseState::Finish => self.finish(),
            PhaseState::Idle | PhaseState::Running => None,
        }
    }

    /// Serve triggers until `interrupt` fires, then end any active session.
    ///
    /// Parks between triggers. A fatal pipeline error stops serving at once
    /// and is returned with the session left as it was. Every finished
    /// session is passed to `on_report`.
    pub fn run(
        &mut self,
        interrupt: &Receiver<()>,
        fatal: &Receiver<FatalError>,
        mut on_report: impl FnMut(&SessionReport),
    ) -> Result<(), FatalError> {
        let wake = self.shared.wake.receiver().clone();
        let mut fatal = fatal.clone();

        loop {
            let wakeup = select! {
                recv(wake) -> _ => Wakeup::Trigger,
                recv(fatal) -> msg => Wakeup::Fatal(msg.ok()),
                recv(interrupt) -> _ => Wakeup::Interrupt,
            };
            match wakeup {
                Wakeup::Trigger => {
                    if let Some(report) = self.process() {
                        on_report(&report);
                    }
                }
                Wakeup::Fatal(Some(e)) => return Err(e),
                // No component can report anymore.
                Wakeup::Fatal(None) => fatal = never(),
                Wakeup::Interrupt => break,
            }
        }

        if let Some(report) = self.close() {
            on_report(&report);
        }
        Ok(())
    }

    /// End the active session, if any.
    pub fn close(&mut self) -> Option<SessionReport> {
        if self.state() == PhaseState::Begin {
            self.begin();
        }
        if self
            .shared
            .state
            .transition(PhaseState::Running, PhaseState::Finish)
        {
            return self.finish();
        }
        self.process()
    }

    fn begin(&mut self) {
        let session = ActiveSession {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            steps_at_start: self.pipeline.step_count(),
        };
        tracing::info!("Session {}: starting {} mode", session.id, self.mode);
        self.active = Some(session);

        self.source.start();
        self.pipeline.start();
        self.indicator.set(true);

        self.shared
            .state
            .transition(PhaseState::Begin, PhaseState::Running);
    }

    fn finish(&mut self) -> Option<SessionReport> {
        self.source.stop();
        self.pipeline.stop();
        if !self.pipeline.wait_idle(FINISH_TIMEOUT) {
            tracing::warn!(
                "Session: {} did not finish within {FINISH_TIMEOUT:?}",
                self.pipeline.name()
            );
        }

        let total_steps = self.pipeline.step_count();
        let report = self.active.take().map(|session| {
            let session_steps = match (total_steps, session.steps_at_start) {
                (Some(total), Some(start)) => Some(total.saturating_sub(start)),
                (Some(total), None) => Some(total),
                _ => None,
            };
            SessionReport {
                session_id: session.id,
                device: self.device.clone(),
                mode: self.mode,
                started_at: session.started_at,
                finished_at: Utc::now(),
                total_steps,
                session_steps,
            }
        });

        if let Some(total) = total_steps {
            tracing::info!("Step count: {total}");
        }
        if let Some(ref report) = report {
            tracing::info!("Session {}: finished", report.session_id);
            if let Some(reporter) = self.reporter.as_mut() {
                reporter.report(report);
            }
        }

        self.indicator.set(false);
        self.stats.record_session_completed();
        self.shared
            .state
            .transition(PhaseState::Finish, PhaseState::Idle);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> SessionTrigger {
        SessionTrigger {
            shared: Arc::new(SessionShared {
                state: StateCell::new(PhaseState::Idle),
                wake: Signal::new(),
            }),
        }
    }

    #[test]
    fn test_trigger_transitions() {
        let trigger = trigger();

        assert!(trigger.press());
        assert_eq!(trigger.state(), PhaseState::Begin);

        // Ignored until the controller has begun.
        assert!(!trigger.press());
        assert_eq!(trigger.state(), PhaseState::Begin);

        trigger.shared.state.set(PhaseState::Running);
        assert!(trigger.press());
        assert_eq!(trigger.state(), PhaseState::Finish);

        assert!(!trigger.press());
        assert_eq!(trigger.state(), PhaseState::Finish);
    }

    #[test]
    fn test_trigger_wakes_controller() {
        let trigger = trigger();
        assert!(!trigger.shared.wake.wait_timeout(Duration::from_millis(1)));
        trigger.press();
        assert!(trigger.shared.wake.wait_timeout(Duration::from_millis(1)));
    }
}
