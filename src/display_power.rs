//! Screen power state machine: Active <-> Sleeping on inactivity timeout

use embassy_time::{Duration, Instant};
use log::info;
use statig::prelude::*;

#[derive(Debug, Clone, Copy)]
pub enum DisplayInput {
    /// Weight moved or a request arrived.
    Activity { at: Instant },
    /// Once per loop iteration.
    Tick { at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutput {
    PowerOn,
    PowerOff,
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Active,
    Sleeping,
}

#[derive(Debug)]
pub struct DisplayContext {
    last_activity_at: Instant,
    timeout: Duration,
    outputs: heapless::Vec<DisplayOutput, 4>,
}

impl DisplayContext {
    fn emit(&mut self, output: DisplayOutput) {
        let _ = self.outputs.push(output);
    }
}

#[derive(Debug, Default)]
pub struct DisplayPowerMachine;

#[state_machine(
    initial = "State::active()",
    state(derive(Debug)),
    on_transition = "Self::on_transition"
)]
impl DisplayPowerMachine {
    #[state]
    fn active(context: &mut DisplayContext, event: &DisplayInput) -> Response<State> {
        use Response::*;

        match *event {
            DisplayInput::Activity { at } => {
                context.last_activity_at = at;
                Handled
            }
            DisplayInput::Tick { at } => {
                if at.saturating_duration_since(context.last_activity_at) > context.timeout {
                    context.emit(DisplayOutput::PowerOff);
                    Transition(State::sleeping())
                } else {
                    context.emit(DisplayOutput::Render);
                    Handled
                }
            }
        }
    }

    #[state]
    fn sleeping(context: &mut DisplayContext, event: &DisplayInput) -> Response<State> {
        use Response::*;

        match *event {
            DisplayInput::Activity { at } => {
                // The caller's next tick renders the first frame.
                context.last_activity_at = at;
                context.emit(DisplayOutput::PowerOn);
                Transition(State::active())
            }
            DisplayInput::Tick { .. } => Handled,
        }
    }

    fn on_transition(&mut self, source: &State, target: &State) {
        info!(
            "🖥️ Display: {:?} -> {:?}",
            Self::mode_of(source),
            Self::mode_of(target)
        );
    }

    fn mode_of(state: &State) -> DisplayMode {
        match state {
            State::Active {} => DisplayMode::Active,
            State::Sleeping {} => DisplayMode::Sleeping,
        }
    }
}

/// Owns the machine and its context; callers apply the returned outputs to
/// the physical screen.
pub struct DisplayPower {
    machine: statig::prelude::StateMachine<DisplayPowerMachine>,
    context: DisplayContext,
}

impl DisplayPower {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            machine: DisplayPowerMachine::default().state_machine(),
            context: DisplayContext {
                last_activity_at: now,
                timeout,
                outputs: heapless::Vec::new(),
            },
        }
    }

    fn handle_input(&mut self, input: DisplayInput) -> heapless::Vec<DisplayOutput, 4> {
        self.context.outputs.clear();
        let _ = self.machine.handle_with_context(&input, &mut self.context);
        core::mem::take(&mut self.context.outputs)
    }

    pub fn note_activity(&mut self, at: Instant) -> heapless::Vec<DisplayOutput, 4> {
        self.handle_input(DisplayInput::Activity { at })
    }

    pub fn tick(&mut self, at: Instant) -> heapless::Vec<DisplayOutput, 4> {
        self.handle_input(DisplayInput::Tick { at })
    }

    pub fn mode(&self) -> DisplayMode {
        DisplayPowerMachine::mode_of(self.machine.state())
    }

    pub fn last_activity_at(&self) -> Instant {
        self.context.last_activity_at
    }
}
