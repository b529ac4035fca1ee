use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};

use crate::animationstate::{AnimationState, Mode};
use crate::buildregistry::BuildRegistry;
use crate::eventprocessor::EventProcessor;
use crate::framerenderer::{Frame, FrameRenderer};
use crate::intervaltimer::IntervalTimer;

/// What event sources and the signal handler hand to the tick loop.
#[derive(Debug)]
pub enum LoopMessage {
    /// A raw build event payload, parsed on the loop thread.
    Payload(String),
    Shutdown,
}

/// Displays frames. Delivery faults are the sink's business.
pub trait FrameSink {
    fn show(&mut self, frame: &Frame);
}

pub struct TickLoop<S: FrameSink> {
    registry: BuildRegistry,
    state: AnimationState,
    processor: EventProcessor,
    renderer: FrameRenderer,
    timer: IntervalTimer,
    sink: S,
    receiver: Receiver<LoopMessage>,
    pending: Vec<String>,
    shutdown: bool,
}

impl<S: FrameSink> TickLoop<S> {
    pub fn new(
        registry: BuildRegistry,
        processor: EventProcessor,
        renderer: FrameRenderer,
        timer: IntervalTimer,
        sink: S,
        receiver: Receiver<LoopMessage>,
    ) -> TickLoop<S> {
        TickLoop {
            registry,
            state: AnimationState::new(),
            processor,
            renderer,
            timer,
            sink,
            receiver,
            pending: Vec::new(),
            shutdown: false,
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &BuildRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown
    }

    /// Ticks at the timer's rate until a shutdown message arrives or every sender is gone.
    pub fn run(&mut self) {
        log::info!(
            "Tick loop running every {:?} on {} LEDs",
            self.timer.interval(),
            self.registry.strip_length()
        );

        while self.wait_for_next_tick() {
            self.tick();
        }

        log::info!(
            "Tick loop stopped ({} builds still active, {} unknown build references)",
            self.registry.count(),
            self.processor.unknown_references()
        );
    }

    /// Applies everything received so far, then advances, renders and shows one frame.
    ///
    /// Nothing is rendered once shutdown has been requested.
    pub fn tick(&mut self) {
        self.drain();
        if self.shutdown {
            return;
        }

        for payload in std::mem::take(&mut self.pending) {
            if let Err(err) =
                self.processor
                    .process_payload(&payload, &mut self.registry, &mut self.state)
            {
                log::warn!("Dropping event {payload}: {err}");
            }
        }

        let positions: Vec<usize> = self
            .registry
            .advance_all()
            .into_iter()
            .map(|(_, position)| position)
            .collect();
        if !positions.is_empty() {
            log::trace!("Builds active: {}", positions.len());
        }

        if self.state.mode() == Mode::Notifying {
            log::trace!(
                "Notifying, {} ticks left",
                self.state.notify_ticks_remaining()
            );
        }

        let frame = self.renderer.render(&mut self.state, &positions);
        self.sink.show(&frame);

        self.state.tick(self.registry.is_empty());
    }

    fn receive(&mut self, message: LoopMessage) {
        match message {
            LoopMessage::Payload(payload) => self.pending.push(payload),
            LoopMessage::Shutdown => {
                log::info!("Shutdown requested");
                self.shutdown = true;
            }
        }
    }

    fn drain(&mut self) {
        while !self.shutdown {
            match self.receiver.try_recv() {
                Ok(message) => self.receive(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("All event senders are gone");
                    self.shutdown = true;
                }
            }
        }
    }

    /// Blocks until the next deadline, queueing payloads as they come in.
    /// Returns false once the loop should stop.
    fn wait_for_next_tick(&mut self) -> bool {
        while !self.shutdown {
            match self.receiver.recv_timeout(self.timer.time_until_next_tick()) {
                Ok(message) => self.receive(message),
                Err(RecvTimeoutError::Timeout) => {
                    self.timer.tick();
                    return true;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("All event senders are gone");
                    self.shutdown = true;
                }
            }
        }

        false
    }
}
