use tracing::{debug, warn};

use crate::command::Command;
use crate::config::DecoderConfig;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::queue::FragmentQueue;
use crate::sensor::SensorState;
use crate::tokenizer::tokenize;

/// Something that happened while decoding a chunk.
#[derive(Debug)]
pub enum DecodeEvent {
    /// A command was decoded and its handler succeeded.
    Dispatched(Command),
    /// A command was decoded but dispatch failed. No state was changed.
    Rejected {
        command: Command,
        error: DispatchError,
    },
    /// The queue outgrew its bound and its oldest fragments were dropped.
    Overflow {
        dropped_fragments: usize,
        dropped_bytes: usize,
    },
}

impl DecodeEvent {
    /// Whether this event is a diagnostic rather than a successful dispatch.
    pub fn is_diagnostic(&self) -> bool {
        !matches!(self, DecodeEvent::Dispatched(_))
    }

    /// The command this event concerns, if any.
    pub fn command(&self) -> Option<&Command> {
        match self {
            DecodeEvent::Dispatched(command) | DecodeEvent::Rejected { command, .. } => {
                Some(command)
            }
            DecodeEvent::Overflow { .. } => None,
        }
    }
}

/// Turns raw chunks into dispatched commands.
///
/// Owns the fragment queue; feed it every chunk from one byte source, in
/// order, from a single thread.
#[derive(Debug)]
pub struct Decoder {
    queue: FragmentQueue,
    dispatcher: Dispatcher,
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with default configuration.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_config(dispatcher, DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(dispatcher: Dispatcher, config: DecoderConfig) -> Self {
        Self {
            queue: FragmentQueue::new(),
            dispatcher,
            config,
        }
    }

    /// Create a decoder that only understands `sensor`, writing into `state`.
    pub fn for_sensor(state: SensorState) -> Self {
        Self::new(Dispatcher::with_sensor(state))
    }

    /// Decode one chunk and dispatch every command it completes, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodeEvent> {
        let fragments = tokenize(chunk);
        debug!(len = chunk.len(), fragments = fragments.len(), "buffer parsed");
        self.queue.extend(fragments);

        let mut events = Vec::new();
        for expr in self.queue.scan() {
            let Some(command) = Command::parse(&expr) else {
                continue;
            };
            match self.dispatcher.dispatch(&command) {
                Ok(()) => events.push(DecodeEvent::Dispatched(command)),
                Err(error) => events.push(DecodeEvent::Rejected { command, error }),
            }
        }

        if let Some(max) = self.config.max_buffered_bytes {
            let (dropped_fragments, dropped_bytes) = self.queue.trim_to(max);
            if dropped_fragments > 0 {
                warn!(
                    dropped_fragments,
                    dropped_bytes,
                    max_buffered_bytes = max,
                    "unterminated input exceeded buffer bound, oldest fragments dropped"
                );
                events.push(DecodeEvent::Overflow {
                    dropped_fragments,
                    dropped_bytes,
                });
            }
        }

        debug!(
            queued = self.queue.len(),
            buffered = self.queue.buffered_bytes(),
            "buffer strings handled"
        );
        events
    }

    /// Fragments waiting for the rest of their command.
    pub fn queue(&self) -> &FragmentQueue {
        &self.queue
    }

    /// Borrow the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Mutably borrow the dispatcher, e.g. to register more handlers.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Discard every queued fragment.
    pub fn reset(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sensor_decoder() -> (Decoder, SensorState) {
        let state = SensorState::new();
        (Decoder::for_sensor(state.clone()), state)
    }

    fn diagnostics(events: &[DecodeEvent]) -> usize {
        events.iter().filter(|e| e.is_diagnostic()).count()
    }

    #[test]
    fn command_split_over_two_chunks() {
        let (mut decoder, state) = sensor_decoder();

        assert!(decoder.feed(b"sensor(15,25,55,").is_empty());
        assert!(state.get().is_none());

        let events = decoder.feed(b"85,95,45);\r\n");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DecodeEvent::Dispatched(c) if c.name == "sensor"));
        assert_eq!(state.get().as_deref(), Some(&[15, 25, 55, 85, 95, 45][..]));
        assert!(decoder.queue().is_empty());
    }

    #[test]
    fn second_of_two_commands_wins() {
        let (mut decoder, state) = sensor_decoder();

        let mut dispatched = 0;
        for chunk in [
            &b"sensor(15,2,5,85,9,4);"[..],
            &b"\r\nsensor(15,2,5,85,9,4);\r"[..],
        ] {
            dispatched += decoder
                .feed(chunk)
                .iter()
                .filter(|e| matches!(e, DecodeEvent::Dispatched(_)))
                .count();
        }

        assert_eq!(dispatched, 2);
        assert_eq!(state.get().as_deref(), Some(&[15, 2, 5, 85, 9, 4][..]));
    }

    #[test]
    fn later_command_in_one_chunk_overwrites_earlier() {
        let (mut decoder, state) = sensor_decoder();
        let events = decoder.feed(b"sensor(1,2);\r\nsensor(3);\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(state.get().as_deref(), Some(&[3][..]));
    }

    #[test]
    fn unrecognized_command_is_one_diagnostic() {
        let (mut decoder, state) = sensor_decoder();
        state.set(vec![1]);

        let events = decoder.feed(b"foo(1,2);\r\n");
        assert_eq!(diagnostics(&events), 1);
        assert!(matches!(
            &events[0],
            DecodeEvent::Rejected {
                error: DispatchError::UnknownCommand { .. },
                ..
            }
        ));
        assert_eq!(state.get().as_deref(), Some(&[1][..]));
    }

    #[test]
    fn conversion_failure_is_one_diagnostic() {
        let (mut decoder, state) = sensor_decoder();

        let events = decoder.feed(b"sensor(1,x,3);\r\n");
        assert_eq!(diagnostics(&events), 1);
        assert!(matches!(
            &events[0],
            DecodeEvent::Rejected {
                error: DispatchError::InvalidArgument { position: 1, .. },
                ..
            }
        ));
        assert!(state.get().is_none());
        assert!(decoder.queue().is_empty());
    }

    #[test]
    fn blank_argument_list_keeps_previous_reading() {
        let (mut decoder, state) = sensor_decoder();
        state.set(vec![7, 7]);

        let events = decoder.feed(b"sensor();\r\n");
        assert_eq!(diagnostics(&events), 1);
        assert!(matches!(
            &events[..],
            [DecodeEvent::Rejected { error: DispatchError::InvalidArgument { .. }, .. }]
        ));
        assert_eq!(state.get().as_deref(), Some(&[7, 7][..]));
        assert!(decoder.queue().is_empty());
    }

    #[test]
    fn whitespace_around_arguments_is_tolerated() {
        let (mut decoder, state) = sensor_decoder();
        decoder.feed(b"sensor(15, 25, 55, 85, 95, 45);\r\n");
        assert_eq!(state.get().as_deref(), Some(&[15, 25, 55, 85, 95, 45][..]));
    }

    #[test]
    fn unterminated_garbage_overflows_and_recovers() {
        let state = SensorState::new();
        let mut decoder = Decoder::with_config(
            Dispatcher::with_sensor(state.clone()),
            DecoderConfig {
                max_buffered_bytes: Some(16),
            },
        );

        let events = decoder.feed(b"aaaaaaaaaa\rbbbbbbbbbb\r");
        assert!(matches!(
            events.as_slice(),
            [DecodeEvent::Overflow {
                dropped_fragments: 1,
                dropped_bytes: 10
            }]
        ));
        assert_eq!(decoder.queue().buffered_bytes(), 10);

        // The surviving tail still prefixes the next command.
        let events = decoder.feed(b"\rsensor(4);\r\n");
        assert!(matches!(
            &events[..],
            [DecodeEvent::Rejected { command, .. }] if command.name == "bbbbbbbbbbsensor"
        ));
        assert!(decoder.queue().is_empty());

        decoder.feed(b"sensor(5);\r\n");
        assert_eq!(state.get().as_deref(), Some(&[5][..]));
    }

    #[test]
    fn unbounded_queue_keeps_everything() {
        let state = SensorState::new();
        let mut decoder = Decoder::with_config(
            Dispatcher::with_sensor(state),
            DecoderConfig {
                max_buffered_bytes: None,
            },
        );
        let garbage = vec![b'z'; 200_000];
        assert!(decoder.feed(&garbage).is_empty());
        assert_eq!(decoder.queue().buffered_bytes(), 200_000);

        decoder.reset();
        assert!(decoder.queue().is_empty());
    }

    #[test]
    fn extra_handlers_can_be_registered() {
        let (mut decoder, _state) = sensor_decoder();
        decoder
            .dispatcher_mut()
            .register("ping", |_: &Command| -> Result<(), DispatchError> { Ok(()) });

        let events = decoder.feed(b"ping();\r\n");
        assert!(matches!(&events[..], [DecodeEvent::Dispatched(c)] if c.name == "ping"));
    }

    fn feed_split(chunks: &[&[u8]]) -> Option<Vec<i64>> {
        let (mut decoder, state) = sensor_decoder();
        for chunk in chunks {
            decoder.feed(chunk);
        }
        state.get().map(|r| r.to_vec())
    }

    #[test]
    fn every_two_way_split_yields_same_reading() {
        let command: &[u8] = b"sensor(1,2,3);\r\n";
        for cut in 0..=command.len() {
            let (left, right) = command.split_at(cut);
            assert_eq!(
                feed_split(&[left, right]),
                Some(vec![1, 2, 3]),
                "split at {cut}"
            );
        }
    }

    proptest! {
        #[test]
        fn any_split_yields_same_reading(
            cuts in proptest::collection::btree_set(0usize..=16, 0..8)
        ) {
            let command: &[u8] = b"sensor(1,2,3);\r\n";
            let mut chunks = Vec::new();
            let mut start = 0;
            for cut in cuts {
                chunks.push(&command[start..cut]);
                start = cut;
            }
            chunks.push(&command[start..]);

            prop_assert_eq!(feed_split(&chunks), Some(vec![1, 2, 3]));
        }
    }
}
