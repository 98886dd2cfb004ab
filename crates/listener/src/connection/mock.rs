use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;

use crate::connection::{Channel, WriteToken};
use crate::protocol::ChannelError;

/// How the next write issued to a [`RecordingChannel`] completes.
#[derive(Debug, Clone)]
pub(crate) enum WriteOutcome {
    Succeed,
    Fail(ChannelError),
    /// Left unresolved; the test resolves it through [`RecordingChannel::token`].
    Hold,
}

#[derive(Debug, Default)]
struct State {
    frames: Vec<Bytes>,
    tokens: Vec<WriteToken>,
    script: VecDeque<WriteOutcome>,
    closed: bool,
}

/// Test double that records every frame and completes writes from a script.
///
/// Writes succeed immediately unless an outcome was scripted. Writes issued after
/// [`Channel::close`] fail with [`ChannelError::Closed`] and are not recorded.
#[derive(Debug, Default)]
pub(crate) struct RecordingChannel {
    state: Mutex<State>,
}

impl RecordingChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, outcome: WriteOutcome) {
        self.state.lock().unwrap().script.push_back(outcome);
    }

    pub(crate) fn frames(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().frames.clone()
    }

    pub(crate) fn frame_strings(&self) -> Vec<String> {
        self.frames().iter().map(|frame| String::from_utf8_lossy(frame).into_owned()).collect()
    }

    pub(crate) fn token(&self, index: usize) -> WriteToken {
        self.state.lock().unwrap().tokens[index].clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl Channel for RecordingChannel {
    fn write(&self, frame: Bytes) -> WriteToken {
        let token = WriteToken::new();
        let outcome = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                Some(WriteOutcome::Fail(ChannelError::Closed))
            } else {
                state.frames.push(frame);
                state.tokens.push(token.clone());
                state.script.pop_front()
            }
        };

        // resolve outside the lock, observers may write again
        match outcome.unwrap_or(WriteOutcome::Succeed) {
            WriteOutcome::Succeed => {
                token.succeed(());
            }
            WriteOutcome::Fail(cause) => {
                token.fail(cause);
            }
            WriteOutcome::Hold => {}
        }
        token
    }

    fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}
