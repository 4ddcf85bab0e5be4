//! Destinations for build output.

use std::io::Write;

use crossbeam_channel::Sender;

use crate::toolchain::message::BuildMessage;

/// Receives the output of build, clean and test-build runs, one message at
/// a time and in the order it was produced.
pub trait BuildOutputSink: Send {
    /// Forget previous output. Called once at the start of every run.
    fn clear(&mut self);

    fn write_line(&mut self, message: BuildMessage);
}

/// Prints messages to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    /// Print artifact messages too
    pub show_artifacts: bool,
}

impl BuildOutputSink for ConsoleSink {
    fn clear(&mut self) {}

    fn write_line(&mut self, message: BuildMessage) {
        if matches!(message, BuildMessage::Artifact(_)) && !self.show_artifacts {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", message);
    }
}

/// Forwards messages to a channel, for hosts that render output on another
/// thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<SinkEvent>,
}

/// What a [`ChannelSink`] sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Clear,
    Line(BuildMessage),
}

impl ChannelSink {
    pub fn new(tx: Sender<SinkEvent>) -> Self {
        ChannelSink { tx }
    }
}

impl BuildOutputSink for ChannelSink {
    fn clear(&mut self) {
        let _ = self.tx.send(SinkEvent::Clear);
    }

    fn write_line(&mut self, message: BuildMessage) {
        // A host that stopped listening is not the build's problem.
        let _ = self.tx.send(SinkEvent::Line(message));
    }
}
