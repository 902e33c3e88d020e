//! Terminal stand-ins for the microphone and the speaker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use services::{
    EngineError, RecognitionEngine, RecognitionEvent, SpeakOptions, SpeechSynthesizer,
    SynthesisError,
};
use tokio::sync::mpsc::UnboundedSender;

/// Treats typed lines as speech while "listening".
///
/// Like a browser recognizer in single-result mode it reports one final
/// transcript and then ends, which exercises the restart loop.
pub struct ConsoleRecognizer {
    running: Arc<AtomicBool>,
    events: UnboundedSender<RecognitionEvent>,
}

/// The host's side of a `ConsoleRecognizer`.
#[derive(Clone)]
pub struct Microphone {
    running: Arc<AtomicBool>,
    events: UnboundedSender<RecognitionEvent>,
}

impl ConsoleRecognizer {
    pub fn new(events: UnboundedSender<RecognitionEvent>) -> (Self, Microphone) {
        let running = Arc::new(AtomicBool::new(false));
        let mic = Microphone {
            running: Arc::clone(&running),
            events: events.clone(),
        };
        (Self { running, events }, mic)
    }

    fn emit(&self, event: RecognitionEvent) {
        // Fails only once the event loop has shut down.
        let _ = self.events.send(event);
    }
}

impl RecognitionEngine for ConsoleRecognizer {
    fn start(&mut self) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }
        self.emit(RecognitionEvent::Started);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(EngineError::NotRunning);
        }
        self.emit(RecognitionEvent::Ended);
        Ok(())
    }
}

impl Microphone {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Delivers `line` as a final transcript and ends the capture.
    pub fn hear(&self, line: &str) {
        let _ = self
            .events
            .send(RecognitionEvent::final_transcript(line, 1.0));
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(RecognitionEvent::Ended);
        }
    }
}

/// Prints what would be spoken.
pub struct ConsoleSpeaker;

impl SpeechSynthesizer for ConsoleSpeaker {
    fn speak(&mut self, text: &str, options: &SpeakOptions) -> Result<(), SynthesisError> {
        println!("🔊 {text}  ({}, rate {})", options.voice, options.rate);
        Ok(())
    }
}
