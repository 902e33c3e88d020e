mod console;

use std::fmt;

use abacus_core::model::{PanelId, QuizBoard, VoiceSettings, VoiceSettingsDraft};
use services::{Capabilities, NoticeLevel, TokioScheduler, VoiceAssistant, VoiceStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::console::{ConsoleRecognizer, ConsoleSpeaker, Microphone};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLevels { raw: String },
    InvalidPanels { raw: String },
    InvalidConfidence { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLevels { raw } => write!(f, "invalid --levels value: {raw}"),
            ArgsError::InvalidPanels { raw } => write!(f, "invalid --panels value: {raw}"),
            ArgsError::InvalidConfidence { raw } => {
                write!(f, "invalid confidence threshold: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Args {
    levels: usize,
    panels: u32,
    once: bool,
    mute: bool,
    confidence_threshold: Option<f32>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--levels <n>] [--panels <n>] [--once] [--mute]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --levels 2");
    eprintln!("  --panels 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ABACUS_LEVELS, ABACUS_PANELS, ABACUS_CONFIDENCE_THRESHOLD, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut levels = std::env::var("ABACUS_LEVELS")
            .ok()
            .and_then(|value| parse_levels(value).ok())
            .unwrap_or(2);
        let mut panels = std::env::var("ABACUS_PANELS")
            .ok()
            .and_then(|value| parse_panels(value).ok())
            .unwrap_or(1);
        let confidence_threshold = std::env::var("ABACUS_CONFIDENCE_THRESHOLD")
            .ok()
            .map(|raw| {
                raw.trim()
                    .parse::<f32>()
                    .map_err(|_| ArgsError::InvalidConfidence { raw: raw.clone() })
            })
            .transpose()?;
        let mut once = false;
        let mut mute = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--levels" => levels = parse_levels(require_value(args, "--levels")?)?,
                "--panels" => panels = parse_panels(require_value(args, "--panels")?)?,
                "--once" => once = true,
                "--mute" => mute = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            levels,
            panels,
            once,
            mute,
            confidence_threshold,
        })
    }
}

fn parse_levels(raw: String) -> Result<usize, ArgsError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ArgsError::InvalidLevels { raw }),
    }
}

fn parse_panels(raw: String) -> Result<u32, ArgsError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ArgsError::InvalidPanels { raw }),
    }
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("services=info".parse()?)
        .add_directive("app=info".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()?;
    Ok(())
}

//
// ─── CONSOLE COMMANDS ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Listen,
    Once,
    Stop,
    Focus(PanelId),
    History,
    Clear,
    Speaker,
    Mic,
    Score,
    Help,
    Quit,
}

impl Command {
    fn from_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = match parts.next()? {
            ":listen" | ":l" => Self::Listen,
            ":once" | ":o" => Self::Once,
            ":stop" | ":s" => Self::Stop,
            ":panel" | ":p" => Self::Focus(parts.next()?.parse().ok()?),
            ":history" => Self::History,
            ":clear" => Self::Clear,
            ":speaker" => Self::Speaker,
            ":mic" => Self::Mic,
            ":score" => Self::Score,
            ":help" | ":h" => Self::Help,
            ":quit" | ":q" => Self::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

fn print_help() {
    println!("Type an answer and press enter, or use a command:");
    println!("  :listen   toggle continuous voice input on the focused panel");
    println!("  :once     listen for a single answer");
    println!("  :stop     stop listening");
    println!("  :panel N  focus panel N");
    println!("  :history  show recent speech activity");
    println!("  :clear    clear the history");
    println!("  :speaker  play the speaker test");
    println!("  :mic      check the microphone (type a line containing \"test\")");
    println!("  :score    show total marks");
    println!("  :quit     exit");
    println!("While listening, typed lines are treated as speech.");
}

struct Console {
    mic: Microphone,
    focus: PanelId,
    once: bool,
    shown_board: Option<QuizBoard>,
    shown_status: VoiceStatus,
}

impl Console {
    /// Returns false when the user asked to quit.
    fn handle_line(&mut self, assistant: &mut VoiceAssistant<TokioScheduler>, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }

        if !line.starts_with(':') {
            if self.mic.is_running() {
                self.mic.hear(line);
            } else if let Err(err) = assistant.enter_answer(self.focus, line) {
                eprintln!("{err}");
            }
            return true;
        }

        let Some(command) = Command::from_line(line) else {
            eprintln!("unknown command: {line}");
            return true;
        };
        debug!(?command, "console command");

        let outcome = match command {
            Command::Listen if self.once => assistant.listen_once(self.focus),
            Command::Listen => assistant.toggle_listening(self.focus).map(|_| ()),
            Command::Once => assistant.listen_once(self.focus),
            Command::Stop => {
                assistant.stop();
                Ok(())
            }
            Command::Focus(panel) => {
                if assistant.board().contains(panel) {
                    self.focus = panel;
                    println!("focused panel {panel}");
                } else {
                    eprintln!("no panel {panel}");
                }
                Ok(())
            }
            Command::History => {
                for entry in assistant.history().visible() {
                    println!(
                        "  {} {:?} {}",
                        entry.timestamp.format("%H:%M:%S"),
                        entry.kind,
                        entry.message
                    );
                }
                Ok(())
            }
            Command::Clear => {
                assistant.clear_history();
                Ok(())
            }
            Command::Speaker => {
                assistant.test_speaker();
                Ok(())
            }
            Command::Mic => assistant.test_microphone(),
            Command::Score => {
                println!("score: {}", assistant.board().total_marks());
                Ok(())
            }
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::Quit => return false,
        };

        if let Err(err) = outcome {
            eprintln!("{err}");
        }
        true
    }

    fn render(&mut self, assistant: &mut VoiceAssistant<TokioScheduler>) {
        for notice in assistant.take_notices() {
            let icon = match notice.level {
                NoticeLevel::Info => "💡",
                NoticeLevel::Success => "✅",
                NoticeLevel::Warning => "⚠️",
                NoticeLevel::Error => "❌",
            };
            println!("{icon} {}", notice.message);
        }

        let status = assistant.status();
        if status.mic_active != self.shown_status.mic_active {
            println!("{}", if status.mic_active { "🎤 listening" } else { "🎤 off" });
        }
        self.shown_status = status;

        let board = assistant.board();
        if self.shown_board.as_ref() == Some(board) {
            return;
        }
        for panel in board.panels() {
            let marker = if panel.id() == self.focus { '>' } else { ' ' };
            let result = panel.result().map_or("", |(message, _)| message);
            println!(
                "{marker}[{}] {} = {:<6} {:<45} marks: {}",
                panel.id(),
                panel.question().expression(),
                panel.input(),
                result,
                panel.marks()
            );
        }
        self.shown_board = Some(board.clone());
    }
}

fn prepare(args: &Args) -> Result<(VoiceSettings, QuizBoard), abacus_core::Error> {
    let settings = VoiceSettingsDraft {
        confidence_threshold: args.confidence_threshold,
        ..VoiceSettingsDraft::new()
    }
    .validate()?;
    let board = QuizBoard::generate(args.panels, args.levels, &mut rand::rng())?;
    Ok((settings, board))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing()?;

    let (settings, board) = prepare(&args)?;

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (recognizer, mic) = ConsoleRecognizer::new(events_tx);
    let mut caps = Capabilities::none().with_recognizer(recognizer);
    if !args.mute {
        caps = caps.with_synthesizer(ConsoleSpeaker);
    }
    let (scheduler, mut fired) = TokioScheduler::new();
    let mut assistant = VoiceAssistant::new(settings, board, caps, scheduler);

    let mut console = Console {
        mic,
        focus: PanelId::new(0),
        once: args.once,
        shown_board: None,
        shown_status: VoiceStatus::default(),
    };
    print_help();
    console.render(&mut assistant);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !console.handle_line(&mut assistant, line.trim()) {
                    break;
                }
            }
            Some(event) = events.recv() => {
                assistant.handle_recognition(event);
            }
            Some(timer) = fired.recv() => {
                assistant.on_timer(timer.handle, timer.task);
            }
        }
        console.render(&mut assistant);
    }

    assistant.stop();
    info!(score = assistant.board().total_marks(), "session finished");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
