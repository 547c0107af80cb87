//! Interactive terminal chat
//!
//! The terminal plays the chat window: rustyline reads input on its own
//! thread, an indicatif spinner is the typing indicator, and every
//! transcript line is coloured by its [`LineStyle`]. Input is only re-armed
//! while the executor is idle, so nothing can be typed mid-resolution.

use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    cursor::{MoveTo, MoveToPreviousLine},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Helper;
use std::io::{self, IsTerminal, Write};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::agent::llm::OllamaClient;
use crate::config::Config;
use crate::memory::{open_knowledge_store, KnowledgeRepository, VolatileKnowledgeStore};
use crate::pipeline::{
    AsyncExecutor, ChatFrontend, ExecutorSettings, LearningCoordinator, ResponseRouter, SubmitOutcome,
};
use crate::types::LineStyle;

const PROMPT: &str = "\x1b[32m❯\x1b[0m ";
const LEARNING_PROMPT: &str = "\x1b[35m🎓 ❯\x1b[0m ";

/// Slash commands understood by the chat loop
const COMMANDS: &[&str] = &["/help", "/clear", "/exit", "/quit"];

/// Tab completion and inline hints for slash commands
struct ChatHelper {
    commands: Vec<&'static str>,
}

impl ChatHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let partial = &line[..pos];
        if !partial.starts_with('/') {
            return Ok((pos, Vec::new()));
        }

        let matches = self
            .commands
            .iter()
            .filter(|c| c.starts_with(partial))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c[partial.len()..].to_string(),
            })
            .collect();
        Ok((pos, matches))
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if !line.starts_with('/') || pos < line.len() {
            return None;
        }
        self.commands
            .iter()
            .find(|c| c.starts_with(line) && **c != line)
            .map(|c| c[line.len()..].to_string())
    }
}

impl Validator for ChatHelper {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Highlighter for ChatHelper {}

impl Helper for ChatHelper {}

/// Print colored output
fn print_colored(text: &str, color: Color) {
    let _ = execute!(io::stdout(), SetForegroundColor(color), Print(text), ResetColor);
}

fn print_dim(text: &str) {
    print_colored(text, Color::DarkGrey);
}

fn print_success(text: &str) {
    print_colored(text, Color::Green);
}

const BUSY_NOTICE: &str = "  Espera a que termine la respuesta anterior.";

/// Welcome banner shown at startup and after `/clear`
fn welcome_lines(model: &str, store: &str, model_online: bool) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "  🤖 ¡Hola! Soy tu asistente ultra-rápido 🚀".to_string(),
        String::new(),
        "  Características".to_string(),
        "    ⚡ Respuestas instantáneas".to_string(),
        "    💾 Cache de respuestas".to_string(),
        "    🧠 IA local con Ollama".to_string(),
        "    🎓 Aprendizaje continuo".to_string(),
        String::new(),
        format!("  modelo        {}", model),
        format!("  conocimiento  {}", store),
    ];
    if !model_online {
        lines.push("  ⚠ El servidor del modelo no responde; se usarán respuestas de reserva".to_string());
    }
    lines.extend([
        String::new(),
        "  Ejemplos: \"Hola\" · \"¿Qué hora es?\" · \"¿Qué es Python?\"".to_string(),
        "  /help para comandos · Tab para autocompletar".to_string(),
        String::new(),
    ]);
    lines
}

fn help_lines() -> Vec<String> {
    [
        "",
        "Comandos",
        "  /help          Mostrar esta ayuda",
        "  /clear         Limpiar la conversación",
        "  /exit          Salir",
        "",
        "  Ctrl+C cancela la línea actual · Ctrl+D sale",
        "",
    ]
    .iter()
    .map(|l| l.to_string())
    .collect()
}

/// Append each line to the transcript as a system line
fn show_system<F: ChatFrontend + ?Sized>(ui: &mut F, lines: &[String]) {
    for line in lines {
        ui.append(line, LineStyle::System);
    }
}

/// Banner label for the knowledge store, flagging an unreadable one
async fn store_label(repository: &dyn KnowledgeRepository, location: &str) -> String {
    match repository.count().await {
        Ok(count) => format!("{} ({} entradas)", location, count),
        Err(e) => {
            debug!("Knowledge store count failed: {}", e);
            format!("⚠ no disponible ({})", location)
        }
    }
}

fn clear_screen() {
    let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
}

/// Animated "escribiendo..." indicator
fn create_typing_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.dim} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("🤖 escribiendo...");
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// What the input thread hands back for each requested line
#[derive(Debug, PartialEq)]
enum InputEvent {
    Line(String),
    Interrupted,
    Closed,
}

/// Line editor running on a dedicated thread, one line per request
struct LineInput {
    requests: std_mpsc::Sender<String>,
    events: mpsc::UnboundedReceiver<InputEvent>,
}

impl LineInput {
    fn spawn() -> Self {
        let (requests, request_rx) = std_mpsc::channel::<String>();
        let (event_tx, events) = mpsc::unbounded_channel();
        std::thread::spawn(move || read_lines(request_rx, event_tx));
        Self { requests, events }
    }

    /// Ask the thread to read one line with `prompt`
    fn request(&self, prompt: &str) {
        if self.requests.send(prompt.to_string()).is_err() {
            debug!("Input thread already finished");
        }
    }

    async fn next(&mut self) -> InputEvent {
        self.events.recv().await.unwrap_or(InputEvent::Closed)
    }

    async fn read_line(&mut self, prompt: &str) -> InputEvent {
        self.request(prompt);
        self.next().await
    }
}

fn read_lines(requests: std_mpsc::Receiver<String>, events: mpsc::UnboundedSender<InputEvent>) {
    let config = rustyline::Config::builder()
        .completion_type(rustyline::CompletionType::List)
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();

    let mut rl = match rustyline::Editor::<ChatHelper, rustyline::history::DefaultHistory>::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            error!("Line editor unavailable: {}", e);
            let _ = events.send(InputEvent::Closed);
            return;
        }
    };
    rl.set_helper(Some(ChatHelper::new()));

    while let Ok(prompt) = requests.recv() {
        let event = match rl.readline(&prompt) {
            Ok(line) => InputEvent::Line(line),
            Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
            Err(ReadlineError::Eof) => InputEvent::Closed,
            Err(e) => {
                warn!("Input error: {}", e);
                InputEvent::Closed
            }
        };

        let closed = event == InputEvent::Closed;
        if events.send(event).is_err() || closed {
            break;
        }
    }
}

/// The terminal as a chat window
struct TerminalFrontend {
    input: LineInput,
    spinner: Option<ProgressBar>,
}

impl TerminalFrontend {
    fn new() -> Self {
        Self {
            input: LineInput::spawn(),
            spinner: None,
        }
    }
}

#[async_trait]
impl ChatFrontend for TerminalFrontend {
    fn append(&mut self, line: &str, style: LineStyle) {
        match style {
            LineStyle::User => {
                // Replace the raw prompt line with the transcript echo
                let _ = execute!(io::stdout(), MoveToPreviousLine(1), Clear(ClearType::CurrentLine));
                print_colored("👤 Tú: ", Color::Green);
                println!("{}", line);
            }
            LineStyle::Bot => {
                print_colored("🤖 Bot: ", Color::Blue);
                println!("{}", line);
                println!();
            }
            LineStyle::System => {
                print_dim(&format!("{}\n", line));
            }
            LineStyle::Error => {
                print_colored(&format!("🤖 Bot: {}\n\n", line), Color::Red);
            }
        }
    }

    fn typing_started(&mut self) {
        if self.spinner.is_none() {
            self.spinner = Some(create_typing_spinner());
        }
    }

    fn typing_finished(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    async fn learning_prompt(&mut self, question: &str) -> Option<String> {
        print_colored("🎓 Aprendizaje\n", Color::Magenta);
        println!("  ¿Quieres guardar esta conversación en la base de conocimiento?");
        println!("  Pregunta: {}", question);
        print_dim("  Escribe la respuesta ideal (Enter vacío para omitir)\n");

        match self.input.read_line(LEARNING_PROMPT).await {
            InputEvent::Line(answer) if !answer.trim().is_empty() => Some(answer),
            _ => {
                print_dim("  Omitido.\n\n");
                None
            }
        }
    }
}

/// Start the interactive chat; `ephemeral` keeps learned answers in memory only
pub async fn run_interactive(ephemeral: bool) -> Result<()> {
    let config = Config::load()?;

    let (repository, location): (Arc<dyn KnowledgeRepository>, String) = if ephemeral {
        (Arc::new(VolatileKnowledgeStore::new()), "en memoria (efímero)".to_string())
    } else {
        (
            open_knowledge_store(&config.store.database_path).await,
            config.store.database_path.display().to_string(),
        )
    };

    let client = Arc::new(OllamaClient::from_config(&config.generation)?);
    let router = ResponseRouter::with_services(&config, repository.clone(), client.clone());

    if !io::stdin().is_terminal() {
        return run_non_interactive(router).await;
    }

    let model_online = client.is_available().await;
    let store = store_label(repository.as_ref(), &location).await;
    let learning = LearningCoordinator::new(repository, config.learning.enabled);
    let (mut executor, mut reports) =
        AsyncExecutor::new(router, learning, ExecutorSettings::from(&config.learning));
    let mut ui = TerminalFrontend::new();

    let welcome = welcome_lines(client.model(), &store, model_online);
    show_system(&mut ui, &welcome);

    let mut awaiting_line = false;
    loop {
        if executor.is_idle() && !awaiting_line {
            ui.input.request(PROMPT);
            awaiting_line = true;
        }

        tokio::select! {
            event = ui.input.next(), if awaiting_line => {
                awaiting_line = false;
                let line = match event {
                    InputEvent::Line(line) => line,
                    InputEvent::Interrupted => continue,
                    InputEvent::Closed => break,
                };

                match line.trim() {
                    "/exit" | "/quit" | "exit" | "quit" => break,
                    "/clear" => {
                        clear_screen();
                        show_system(&mut ui, &welcome);
                    }
                    "/help" => show_system(&mut ui, &help_lines()),
                    input => {
                        if executor.submit(input, &mut ui) == SubmitOutcome::Busy {
                            ui.append(BUSY_NOTICE, LineStyle::System);
                        }
                    }
                }
            }
            Some(report) = reports.recv() => {
                executor.complete(report, &mut ui).await;
            }
            else => break,
        }
    }

    print_success("¡Hasta luego! 👋\n");
    Ok(())
}

/// Piped input: answer each line in order, no learning prompt
async fn run_non_interactive(mut router: ResponseRouter) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    answer_lines(stdin, &mut router, &mut io::stdout()).await
}

/// Resolve every non-blank line of `reader`, writing one answer line each
async fn answer_lines<R, W>(reader: R, router: &mut ResponseRouter, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        let result = router.resolve(query).await;
        writeln!(out, "{}", result.display_line())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::MockGenerativeService;
    use crate::memory::UnavailableKnowledgeStore;
    use rustyline::history::DefaultHistory;

    #[derive(Default)]
    struct Transcript {
        lines: Vec<(String, LineStyle)>,
    }

    #[async_trait]
    impl ChatFrontend for Transcript {
        fn append(&mut self, line: &str, style: LineStyle) {
            self.lines.push((line.to_string(), style));
        }

        fn typing_started(&mut self) {}

        fn typing_finished(&mut self) {}

        async fn learning_prompt(&mut self, _question: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_slash_command_completion() {
        let helper = ChatHelper::new();
        let history = DefaultHistory::new();
        let ctx = rustyline::Context::new(&history);

        let (pos, matches) = helper.complete("/cl", 3, &ctx).unwrap();
        assert_eq!(pos, 3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].replacement, "ear");

        let (_, matches) = helper.complete("hola", 4, &ctx).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_slash_command_hint() {
        let helper = ChatHelper::new();
        let history = DefaultHistory::new();
        let ctx = rustyline::Context::new(&history);

        assert_eq!(helper.hint("/he", 3, &ctx), Some("lp".to_string()));
        assert_eq!(helper.hint("/help", 5, &ctx), None);
        assert_eq!(helper.hint("qué hora", 8, &ctx), None);
    }

    #[test]
    fn test_welcome_banner_is_system_output() {
        let mut ui = Transcript::default();
        show_system(&mut ui, &welcome_lines("llama3.2:1b", "knowledge.db (3 entradas)", false));

        assert!(!ui.lines.is_empty());
        assert!(ui.lines.iter().all(|(_, style)| *style == LineStyle::System));
        assert!(ui.lines.iter().any(|(line, _)| line.contains("llama3.2:1b")));
        assert!(ui.lines.iter().any(|(line, _)| line.contains("knowledge.db (3 entradas)")));
        assert!(ui.lines.iter().any(|(line, _)| line.contains("⚠ El servidor del modelo no responde")));

        let online = welcome_lines("llama3.2:1b", "knowledge.db", true);
        assert!(!online.iter().any(|line| line.contains("⚠")));
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_lines();
        for command in ["/help", "/clear", "/exit"] {
            assert!(help.iter().any(|line| line.contains(command)), "missing {}", command);
        }
    }

    #[tokio::test]
    async fn test_store_label_flags_unreadable_store() {
        let store = VolatileKnowledgeStore::with_entries([("hola", "qué tal")]);
        assert_eq!(store_label(&store, "mem").await, "mem (1 entradas)");

        let broken = UnavailableKnowledgeStore::new("locked");
        assert_eq!(store_label(&broken, "knowledge.db").await, "⚠ no disponible (knowledge.db)");
    }

    #[tokio::test]
    async fn test_piped_lines_are_answered_in_order() {
        let mut service = MockGenerativeService::new();
        service.expect_generate().never();
        let store = Arc::new(VolatileKnowledgeStore::new());
        let mut router = ResponseRouter::with_services(&Config::default(), store, Arc::new(service));

        let input: &[u8] = b"hola\n\n   \n  gracias \n";
        let mut out = Vec::new();
        answer_lines(input, &mut router, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("¡Hola! 😊 ¿En qué puedo ayudarte hoy?"));
        assert!(lines[1].starts_with("¡De nada! 💙 Me encanta ayudarte."));
    }
}
