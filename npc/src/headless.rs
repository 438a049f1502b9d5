//! Headless mode for the NPC companion.
//!
//! A line-oriented protocol on stdin:
//! - Lines starting with `#` are commands (chat, goto, wait, status, ...)
//! - Any other line is said to the NPC while the chat is open
//!
//! Output lines are tagged (`[NPC]`, `[STATUS]`, `[ERROR]`, ...) so scripts can
//! parse them.

use npc_core::{AgentController, ChatSurface, DialogueSession, Vec3};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Seconds advanced per simulation step.
const TICK: f32 = 0.1;

/// Default number of messages shown by `#history`.
const HISTORY_DEFAULT: usize = 10;

/// Longest single `#wait`, in seconds.
const MAX_WAIT: f32 = 600.0;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Chat,
    Goto { x: f32, z: f32 },
    Wait(f32),
    Status,
    Objects,
    History(usize),
    Reset,
    Say(String),
    Invalid(String),
}

/// Parse one non-empty, trimmed input line.
pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix('#') else {
        return Command::Say(line.to_string());
    };

    let parts: Vec<&str> = rest.split_whitespace().collect();
    match parts.as_slice() {
        ["help"] => Command::Help,
        ["quit"] | ["exit"] => Command::Quit,
        ["chat"] => Command::Chat,
        ["goto", x, z] => match (x.parse(), z.parse()) {
            (Ok(x), Ok(z)) => Command::Goto { x, z },
            _ => Command::Invalid("Usage: #goto <x> <z>".to_string()),
        },
        ["wait", secs] => match secs.parse::<f32>() {
            Ok(secs) if (0.0..=MAX_WAIT).contains(&secs) => Command::Wait(secs),
            _ => Command::Invalid(format!("Usage: #wait <seconds> (0 to {MAX_WAIT:.0})")),
        },
        ["wait"] => Command::Wait(1.0),
        ["status"] => Command::Status,
        ["objects"] => Command::Objects,
        ["history"] => Command::History(HISTORY_DEFAULT),
        ["history", n] => match n.parse() {
            Ok(n) => Command::History(n),
            Err(_) => Command::Invalid("Usage: #history [count]".to_string()),
        },
        ["reset"] => Command::Reset,
        _ => Command::Invalid(format!("Unknown command: {line}")),
    }
}

/// The player, one NPC, and the chat input between them.
pub struct Scene {
    agent: AgentController,
    chat: ChatSurface,
    player: Vec3,
    clock: f64,
}

impl Scene {
    pub fn new(agent: AgentController, chat: ChatSurface, player: Vec3) -> Self {
        Self {
            agent,
            chat,
            player,
            clock: 0.0,
        }
    }

    fn distance(&self) -> f32 {
        self.player.distance(self.agent.position())
    }

    /// Advance the simulation by `seconds`. Returns bubble lines that
    /// appeared along the way.
    fn advance(&mut self, seconds: f32) -> Vec<String> {
        let mut said = Vec::new();
        let mut last = self.visible_bubble();
        let steps = (seconds / TICK).round() as u32;

        for _ in 0..steps {
            self.agent.tick(TICK, Some(self.player));
            self.clock += f64::from(TICK);
            self.check_chat_distance();

            let now = self.visible_bubble();
            if now != last {
                if let Some(text) = &now {
                    said.push(text.clone());
                }
                last = now;
            }
        }
        said
    }

    /// Move the player. Refused while the chat input has focus.
    fn move_player(&mut self, x: f32, z: f32) -> bool {
        if self.chat.is_typing() {
            return false;
        }
        self.player = Vec3::new(x, 0.0, z);
        true
    }

    fn check_chat_distance(&mut self) -> bool {
        if self.chat.should_auto_close(self.distance()) {
            self.chat.hide();
            return true;
        }
        false
    }

    fn objects_line(&self) -> String {
        let names = self.agent.nearby_objects();
        let far = self.agent.world().objects().len() - names.len();
        match (names.is_empty(), far) {
            (true, _) => "(none nearby)".to_string(),
            (false, 0) => names.join(", "),
            (false, far) => format!("{} (+{far} out of reach)", names.join(", ")),
        }
    }

    fn visible_bubble(&self) -> Option<String> {
        let bubble = self.agent.bubble();
        bubble.is_visible().then(|| bubble.text().to_string())
    }

    fn status_line(&self) -> String {
        format!(
            "{} at {} ({}), player at {}, distance {:.1}, chat {}",
            self.agent.personality().name,
            self.agent.position(),
            self.agent.state(),
            self.player,
            self.distance(),
            if self.chat.is_open() { "open" } else { "closed" },
        )
    }
}

fn print_help() {
    println!("Commands:");
    println!("  #chat          - Open or close the chat (must be near the NPC)");
    println!("  #goto <x> <z>  - Move the player (not while chatting)");
    println!("  #wait [secs]   - Let time pass (default 1s, max 600s)");
    println!("  #status        - Show positions and NPC state");
    println!("  #objects       - List objects near the NPC");
    println!("  #history [n]   - Show the last n messages");
    println!("  #reset         - Forget the conversation");
    println!("  #quit          - Exit");
    println!("  #help          - Show this help");
    println!("Anything else is said to the NPC while the chat is open.");
}

/// Run the REPL until `#quit` or end of input.
pub async fn run_headless(mut scene: Scene, mut session: DialogueSession) -> anyhow::Result<()> {
    println!("=== NPC Headless Mode ===");
    println!("[STATUS] {}", scene.status_line());
    if let Some(text) = scene.visible_bubble() {
        println!("[NPC] {text}");
    }
    println!();
    print_help();
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => print_help(),
            Command::Chat => {
                let reach = scene.agent.config().detection_radius;
                if !scene.chat.is_open() && scene.distance() > reach {
                    println!("[ERROR] Too far away. Walk within {reach:.0} units first.");
                } else {
                    let id = scene.agent.id().clone();
                    match scene.chat.toggle(&id, scene.clock) {
                        Some(true) => println!("[CHAT] Open. Type to talk."),
                        Some(false) => println!("[CHAT] Closed."),
                        None => println!("[CHAT] Not so fast. Try again in a moment."),
                    }
                }
            }
            Command::Goto { x, z } => {
                if scene.move_player(x, z) {
                    println!("[MOVED] Player at {}", scene.player);
                } else {
                    println!("[INFO] You can't move while typing. Type #chat to close the chat.");
                }
            }
            Command::Wait(seconds) => {
                for text in scene.advance(seconds) {
                    println!("[NPC] {text}");
                }
                println!("[STATUS] {}", scene.status_line());
            }
            Command::Status => {
                println!("[STATUS] {}", scene.status_line());
                match scene.visible_bubble() {
                    Some(text) => println!("[BUBBLE] {text}"),
                    None => println!("[BUBBLE] (hidden)"),
                }
            }
            Command::Objects => println!("[OBJECTS] {}", scene.objects_line()),
            Command::History(count) => {
                let recent = session.recent(scene.agent.id(), count);
                if recent.is_empty() {
                    println!("[HISTORY] (empty)");
                }
                for message in recent {
                    let calls: Vec<&str> =
                        message.tool_calls.iter().map(|c| c.name.as_str()).collect();
                    match (message.text(), calls.is_empty()) {
                        (Some(text), true) => println!("[HISTORY] {}: {text}", message.role),
                        (Some(text), false) => println!(
                            "[HISTORY] {}: {text} [calls: {}]",
                            message.role,
                            calls.join(", ")
                        ),
                        (None, _) => {
                            println!("[HISTORY] {}: [calls: {}]", message.role, calls.join(", "))
                        }
                    }
                }
            }
            Command::Reset => {
                let id = scene.agent.id().clone();
                let personality = scene.agent.personality().clone();
                session.reset(&id, &personality);
                println!("[RESET] Conversation cleared.");
            }
            Command::Say(text) => {
                if !scene.chat.is_open() {
                    println!("[INFO] Chat is closed. Walk up to the NPC and type #chat.");
                    continue;
                }
                let started = std::time::Instant::now();
                match session.converse(&mut scene.chat, &mut scene.agent, &text).await {
                    Ok(reply) => {
                        println!("[NPC] {}", scene.agent.bubble_text());
                        if reply.close_chat() {
                            println!("[CHAT] Closed.");
                        }
                    }
                    Err(e) => println!("[ERROR] {e}"),
                }
                // Real time spent waiting on the model passes in the scene too.
                let elapsed = started.elapsed().min(Duration::from_secs(5));
                for text in scene.advance(elapsed.as_secs_f32()) {
                    println!("[NPC] {text}");
                }
            }
            Command::Invalid(message) => println!("[ERROR] {message}"),
        }

        stdout.flush().ok();
    }

    Ok(())
}
