use std::io::Write;
use std::sync::Mutex;

use alpaca_client::chat::{GenerationState, Message, MessageStatus, Role};
use alpaca_client::{Notifier, SessionObserver, Severity};

/// Prints notices on their own line, tagged with their severity.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        println!("[{}] {message}", severity.as_str());
    }
}

#[derive(Debug, Default)]
struct RenderState {
    /// Messages already printed, the last one possibly in part.
    rendered: usize,
    /// Bytes of the last printed message already written.
    tail_len: usize,
    tail_open: bool,
}

/// Renders the thread incrementally so streamed chunks appear as they arrive.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    state: Mutex<RenderState>,
}

impl ConsoleObserver {
    /// Forgets what was printed; the next change renders the whole thread.
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = RenderState::default();
        }
    }
}

impl SessionObserver for ConsoleObserver {
    fn messages_changed(&self, messages: &[Message]) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let mut out = std::io::stdout().lock();

        let tail_shrunk = state.rendered > 0
            && messages
                .get(state.rendered - 1)
                .is_none_or(|message| message.content.len() < state.tail_len);
        if tail_shrunk {
            *state = RenderState::default();
        }

        if state.rendered > 0 {
            let tail = &messages[state.rendered - 1];
            let _ = write!(out, "{}", &tail.content[state.tail_len..]);
            state.tail_len = tail.content.len();
            if state.tail_open && !tail.is_open() {
                finish(&mut out, tail);
                state.tail_open = false;
            }
        }

        for message in &messages[state.rendered..] {
            let _ = write!(out, "{}> {}", role_label(message.role), message.content);
            if message.is_open() {
                state.tail_open = true;
            } else {
                finish(&mut out, message);
                state.tail_open = false;
            }
            state.rendered += 1;
            state.tail_len = message.content.len();
        }
        let _ = out.flush();
    }

    fn generation_changed(&self, state: GenerationState) {
        tracing::debug!(?state, "generation state changed");
    }
}

fn finish(out: &mut impl Write, message: &Message) {
    if let MessageStatus::Interrupted(reason) = &message.status {
        let _ = write!(out, " [interrupted: {reason}]");
    }
    let _ = writeln!(out);
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "you",
        Role::Assistant => "assistant",
    }
}
