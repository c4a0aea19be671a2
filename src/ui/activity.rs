/// Terminal-style activity log shown over the result panel while a request
/// is in flight. The last line gets an animated "..." driven by `tick`.

/// Longest prompt excerpt echoed into the log
const PROMPT_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Default)]
pub struct ActivityLog {
    lines: Vec<String>,
    ticks: usize,
    visible: bool,
}

impl ActivityLog {
    /// Clear and show the log for a new request
    pub fn start(&mut self, model: &str, prompt: &str) {
        self.lines.clear();
        self.ticks = 0;
        self.visible = true;
        self.push(format!("Model   : {model}"));
        self.push(format!("Prompt  : {}", excerpt(prompt)));
        self.push("─".repeat(38));
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Advance the ellipsis animation
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Current log text with the animated last line
    pub fn render(&self) -> String {
        let Some((last, earlier)) = self.lines.split_last() else {
            return String::new();
        };
        let dots = ".".repeat(self.ticks % 3 + 1);
        let base = last.trim_end_matches(['.', ' ']);

        let mut out = earlier.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(base);
        out.push_str(&dots);
        out
    }
}

fn excerpt(prompt: &str) -> String {
    if prompt.chars().count() > PROMPT_PREVIEW_CHARS {
        let mut short: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        short.push('…');
        short
    } else {
        prompt.to_string()
    }
}
