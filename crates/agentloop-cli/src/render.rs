use agentloop::agent::StreamFragment;
use console::{style, Term};
use std::io;

/// Writes answer text to stdout as it streams; tool notices go to stderr, dimmed
pub struct FragmentPrinter {
    out: Term,
    notices: Term,
    wrote_text: bool,
}

impl FragmentPrinter {
    pub fn new() -> Self {
        Self {
            out: Term::stdout(),
            notices: Term::stderr(),
            wrote_text: false,
        }
    }

    pub fn print(&mut self, fragment: &StreamFragment) -> io::Result<()> {
        if fragment.is_tool_call_notice {
            self.notices
                .write_str(&style(&fragment.text).dim().to_string())?;
            return self.notices.flush();
        }

        if !fragment.text.is_empty() {
            self.out.write_str(&fragment.text)?;
            self.wrote_text = true;
        }
        if fragment.is_final && self.wrote_text {
            self.out.write_line("")?;
        }
        self.out.flush()
    }
}

impl Default for FragmentPrinter {
    fn default() -> Self {
        Self::new()
    }
}
