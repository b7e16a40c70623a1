//! Serialized report output shared by the driver and worker threads.

use std::io::Write;
use std::sync::Mutex;

enum Sink {
    Stdout,
    #[cfg(test)]
    Capture(Vec<String>),
}

/// Line-oriented output guarded by its own lock.
///
/// Independent of the task queue lock; no thread ever holds both.
pub struct Console {
    sink: Mutex<Sink>,
}

impl Console {
    /// Console writing to process stdout.
    pub fn stdout() -> Self {
        Self {
            sink: Mutex::new(Sink::Stdout),
        }
    }

    /// Console collecting lines in memory.
    #[cfg(test)]
    pub fn capture() -> Self {
        Self {
            sink: Mutex::new(Sink::Capture(Vec::new())),
        }
    }

    /// Emit one whole line; concurrent callers never interleave.
    pub fn line(&self, text: impl AsRef<str>) {
        let mut guard = self.sink.lock().expect("console mutex poisoned");
        match &mut *guard {
            Sink::Stdout => {
                let mut out = std::io::stdout().lock();
                // A closed stdout is not worth aborting a run over.
                let _ = writeln!(out, "{}", text.as_ref());
                let _ = out.flush();
            }
            #[cfg(test)]
            Sink::Capture(lines) => lines.push(text.as_ref().to_string()),
        }
    }

    /// Lines collected so far; empty for the stdout sink.
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        let guard = self.sink.lock().expect("console mutex poisoned");
        match &*guard {
            Sink::Stdout => Vec::new(),
            Sink::Capture(lines) => lines.clone(),
        }
    }
}
