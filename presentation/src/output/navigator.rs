//! Navigation for the terminal

use colored::Colorize;
use roundtable_application::ports::navigator::Navigator;
use std::sync::Mutex;

/// Prints where a browser would have navigated to and remembers it.
#[derive(Default)]
pub struct ConsoleNavigator {
    quiet: bool,
    location: Mutex<Option<String>>,
}

impl ConsoleNavigator {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            location: Mutex::new(None),
        }
    }

    /// Path of the last navigation, e.g. `/chat/why-rust-1`.
    pub fn location(&self) -> Option<String> {
        self.location.lock().ok()?.clone()
    }
}

impl Navigator for ConsoleNavigator {
    fn invalidate_thread_lists(&self) {}

    fn navigate_to_thread(&self, thread_id: &str, slug: &str) {
        let path = format!("/chat/{}", slug);
        if !self.quiet {
            eprintln!("{} {} ({})", "->".cyan(), path.bold(), thread_id.dimmed());
        }
        if let Ok(mut location) = self.location.lock() {
            *location = Some(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remembers_last_location() {
        let navigator = ConsoleNavigator::new(true);
        assert_eq!(navigator.location(), None);
        navigator.navigate_to_thread("thread-1", "why-rust-1");
        assert_eq!(navigator.location().as_deref(), Some("/chat/why-rust-1"));
    }
}
