//! Output formatting

pub mod console;
pub mod formatter;
pub mod navigator;
pub mod view;

pub use console::ConsoleFormatter;
pub use formatter::OutputFormatter;
pub use navigator::ConsoleNavigator;
pub use view::{AnswerView, RoundView, SearchView};
