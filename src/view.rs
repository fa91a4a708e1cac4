/// Abstraction over the surface that displays one search interaction. The controller only
/// talks to this trait; the concrete surface (terminal, tests, an embedding UI) is injected
/// at construction time instead of being reached through globals.
pub trait SearchView {
    /// Blocking notification for input problems; shown before any request is made.
    fn alert(&self, message: &str);
    /// Toggles the loading indicator.
    fn set_loading(&self, visible: bool);
    /// Drops any previously rendered result blocks.
    fn clear_results(&self);
    fn show_summary(&self, summary: &str);
    fn hide_summary(&self);
    /// Opens a result block headed by the document name.
    fn begin_document(&self, name: &str);
    /// Placeholder for a document whose match list is empty.
    fn no_matches(&self);
    /// One match line: snippet, a labeled deep link, and the literal score.
    fn match_entry(&self, snippet: &str, link_label: &str, href: &str, score: f64);
    /// A single standalone block for server-reported or transport errors.
    fn error_block(&self, text: &str);
}

/// Renders one interaction to stdout. Clearing and hiding are no-ops here since a terminal
/// scrolls instead of repainting.
pub struct ConsoleView;

impl SearchView for ConsoleView {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    fn set_loading(&self, visible: bool) {
        if visible {
            println!("Searching...");
        }
    }

    fn clear_results(&self) {}

    fn show_summary(&self, summary: &str) {
        println!("\n{summary}\n");
    }

    fn hide_summary(&self) {}

    fn begin_document(&self, name: &str) {
        println!("== {name} ==");
    }

    fn no_matches(&self) {
        println!("  No pages matched in this document.");
    }

    fn match_entry(&self, snippet: &str, link_label: &str, href: &str, score: f64) {
        println!("  {snippet}");
        println!("  {link_label} -> {href} (score {score})");
    }

    fn error_block(&self, text: &str) {
        println!("{text}");
    }
}
