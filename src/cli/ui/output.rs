use console::style;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Label and value on one line
    pub fn field(&self, label: &str, value: &str) {
        println!("  {:<22} {}", style(label).dim(), value);
    }

    /// 0-100 score colored by band
    pub fn score(&self, label: &str, score: u8) {
        let rendered = format!("{:>3}/100", score);
        let colored = match score {
            80..=100 => style(rendered).green(),
            60..=79 => style(rendered).cyan(),
            40..=59 => style(rendered).yellow(),
            _ => style(rendered).red(),
        };
        println!("  {:<22} {}", style(label).dim(), colored);
    }

    pub fn bullet(&self, message: &str) {
        println!("  • {}", message);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
