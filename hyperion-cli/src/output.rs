// Terminal Output
// Colored progress lines for the CLI; everything but task lines goes to stderr

const RESET: &str = "\x1b[0m";

fn paint(style: &str, text: &str) -> String {
    format!("\x1b[{}m{}{}", style, text, RESET)
}

/// Right-aligned action word followed by a message, e.g. `   Reading doc.yaml`
pub fn status(action: &str, message: &str) {
    eprintln!("{} {}", paint("1;36", &format!("{:>12}", action)), message);
}

/// Final verdict of a successful command
pub fn success(message: &str) {
    eprintln!("  {} {}", paint("1;32", "\u{2713}"), message);
}

/// Final verdict of a failed command
pub fn failure(message: &str) {
    eprintln!("  {} {}", paint("1;31", "\u{2717}"), message);
}

/// One passed validation step
pub fn check(message: &str) {
    eprintln!("  {} {}", paint("32", "\u{2713}"), message);
}

pub fn warning(message: &str) {
    eprintln!("  {} {}", paint("33", "!"), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", paint("1;31", "error:"), message);
}

pub fn info(message: &str) {
    eprintln!("  {} {}", paint("36", "i"), message);
}

/// Muted detail line (variables, debug hints)
pub fn dim(message: &str) {
    eprintln!("{}", paint("2", message));
}

/// Green completion line of a task or group
pub fn dim_success(message: &str) {
    eprintln!("{}", paint("32", message));
}

/// Red completion line of a task or group
pub fn dim_failure(message: &str) {
    eprintln!("{}", paint("31", message));
}

/// Banner opening a task group
pub fn group_header(title: &str, parallel: bool, selected: usize) {
    let mode = if parallel { "parallel" } else { "sequential" };
    eprintln!("{} '{}' ({} tasks, {})", paint("1;34", "  Group"), title, selected, mode);
}

/// Banner opening a matrix iteration
pub fn iteration(title: &str) {
    eprintln!("{} {}", paint("1;35", "  Matrix"), title);
}

/// Document header line
pub fn header(message: &str) {
    eprintln!("{}", paint("1", &format!("==> {}", message)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_and_resets() {
        assert_eq!(paint("1;32", "ok"), "\x1b[1;32mok\x1b[0m");
    }
}
