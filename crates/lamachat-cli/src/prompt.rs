use std::io::{self, BufRead, Write};

pub fn read_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Only an explicit `y` or `yes` counts as agreement.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn confirm(question: &str) -> io::Result<bool> {
    let answer = read_line(&format!("{question} (yes/no) "))?;
    Ok(is_yes(&answer))
}
