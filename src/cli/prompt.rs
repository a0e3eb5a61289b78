//! Interactive confirmation

use std::io::{self, BufRead, Write};

/// Ask a yes/no question on stdout, reading the answer from stdin
///
/// End of input counts as the default, or "no" without one.
pub fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let stdin = io::stdin();
    confirm_with(prompt, default, &mut stdin.lock(), &mut io::stdout())
}

fn confirm_with<R: BufRead, W: Write>(
    prompt: &str,
    default: Option<bool>,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    let mut line = String::new();

    loop {
        line.clear();

        match default {
            Some(true) => write!(output, "{} (Y/n): ", prompt)?,
            Some(false) | None => write!(output, "{} (y/N): ", prompt)?,
        }
        output.flush()?;

        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(default.unwrap_or(false));
        }

        match line.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            _ => {}
        }
    }
}
