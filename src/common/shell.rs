//! Helper commands are configured as shell-like strings (`"rofi -dmenu -i"`)
//! and logged back in the same form.

use anyhow::{Context, Result, bail};

/// Render a program and its arguments as one copy-pasteable line.
pub fn command_line(program: &str, args: &[String]) -> String {
    shell_words::join(std::iter::once(program).chain(args.iter().map(String::as_str)))
}

/// Split a configured command string into program and arguments.
pub fn split_command(command: &str) -> Result<(String, Vec<String>)> {
    let mut words = shell_words::split(command)
        .with_context(|| format!("parsing command line `{command}`"))?;
    if words.is_empty() {
        bail!("command line is empty");
    }
    let program = words.remove(0);
    Ok((program, words))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let args = vec!["type".to_string(), "--".to_string(), "😀 x".to_string()];
        assert_eq!(command_line("xdotool", &args), "xdotool type -- '😀 x'");
        assert_eq!(command_line("wl-copy", &[]), "wl-copy");
    }

    #[test]
    fn test_command_line_round_trips_quotes() {
        let args = vec!["-p".to_string(), "it's".to_string()];
        let line = command_line("rofi", &args);
        let (program, parsed) = split_command(&line).unwrap();
        assert_eq!(program, "rofi");
        assert_eq!(parsed, args);
    }

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("rofi -dmenu -p 'pick one'").unwrap();
        assert_eq!(program, "rofi");
        assert_eq!(args, vec!["-dmenu", "-p", "pick one"]);
    }

    #[test]
    fn test_split_command_rejects_empty() {
        assert!(split_command("   ").is_err());
        assert!(split_command("dmenu 'unterminated").is_err());
    }
}
