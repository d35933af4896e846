// clipboard.rs - OS clipboard access with a stdin/stdout fallback.
//
// arboard fails to construct on headless machines (no display server, SSH
// sessions, CI). Callers treat that as "no clipboard" and fall back to the
// standard streams instead of failing the command.

use std::io::{self, Read, Write};

use anyhow::Context;

/// Where bundle text was read from or delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Clipboard,
    Stdout,
    Stdin,
    File,
}

/// Put `text` on the clipboard, or print it when no clipboard is available.
pub fn deliver(text: &str, force_stdout: bool) -> anyhow::Result<Channel> {
    if !force_stdout {
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string())) {
            Ok(()) => return Ok(Channel::Clipboard),
            Err(e) => tracing::warn!("clipboard unavailable ({}); writing bundle to stdout", e),
        }
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(Channel::Stdout)
}

/// Read bundle text from the clipboard, or from stdin when no clipboard is
/// available.
pub fn receive(force_stdin: bool) -> anyhow::Result<(String, Channel)> {
    if !force_stdin {
        match arboard::Clipboard::new().and_then(|mut cb| cb.get_text()) {
            Ok(text) => return Ok((text, Channel::Clipboard)),
            Err(arboard::Error::ContentNotAvailable) => {
                return Ok((String::new(), Channel::Clipboard))
            }
            Err(e) => tracing::warn!("clipboard unavailable ({}); reading bundle from stdin", e),
        }
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read bundle from stdin")?;
    Ok((text, Channel::Stdin))
}
