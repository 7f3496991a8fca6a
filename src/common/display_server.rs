//! Which graphical session dmoji runs in, and the helpers that fit it

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Wayland,
    X11,
    /// No session detected; X11 helpers are assumed
    Unknown,
}

impl DisplayServer {
    pub fn detect() -> Self {
        Self::classify(
            env::var("XDG_SESSION_TYPE").ok().as_deref(),
            env::var_os("WAYLAND_DISPLAY").is_some(),
            env::var_os("DISPLAY").is_some(),
        )
    }

    /// `XDG_SESSION_TYPE` wins; otherwise whichever display socket is set,
    /// Wayland first.
    fn classify(session_type: Option<&str>, wayland_display: bool, x_display: bool) -> Self {
        match session_type.map(str::to_ascii_lowercase).as_deref() {
            Some("wayland") => DisplayServer::Wayland,
            Some("x11") => DisplayServer::X11,
            _ if wayland_display => DisplayServer::Wayland,
            _ if x_display => DisplayServer::X11,
            _ => DisplayServer::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DisplayServer::Wayland => "wayland",
            DisplayServer::X11 => "x11",
            DisplayServer::Unknown => "unknown",
        }
    }

    /// Command that reads the clipboard contents from stdin.
    ///
    /// On X11 `xsel` is preferred; `xclip` is used when only it is installed.
    pub fn clipboard_set_command(&self) -> (&'static str, Vec<&'static str>) {
        match self {
            DisplayServer::Wayland => ("wl-copy", vec![]),
            DisplayServer::X11 | DisplayServer::Unknown => {
                if which::which("xsel").is_err() && which::which("xclip").is_ok() {
                    ("xclip", vec!["-selection", "clipboard", "-i"])
                } else {
                    ("xsel", vec!["--input", "--clipboard"])
                }
            }
        }
    }

    /// Command that types its last argument into the focused window.
    pub fn type_command(&self) -> (&'static str, Vec<&'static str>) {
        match self {
            DisplayServer::Wayland => ("wtype", vec!["--"]),
            DisplayServer::X11 | DisplayServer::Unknown => {
                ("xdotool", vec!["type", "--clearmodifiers", "--"])
            }
        }
    }
}
