#![deny(missing_docs)]

//! Command line entry point: drag one or more files into another application.
use std::path::{Path, PathBuf};

use filedrag::config::{self, DragSettings};
use filedrag::{DragError, logging, run_native_drag};

const USAGE: &str = "Usage: filedrag <file1> [file2 ...]";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };
    let files = match command {
        Command::Help => {
            println!("{}", help_text());
            return;
        }
        Command::Version => {
            println!("filedrag {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Command::Drag(files) => files,
    };
    if let Err(err) = run(files) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(files: Vec<PathBuf>) -> Result<(), String> {
    let settings = config::load_or_default().unwrap_or_else(|err| {
        eprintln!("Using default settings: {err}");
        DragSettings::default()
    });
    if let Err(err) = logging::init(&settings.log_level) {
        eprintln!("Logging disabled: {err}");
    }

    let paths = resolve_paths(&files, &settings)?;
    let effect = run_native_drag(&paths).map_err(|err: DragError| err.to_string())?;
    println!("Drag-drop completed with effect: {effect}");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Version,
    Drag(Vec<PathBuf>),
}

fn parse_args(args: Vec<String>) -> Result<Command, String> {
    let mut files = Vec::new();
    let mut options_done = false;
    for arg in args {
        if options_done {
            files.push(PathBuf::from(arg));
            continue;
        }
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--" => options_done = true,
            unknown if unknown.starts_with("--") => {
                return Err(format!("Unknown argument: {unknown}"));
            }
            _ => files.push(PathBuf::from(arg)),
        }
    }
    if files.is_empty() {
        return Err("No files given".to_string());
    }
    Ok(Command::Drag(files))
}

fn help_text() -> String {
    [
        USAGE,
        "",
        "Starts a shell drag of the given files; drop them onto any window that",
        "accepts files (Explorer, mail clients, ...). Release the mouse button to",
        "drop, press Escape to cancel.",
        "",
        "Options:",
        "  -h, --help     Show this help",
        "  -V, --version  Show the version",
        "  --             Treat the remaining arguments as file names",
    ]
    .join("\n")
}

/// Make every path absolute and convert it to the string form the shell needs.
fn resolve_paths(files: &[PathBuf], settings: &DragSettings) -> Result<Vec<String>, String> {
    files
        .iter()
        .map(|file| resolve_path(file, settings))
        .collect()
}

fn resolve_path(file: &Path, settings: &DragSettings) -> Result<String, String> {
    if !file.exists() {
        if settings.require_existing {
            return Err(format!("File not found: {}", file.display()));
        }
        tracing::warn!("Dragging missing file {}", file.display());
    }
    let absolute = if settings.canonicalize_paths && file.exists() {
        file.canonicalize()
    } else {
        std::path::absolute(file)
    }
    .map_err(|err| format!("Failed to resolve {}: {err}", file.display()))?;
    absolute
        .into_os_string()
        .into_string()
        .map_err(|raw| format!("Path is not valid Unicode: {}", PathBuf::from(raw).display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn missing_arguments_are_an_error() {
        assert!(parse_args(Vec::new()).is_err());
        assert!(parse_args(args(&["--"])).is_err());
    }

    #[test]
    fn collects_files_in_order() {
        assert_eq!(
            parse_args(args(&["b.txt", "a.txt", "--", "--odd-name"])).unwrap(),
            Command::Drag(vec![
                PathBuf::from("b.txt"),
                PathBuf::from("a.txt"),
                PathBuf::from("--odd-name"),
            ])
        );
    }

    #[test]
    fn help_and_unknown_flags() {
        assert_eq!(parse_args(args(&["a", "--help"])).unwrap(), Command::Help);
        assert_eq!(parse_args(args(&["-V"])).unwrap(), Command::Version);
        assert!(parse_args(args(&["--bogus", "a"])).is_err());
    }

    #[test]
    fn relative_paths_become_absolute() {
        let settings = DragSettings::default();
        let resolved = resolve_path(Path::new("some/relative.txt"), &settings).unwrap();
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("relative.txt"));
    }

    #[test]
    fn require_existing_rejects_missing_files() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.wav");
        std::fs::write(&present, b"RIFF").unwrap();
        let settings = DragSettings {
            require_existing: true,
            canonicalize_paths: true,
            ..DragSettings::default()
        };
        assert!(resolve_path(&present, &settings).is_ok());
        assert!(resolve_path(&dir.path().join("absent.wav"), &settings).is_err());
    }
}
