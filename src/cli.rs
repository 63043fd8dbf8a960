//! Command-line argument parsing for the highlighter
//!
//! Supports:
//! - Highlighting a file or stdin
//! - Language detection from the file extension
//! - Listing themes and languages
//! - Extra language manifests

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tree-sitter syntax highlighting to HTML
#[derive(Parser, Debug)]
#[command(name = "treelight", version, about = "Tree-sitter syntax highlighting to HTML")]
pub struct CliArgs {
    /// File to highlight (reads stdin when omitted or "-")
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Language id (detected from the file extension when omitted)
    #[arg(short, long, value_name = "ID")]
    pub language: Option<String>,

    /// Theme id (falls back to the configured default)
    #[arg(short, long, value_name = "ID")]
    pub theme: Option<String>,

    /// Fail instead of printing unhighlighted code
    #[arg(long)]
    pub strict: bool,

    /// Give up parsing after N milliseconds
    #[arg(long, value_name = "N")]
    pub timeout_ms: Option<u64>,

    /// Config file (defaults to ~/.config/treelight/config.yaml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Language manifest (YAML or JSON) to register; repeatable
    #[arg(long = "language-file", value_name = "FILE")]
    pub language_files: Vec<PathBuf>,

    /// Print registered theme ids and exit
    #[arg(long)]
    pub list_themes: bool,

    /// Print registered language ids and exit
    #[arg(long)]
    pub list_languages: bool,
}

/// Where the code comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

/// What the invocation should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListThemes,
    ListLanguages,
    Highlight { input: Input, language: String },
}

/// Options derived from CLI arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub action: Action,
    pub theme: Option<String>,
    /// `None` defers to the config file
    pub strict: Option<bool>,
    pub timeout: Option<Duration>,
    pub config: Option<PathBuf>,
    pub language_files: Vec<PathBuf>,
}

/// Map a file extension to a built-in language id
pub fn language_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let id = match ext.as_str() {
        "go" => "go",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "rs" => "rust",
        "py" | "pyi" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "sh" | "bash" => "bash",
        "php" => "php",
        _ => return None,
    };
    Some(id)
}

impl CliArgs {
    /// Convert parsed CLI args into a run configuration
    pub fn into_config(self) -> Result<RunConfig, String> {
        let action = if self.list_themes {
            Action::ListThemes
        } else if self.list_languages {
            Action::ListLanguages
        } else {
            let input = match self.path {
                None => Input::Stdin,
                Some(path) if path.as_os_str() == "-" => Input::Stdin,
                Some(path) => Input::File(path),
            };
            let language = match (self.language, &input) {
                (Some(language), _) => language,
                (None, Input::File(path)) => language_for_path(path)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        format!(
                            "Cannot detect language of {}; pass --language",
                            path.display()
                        )
                    })?,
                (None, Input::Stdin) => {
                    return Err("--language is required when reading stdin".to_string())
                }
            };
            Action::Highlight { input, language }
        };

        Ok(RunConfig {
            action,
            theme: self.theme,
            strict: self.strict.then_some(true),
            timeout: self.timeout_ms.map(Duration::from_millis),
            config: self.config,
            language_files: self.language_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(path: Option<&str>, language: Option<&str>) -> CliArgs {
        CliArgs {
            path: path.map(PathBuf::from),
            language: language.map(str::to_string),
            theme: None,
            strict: false,
            timeout_ms: None,
            config: None,
            language_files: vec![],
            list_themes: false,
            list_languages: false,
        }
    }

    #[test]
    fn test_language_detected_from_extension() {
        let config = args(Some("main.go"), None).into_config().unwrap();
        assert_eq!(
            config.action,
            Action::Highlight {
                input: Input::File(PathBuf::from("main.go")),
                language: "go".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_language_wins() {
        let config = args(Some("script.txt"), Some("bash")).into_config().unwrap();
        assert!(matches!(config.action, Action::Highlight { ref language, .. } if language == "bash"));
    }

    #[test]
    fn test_unknown_extension_is_error() {
        assert!(args(Some("notes.txt"), None).into_config().is_err());
    }

    #[test]
    fn test_stdin_requires_language() {
        assert!(args(None, None).into_config().is_err());
        let config = args(Some("-"), Some("rust")).into_config().unwrap();
        assert!(matches!(
            config.action,
            Action::Highlight {
                input: Input::Stdin,
                ..
            }
        ));
    }

    #[test]
    fn test_list_flags_skip_input() {
        let mut list = args(None, None);
        list.list_themes = true;
        assert_eq!(list.into_config().unwrap().action, Action::ListThemes);
    }

    #[test]
    fn test_strict_flag_only_overrides_when_set() {
        assert_eq!(args(Some("a.rs"), None).into_config().unwrap().strict, None);
        let mut strict = args(Some("a.rs"), None);
        strict.strict = true;
        assert_eq!(strict.into_config().unwrap().strict, Some(true));
    }

    #[test]
    fn test_timeout_in_milliseconds() {
        let mut timed = args(Some("a.go"), None);
        timed.timeout_ms = Some(250);
        assert_eq!(
            timed.into_config().unwrap().timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_extension_map() {
        assert_eq!(language_for_path(Path::new("x.HPP")), Some("cpp"));
        assert_eq!(language_for_path(Path::new("x.py")), Some("python"));
        assert_eq!(language_for_path(Path::new("x.mjs")), Some("javascript"));
        assert_eq!(language_for_path(Path::new("x.jsx")), Some("jsx"));
        assert_eq!(language_for_path(Path::new("x.ts")), Some("typescript"));
        assert_eq!(language_for_path(Path::new("x.tsx")), Some("tsx"));
        assert_eq!(language_for_path(Path::new("Makefile")), None);
    }
}
