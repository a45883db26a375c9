//! Command-line argument parsing.

use std::path::PathBuf;

use crate::error::{CliError, CliResult};

/// Number of posts `recent` returns when `--limit` is not given.
pub const DEFAULT_RECENT_LIMIT: usize = 6;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Path given with `-c/--config`.
    pub config: Option<PathBuf>,
    /// What to do.
    pub action: Action,
}

/// Top-level action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print usage and exit.
    Help,
    /// Print the version and exit.
    Version,
    /// Run a command.
    Run(Command),
}

/// A fedview command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve a post URL or handle, whichever it turns out to be.
    Resolve {
        /// Raw identifier.
        identifier: String,
    },
    /// Resolve a post and its author.
    Post {
        /// Raw identifier.
        identifier: String,
    },
    /// Resolve an account profile.
    Profile {
        /// Raw identifier.
        identifier: String,
    },
    /// List an account's most recent posts.
    Recent {
        /// Raw handle or profile URL.
        identifier: String,
        /// Maximum number of posts.
        limit: usize,
    },
    /// Search a hashtag and resolve every hit.
    Hashtag {
        /// Tag, with or without `#`.
        tag: String,
        /// Report results chunk by chunk instead of as they settle.
        chunked: bool,
    },
    /// Print the normalized form of an identifier.
    Normalize {
        /// Raw identifier.
        identifier: String,
    },
    /// Classify a raw error message for a host.
    Classify {
        /// Host the error came from.
        host: String,
        /// Error text.
        message: String,
    },
}

impl Args {
    /// Parses the process arguments.
    pub fn from_env() -> CliResult<Self> {
        Self::parse(std::env::args().skip(1))
    }

    /// Parses arguments, not including the program name.
    pub fn parse<I, S>(args: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = None;
        let mut limit = None;
        let mut chunked = false;
        let mut positional = Vec::new();

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| CliError::usage(format!("{arg} requires a path")))?;
                    config = Some(PathBuf::from(path));
                }
                "-n" | "--limit" => {
                    let value = args
                        .next()
                        .ok_or_else(|| CliError::usage(format!("{arg} requires a number")))?;
                    let value = value
                        .parse()
                        .map_err(|_| CliError::usage(format!("invalid limit: {value}")))?;
                    limit = Some(value);
                }
                "--chunked" => chunked = true,
                "-h" | "--help" => {
                    return Ok(Self {
                        config,
                        action: Action::Help,
                    })
                }
                "-v" | "--version" => {
                    return Ok(Self {
                        config,
                        action: Action::Version,
                    })
                }
                other if other.starts_with('-') && other.len() > 1 => {
                    return Err(CliError::usage(format!("unknown argument: {other}")));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let Some(name) = positional.next() else {
            return Ok(Self {
                config,
                action: Action::Help,
            });
        };
        let rest: Vec<String> = positional.collect();

        let command = match name.as_str() {
            "resolve" => Command::Resolve {
                identifier: single(&name, rest)?,
            },
            "post" => Command::Post {
                identifier: single(&name, rest)?,
            },
            "profile" => Command::Profile {
                identifier: single(&name, rest)?,
            },
            "recent" => Command::Recent {
                identifier: single(&name, rest)?,
                limit: limit.unwrap_or(DEFAULT_RECENT_LIMIT),
            },
            "hashtag" => Command::Hashtag {
                tag: single(&name, rest)?,
                chunked,
            },
            "normalize" => Command::Normalize {
                identifier: single(&name, rest)?,
            },
            "classify" => {
                let mut rest = rest.into_iter();
                let host = rest
                    .next()
                    .ok_or_else(|| CliError::usage("classify requires <host> <message>"))?;
                let message: Vec<String> = rest.collect();
                if message.is_empty() {
                    return Err(CliError::usage("classify requires <host> <message>"));
                }
                Command::Classify {
                    host,
                    message: message.join(" "),
                }
            }
            other => return Err(CliError::usage(format!("unknown command: {other}"))),
        };

        Ok(Self {
            config,
            action: Action::Run(command),
        })
    }
}

fn single(command: &str, rest: Vec<String>) -> CliResult<String> {
    let mut rest = rest.into_iter();
    match (rest.next(), rest.next()) {
        (Some(value), None) => Ok(value),
        (None, _) => Err(CliError::usage(format!("{command} requires one argument"))),
        (Some(_), Some(extra)) => Err(CliError::usage(format!(
            "{command}: unexpected argument: {extra}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Command {
        match Args::parse(args.iter().copied()).unwrap().action {
            Action::Run(command) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_no_arguments_prints_help() {
        let args = Args::parse(Vec::<String>::new()).unwrap();
        assert_eq!(args.action, Action::Help);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(Args::parse(["-h"]).unwrap().action, Action::Help);
        assert_eq!(
            Args::parse(["post", "--version"]).unwrap().action,
            Action::Version
        );
    }

    #[test]
    fn test_config_flag() {
        let args = Args::parse(["-c", "fedview.toml", "normalize", "alice@m.example"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("fedview.toml")));
        assert!(Args::parse(["--config"]).is_err());
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            run(&["post", "https://m.example/@alice/1"]),
            Command::Post {
                identifier: "https://m.example/@alice/1".to_string()
            }
        );
        assert_eq!(
            run(&["recent", "@alice@m.example"]),
            Command::Recent {
                identifier: "@alice@m.example".to_string(),
                limit: DEFAULT_RECENT_LIMIT,
            }
        );
        assert_eq!(
            run(&["recent", "--limit", "3", "@alice@m.example"]),
            Command::Recent {
                identifier: "@alice@m.example".to_string(),
                limit: 3,
            }
        );
        assert_eq!(
            run(&["hashtag", "#rust", "--chunked"]),
            Command::Hashtag {
                tag: "#rust".to_string(),
                chunked: true,
            }
        );
        assert_eq!(
            run(&["classify", "down.example", "fetch", "failed:", "ECONNREFUSED"]),
            Command::Classify {
                host: "down.example".to_string(),
                message: "fetch failed: ECONNREFUSED".to_string(),
            }
        );
    }

    #[test]
    fn test_usage_errors() {
        assert!(matches!(
            Args::parse(["--bogus"]),
            Err(CliError::Usage { .. })
        ));
        assert!(Args::parse(["frobnicate", "x"]).is_err());
        assert!(Args::parse(["post"]).is_err());
        assert!(Args::parse(["post", "a", "b"]).is_err());
        assert!(Args::parse(["recent", "-n", "many", "@a@b.c"]).is_err());
        assert!(Args::parse(["classify", "down.example"]).is_err());
    }
}
