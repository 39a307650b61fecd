//! The line-oriented command language accepted by `ft run` and `ft shell`.

use std::fmt;

use anyhow::{bail, Context};

/// One parsed script command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Init,
    Destroy,
    Mkdir(String),
    Touch(String, Option<String>),
    Rmdir(String),
    Rm(String),
    Cat(String),
    Put(String, Option<String>),
    Stat(String),
    Test(Probe, String),
    Print,
    Check,
}

/// What `test` asks about a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    Directory,
    File,
}

impl Step {
    /// Returns `true` for commands that manage the tree's lifecycle.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Init | Self::Destroy)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Destroy => write!(f, "destroy"),
            Self::Mkdir(path) => write!(f, "mkdir {path}"),
            Self::Touch(path, _) => write!(f, "touch {path}"),
            Self::Rmdir(path) => write!(f, "rmdir {path}"),
            Self::Rm(path) => write!(f, "rm {path}"),
            Self::Cat(path) => write!(f, "cat {path}"),
            Self::Put(path, _) => write!(f, "put {path}"),
            Self::Stat(path) => write!(f, "stat {path}"),
            Self::Test(Probe::Directory, path) => write!(f, "test -d {path}"),
            Self::Test(Probe::File, path) => write!(f, "test -f {path}"),
            Self::Print => write!(f, "print"),
            Self::Check => write!(f, "check"),
        }
    }
}

/// Parse a single line. Blank lines and `#` comments yield `None`.
///
/// Contents for `touch` and `put` are the remaining words joined by single
/// spaces.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Step>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let mut path = || {
        words
            .next()
            .map(str::to_string)
            .with_context(|| format!("`{command}` needs a path"))
    };

    let step = match command {
        "init" => Step::Init,
        "destroy" => Step::Destroy,
        "print" => Step::Print,
        "check" => Step::Check,
        "mkdir" => Step::Mkdir(path()?),
        "rmdir" => Step::Rmdir(path()?),
        "rm" => Step::Rm(path()?),
        "cat" => Step::Cat(path()?),
        "stat" => Step::Stat(path()?),
        "touch" => {
            let path = path()?;
            Step::Touch(path, rest(&mut words))
        }
        "put" => {
            let path = path()?;
            Step::Put(path, rest(&mut words))
        }
        "test" => {
            let probe = match words.next() {
                Some("-d") => Probe::Directory,
                Some("-f") => Probe::File,
                Some(flag) => bail!("unknown test flag `{flag}`, expected -d or -f"),
                None => bail!("`test` needs -d or -f"),
            };
            let path = words
                .next()
                .map(str::to_string)
                .context("`test` needs a path")?;
            Step::Test(probe, path)
        }
        other => bail!("unknown command `{other}`"),
    };

    if !matches!(step, Step::Touch(..) | Step::Put(..)) && words.next().is_some() {
        bail!("too many arguments for `{command}`");
    }
    Ok(Some(step))
}

fn rest<'a>(words: &mut impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = words.collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Step {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn skips_blank_and_comments() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# a comment").unwrap(), None);
        assert_eq!(parse_line("  # indented").unwrap(), None);
    }

    #[test]
    fn parses_path_commands() {
        assert_eq!(parse("mkdir /a/b"), Step::Mkdir("/a/b".into()));
        assert_eq!(parse("rmdir /a"), Step::Rmdir("/a".into()));
        assert_eq!(parse("rm /a/f"), Step::Rm("/a/f".into()));
        assert_eq!(parse("cat /a/f"), Step::Cat("/a/f".into()));
        assert_eq!(parse("  stat   /a  "), Step::Stat("/a".into()));
        assert_eq!(parse("init"), Step::Init);
        assert_eq!(parse("print"), Step::Print);
    }

    #[test]
    fn contents_join_remaining_words() {
        assert_eq!(
            parse("touch /a/f hello   big world"),
            Step::Touch("/a/f".into(), Some("hello big world".into()))
        );
        assert_eq!(parse("touch /a/f"), Step::Touch("/a/f".into(), None));
        assert_eq!(
            parse("put /a/f x"),
            Step::Put("/a/f".into(), Some("x".into()))
        );
    }

    #[test]
    fn parses_test_flags() {
        assert_eq!(parse("test -d /a"), Step::Test(Probe::Directory, "/a".into()));
        assert_eq!(parse("test -f /a/f"), Step::Test(Probe::File, "/a/f".into()));
        assert!(parse_line("test -x /a").is_err());
        assert!(parse_line("test -d").is_err());
    }

    #[test]
    fn rejects_bad_lines() {
        let err = parse_line("frobnicate /a").unwrap_err();
        assert_eq!(err.to_string(), "unknown command `frobnicate`");
        let err = parse_line("mkdir").unwrap_err();
        assert_eq!(err.to_string(), "`mkdir` needs a path");
        assert!(parse_line("mkdir /a /b").is_err());
        assert!(parse_line("print now").is_err());
    }

    #[test]
    fn display_round_trips_command_word() {
        assert_eq!(parse("test -f /x").to_string(), "test -f /x");
        assert_eq!(parse("touch /x data").to_string(), "touch /x");
        assert!(Step::Init.is_lifecycle());
        assert!(!parse("mkdir /x").is_lifecycle());
    }
}
