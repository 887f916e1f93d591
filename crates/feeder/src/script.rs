use anyhow::{anyhow, bail};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cmd {
    /// Move to a point. Without a feed rate, the default one is used.
    MoveTo { x: f64, y: f64, feed: Option<f64> },
    PenUp,
    PenDown,
    Quit,
}

fn number(word: Option<&str>, what: &str) -> anyhow::Result<f64> {
    let word = word.ok_or_else(|| anyhow!("missing {what}"))?;
    word.parse()
        .map_err(|_| anyhow!("expected a number for {what}, found \"{word}\""))
}

/// Parses one line of commands. Blank lines and comments (starting with `#`)
/// give `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Cmd>> {
    let line = line.split('#').next().unwrap_or("");
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    let cmd = match first {
        "move" => {
            let x = number(words.next(), "x")?;
            let y = number(words.next(), "y")?;
            let feed = words.next().map(|w| number(Some(w), "feed")).transpose()?;
            Cmd::MoveTo { x, y, feed }
        }
        "pen" => match words.next() {
            Some("up") => Cmd::PenUp,
            Some("down") => Cmd::PenDown,
            _ => bail!("expected \"pen up\" or \"pen down\""),
        },
        "quit" => Cmd::Quit,
        _ => bail!("unknown command \"{first}\""),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected \"{extra}\" after command");
    }
    Ok(Some(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        assert_eq!(
            parse_line("move 10 -2.5").unwrap(),
            Some(Cmd::MoveTo {
                x: 10.0,
                y: -2.5,
                feed: None
            })
        );
        assert_eq!(
            parse_line("  move 0 0 1500 # back home").unwrap(),
            Some(Cmd::MoveTo {
                x: 0.0,
                y: 0.0,
                feed: Some(1500.0)
            })
        );
        assert_eq!(parse_line("pen down").unwrap(), Some(Cmd::PenDown));
        assert_eq!(parse_line("pen up").unwrap(), Some(Cmd::PenUp));
        assert_eq!(parse_line("quit").unwrap(), Some(Cmd::Quit));
    }

    #[test]
    fn blank_and_comments() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# just a comment").unwrap(), None);
    }

    #[test]
    fn errors() {
        assert!(parse_line("move 10").is_err());
        assert!(parse_line("move ten 10").is_err());
        assert!(parse_line("move 1 2 3 4").is_err());
        assert!(parse_line("pen sideways").is_err());
        assert!(parse_line("jump").is_err());
    }
}
