//! Operator command grammar and the interactive prompt loop.
//!
//! One line of input is one command: a verb plus whitespace-separated
//! arguments. Every verb maps to exactly one outbound event. Parsing is
//! a pure function ([`parse_line`]) so the grammar is testable without a
//! terminal; [`run`] is the `> ` prompt loop the binary drives.
//!
//! Errors are strictly per-command: a bad `move` argument, an unknown
//! verb, or a failed send is reported and the loop re-prompts. Only
//! end-of-input ends the loop.

use std::io::Write;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::client::CommandSender;
use crate::protocol::ClientMessage;

/// Help text printed before the first prompt.
pub const BANNER: &str = "\
=========================
GAME TEST COMMANDS:
-------------------------
move x y
ready
start
draw
draw_ok
undo
undo_ok
resign
leave
=========================";

/// A command line that could not be turned into an outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The verb is not in the grammar.
    #[error("invalid command: {0}")]
    Unknown(String),

    /// `move` was given fewer than two coordinates.
    #[error("usage: move <x> <y>")]
    MissingMoveArgument,

    /// A `move` coordinate was not an integer.
    #[error("invalid coordinate {0:?}: expected an integer")]
    BadCoordinate(String),
}

/// Parse one line of operator input.
///
/// Returns `Ok(None)` for an empty (or all-whitespace) line. Extra
/// tokens after a complete command are ignored.
///
/// # Errors
///
/// Returns a [`CommandError`] describing the bad verb or argument; no
/// event is produced in that case.
pub fn parse_line(line: &str) -> Result<Option<ClientMessage>, CommandError> {
    let mut tokens = line.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Ok(None);
    };

    let msg = match verb {
        "move" => {
            let (Some(x), Some(y)) = (tokens.next(), tokens.next()) else {
                return Err(CommandError::MissingMoveArgument);
            };
            let x = x
                .parse::<i32>()
                .map_err(|_| CommandError::BadCoordinate(x.to_string()))?;
            let y = y
                .parse::<i32>()
                .map_err(|_| CommandError::BadCoordinate(y.to_string()))?;
            ClientMessage::PlayerMove { x, y }
        }
        "ready" => ClientMessage::PlayerReady,
        "start" => ClientMessage::ForceStart,
        "draw" => ClientMessage::RequestDraw,
        "draw_ok" => ClientMessage::AcceptDraw,
        "undo" => ClientMessage::RequestUndo,
        "undo_ok" => ClientMessage::AcceptUndo,
        "resign" => ClientMessage::Resign,
        "leave" => ClientMessage::LeaveRoom,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(msg))
}

/// Run the prompt loop until `reader` reaches end-of-input.
///
/// Prints the banner, then for each line: parse, queue the event through
/// `sender`, and report any parse or send failure to the operator.
/// Diagnostics go to stderr so they do not interleave with payload
/// output on stdout.
///
/// # Errors
///
/// Returns an error only if reading input or flushing the prompt fails.
pub async fn run<R>(reader: R, sender: &CommandSender) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("{BANNER}");

    let mut lines = reader.lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            debug!("end of input, leaving command loop");
            break;
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(msg)) => {
                if let Err(e) = sender.send(msg) {
                    eprintln!("failed to send command: {e}");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn move_with_integer_args_parses() {
        let msg = parse_line("move 3 4").unwrap().unwrap();
        assert_eq!(msg, ClientMessage::PlayerMove { x: 3, y: 4 });
    }

    #[test]
    fn move_accepts_negative_coordinates() {
        let msg = parse_line("move -1 -7").unwrap().unwrap();
        assert_eq!(msg, ClientMessage::PlayerMove { x: -1, y: -7 });
    }

    #[test]
    fn move_with_non_integer_args_is_an_error() {
        let err = parse_line("move a b").unwrap_err();
        assert_eq!(err, CommandError::BadCoordinate("a".into()));

        let err = parse_line("move 3 b").unwrap_err();
        assert_eq!(err, CommandError::BadCoordinate("b".into()));
    }

    #[test]
    fn move_with_missing_args_is_an_error() {
        assert_eq!(
            parse_line("move").unwrap_err(),
            CommandError::MissingMoveArgument
        );
        assert_eq!(
            parse_line("move 3").unwrap_err(),
            CommandError::MissingMoveArgument
        );
    }

    #[test]
    fn move_ignores_extra_tokens() {
        let msg = parse_line("move 3 4 5 6").unwrap().unwrap();
        assert_eq!(msg, ClientMessage::PlayerMove { x: 3, y: 4 });
    }

    #[test]
    fn zero_arg_verbs_map_to_their_events() {
        let cases = [
            ("ready", ClientMessage::PlayerReady),
            ("start", ClientMessage::ForceStart),
            ("draw", ClientMessage::RequestDraw),
            ("draw_ok", ClientMessage::AcceptDraw),
            ("undo", ClientMessage::RequestUndo),
            ("undo_ok", ClientMessage::AcceptUndo),
            ("resign", ClientMessage::Resign),
            ("leave", ClientMessage::LeaveRoom),
        ];
        for (input, expected) in cases {
            let msg = parse_line(input).unwrap().unwrap();
            assert_eq!(msg, expected, "verb {input:?}");
        }
    }

    #[test]
    fn zero_arg_verbs_ignore_extra_tokens() {
        let msg = parse_line("ready please now").unwrap().unwrap();
        assert_eq!(msg, ClientMessage::PlayerReady);
    }

    #[test]
    fn unknown_verb_is_an_error() {
        let err = parse_line("xyz").unwrap_err();
        assert_eq!(err, CommandError::Unknown("xyz".into()));
    }

    #[test]
    fn empty_and_whitespace_lines_produce_nothing() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t ").unwrap(), None);
    }

    #[test]
    fn leading_whitespace_is_trimmed() {
        let msg = parse_line("  ready").unwrap().unwrap();
        assert_eq!(msg, ClientMessage::PlayerReady);
    }

    #[test]
    fn verbs_are_case_sensitive() {
        let err = parse_line("READY").unwrap_err();
        assert_eq!(err, CommandError::Unknown("READY".into()));
    }
}
