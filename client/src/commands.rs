//! Parsing of interactive input lines
//!
//! Lines starting with `/` are commands; anything else is a chat message.

use shared::{is_valid_card, ClientEvent, PlayerId, Request, ThrowableKind, CARD_DECK};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(ClientEvent),
    Request(Request),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  /create [name]              create a room
  /join <code> [name]         join a room
  /vote <card>                pick a card
  /reveal, /reset             reveal or restart the round (game master)
  /story <text>               set the story (game master)
  /host <player id>           hand over game master
  /move <x> <y>               move your avatar
  /throw <item> <x> <y>       throw tomato, confetti, ball or paper
  /act <action>               perform an action
  /check <name>               check if a display name is free
  /profile <name>             create your profile
  /name <name>                change your display name
  /avatar <avatar>            change your avatar (registered users)
  /leaderboard                show the season leaderboard
  /help, /quit
Anything else is sent as a chat message.";

fn rest(args: &str, usage: &str) -> Result<String, String> {
    let args = args.trim();
    if args.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(args.to_string())
    }
}

fn float(value: Option<&str>, usage: &str) -> Result<f32, String> {
    value
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("usage: {}", usage))
}

/// Parses one input line. `default_name` fills in omitted player names.
pub fn parse(line: &str, default_name: &str, avatar: Option<&str>) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Err("nothing to send".to_string());
    }
    let body = match line.strip_prefix('/') {
        Some(body) => body,
        None => return Ok(Command::Event(ClientEvent::SendMessage(line.to_string()))),
    };

    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };
    let player_name = |given: &str| {
        if given.is_empty() {
            default_name.to_string()
        } else {
            given.to_string()
        }
    };
    let avatar = avatar.map(str::to_string);

    let command = match name.to_ascii_lowercase().as_str() {
        "create" => Command::Event(ClientEvent::CreateRoom {
            player_name: player_name(args),
            avatar,
        }),
        "join" => {
            let (code, name) = match args.split_once(char::is_whitespace) {
                Some((code, name)) => (code, name.trim()),
                None => (args, ""),
            };
            Command::Event(ClientEvent::JoinRoom {
                room_id: rest(code, "/join <code> [name]")?,
                player_name: player_name(name),
                avatar,
            })
        }
        "vote" => {
            if !is_valid_card(args) {
                return Err(format!("pick one of {}", CARD_DECK.join(" ")));
            }
            Command::Event(ClientEvent::SelectCard(args.to_string()))
        }
        "reveal" => Command::Event(ClientEvent::RevealCards),
        "reset" => Command::Event(ClientEvent::ResetRound),
        "story" => Command::Event(ClientEvent::UpdateStory(rest(args, "/story <text>")?)),
        "host" => {
            let target: PlayerId = args
                .parse()
                .map_err(|_| "usage: /host <player id>".to_string())?;
            Command::Event(ClientEvent::TransferHost(target))
        }
        "move" => {
            let mut parts = args.split_whitespace();
            let x = float(parts.next(), "/move <x> <y>")?;
            let y = float(parts.next(), "/move <x> <y>")?;
            Command::Event(ClientEvent::Move { x, y })
        }
        "throw" => {
            let usage = "/throw <item> <x> <y>";
            let mut parts = args.split_whitespace();
            let kind: ThrowableKind = parts
                .next()
                .ok_or_else(|| format!("usage: {}", usage))?
                .parse()?;
            let target_x = float(parts.next(), usage)?;
            let target_y = float(parts.next(), usage)?;
            Command::Event(ClientEvent::ThrowItem {
                kind,
                target_x,
                target_y,
            })
        }
        "act" => Command::Event(ClientEvent::PerformAction(rest(args, "/act <action>")?)),
        "check" => Command::Request(Request::CheckDisplayName(rest(args, "/check <name>")?)),
        "profile" => Command::Request(Request::CreateProfile {
            display_name: rest(args, "/profile <name>")?,
        }),
        "name" => Command::Request(Request::UpdateDisplayName(rest(args, "/name <name>")?)),
        "avatar" => Command::Request(Request::UpdateAvatar(rest(args, "/avatar <avatar>")?)),
        "leaderboard" => Command::Request(Request::GetLeaderboard),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command /{}, try /help", other)),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(line: &str) -> Command {
        parse(line, "Ada", None).unwrap()
    }

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            parse_ok("  hello there "),
            Command::Event(ClientEvent::SendMessage("hello there".to_string()))
        );
    }

    #[test]
    fn test_create_and_join_default_name() {
        assert_eq!(
            parse("/create", "Ada", Some("fox")).unwrap(),
            Command::Event(ClientEvent::CreateRoom {
                player_name: "Ada".to_string(),
                avatar: Some("fox".to_string()),
            })
        );
        assert_eq!(
            parse_ok("/join abc123 Grace Hopper"),
            Command::Event(ClientEvent::JoinRoom {
                room_id: "abc123".to_string(),
                player_name: "Grace Hopper".to_string(),
                avatar: None,
            })
        );
        assert!(parse("/join", "Ada", None).is_err());
    }

    #[test]
    fn test_vote_only_accepts_deck_cards() {
        assert_eq!(
            parse_ok("/vote 13"),
            Command::Event(ClientEvent::SelectCard("13".to_string()))
        );
        assert!(parse("/vote 4", "Ada", None).is_err());
    }

    #[test]
    fn test_throw_and_move() {
        assert_eq!(
            parse_ok("/throw Tomato 10 20.5"),
            Command::Event(ClientEvent::ThrowItem {
                kind: ThrowableKind::Tomato,
                target_x: 10.0,
                target_y: 20.5,
            })
        );
        assert!(parse("/throw rock 1 2", "Ada", None).is_err());
        assert!(parse("/move 1", "Ada", None).is_err());
        assert!(parse("/move 1 NaN", "Ada", None).is_err());
    }

    #[test]
    fn test_requests() {
        assert_eq!(parse_ok("/leaderboard"), Command::Request(Request::GetLeaderboard));
        assert_eq!(
            parse_ok("/name  Grace "),
            Command::Request(Request::UpdateDisplayName("Grace".to_string()))
        );
        assert_eq!(parse_ok("/host 4"), Command::Event(ClientEvent::TransferHost(4)));
        assert!(parse("/host four", "Ada", None).is_err());
    }

    #[test]
    fn test_unknown_and_empty() {
        assert!(parse("/dance", "Ada", None).is_err());
        assert!(parse("   ", "Ada", None).is_err());
        assert_eq!(parse_ok("/QUIT"), Command::Quit);
    }
}
