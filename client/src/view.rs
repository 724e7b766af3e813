//! Text rendering of server events for the terminal client

use shared::{PlayerId, PointsAward, Response, RoomSnapshot, ServerEvent};

/// Remembers the last room state so later events can name players.
#[derive(Debug, Default)]
pub struct RoomView {
    me: Option<PlayerId>,
    room_id: Option<String>,
    snapshot: Option<RoomSnapshot>,
    seen_messages: u64,
}

impl RoomView {
    pub fn new(me: PlayerId) -> Self {
        Self {
            me: Some(me),
            ..Self::default()
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn snapshot(&self) -> Option<&RoomSnapshot> {
        self.snapshot.as_ref()
    }

    fn name_of(&self, id: PlayerId) -> String {
        self.snapshot
            .as_ref()
            .and_then(|s| s.player(id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("player {}", id))
    }

    /// Applies an event and returns the lines to print for it.
    pub fn apply(&mut self, event: ServerEvent) -> Vec<String> {
        match event {
            ServerEvent::Welcome { connection_id, .. } => {
                self.me = Some(connection_id);
                Vec::new()
            }
            ServerEvent::Rejected { reason } => vec![format!("! rejected: {}", reason)],
            ServerEvent::RoomJoined {
                room_id, player_id, ..
            } => {
                self.me = Some(player_id);
                let line = format!("Joined room {} as player {}", room_id, player_id);
                self.room_id = Some(room_id);
                vec![line]
            }
            ServerEvent::RoomState(snapshot) => self.apply_snapshot(snapshot),
            ServerEvent::ItemThrown(item) => vec![format!(
                "{} threw a {} at ({:.0}, {:.0})",
                self.name_of(item.thrower_id),
                item.kind,
                item.target_x,
                item.target_y
            )],
            ServerEvent::PlayerAction {
                player_id, action, ..
            } => vec![format!("* {} {}", self.name_of(player_id), action)],
            ServerEvent::PointsAwarded(awards) => self.describe_awards(&awards),
            ServerEvent::Error(message) => vec![format!("! {}", message)],
            ServerEvent::Response {
                request_id,
                response,
            } => vec![describe_response(request_id, &response)],
        }
    }

    fn apply_snapshot(&mut self, snapshot: RoomSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        // Only print chat lines we have not shown yet.
        for message in &snapshot.messages {
            if message.id >= self.seen_messages {
                lines.push(format!("<{}> {}", message.player_name, message.text));
                self.seen_messages = message.id + 1;
            }
        }

        let changed_round = self
            .snapshot
            .as_ref()
            .map_or(true, |old| old.cards_revealed != snapshot.cards_revealed);
        if changed_round {
            lines.extend(render_room(&snapshot, self.me));
        }
        self.snapshot = Some(snapshot);
        lines
    }

    fn describe_awards(&self, awards: &[PointsAward]) -> Vec<String> {
        awards
            .iter()
            .map(|a| format!("+{} points for {}", a.points, self.name_of(a.player_id)))
            .collect()
    }
}

/// Full table of players and their votes.
pub fn render_room(snapshot: &RoomSnapshot, me: Option<PlayerId>) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.players.len() + 2);
    if let Some(story) = &snapshot.current_story {
        lines.push(format!("Story: {}", story));
    }
    lines.push(if snapshot.cards_revealed {
        "Cards revealed".to_string()
    } else {
        "Voting in progress".to_string()
    });

    for player in &snapshot.players {
        let vote = match (&player.card, player.has_voted) {
            (Some(card), _) => card.clone(),
            (None, true) => "voted".to_string(),
            (None, false) => "-".to_string(),
        };
        lines.push(format!(
            "  {}{} [{}] {}{} ({} pts)",
            if Some(player.id) == me { "> " } else { "  " },
            player.id,
            vote,
            player.name,
            if player.is_game_master { " (game master)" } else { "" },
            player.points
        ));
    }
    lines
}

pub fn describe_response(request_id: u32, response: &Response) -> String {
    match response {
        Response::DisplayNameAvailability { available } => format!(
            "#{} display name is {}",
            request_id,
            if *available { "available" } else { "taken" }
        ),
        Response::Leaderboard {
            season,
            leaderboard,
        } => {
            let mut out = match season {
                Some(season) => format!(
                    "#{} season {} ({} to {})",
                    request_id, season.id, season.start_date, season.end_date
                ),
                None => format!("#{} leaderboard unavailable", request_id),
            };
            for (rank, entry) in leaderboard.iter().enumerate() {
                out.push_str(&format!(
                    "\n  {}. {} {}",
                    rank + 1,
                    entry.display_name,
                    entry.season_points
                ));
            }
            out
        }
        Response::Outcome { success: true, .. } => format!("#{} done", request_id),
        Response::Outcome { error, .. } => format!(
            "#{} failed: {}",
            request_id,
            error.as_deref().unwrap_or("unknown error")
        ),
    }
}
