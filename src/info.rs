use std::collections::HashMap;

use log::{debug, warn};

use crate::error::QueryError;
use crate::packet::ResponsePacket;
use crate::parse::{lenient, parse_info_string, split_args};

/// Leading token of every status reply.
pub const RESPONSE_HEADER: &str = "print";

/// Which player line layout the server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// `frags ping "name" "address"`
    #[default]
    Quake2,
    /// `id score time ping "name" "skin" color1 color2`
    Quake1,
}

/// One line of the player block of a status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRecord {
    Quake2 {
        frags: i32,
        ping: i32,
        name: Option<String>,
        address: Option<String>,
    },
    Quake1 {
        id: i32,
        score: i32,
        time: i32,
        ping: i32,
        name: String,
        skin: String,
        color1: i32,
        color2: i32,
    },
}

impl PlayerRecord {
    pub fn ping(&self) -> i32 {
        match self {
            PlayerRecord::Quake2 { ping, .. } | PlayerRecord::Quake1 { ping, .. } => *ping,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            PlayerRecord::Quake2 { name, .. } => name.as_deref(),
            PlayerRecord::Quake1 { name, .. } => Some(name),
        }
    }

    /// Zero ping is how servers report bots. There is no protocol flag for
    /// it, so a real player on a zero-latency link is misfiled too.
    pub fn is_bot(&self) -> bool {
        self.ping() == 0
    }

    fn parse(args: &[String], dialect: Dialect) -> Self {
        let text = |i: usize| args.get(i).filter(|s| !s.is_empty()).cloned();
        match dialect {
            Dialect::Quake2 => PlayerRecord::Quake2 {
                frags: lenient(args.first()),
                ping: lenient(args.get(1)),
                name: text(2),
                address: text(3),
            },
            Dialect::Quake1 => PlayerRecord::Quake1 {
                id: lenient(args.first()),
                score: lenient(args.get(1)),
                time: lenient(args.get(2)),
                ping: lenient(args.get(3)),
                name: text(4).unwrap_or_default(),
                skin: text(5).unwrap_or_default(),
                color1: lenient(args.get(6)),
                color2: lenient(args.get(7)),
            },
        }
    }
}

/// Server state as obtained by [crate::query::query].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerState {
    /// Every key of the info string, verbatim
    pub info: HashMap<String, String>,
    /// Players with a non-zero ping
    pub players: Vec<PlayerRecord>,
    /// Players reporting a zero ping
    pub bots: Vec<PlayerRecord>,
    /// Current map
    pub map: Option<String>,
    /// Server hostname
    pub hostname: Option<String>,
    /// Max players, as the server spelled it
    pub max_players: Option<String>,
    /// Current players
    pub num_players: usize,
    /// Server version string
    pub version: Option<String>,
    /// `g_needpass`, if the server advertises it
    pub needs_password: Option<String>,
}

impl ServerState {
    /// Parse a [ResponsePacket] into its corresponding [ServerState].
    pub fn parse(packet: &ResponsePacket, dialect: Dialect) -> Result<ServerState, QueryError> {
        let text: String = packet.text();
        let text: &str = text.trim_start();
        let (resp_type, body) = match text.find(char::is_whitespace) {
            Some(i) => (&text[..i], text[i..].trim_start()),
            None => (text, ""),
        };
        if resp_type != RESPONSE_HEADER {
            return Err(QueryError::UnexpectedResponse(resp_type.to_owned()));
        }

        let mut state: ServerState = ServerState::default();
        let mut lines = body.lines();
        let Some(info_line) = lines.next() else {
            return Ok(state);
        };
        state.info = parse_info_string(info_line);

        for line in lines {
            let line: &str = line.trim();
            if line.is_empty() || line.starts_with('\0') {
                break;
            }
            let args: Vec<String> = split_args(line);
            if args.is_empty() {
                continue;
            }
            if args.len() < 2 {
                warn!("short player line {:?}, missing fields default to zero", line);
            }
            let player: PlayerRecord = PlayerRecord::parse(&args, dialect);
            if player.is_bot() {
                state.bots.push(player);
            } else {
                state.players.push(player);
            }
        }

        state.project_info();
        debug!(
            "parsed status: map={:?} players={} bots={}",
            state.map,
            state.players.len(),
            state.bots.len()
        );
        Ok(state)
    }

    /// Fill the derived fields from `info`. Later aliases override earlier ones.
    fn project_info(&mut self) {
        let info = &self.info;
        let get = |key: &str| info.get(key).cloned();

        self.needs_password = get("g_needpass");
        self.map = get("mapname");
        self.max_players = get("maxclients").or_else(|| get("sv_maxclients"));
        self.hostname = get("hostname").or_else(|| get("sv_hostname"));
        self.version = get("version").or_else(|| get("iv"));
        self.num_players = get("clients")
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(self.players.len() + self.bots.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[u8], dialect: Dialect) -> Result<ServerState, QueryError> {
        ServerState::parse(&ResponsePacket::unpack(raw)?, dialect)
    }

    #[test]
    fn quake2_reply() {
        let state = parse(
            b"\xff\xff\xff\xffprint\n\\hostname\\Test\\mapname\\dday1\n5 37 \"Alice\" \"1.2.3.4:1234\"\n",
            Dialect::Quake2,
        )
        .unwrap();

        assert_eq!(state.hostname.as_deref(), Some("Test"));
        assert_eq!(state.map.as_deref(), Some("dday1"));
        assert_eq!(
            state.players,
            vec![PlayerRecord::Quake2 {
                frags: 5,
                ping: 37,
                name: Some("Alice".to_owned()),
                address: Some("1.2.3.4:1234".to_owned()),
            }]
        );
        assert!(state.bots.is_empty());
        assert_eq!(state.num_players, 1);
    }

    #[test]
    fn zero_ping_is_a_bot() {
        let state = parse(
            b"\xff\xff\xff\xffprint\n\\mapname\\q2dm1\n0 0 \"Bot1\" \"\"\n",
            Dialect::Quake2,
        )
        .unwrap();

        assert!(state.players.is_empty());
        assert_eq!(
            state.bots,
            vec![PlayerRecord::Quake2 {
                frags: 0,
                ping: 0,
                name: Some("Bot1".to_owned()),
                address: None,
            }]
        );
    }

    #[test]
    fn alias_precedence() {
        let state = parse(
            b"\xff\xff\xff\xffprint\n\\sv_hostname\\a\\hostname\\b\\sv_maxclients\\8\\maxclients\\16\\iv\\1.0\\clients\\7\\g_needpass\\1\n",
            Dialect::Quake2,
        )
        .unwrap();

        assert_eq!(state.hostname.as_deref(), Some("b"));
        assert_eq!(state.max_players.as_deref(), Some("16"));
        assert_eq!(state.version.as_deref(), Some("1.0"));
        assert_eq!(state.num_players, 7);
        assert_eq!(state.needs_password.as_deref(), Some("1"));
    }

    #[test]
    fn player_block_stops_at_blank_line() {
        let state = parse(
            b"\xff\xff\xff\xffprint\n\\version\\3.20\n1 50 \"a\"\n\n2 60 \"b\"\n",
            Dialect::Quake2,
        )
        .unwrap();
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.num_players, 1);
        assert_eq!(state.version.as_deref(), Some("3.20"));
    }

    #[test]
    fn garbage_numbers_default_to_zero() {
        let state = parse(
            b"\xff\xff\xff\xffprint\n\\x\\y\nlots 40 \"c\"\n",
            Dialect::Quake2,
        )
        .unwrap();
        assert_eq!(state.players[0], PlayerRecord::Quake2 {
            frags: 0,
            ping: 40,
            name: Some("c".to_owned()),
            address: None,
        });
    }

    #[test]
    fn quake1_dialect() {
        let state = parse(
            b"\xff\xff\xff\xffprint\n\\hostname\\old\n3 12 600 45 \"Ranger\" \"base\" 4 13\n",
            Dialect::Quake1,
        )
        .unwrap();
        assert_eq!(
            state.players,
            vec![PlayerRecord::Quake1 {
                id: 3,
                score: 12,
                time: 600,
                ping: 45,
                name: "Ranger".to_owned(),
                skin: "base".to_owned(),
                color1: 4,
                color2: 13,
            }]
        );
    }

    #[test]
    fn wrong_response_token() {
        let err = parse(b"\xff\xff\xff\xffinfo\n\\a\\b\n", Dialect::Quake2).unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedResponse(t) if t == "info"));
    }

    #[test]
    fn missing_marker_is_an_error() {
        let err = parse(b"print\n\\a\\b\n", Dialect::Quake2).unwrap_err();
        assert!(matches!(err, QueryError::UnknownPacketHeader(_)));
    }

    #[test]
    fn empty_body() {
        let state = parse(b"\xff\xff\xff\xffprint", Dialect::Quake2).unwrap();
        assert_eq!(state, ServerState::default());
    }
}
