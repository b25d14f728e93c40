use std::collections::BTreeMap;

use crate::engine::{
    Directive, EngineError, GameEngine, MoveArgs, MoveReply, MoveSpec, MoveTable, Outcome,
    ParamKind, ParamSpec,
};
use crate::player::{PlayerId, PlayerRecord};

const SIZE: usize = 3;

/// Tic-Tac-Toe. What else can I say?
///
/// The first seated player is X, the second is O. A draw reports both players
/// tied for first.
pub struct TicTacToe {
    players: Vec<PlayerRecord>,
    board: [[Option<PlayerId>; SIZE]; SIZE],
    turn: usize,
    moves_made: usize,
    moves: MoveTable,
}

impl TicTacToe {
    pub fn new(players: Vec<PlayerRecord>) -> Self {
        let moves = MoveTable::new(vec![MoveSpec {
            name: "place".to_string(),
            description: "Place your mark on an open square".to_string(),
            params: vec![
                ParamSpec::new("row", ParamKind::Int),
                ParamSpec::new("col", ParamKind::Int),
            ],
            needs_current_turn: true,
        }]);

        Self {
            players,
            board: [[None; SIZE]; SIZE],
            turn: 0,
            moves_made: 0,
            moves,
        }
    }

    fn mark(&self, id: PlayerId) -> char {
        if id == self.players[0].id {
            'X'
        } else {
            'O'
        }
    }

    fn rendered_board(&self) -> String {
        self.board
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(id) => self.mark(*id),
                        None => '·',
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn winner(&self) -> Option<PlayerId> {
        let lines: Vec<[(usize, usize); SIZE]> = vec![
            [(0, 0), (0, 1), (0, 2)],
            [(1, 0), (1, 1), (1, 2)],
            [(2, 0), (2, 1), (2, 2)],
            [(0, 0), (1, 0), (2, 0)],
            [(0, 1), (1, 1), (2, 1)],
            [(0, 2), (1, 2), (2, 2)],
            [(0, 0), (1, 1), (2, 2)],
            [(0, 2), (1, 1), (2, 0)],
        ];

        for line in lines {
            let first = self.board[line[0].0][line[0].1]?;
            if line.iter().all(|(r, c)| self.board[*r][*c] == Some(first)) {
                return Some(first);
            }
        }
        None
    }

    fn place(&mut self, player: &PlayerRecord, row: i64, col: i64) -> Result<(), EngineError> {
        if !(0..SIZE as i64).contains(&row) || !(0..SIZE as i64).contains(&col) {
            return Err(EngineError::InvalidMove(format!(
                "({row}, {col}) is off the board"
            )));
        }
        let (row, col) = (row as usize, col as usize);
        if self.board[row][col].is_some() {
            return Err(EngineError::InvalidMove(
                "that square is already taken".to_string(),
            ));
        }

        self.board[row][col] = Some(player.id);
        self.moves_made += 1;
        self.turn = (self.turn + 1) % self.players.len();
        Ok(())
    }
}

impl GameEngine for TicTacToe {
    fn moves(&self) -> &MoveTable {
        &self.moves
    }

    fn current_turn(&self) -> PlayerId {
        self.players[self.turn].id
    }

    fn invoke(
        &mut self,
        name: &str,
        player: &PlayerRecord,
        args: &MoveArgs,
    ) -> Result<Option<MoveReply>, EngineError> {
        match name {
            "place" => {
                let row = args.int("row")?;
                let col = args.int("col")?;
                self.place(player, row, col)?;
                Ok(None)
            }
            other => Err(EngineError::UnknownMove(other.to_string())),
        }
    }

    fn state(&self) -> Vec<Directive> {
        let mut directives = vec![Directive::Field {
            name: "Board".to_string(),
            value: self.rendered_board(),
            inline: false,
        }];

        for row in 0..SIZE {
            for col in 0..SIZE {
                if self.board[row][col].is_none() {
                    let mut args = BTreeMap::new();
                    args.insert("row".to_string(), row.to_string());
                    args.insert("col".to_string(), col.to_string());
                    directives.push(Directive::Button {
                        label: format!("{}{}", row + 1, col + 1),
                        callback: "place".to_string(),
                        args,
                        row: Some(row as u8),
                        needs_current_turn: true,
                    });
                }
            }
        }

        directives.push(Directive::Footer {
            text: format!(
                "{} is X, {} is O",
                self.players[0].mention(),
                self.players[1].mention()
            ),
        });

        directives
    }

    fn outcome(&self) -> Option<Outcome> {
        if let Some(winner) = self.winner() {
            return Some(Outcome::Winner(winner));
        }
        if self.moves_made == SIZE * SIZE {
            // Draw: both players tied for first
            return Some(Outcome::Placements(vec![self
                .players
                .iter()
                .map(|p| p.id)
                .collect()]));
        }
        None
    }
}
