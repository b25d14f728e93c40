pub mod tictactoe;

use crate::catalog::{GameCatalog, GameKindSpec, PlayerCountSpec};
use crate::rating::RatingTuning;

/// The catalog of games this deployment ships.
pub fn standard_catalog() -> GameCatalog {
    let mut catalog = GameCatalog::new();

    catalog.register(
        GameKindSpec::new(
            "tictactoe",
            "Tic-Tac-Toe",
            PlayerCountSpec::Exact(2),
            Box::new(|players| Box::new(tictactoe::TicTacToe::new(players))),
        )
        .with_description("Tic-Tac-Toe. What else can I say?")
        .with_details("playhall", "~5 min", "Easy")
        .with_tuning(RatingTuning {
            // Draws are common on a 3x3 board
            draw_probability: 0.33,
            ..RatingTuning::default()
        }),
    );

    catalog
}
