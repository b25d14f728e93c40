use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use playhall::matchmaking::{self, MatchmakingSession, StartOutcome};
use playhall::render::RenderEvent;
use playhall::MoveOutcome;
use playhall::player::{PlayerRepository, UserRef};
use playhall::rating::MU;

mod utils;

use utils::{user, TestApp};

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn user_json(user: &UserRef) -> Value {
    json!({ "id": user.id, "name": user.name })
}

#[tokio::test]
async fn test_lobby_to_game_lifecycle() {
    let app = TestApp::new();
    let creator = user("carol");
    let joiner = user("pat");

    let lobby = MatchmakingSession::create(
        app.deps(),
        app.catalog.clone(),
        &creator,
        "tictactoe",
        false,
        false,
    )
    .await
    .unwrap();

    let lobby_id = lobby.lock().await.lobby_id().to_string();
    lobby.lock().await.join(&joiner).await.unwrap();

    let outcome = lobby.lock().await.start(&creator.id).await;
    let StartOutcome::Ready(ticket) = outcome else {
        panic!("expected matchmaking to be ready, got {outcome:?}");
    };

    let game = matchmaking::promote(&app.deps(), &app.catalog, ticket)
        .await
        .unwrap();

    // Both players seated, in some order
    let seated: Vec<_> = game.players().iter().map(|p| p.id).collect();
    assert_eq!(seated.len(), 2);
    assert!(seated.contains(&creator.id));
    assert!(seated.contains(&joiner.id));

    // The current turn is one of the seated players
    let current = game.current_turn().await.unwrap();
    assert!(seated.contains(&current.id));

    // The lobby is fully replaced by the game in the directory
    assert!(app.directory.lobby(&lobby_id).await.is_none());
    assert_eq!(app.directory.lobby_count().await, 0);
    assert!(app.directory.game(game.session_id()).await.is_some());
    assert!(app.directory.player_in_game(&creator.id).await);
    assert!(app.directory.player_in_game(&joiner.id).await);
}

#[tokio::test]
async fn test_three_player_race_settles_tie_groups() {
    let app = TestApp::new();
    let runners = [user("p1"), user("p2"), user("p3")];

    let lobby = MatchmakingSession::create(
        app.deps(),
        app.catalog.clone(),
        &runners[0],
        "race",
        true,
        false,
    )
    .await
    .unwrap();
    lobby.lock().await.join(&runners[1]).await.unwrap();
    lobby.lock().await.join(&runners[2]).await.unwrap();

    let StartOutcome::Ready(ticket) = lobby.lock().await.start(&runners[0].id).await else {
        panic!("expected matchmaking to be ready");
    };
    let game = matchmaking::promote(&app.deps(), &app.catalog, ticket)
        .await
        .unwrap();

    // Whoever is seated first dashes and wins; the other two tie for second
    let first_seat = game.players()[0].clone();
    let first_user = UserRef::new(first_seat.id, first_seat.name.clone());

    app.renderer.clear();
    let outcome = game.move_by_command(&first_user, "dash", Default::default(), true).await;
    assert_eq!(outcome, MoveOutcome::Completed);

    // The engine's reply was surfaced as an ephemeral ack
    let events = app.renderer.events();
    assert!(events.iter().any(|e| matches!(
        e,
        RenderEvent::Notice { text, .. } if text == "First across the line!"
    )));

    // Standings mark the tied runners-up
    let standings = events
        .iter()
        .find_map(|e| match e {
            RenderEvent::FinalStandings { text, .. } => Some(text.clone()),
            _ => None,
        })
        .expect("final standings were rendered");
    let lines: Vec<&str> = standings.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(&format!("1. {}", first_seat.mention())));
    assert!(lines[1].starts_with("2T."));
    assert!(lines[2].starts_with("2T."));

    // Ratings moved for all three, winner gaining at least as much as anyone
    let mut deltas = Vec::new();
    for runner in &runners {
        let record = app.players.get_player("race", runner).await.unwrap();
        assert!(record.mu.is_finite());
        deltas.push((runner.id, record.mu - MU));
    }
    let winner_delta = deltas
        .iter()
        .find(|(id, _)| *id == first_seat.id)
        .unwrap()
        .1;
    assert!(winner_delta > 0.0);
    for (id, delta) in &deltas {
        if *id != first_seat.id {
            assert!(winner_delta >= *delta);
            assert!(*delta < 0.0, "tied losers drop against the winner");
        }
    }

    // Settlement cleaned every routing entry
    assert_eq!(app.directory.game_count().await, 0);
    for runner in &runners {
        assert!(!app.directory.player_in_game(&runner.id).await);
    }
}

#[tokio::test]
async fn test_store_outage_blocks_lobby_creation_over_http() {
    let app = TestApp::new();
    let router = app.router();
    app.players.set_unavailable(true);

    let (status, body) = post_json(
        &router,
        "/lobbies",
        json!({
            "game_kind": "tictactoe",
            "user": user_json(&user("alice")),
        }),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("try again later"));
    // No session was registered anywhere and no game path is reachable
    assert_eq!(app.directory.lobby_count().await, 0);
    assert_eq!(app.directory.game_count().await, 0);
    assert!(app.renderer.events().is_empty());
}

#[tokio::test]
async fn test_single_player_lobby_dissolves_over_http() {
    let app = TestApp::new();
    let router = app.router();
    let alice = user("alice");

    let (status, lobby) = post_json(
        &router,
        "/lobbies",
        json!({
            "game_kind": "tictactoe",
            "user": user_json(&alice),
            "rated": false,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lobby_id = lobby["lobby_id"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &router,
        &format!("/lobbies/{lobby_id}/leave"),
        json!({ "user": user_json(&alice) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "lobby_closed");

    // The lobby is gone and no game was ever constructed
    let (status, _) = get_json(&router, &format!("/lobbies/{lobby_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.directory.game_count().await, 0);
}

#[tokio::test]
async fn test_full_game_over_http() {
    let app = TestApp::new();
    let router = app.router();
    let alice = user("alice");
    let bob = user("bob");

    // Open, join, start
    let (status, lobby) = post_json(
        &router,
        "/lobbies",
        json!({
            "game_kind": "tictactoe",
            "user": user_json(&alice),
            "rated": false,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lobby_id = lobby["lobby_id"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        &router,
        &format!("/lobbies/{lobby_id}/join"),
        json!({ "user": user_json(&bob) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, started) = post_json(
        &router,
        &format!("/lobbies/{lobby_id}/start"),
        json!({ "user": user_json(&alice) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["started"], true);
    let session_id = started["session_id"].as_str().unwrap().to_string();

    // Seat order was shuffled; read it back
    let (status, game) = get_json(&router, &format!("/games/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let first_mention = game["current_turn"].as_str().unwrap().to_string();
    let (first, second) = if first_mention == format!("@{}", alice.name) {
        (&alice, &bob)
    } else {
        (&bob, &alice)
    };

    // First seat wins down the top row while second fills the middle row
    let script = [
        (first, 0, 0),
        (second, 1, 0),
        (first, 0, 1),
        (second, 1, 1),
    ];
    for (player, row, col) in script {
        let (status, body) = post_json(
            &router,
            &format!("/games/{session_id}/button"),
            json!({
                "user": user_json(player),
                "callback": "place",
                "arguments": format!("row={row},col={col}"),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "applied");
    }

    let (status, body) = post_json(
        &router,
        &format!("/games/{session_id}/button"),
        json!({
            "user": user_json(first),
            "callback": "place",
            "arguments": "row=0,col=2",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "game_over");

    // Settled games disappear from routing
    let (status, _) = get_json(&router, &format!("/games/{session_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Moves after settlement no longer route anywhere
    let (status, body) = post_json(
        &router,
        &format!("/games/{session_id}/button"),
        json!({
            "user": user_json(second),
            "callback": "place",
            "arguments": "row=2,col=2",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
}
