mod common;

use common::session_test;

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_commands() {
    session_test(
        r#"
[C1] hello
[S1] error unrecognized command: hello
[C1] poules
[S1] error invalid number of arguments for command poules - expected 1, found 0
[C1] poules one
[S1] error malformed id or number
[C1] new_tournament Cup, 9am, 2, 20, 5
[S1] error malformed time of day 9am (expected HH:MM)
[C1] rounds 4
[S1] error no such tournament
    "#,
    )
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_setup() {
    session_test(
        r#"
[C1] tournaments
[S1] tournaments []
[C1] new_tournament Spring Cup, 09:00, 2, 20, 5
[S1] new_tournament 1
[C1] new_tournament Broken, 09:00, 0, 20, 5
[S1] error invalid tournament settings: at least one field is needed
[C1] tournaments
[S1] tournaments [[1, Spring Cup, 09:00, 2, 20, 5]]
[C1] update_tournament 1, Summer Cup, 10:30, 3, 15, 0
[S1] okay
[C1] tournaments
[S1] tournaments [[1, Summer Cup, 10:30, 3, 15, 0]]

// poules and teams
[C1] new_poule 1, A
[S1] new_poule 1
[C1] new_poule 1, B
[S1] new_poule 2
[C1] new_poule 2, C
[S1] error no such tournament
[C1] rename_poule 2, Beta
[S1] okay
[C1] poules 1
[S1] poules [[1, A], [2, Beta]]
[C1] new_team 1, Eagles, 1
[S1] new_team 1
[C1] new_team 1, Hawks, -
[S1] new_team 2
[C1] new_team 1, Eagles, 2
[S1] error team name Eagles is already taken in this tournament
[C1] new_team 1, Owls, 7
[S1] error poule does not belong to this tournament
[C1] assign_team 2, 2
[S1] okay
[C1] rename_team 2, Falcons
[S1] okay
[C1] teams 1
[S1] teams [[1, Eagles, 1], [2, Falcons, 2]]
[C1] assign_team 1, -
[S1] okay
[C1] delete_team 2
[S1] okay
[C1] teams 1
[S1] teams [[1, Eagles, -]]

// deleting the tournament takes everything with it
[C1] delete_tournament 1
[S1] okay
[C1] tournaments
[S1] tournaments []
[C1] teams 1
[S1] error no such tournament
    "#,
    )
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tournament_day() {
    session_test(
        r#"
[C1] new_tournament Spring Cup, 09:00, 2, 20, 5
[S1] new_tournament 1
[C1] new_poule 1, A
[S1] new_poule 1
[C1] new_poule 1, B
[S1] new_poule 2
[C1] new_team 1, a1, 1
[S1] new_team 1
[C1] new_team 1, a2, 1
[S1] new_team 2
[C1] new_team 1, b1, 2
[S1] new_team 3
[C1] new_team 1, b2, 2
[S1] new_team 4
[C1] rounds 1
[S1] rounds 1, []
[C1] phase_status 1
[S1] phase_status 1, 0, 0, false, 0, 0, false

[C1] generate_group_phase 1
[S1] okay
[C1] rounds 1
[S1] rounds 1, [[1, 1, group, 09:00, 09:20, [[1, 1, 1, 2, -, -, -, -, -], [2, 2, 3, 4, -, -, -, -, -]]], [2, 2, knockout, 09:20, 09:40, [[3, 1, 1#1, 2#1, -, -, -, -, -], [4, 2, 1#2, 2#2, -, -, -, -, -]]], [3, 3, final, 09:40, 10:00, [[5, 1, -, -, -, -, -, -, -]]]]
[C1] generate_group_phase 1
[S1] error group phase already exists and will not be overwritten
[C1] assign_team 1, 2
[S1] error poule assignments are locked once the group phase exists

// group phase results
[C1] score 1, 21, 15, 21, 18
[S1] okay
[C1] score 2, 19, 21, 21, 15
[S1] okay
[C1] score 2, -3, 21, 21, 15
[S1] error set scores can't be negative
[C1] score 2, 2147483647, 0, 2147483647, 0
[S1] error set score 2147483647 is too high (at most 999)
[C1] standings 1
[S1] standings 1, [[1, A, [[1, a1, 4, 42, 33, 9, 1], [2, a2, 0, 33, 42, -9, 1]]], [2, B, [[3, b1, 2, 40, 36, 4, 1], [4, b2, 2, 36, 40, -4, 1]]]]
[C1] team_by_rank 1, 1
[S1] team 1, a1
[C1] team_by_rank 2, 3
[S1] team -
[C1] phase_status 1
[S1] phase_status 1, 2, 2, true, 2, 0, false

// knockout
[C1] generate_final 1
[S1] error not enough #1 vs #1 knockout winners to fill the final
[C1] generate_knockout_phase 1
[S1] okay
[C1] rounds 1
[S1] rounds 1, [[1, 1, group, 09:00, 09:20, [[1, 1, 1, 2, -, 21, 15, 21, 18], [2, 2, 3, 4, -, 19, 21, 21, 15]]], [2, 2, knockout, 09:20, 09:40, [[3, 1, 1, 3, -, -, -, -, -], [4, 2, 2, 4, -, -, -, -, -]]], [3, 3, final, 09:40, 10:00, [[*, 1, -, -, -, -, -, -, -]]]]
[C1] score 3, 21, 10, 21, 12
[S1] okay
[C1] overall_standings 1
[S1] overall_standings 1, [[1, 1, a1, 4, 42, 33, 9, 2, 1, -], [2, 3, b1, 2, 40, 36, 4, 2, 1, -], [3, 2, a2, 0, 33, 42, -9, 1, 2, -], [4, 4, b2, 2, 36, 40, -4, 1, 2, -]]
    "#,
    )
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_observe() {
    session_test(
        r#"
[C1] new_tournament Cup, 09:00, 1, 10, 0
[S1] new_tournament 1
[C1] new_poule 1, A
[S1] new_poule 1
[C1] new_team 1, a1, 1
[S1] new_team 1
[C1] new_team 1, a2, 1
[S1] new_team 2
[C2] observe_tournament 1
[S2] rounds 1, []
[C1] generate_group_phase 1
[S1] okay
[S2] rounds 1, [[1, 1, group, 09:00, 09:10, [[1, 1, 1, 2, -, -, -, -, -]]]]
[C1] score 1, 21, 10, -, -
[S1] okay
[S2] rounds 1, [[1, 1, group, 09:00, 09:10, [[1, 1, 1, 2, -, 21, 10, -, -]]]]
[C2] stop_observe_tournament 1
[S2] okay
[C1] score 1, 21, 10, 21, 8
[S1] okay
[C2] rounds 1
[S2] rounds 1, [[1, 1, group, 09:00, 09:10, [[1, 1, 1, 2, -, 21, 10, 21, 8]]]]
[C2] observe_tournament 2
[S2] error no such tournament
    "#,
    )
    .await;
}
