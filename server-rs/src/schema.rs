diesel::table! {
    matches (id) {
        id -> Integer,
        tournament_id -> Integer,
        round_id -> Integer,
        poule_id -> Nullable<Integer>,
        field_number -> Integer,
        home_team_id -> Nullable<Integer>,
        away_team_id -> Nullable<Integer>,
        referee_team_id -> Nullable<Integer>,
        home_rank_poule_id -> Nullable<Integer>,
        home_rank_position -> Nullable<Integer>,
        away_rank_poule_id -> Nullable<Integer>,
        away_rank_position -> Nullable<Integer>,
        home_set1_score -> Nullable<Integer>,
        away_set1_score -> Nullable<Integer>,
        home_set2_score -> Nullable<Integer>,
        away_set2_score -> Nullable<Integer>,
    }
}

diesel::table! {
    poules (id) {
        id -> Integer,
        tournament_id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    rounds (id) {
        id -> Integer,
        tournament_id -> Integer,
        round_number -> Integer,
        kind -> Text,
        start_time -> Time,
        end_time -> Time,
    }
}

diesel::table! {
    teams (id) {
        id -> Integer,
        tournament_id -> Integer,
        poule_id -> Nullable<Integer>,
        name -> Text,
    }
}

diesel::table! {
    tournaments (id) {
        id -> Integer,
        name -> Text,
        start_time -> Time,
        num_fields -> Integer,
        match_duration_minutes -> Integer,
        break_duration_minutes -> Integer,
    }
}

diesel::joinable!(matches -> rounds (round_id));
diesel::joinable!(poules -> tournaments (tournament_id));
diesel::joinable!(rounds -> tournaments (tournament_id));

diesel::allow_tables_to_appear_in_same_query!(matches, poules, rounds, teams, tournaments,);
