//! Lifecycle transition table and the permission gate.

use uuid::Uuid;

use matchday_backend::error::MatchError;
use matchday_backend::matches::lifecycle::{
    can_manage_match, ensure_can_manage, validate_transition, MatchAction,
};
use matchday_backend::middleware::auth::Claims;
use matchday_backend::models::match_record::MatchStatus;
use matchday_backend::models::user::{UserRole, UserStatus};

fn claims_for(user_id: Uuid, role: UserRole) -> Claims {
    Claims {
        sub: user_id.to_string(),
        username: "operator".to_string(),
        role,
        status: UserStatus::Active,
        exp: 4102444800,
    }
}

#[test]
fn the_happy_path_walks_the_full_lifecycle() {
    assert_eq!(
        validate_transition(MatchStatus::Scheduled, 1, MatchAction::StartMatch).unwrap(),
        MatchStatus::Live
    );
    assert_eq!(
        validate_transition(MatchStatus::Live, 1, MatchAction::EndFirstHalf).unwrap(),
        MatchStatus::Halftime
    );
    assert_eq!(
        validate_transition(MatchStatus::Halftime, 1, MatchAction::StartSecondHalf).unwrap(),
        MatchStatus::Live
    );
    assert_eq!(
        validate_transition(MatchStatus::Live, 2, MatchAction::EndMatch).unwrap(),
        MatchStatus::Finished
    );
}

#[test]
fn a_match_cannot_start_twice() {
    let err = validate_transition(MatchStatus::Live, 1, MatchAction::StartMatch).unwrap_err();
    assert!(matches!(err, MatchError::InvalidTransition { .. }));
}

#[test]
fn halftime_requires_being_live_in_half_one() {
    assert!(validate_transition(MatchStatus::Scheduled, 1, MatchAction::EndFirstHalf).is_err());
    assert!(validate_transition(MatchStatus::Halftime, 1, MatchAction::EndFirstHalf).is_err());
    // Live in half 2: the first half is long gone.
    assert!(validate_transition(MatchStatus::Live, 2, MatchAction::EndFirstHalf).is_err());
}

#[test]
fn full_time_requires_being_live_in_half_two() {
    assert!(validate_transition(MatchStatus::Live, 1, MatchAction::EndMatch).is_err());
    assert!(validate_transition(MatchStatus::Halftime, 2, MatchAction::EndMatch).is_err());
    assert!(validate_transition(MatchStatus::Finished, 2, MatchAction::EndMatch).is_err());
}

#[test]
fn second_half_only_starts_from_halftime() {
    assert!(validate_transition(MatchStatus::Scheduled, 1, MatchAction::StartSecondHalf).is_err());
    assert!(validate_transition(MatchStatus::Live, 1, MatchAction::StartSecondHalf).is_err());
    assert!(validate_transition(MatchStatus::Finished, 2, MatchAction::StartSecondHalf).is_err());
}

#[test]
fn finished_is_terminal() {
    for action in [
        MatchAction::StartMatch,
        MatchAction::EndFirstHalf,
        MatchAction::StartSecondHalf,
        MatchAction::EndMatch,
    ] {
        assert!(validate_transition(MatchStatus::Finished, 2, action).is_err());
    }
}

#[test]
fn team_managers_may_run_their_own_match() {
    let home_manager = Uuid::new_v4();
    let away_manager = Uuid::new_v4();

    let claims = claims_for(home_manager, UserRole::User);
    assert!(can_manage_match(&claims, home_manager, away_manager));

    let claims = claims_for(away_manager, UserRole::User);
    assert!(can_manage_match(&claims, home_manager, away_manager));
}

#[test]
fn unrelated_users_are_rejected() {
    let claims = claims_for(Uuid::new_v4(), UserRole::User);
    let err = ensure_can_manage(&claims, Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, MatchError::Forbidden));
}

#[test]
fn administrators_may_run_any_match() {
    let claims = claims_for(Uuid::new_v4(), UserRole::Admin);
    assert!(can_manage_match(&claims, Uuid::new_v4(), Uuid::new_v4()));

    let claims = claims_for(Uuid::new_v4(), UserRole::SuperAdmin);
    assert!(can_manage_match(&claims, Uuid::new_v4(), Uuid::new_v4()));
}

#[test]
fn a_malformed_subject_cannot_manage_by_team() {
    let mut claims = claims_for(Uuid::new_v4(), UserRole::User);
    claims.sub = "not-a-uuid".to_string();
    assert!(!can_manage_match(&claims, Uuid::new_v4(), Uuid::new_v4()));
}
