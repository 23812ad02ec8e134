//! End-to-end bet cycles against `BettingSession`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use coinflip::session::BettingSession;
use coinflip::types::{BetStateProblem, SessionError, SessionPhase, Side, StakeMode};

use crate::mock_coin::MockCoin;

fn session() -> (BettingSession, MockCoin) {
    let coin = MockCoin::new();
    (BettingSession::new(Box::new(coin.clone())), coin)
}

#[test]
fn test_heads_win_from_fresh_session() {
    let (mut s, coin) = session();
    s.select_stake(dec!(0.25)).unwrap();
    s.select_side(Side::Heads).unwrap();
    coin.force(Side::Heads);

    s.resolve_bet().unwrap();

    assert_eq!(s.balance(), dec!(100.25));
    assert_eq!(s.win_streak(), 1);
    assert_eq!(s.loss_streak(), 0);
    let lines: Vec<String> = s.history().iter().map(ToString::to_string).collect();
    assert_eq!(lines, ["Heads (0.25): Win +0.25"]);
    assert_eq!(s.pending_stake(), None);
    assert_eq!(s.pending_side(), None);
}

#[test]
fn test_tails_loss_from_fresh_session() {
    let (mut s, coin) = session();
    s.select_stake(dec!(0.25)).unwrap();
    s.select_side(Side::Heads).unwrap();
    coin.force(Side::Tails);

    s.resolve_bet().unwrap();

    assert_eq!(s.balance(), dec!(99.75));
    assert_eq!(s.win_streak(), 0);
    assert_eq!(s.loss_streak(), 1);
    assert_eq!(s.last_result(), Some(Side::Tails));
}

#[test]
fn test_short_balance_rejected_without_draw() {
    let coin = MockCoin::new();
    let mut s = BettingSession::new(Box::new(coin.clone())).with_balance(dec!(0.2));
    s.select_stake(dec!(0.25)).unwrap();
    s.select_side(Side::Heads).unwrap();

    let err = s.resolve_bet().unwrap_err();

    assert!(matches!(
        err,
        SessionError::InvalidBetState(BetStateProblem::InsufficientBalance { .. })
    ));
    assert_eq!(s.balance(), dec!(0.2));
    assert!(s.history().is_empty());
    assert!(coin.drawn().is_empty());
}

#[test]
fn test_god_mode_twenty_on_tails() {
    let (mut s, coin) = session();
    s.set_mode(StakeMode::Elevated);
    s.select_stake(dec!(20)).unwrap();
    s.select_side(Side::Tails).unwrap();
    coin.force(Side::Tails);

    s.resolve_bet().unwrap();

    assert_eq!(s.balance(), dec!(120));
}

#[test]
fn test_normal_stake_rejected_in_god_mode() {
    let (mut s, _coin) = session();
    s.toggle_mode();
    assert!(matches!(
        s.select_stake(dec!(0.5)),
        Err(SessionError::InvalidStake { mode: StakeMode::Elevated, .. })
    ));
}

#[test]
fn test_two_phase_cycle() {
    let (mut s, coin) = session();
    s.select_stake(dec!(1)).unwrap();
    s.select_side(Side::Tails).unwrap();

    let ticket = s.begin_flip().unwrap();
    assert_eq!(s.phase(), SessionPhase::Flipping);
    assert_eq!(s.select_side(Side::Heads).unwrap_err(), SessionError::SessionBusy);
    assert_eq!(s.resolve_bet().unwrap_err(), SessionError::FlightInProgress);

    coin.force(Side::Heads);
    let record = s.complete_flip(ticket).unwrap();

    assert_eq!(record.to_string(), "Tails (1): Loss -1");
    assert_eq!(s.phase(), SessionPhase::Idle);
    assert_eq!(s.balance(), dec!(99));
}

#[test]
fn test_failed_calls_leave_history_alone() {
    let (mut s, coin) = session();
    for _ in 0..3 {
        assert!(s.resolve_bet().is_err());
    }
    s.select_stake(dec!(0.05)).unwrap();
    assert!(s.resolve_bet().is_err());
    s.select_side(Side::Heads).unwrap();
    coin.force(Side::Heads);
    s.resolve_bet().unwrap();
    assert!(s.resolve_bet().is_err());

    assert_eq!(s.history().len(), 1);
    assert_eq!(coin.drawn(), vec![Side::Heads]);
}

#[test]
fn test_drain_to_zero_then_top_up() {
    let (mut s, coin) = session();
    s.set_mode(StakeMode::Elevated);
    for _ in 0..5 {
        s.select_stake(dec!(20)).unwrap();
        s.select_side(Side::Heads).unwrap();
        coin.force(Side::Tails);
        s.resolve_bet().unwrap();
    }
    assert_eq!(s.balance(), Decimal::ZERO);
    assert_eq!(s.loss_streak(), 5);

    s.select_stake(dec!(10)).unwrap();
    s.select_side(Side::Heads).unwrap();
    assert!(s.resolve_bet().is_err());

    s.top_up(dec!(10)).unwrap();
    coin.force(Side::Heads);
    s.resolve_bet().unwrap();
    assert_eq!(s.balance(), dec!(20));
    assert_eq!(s.win_streak(), 1);
    assert_eq!(s.loss_streak(), 0);
    assert_eq!(s.stats().longest_loss_streak, 5);
}
