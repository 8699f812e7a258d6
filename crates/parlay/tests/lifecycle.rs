//! End-to-end lifecycle run against the simulated ledger: bootstrap, bet
//! ingestion with referral processing, randomness, settlement, the next
//! round, bounty mirroring and the final sweep. Everything flows through
//! the assembled [`Runtime`], the same wiring the daemon uses.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parlay::{AppConfig, Runtime};
use parlay_chain::SimulatedLedger;
use parlay_monitor::Stage;
use parlay_types::{BetLeg, BetStatus, MatchOutcome, UnixTime, MATCHES_PER_ROUND};

const GENESIS: UnixTime = 1_700_000_000;
const ROUND_SECS: u64 = 900;
const DELAY_SECS: u64 = 1_200;
const CLAIM_SECS: u64 = 3_600;
const GRACE_SECS: u64 = 600;
const WEI: u128 = 1_000_000_000_000_000_000;

fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(WEI)
}

struct World {
    sim: Arc<SimulatedLedger>,
    runtime: Runtime,
}

fn world() -> World {
    let sim = Arc::new(SimulatedLedger::new(ROUND_SECS, GENESIS));

    let mut config = AppConfig::default();
    config.contracts.game_core = sim.game_core;
    config.contracts.betting_core = sim.betting_core;
    config.sync.start_block = Some(1);
    config.monitor.round_duration_secs = ROUND_SECS;
    config.monitor.next_round_delay_secs = DELAY_SECS;
    config.monitor.claim_deadline_secs = CLAIM_SECS;
    config.monitor.sweep_grace_secs = GRACE_SECS;

    let runtime = Runtime::with_client(sim.clone(), &config);
    World { sim, runtime }
}

fn bettor() -> Address {
    Address::repeat_byte(0x11)
}

fn referrer() -> Address {
    Address::repeat_byte(0x22)
}

#[test]
fn test_full_round_lifecycle() {
    let w = world();
    let monitor = w.runtime.monitor();
    let sync = w.runtime.sync();

    // --- Bootstrap: season, first round, seeding ---
    let actions = monitor.bootstrap(w.sim.now()).unwrap();
    assert_eq!(
        actions,
        vec![Stage::StartSeason, Stage::StartRound, Stage::SeedRound]
    );

    // First sync tick caches the round and its league fixtures.
    sync.poll_once(w.sim.now()).unwrap();
    let detail = w.runtime.round_detail(1).unwrap().unwrap();
    assert!(detail.round.is_active);
    assert_eq!(detail.matches.len(), MATCHES_PER_ROUND);
    assert!(detail.matches.iter().all(|m| !m.home_team_name.is_empty()));

    // --- Referred bettor places a two-leg parlay ---
    w.runtime
        .rewards()
        .create_referral(referrer(), bettor(), None, w.sim.now())
        .unwrap();
    let legs = vec![
        BetLeg {
            match_index: 0,
            predicted: MatchOutcome::HomeWin,
        },
        BetLeg {
            match_index: 1,
            predicted: MatchOutcome::Draw,
        },
    ];
    let bet_id = w
        .sim
        .place_bet(bettor(), legs, tokens(100), U256::ZERO, tokens(4))
        .unwrap();
    sync.poll_once(w.sim.now()).unwrap();

    let bet = w.runtime.store().bet(bet_id).unwrap().unwrap();
    assert_eq!(bet.status, BetStatus::Pending);
    assert_eq!(bet.potential_winnings, tokens(400));

    // Placement point plus the capped referral reward (5% of 100).
    let points = w.runtime.store().points(bettor()).unwrap();
    assert_eq!(points.total_points, 1);
    let summary = w.runtime.referral_summary(referrer()).unwrap();
    assert_eq!(summary.total_referrals, 1);
    assert_eq!(summary.total_earnings, tokens(5));

    // --- Window closes: randomness requested exactly once ---
    w.sim.advance_time(ROUND_SECS);
    let actions = monitor.tick(w.sim.now()).unwrap();
    assert_eq!(actions, vec![Stage::RequestRandomness]);
    assert!(monitor.tick(w.sim.now()).unwrap().is_empty());

    // --- Fulfilment: both predicted legs hit ---
    let mut scores = [(0u8, 2u8); MATCHES_PER_ROUND];
    scores[0] = (3, 1); // home win
    scores[1] = (1, 1); // draw
    w.sim.fulfill_randomness(&scores).unwrap();
    sync.poll_once(w.sim.now()).unwrap();

    let detail = w.runtime.round_detail(1).unwrap().unwrap();
    assert_eq!(detail.matches[0].outcome, MatchOutcome::HomeWin);
    assert_eq!(detail.matches[1].outcome, MatchOutcome::Draw);

    // --- Settlement: the bet resolves as won, win points awarded ---
    let actions = monitor.tick(w.sim.now()).unwrap();
    assert_eq!(actions, vec![Stage::SettleRound]);
    sync.poll_once(w.sim.now()).unwrap();

    let bet = w.runtime.store().bet(bet_id).unwrap().unwrap();
    assert_eq!(bet.status, BetStatus::Won);
    let points = w.runtime.store().points(bettor()).unwrap();
    assert_eq!(points.total_points, 11);
    assert_eq!(points.bets_won, 1);

    let status = w.runtime.status(w.sim.now()).unwrap();
    assert!(status.game_state.round_settled);
    assert_eq!(status.handler_errors, 0);

    // --- Cooldown, then the next round starts and seeds ---
    w.sim.advance_time(DELAY_SECS - 1);
    assert!(monitor.tick(w.sim.now()).unwrap().is_empty());
    w.sim.advance_time(1);
    let actions = monitor.tick(w.sim.now()).unwrap();
    assert_eq!(actions, vec![Stage::StartRound, Stage::SeedRound]);
    sync.poll_once(w.sim.now()).unwrap();
    assert!(w.runtime.round_detail(2).unwrap().is_some());

    // --- A third party claims the unclaimed win for the bounty ---
    w.sim.claim_bounty(bet_id, Address::repeat_byte(0x33)).unwrap();
    sync.poll_once(w.sim.now()).unwrap();

    let bet = w.runtime.store().bet(bet_id).unwrap().unwrap();
    assert_eq!(bet.status, BetStatus::Claimed);
    let claim = w.runtime.store().bounty_claim(bet_id).unwrap().unwrap();
    assert_eq!(claim.winner, bettor());
    assert_eq!(claim.bounty_amount + claim.winner_amount, tokens(400));

    // --- Past the claim deadline plus grace: round 1 gets swept ---
    w.sim.advance_time(CLAIM_SECS + GRACE_SECS);
    let actions = monitor.tick(w.sim.now()).unwrap();
    assert!(actions.contains(&Stage::SweepRound));
    sync.poll_once(w.sim.now()).unwrap();

    assert!(w.runtime.store().sweep(1).unwrap().is_some());
    assert!(w.runtime.store().settled_unswept_rounds().unwrap().is_empty());
}

#[test]
fn test_losing_bet_and_leaderboard() {
    let w = world();
    w.runtime.monitor().bootstrap(w.sim.now()).unwrap();
    w.runtime.sync().poll_once(w.sim.now()).unwrap();

    let winner = bettor();
    let loser = Address::repeat_byte(0x44);
    let on = |outcome| {
        vec![BetLeg {
            match_index: 0,
            predicted: outcome,
        }]
    };
    let winning_bet = w
        .sim
        .place_bet(winner, on(MatchOutcome::AwayWin), tokens(20), U256::ZERO, tokens(2))
        .unwrap();
    let losing_bet = w
        .sim
        .place_bet(loser, on(MatchOutcome::HomeWin), tokens(20), U256::ZERO, tokens(2))
        .unwrap();

    w.sim.advance_time(ROUND_SECS);
    w.runtime.monitor().tick(w.sim.now()).unwrap();
    w.sim.fulfill_randomness(&[(0, 1); MATCHES_PER_ROUND]).unwrap();
    w.runtime.monitor().tick(w.sim.now()).unwrap();
    w.runtime.sync().poll_once(w.sim.now()).unwrap();

    let store = w.runtime.store();
    assert_eq!(store.bet(winning_bet).unwrap().unwrap().status, BetStatus::Won);
    assert_eq!(store.bet(losing_bet).unwrap().unwrap().status, BetStatus::Lost);

    // 11 points for place+win beats 1 point for place.
    let board = w.runtime.leaderboard(10).unwrap();
    assert_eq!(board[0].0, winner);
    assert_eq!(board[0].1.total_points, 11);
    assert_eq!(board[1].1.total_points, 1);
}

#[test]
fn test_restart_resumes_from_watermark() {
    let w = world();
    w.runtime.monitor().bootstrap(w.sim.now()).unwrap();
    w.runtime.sync().poll_once(w.sim.now()).unwrap();
    let first = w.runtime.status(w.sim.now()).unwrap();

    // Nothing new on chain: the tick is idle and the watermark holds.
    assert!(w.runtime.sync().poll_once(w.sim.now()).unwrap().is_none());
    let second = w.runtime.status(w.sim.now()).unwrap();
    assert_eq!(first.last_processed_block, second.last_processed_block);

    // New blocks extend the range from the watermark, not from genesis.
    w.sim.advance_blocks(3);
    let report = w.runtime.sync().poll_once(w.sim.now()).unwrap().unwrap();
    assert_eq!(Some(report.from_block), first.last_processed_block.map(|b| b + 1));
}
