mod common;

use std::time::{Duration, Instant};

use alloy_primitives::U256;
use raffle_deploy::{Error, RaffleEvent, WaitState};

use common::setup;

// Test the wait settles on an event produced by the trigger
#[tokio::test]
async fn test_wait_settles_on_triggered_event() {
    let ctx = setup().await;

    let mut wait = ctx
        .raffle
        .once(RaffleEvent::RAFFLE_ENTER, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(ctx.chain.listener_count(), 1);

    let trigger = async {
        ctx.raffle.enter_raffle(ctx.entrance_fee).await?;
        Ok::<(), Error>(())
    };
    let player = wait
        .settle(trigger, |event| async move {
            match event {
                RaffleEvent::RaffleEnter { player } => Ok(player),
                other => panic!("unexpected event {other:?}"),
            }
        })
        .await
        .unwrap();

    assert_eq!(player, ctx.deployer);
    assert_eq!(wait.state(), WaitState::Settled);
    assert_eq!(ctx.chain.listener_count(), 0);
}

// Test a missing event times out and releases the listener
#[tokio::test]
async fn test_wait_times_out_and_cancels() {
    let ctx = setup().await;

    let mut wait = ctx
        .raffle
        .once(RaffleEvent::WINNER_PICKED, Duration::from_millis(200))
        .await
        .unwrap();

    // Entering never picks a winner
    let trigger = async {
        ctx.raffle.enter_raffle(ctx.entrance_fee).await?;
        Ok::<(), Error>(())
    };
    let err = wait
        .settle(trigger, |_| async { Ok::<(), Error>(()) })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { ref event, .. } if event == "WinnerPicked"));
    assert_eq!(wait.state(), WaitState::Waiting);
    assert!(!wait.is_listening());
    assert_eq!(ctx.chain.listener_count(), 0);
}

// Test events emitted before registration are not seen
#[tokio::test]
async fn test_wait_ignores_events_before_registration() {
    let ctx = setup().await;

    ctx.raffle.enter_raffle(ctx.entrance_fee).await.unwrap();

    let mut wait = ctx
        .raffle
        .once(RaffleEvent::RAFFLE_ENTER, Duration::from_millis(200))
        .await
        .unwrap();
    let err = wait
        .settle(async { Ok::<(), Error>(()) }, |_| async { Ok::<(), Error>(()) })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }));
}

// Test a failing trigger is reported and still cancels the listener
#[tokio::test]
async fn test_wait_propagates_trigger_failure() {
    let ctx = setup().await;

    let mut wait = ctx
        .raffle
        .once(RaffleEvent::WINNER_PICKED, Duration::from_secs(5))
        .await
        .unwrap();

    let trigger = async {
        ctx.raffle.enter_raffle(U256::ZERO).await?;
        Ok::<(), Error>(())
    };
    let err = wait
        .settle(trigger, |_| async { Ok::<(), Error>(()) })
        .await
        .unwrap_err();

    assert_eq!(err.revert_reason().as_deref(), Some("Raffle__NotEnoughETHEntered"));
    assert_eq!(ctx.chain.listener_count(), 0);
}

// Test a failing verification rejects the wait
#[tokio::test]
async fn test_wait_propagates_verification_failure() {
    let ctx = setup().await;

    let mut wait = ctx
        .raffle
        .once(RaffleEvent::RAFFLE_ENTER, Duration::from_secs(5))
        .await
        .unwrap();

    let trigger = async {
        ctx.raffle.enter_raffle(ctx.entrance_fee).await?;
        Ok::<(), Error>(())
    };
    // No player at index 1 yet
    let raffle = &ctx.raffle;
    let err = wait
        .settle(trigger, |_| async move { raffle.player(1).await })
        .await
        .unwrap_err();

    assert_eq!(err.revert_reason().as_deref(), Some("panic code 0x32"));
    assert_eq!(wait.state(), WaitState::Settled);
}

// Test a slow verification counts against the same timeout
#[tokio::test]
async fn test_wait_times_out_during_verification() {
    let ctx = setup().await;

    let mut wait = ctx
        .raffle
        .once(RaffleEvent::RAFFLE_ENTER, Duration::from_millis(200))
        .await
        .unwrap();

    let trigger = async {
        ctx.raffle.enter_raffle(ctx.entrance_fee).await?;
        Ok::<(), Error>(())
    };
    let started = Instant::now();
    let err = wait
        .settle(trigger, |_| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok::<(), Error>(())
        })
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(err, Error::Timeout { ref event, .. } if event == "RaffleEnter"));
    // The event itself did fire
    assert_eq!(wait.state(), WaitState::Settled);
    assert_eq!(ctx.chain.listener_count(), 0);
}

// Test only declared events can be awaited
#[tokio::test]
async fn test_unknown_event_is_rejected() {
    let ctx = setup().await;

    let err = ctx
        .raffle
        .once("WinnerPaid", Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownEvent(name) if name == "WinnerPaid"));
    assert_eq!(ctx.chain.listener_count(), 0);
}
