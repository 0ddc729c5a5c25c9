use super::*;
use chrono::Duration;
use pretty_assertions::assert_eq;

#[test]
fn chat_is_refused_after_daily_limit() {
    let clock = clock();
    let (mut state, mut services) = mounted(&clock);

    for i in 0..CHAT_LIMIT {
        assert!(chat_round_trip(&mut state, &mut services, &format!("m{i}")));
    }
    assert_eq!(state.usage.chat_used, CHAT_LIMIT);

    let effects = user(
        &mut state,
        &mut services,
        UserAction::SubmitChat("one more".to_string()),
    );
    assert_eq!(effects, vec![ShellEffect::RequestFrame]);
    assert_eq!(state.notice, Some(Notice::LimitReached(UsageKind::Chat)));
    assert_eq!(state.transcript.len(), (CHAT_LIMIT * 2) as usize);
    assert_eq!(services.usage.remaining_messages(), 0);
}

#[test]
fn tool_quota_is_independent_of_chat_quota() {
    let clock = clock();
    let (mut state, mut services) = mounted(&clock);

    for _ in 0..TOOLS_LIMIT {
        let effects = user(
            &mut state,
            &mut services,
            UserAction::RunTool {
                tool: ToolId::Hashtags,
                input: "coffee".to_string(),
            },
        );
        let (request_id, _, _) = generated(&effects).expect("generate");
        runtime(
            &mut state,
            &mut services,
            RuntimeAction::GenerationFinished {
                request_id,
                reply: GenerationReply::Text("#coffee".to_string()),
            },
        );
    }
    let effects = user(
        &mut state,
        &mut services,
        UserAction::RunTool {
            tool: ToolId::Caption,
            input: "coffee".to_string(),
        },
    );
    assert_eq!(generated(&effects), None);
    assert_eq!(state.notice, Some(Notice::LimitReached(UsageKind::Tools)));

    assert!(chat_round_trip(&mut state, &mut services, "still chatting"));
}

#[test]
fn empty_input_does_not_spend_quota() {
    let clock = clock();
    let (mut state, mut services) = mounted(&clock);

    let effects = user(
        &mut state,
        &mut services,
        UserAction::SubmitChat("   ".to_string()),
    );
    assert!(effects.is_empty());
    assert_eq!(services.usage.remaining_messages(), CHAT_LIMIT);
}

#[test]
fn in_flight_request_blocks_without_spending() {
    let clock = clock();
    let (mut state, mut services) = mounted(&clock);

    let first = user(
        &mut state,
        &mut services,
        UserAction::SubmitChat("first".to_string()),
    );
    assert!(generated(&first).is_some());
    let second = user(
        &mut state,
        &mut services,
        UserAction::SubmitChat("second".to_string()),
    );
    assert_eq!(generated(&second), None);
    assert_eq!(state.notice, Some(Notice::Busy));
    assert_eq!(services.usage.remaining_messages(), CHAT_LIMIT - 1);
}

#[test]
fn usage_tick_after_midnight_restores_quota() {
    let clock = clock();
    let (mut state, mut services) = mounted(&clock);
    for i in 0..CHAT_LIMIT {
        chat_round_trip(&mut state, &mut services, &format!("m{i}"));
    }
    user(
        &mut state,
        &mut services,
        UserAction::SubmitChat("blocked".to_string()),
    );
    assert!(state.notice.is_some());

    // 20:00 local plus four hours crosses local midnight.
    clock.advance(Duration::hours(4));
    runtime(&mut state, &mut services, RuntimeAction::UsageTick);

    assert_eq!(state.usage.chat_used, 0);
    assert_eq!(state.usage.date, clock.today());
    assert_eq!(state.notice, None);
    assert!(chat_round_trip(&mut state, &mut services, "new day"));
}

#[test]
fn submit_after_midnight_resets_before_the_guard() {
    let clock = clock();
    let (mut state, mut services) = mounted(&clock);
    for i in 0..CHAT_LIMIT {
        chat_round_trip(&mut state, &mut services, &format!("m{i}"));
    }

    // No tick has run yet; the submission itself must see the new day.
    clock.advance(Duration::hours(5));
    assert!(chat_round_trip(&mut state, &mut services, "early bird"));
    assert_eq!(state.usage.chat_used, 1);
}
