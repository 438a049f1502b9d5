//! End-to-end dialogue turns against a scripted backend.

use groq::{Role, ToolCall};
use npc_core::testing::{
    assert_bubble, assert_following, assert_history_len, assert_not_following, MockBackend,
    TestHarness,
};
use npc_core::{
    BehaviorState, DialogueConfig, DialogueSession, Fallback, ModelParams, PersonalityProfile,
    SubmitError,
};
use std::time::Duration;

fn follow_call(id: &str) -> ToolCall {
    ToolCall::new(id, "toggle_follow", "{}")
}

fn move_call(id: &str, object: &str) -> ToolCall {
    ToolCall::new(
        id,
        "move_to_object",
        serde_json::json!({ "objectName": object }).to_string(),
    )
}

#[tokio::test]
async fn follow_request_toggles_follow_and_records_assistant() {
    let mut harness =
        TestHarness::with_personality(PersonalityProfile::new("Pip").with_greeting("Hi!"));
    harness.expect_tool_calls(None, vec![follow_call("call_1")]);
    assert_not_following(&harness);

    let reply = harness.say("follow me").await;

    let request = harness.backend.last_request().unwrap();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert!(request.messages[0]
        .content
        .as_deref()
        .unwrap()
        .ends_with("Your first greeting should be: Hi!"));
    assert_eq!(request.messages[1].content.as_deref(), Some("follow me"));

    assert_following(&harness);
    assert_bubble(&harness, "Following you!");
    assert!(reply.text.is_none());
    assert!(reply.close_chat());
    assert_eq!(reply.dispatch.invoked.len(), 1);

    assert_history_len(&harness, 3);
    let last = harness.history().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.tool_calls, vec![follow_call("call_1")]);
}

#[tokio::test]
async fn text_and_tool_call_in_one_reply() {
    let mut harness = TestHarness::new();
    harness.expect_tool_calls(Some("On my way!"), vec![move_call("c1", "Lamp01")]);

    let reply = harness.say("go to the lamp").await;

    assert_eq!(reply.text.as_deref(), Some("On my way!"));
    assert!(!reply.close_chat());
    assert_eq!(
        harness.agent.state(),
        BehaviorState::MovingTo("lamp01".to_string())
    );
}

#[tokio::test]
async fn missing_object_leaves_agent_alone() {
    let mut harness = TestHarness::new();
    harness.expect_tool_calls(None, vec![move_call("c1", "lamp02")]);
    let before = harness.agent.flags();

    let reply = harness.say("go to lamp02").await;

    assert_eq!(harness.agent.flags(), before);
    assert!(!reply.dispatch.invoked[0].result);
    assert_bubble(&harness, "I can't find lamp02...");
}

#[tokio::test]
async fn unknown_tool_is_skipped() {
    let mut harness = TestHarness::new();
    harness.expect_tool_calls(
        Some("Let me dance."),
        vec![ToolCall::new("c1", "dance", "{}"), follow_call("c2")],
    );

    let reply = harness.say("dance, then follow").await;

    assert_eq!(reply.dispatch.skipped.len(), 1);
    assert_following(&harness);
    assert_history_len(&harness, 3);
}

#[tokio::test]
async fn malformed_body_keeps_user_message_only() {
    let mut harness = TestHarness::new();
    harness.expect_error(groq::Error::MalformedResponse("no choices".into()));

    let reply = harness.say("hello?").await;

    assert_eq!(reply.display_text(), Some("I didn't understand that."));
    assert_history_len(&harness, 2);
    assert_eq!(harness.history()[1].role, Role::User);
}

#[tokio::test]
async fn each_failure_has_its_own_line() {
    let cases = [
        (
            groq::Error::Network("connection refused".into()),
            "Sorry, I'm having trouble connecting right now.",
        ),
        (
            groq::Error::Api {
                status: 503,
                message: "over capacity".into(),
            },
            "Sorry, I'm having trouble connecting to my brain.",
        ),
        (
            groq::Error::Parse("expected value".into()),
            "Sorry, I'm having trouble responding right now.",
        ),
        (groq::Error::Timeout, "Sorry, I took too long to think. Try again?"),
    ];

    for (error, expected) in cases {
        let mut harness = TestHarness::new();
        harness.expect_error(error);
        let reply = harness.say("hi").await;
        assert_eq!(reply.display_text(), Some(expected));
        assert_history_len(&harness, 2);
    }
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out() {
    let backend = MockBackend::new().with_delay(Duration::from_secs(60));
    backend.queue_text("too late");
    let mut harness = TestHarness::with_backend(backend, PersonalityProfile::default());

    let reply = harness.say("hello").await;

    assert_eq!(reply.fallback, Some(Fallback::Timeout));
    assert_eq!(harness.backend.request_count(), 1);
    assert_history_len(&harness, 2);
}

#[tokio::test]
async fn disabled_session_sends_nothing() {
    let mut harness = TestHarness::new();
    harness.session = DialogueSession::disabled(ModelParams::default(), DialogueConfig::default());

    let reply = harness.say("hello").await;

    assert_eq!(reply.display_text(), Some("I can't talk right now."));
    assert_eq!(harness.backend.request_count(), 0);
    assert!(!harness.session.store().contains(harness.agent_id()));
}

#[tokio::test]
async fn history_stays_bounded() {
    let mut harness = TestHarness::new();
    for i in 0..12 {
        harness.expect_text(format!("reply {i}"));
        harness.say(&format!("message {i}")).await;
    }

    assert_history_len(&harness, 10);
    assert_eq!(harness.history()[0].role, Role::System);
    assert_eq!(
        harness.history().last().unwrap().content.as_deref(),
        Some("reply 11")
    );

    // The request never carries more than the bound.
    for request in harness.backend.requests() {
        assert!(request.messages.len() <= 10);
        assert_eq!(request.messages[0].role, Role::System);
    }
}

#[tokio::test]
async fn smallest_history_still_sends_player_line() {
    let mut harness = TestHarness::new().with_config(DialogueConfig {
        max_history: 1,
        ..DialogueConfig::default()
    });
    harness.expect_text("Fine.");
    harness.expect_text("Again?");
    harness.say("hello").await;
    harness.say("follow me").await;

    let request = harness.backend.last_request().unwrap();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1].role, Role::User);
    assert_eq!(request.messages[1].content.as_deref(), Some("follow me"));
}

#[tokio::test]
async fn reset_then_recent_is_empty() {
    let mut harness = TestHarness::new();
    harness.expect_text("Hello!");
    harness.say("hi").await;
    assert_eq!(harness.session.recent(harness.agent_id(), 5).len(), 2);

    let id = harness.agent_id().clone();
    let personality = harness.agent.personality().clone();
    harness.session.reset(&id, &personality);

    assert!(harness.session.recent(&id, 5).is_empty());
    assert_history_len(&harness, 1);
}

#[tokio::test]
async fn tool_results_are_recorded_when_enabled() {
    let mut harness = TestHarness::new().with_config(DialogueConfig {
        record_tool_results: true,
        ..DialogueConfig::default()
    });
    harness.expect_tool_calls(None, vec![follow_call("call_1")]);

    harness.say("follow me").await;

    assert_history_len(&harness, 4);
    let result = harness.history().last().unwrap();
    assert_eq!(result.role, Role::Tool);
    assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(result.content.as_deref(), Some("following"));
}

#[tokio::test]
async fn chat_shows_reply_and_closes_on_follow() {
    let mut harness = TestHarness::new();
    harness.expect_text("Hey!");

    let reply = harness.type_message("hello").await.unwrap();
    assert_eq!(reply.text.as_deref(), Some("Hey!"));
    assert_bubble(&harness, "Hey!");
    assert!(harness.chat.is_open());
    assert!(!harness.chat.is_pending());

    harness.expect_tool_calls(Some("Sure thing."), vec![follow_call("c1")]);
    harness.type_message("follow me").await.unwrap();
    assert!(!harness.chat.is_open());
    assert_bubble(&harness, "Sure thing.");
}

#[tokio::test]
async fn chat_keeps_tool_acknowledgment_when_reply_has_no_text() {
    let mut harness = TestHarness::new();
    harness.expect_tool_calls(None, vec![move_call("c1", "crate")]);

    harness.type_message("go to the crate").await.unwrap();

    assert_bubble(&harness, "Going to Crate!");
    assert!(harness.chat.is_open());
}

#[tokio::test]
async fn chat_rejects_blank_and_closed_input() {
    let mut harness = TestHarness::new();
    assert_eq!(
        harness.type_message("   ").await.unwrap_err(),
        SubmitError::Blank
    );

    harness.chat.hide();
    let err = harness
        .session
        .converse(&mut harness.chat, &mut harness.agent, "hi")
        .await
        .unwrap_err();
    assert_eq!(err, SubmitError::Closed);
    assert_eq!(harness.backend.request_count(), 0);
}

#[tokio::test]
async fn chat_shows_fallback_line() {
    let mut harness = TestHarness::new();
    harness.expect_error(groq::Error::Api {
        status: 401,
        message: "bad key".into(),
    });

    harness.type_message("hello").await.unwrap();

    assert_bubble(&harness, "Sorry, I'm having trouble connecting to my brain.");
}
