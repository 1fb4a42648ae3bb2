//! Terminal adapter: command parsing, command handling, and the chat loop.

use rolebot::adapters::cli::{
    handle_command, parse_command, run_chat_loop, run_chat_loop_with, stream_reply, ChatCommand, CommandOutcome,
    ReplyOutcome,
};

use crate::support::{session_with, settings, Reply, ScriptedProvider};

#[test]
fn plain_text_is_not_a_command() {
    assert_eq!(parse_command("hello there"), None);
    assert_eq!(parse_command("  你好 /role x"), None);
}

#[test]
fn slash_commands_are_parsed() {
    let cases = [
        ("/help", ChatCommand::Help),
        ("/roles", ChatCommand::Roles),
        ("/personalities", ChatCommand::Personalities),
        ("/role travel", ChatCommand::Role("travel".to_owned())),
        (
            "/pair  travel   humorous_friend ",
            ChatCommand::Pair {
                role: "travel".to_owned(),
                personality: "humorous_friend".to_owned(),
            },
        ),
        ("/reset", ChatCommand::Reset),
        ("/history", ChatCommand::History),
        ("/info", ChatCommand::Info),
        ("/quit", ChatCommand::Quit),
        ("/exit", ChatCommand::Quit),
        ("/role", ChatCommand::Usage("/role <id>")),
        ("/pair travel", ChatCommand::Usage("/pair <role> <personality>")),
        ("/dance", ChatCommand::Unknown("dance".to_owned())),
    ];
    for (line, expected) in cases {
        assert_eq!(parse_command(line), Some(expected), "{line}");
    }
}

#[test]
fn role_command_switches_and_reports() {
    let provider = ScriptedProvider::new([]);
    let (_catalog, session) = session_with(&provider, settings());
    let outcome = handle_command(&session, ChatCommand::Role("english".to_owned()));
    match outcome {
        CommandOutcome::Reply(text) => {
            assert!(text.contains("英文学习教练"));
            assert!(text.contains("耐心导师型"));
        }
        CommandOutcome::Quit => panic!("role command should not quit"),
    }
    assert_eq!(session.snapshot().role_id, "english");
}

#[test]
fn failing_command_reports_error_without_state_change() {
    let provider = ScriptedProvider::new([]);
    let (_catalog, session) = session_with(&provider, settings());
    let outcome = handle_command(&session, ChatCommand::Role("pirate".to_owned()));
    assert!(matches!(
        outcome,
        CommandOutcome::Reply(ref text) if text.starts_with("Error: unknown role 'pirate'")
    ));
    assert_eq!(session.snapshot().role_id, "default");
}

#[test]
fn roles_command_marks_current_role() {
    let provider = ScriptedProvider::new([]);
    let (_catalog, session) = session_with(&provider, settings());
    let outcome = handle_command(&session, ChatCommand::Roles);
    assert!(matches!(
        outcome,
        CommandOutcome::Reply(ref text) if text.contains("* default - 贴心生活助手 [温柔助理型]")
    ));
}

#[tokio::test]
async fn chat_loop_streams_replies_and_handles_commands() {
    let provider = ScriptedProvider::new([Reply::Chunks(vec!["Hi", " there"])]);
    let (_catalog, session) = session_with(&provider, settings());

    let input: &[u8] = "hello\n\n/role travel\n/history\n/quit\nnever sent\n".as_bytes();
    let mut output: Vec<u8> = Vec::new();
    run_chat_loop(&session, input, &mut output)
        .await
        .expect("loop completes");

    let printed = String::from_utf8(output).expect("utf8 output");
    assert!(printed.starts_with("Chatting with 小助手 as 贴心生活助手."));
    assert!(printed.contains("Hi there\n"));
    assert!(printed.contains("Switched to 旅游规划助手 (travel)"));
    assert!(printed.contains("No messages yet."));
    assert!(printed.ends_with("Bye.\n"));
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn chat_loop_reports_failures_inline() {
    let provider = ScriptedProvider::new([Reply::ConnectError("service down")]);
    let (_catalog, session) = session_with(&provider, settings());

    let input: &[u8] = b"hello\n";
    let mut output: Vec<u8> = Vec::new();
    run_chat_loop(&session, input, &mut output)
        .await
        .expect("loop completes");

    let printed = String::from_utf8(output).expect("utf8 output");
    assert!(printed.contains("Error occurred: provider unavailable: service down"));
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn cancelled_reply_is_not_recorded() {
    let provider = ScriptedProvider::new([Reply::Hang(vec!["thinking"])]);
    let (_catalog, session) = session_with(&provider, settings());

    let turn = session.submit_turn("hello").expect("turn");
    let mut output: Vec<u8> = Vec::new();
    let cancel = async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    };
    let outcome = stream_reply(turn, &mut output, cancel)
        .await
        .expect("write succeeds");

    assert_eq!(outcome, ReplyOutcome::Cancelled);
    let printed = String::from_utf8(output).expect("utf8 output");
    assert!(printed.starts_with("thinking"));
    assert!(printed.ends_with("[cancelled]\n"));
    assert!(session.history().is_empty());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn interrupt_at_prompt_ends_the_chat() {
    let provider = ScriptedProvider::new([]);
    let (_catalog, session) = session_with(&provider, settings());

    let (_keyboard, terminal) = tokio::io::duplex(64);
    let input = tokio::io::BufReader::new(terminal);
    let mut output: Vec<u8> = Vec::new();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        run_chat_loop_with(&session, input, &mut output, || async {}),
    )
    .await
    .expect("interrupt ends the loop")
    .expect("loop completes");

    let printed = String::from_utf8(output).expect("utf8 output");
    assert!(printed.ends_with("> \nBye.\n"));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn interrupt_during_reply_keeps_the_chat_running() {
    let provider = ScriptedProvider::new([
        Reply::Hang(vec!["thinking"]),
        Reply::Chunks(vec!["second answer"]),
    ]);
    let (_catalog, session) = session_with(&provider, settings());

    let (mut keyboard, terminal) = tokio::io::duplex(256);
    let input = tokio::io::BufReader::new(terminal);
    let mut output: Vec<u8> = Vec::new();
    let presses = std::sync::atomic::AtomicUsize::new(0);
    let interrupt = || {
        let press = presses.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move {
            // Only the call made for the first reply fires.
            if press == 1 {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            } else {
                std::future::pending::<()>().await;
            }
        }
    };

    let typing = async {
        use tokio::io::AsyncWriteExt;
        keyboard
            .write_all("first\nsecond\n".as_bytes())
            .await
            .expect("type input");
        drop(keyboard);
    };
    let (result, ()) = tokio::join!(
        run_chat_loop_with(&session, input, &mut output, interrupt),
        typing
    );
    result.expect("loop completes");

    let printed = String::from_utf8(output).expect("utf8 output");
    assert!(printed.contains("thinking\n[cancelled]\n"));
    assert!(printed.contains("second answer\n"));
    assert!(printed.ends_with("Bye.\n"));
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "second");
}
