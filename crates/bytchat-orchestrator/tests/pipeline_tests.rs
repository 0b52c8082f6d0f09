// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests against mock providers and an in-memory ledger.

use std::sync::Arc;

use bytchat_core::normalize::apology;
use bytchat_core::{FailureKind, OwnerIdentity, ProviderAdapter, ProviderKind, RosterEntry, TaskType};
use bytchat_orchestrator::{AnswerStream, PipelineSettings, RequestOrchestrator};
use bytchat_quota::PlanTier;
use bytchat_test_utils::{MockProvider, MockRetriever, StaticBotDirectory, TestHarness};
use futures::StreamExt;
use tracing_test::traced_test;

const BOT: i64 = 10;
const OWNER: i64 = 77;

struct Fixture {
    harness: TestHarness,
    openai: Arc<MockProvider>,
    retriever: Arc<MockRetriever>,
    orchestrator: RequestOrchestrator,
}

async fn fixture(roster: Vec<RosterEntry>) -> Fixture {
    let harness = TestHarness::new().await.expect("harness");
    let openai = Arc::new(MockProvider::new(ProviderKind::OpenAi));
    let retriever = Arc::new(MockRetriever::empty());
    let orchestrator = RequestOrchestrator::new(
        Arc::new(StaticBotDirectory::new().with_bot(BOT, roster)),
        retriever.clone(),
        vec![openai.clone() as Arc<dyn ProviderAdapter>],
        harness.ledger.clone(),
        PipelineSettings::from_config(&harness.config),
    );
    Fixture {
        harness,
        openai,
        retriever,
        orchestrator,
    }
}

fn gpt4o_roster() -> Vec<RosterEntry> {
    vec![RosterEntry::new(TaskType::General, ProviderKind::OpenAi, "gpt-4o")]
}

async fn collect(stream: AnswerStream) -> Vec<String> {
    stream.collect().await
}

#[tokio::test]
async fn free_account_without_credits_is_refused() {
    let f = fixture(gpt4o_roster()).await;
    f.harness
        .account_with_credits(OWNER, PlanTier::Free, 0)
        .await
        .unwrap();

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "hi", true)).await;

    assert_eq!(out, vec![FailureKind::QuotaExceeded.user_message().to_string()]);
    assert_eq!(f.openai.complete_calls(), 0);
    assert_eq!(f.openai.stream_calls(), 0);
    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 0);
}

#[tokio::test]
async fn metered_answer_is_billed_and_sent_whole() {
    let f = fixture(gpt4o_roster()).await;
    f.harness
        .account_with_credits(OWNER, PlanTier::Pro, 100)
        .await
        .unwrap();
    // 1000 in * 0.005 + 200 out * 0.015 = $0.008 = 8 credits
    f.openai.push_completion("The answer is 42.", 1000, 200).await;

    let out = collect(f.orchestrator.handle_query(
        OwnerIdentity::Tracked(OWNER),
        BOT,
        "what is the answer?",
        true,
    ))
    .await;

    assert_eq!(out, vec!["The answer is 42.".to_string()]);
    assert_eq!(f.openai.stream_calls(), 0);
    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 1);
    let account = f.harness.ledger.account(OWNER).await.unwrap().unwrap();
    assert_eq!(account.credits_remaining, 92);
    assert_eq!(account.overage_used, 0);
}

#[tokio::test]
async fn paid_shortfall_spills_into_overage() {
    let f = fixture(gpt4o_roster()).await;
    f.harness
        .account_with_credits(OWNER, PlanTier::Pro, 2)
        .await
        .unwrap();
    f.openai.push_completion("done", 1000, 200).await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "go", true)).await;

    assert_eq!(out, vec!["done".to_string()]);
    let account = f.harness.ledger.account(OWNER).await.unwrap().unwrap();
    assert_eq!(account.credits_remaining, 0);
    assert_eq!(account.overage_used, 6);
}

#[tokio::test]
async fn stream_error_is_passed_through_unbilled() {
    let f = fixture(gpt4o_roster()).await;
    f.openai.push_failing_stream(&["Hel"]).await;

    let out = collect(f.orchestrator.handle_query(
        OwnerIdentity::Anonymous("visitor-1".into()),
        BOT,
        "hello",
        true,
    ))
    .await;

    assert_eq!(out, vec!["Hel".to_string(), apology("openai")]);
    assert_eq!(f.openai.complete_calls(), 0);
    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 0);
}

#[tokio::test]
async fn tracked_owner_without_metrics_streams_unbilled() {
    let f = fixture(gpt4o_roster()).await;
    f.openai.push_stream(&["a", "b", "c"]).await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "letters", false)).await;

    assert_eq!(out, vec!["a", "b", "c"]);
    assert_eq!(f.openai.complete_calls(), 0);
    assert!(f.harness.ledger.account(OWNER).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_metered_call_falls_back_to_streaming_once() {
    let f = fixture(gpt4o_roster()).await;
    f.harness
        .account_with_credits(OWNER, PlanTier::Pro, 100)
        .await
        .unwrap();
    f.openai.push_completion_failure().await;
    f.openai.push_stream(&["streamed ", "instead"]).await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "hi", true)).await;

    assert_eq!(out.concat(), "streamed instead");
    assert_eq!(f.openai.complete_calls(), 1);
    assert_eq!(f.openai.stream_calls(), 1);
    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 0);
    let account = f.harness.ledger.account(OWNER).await.unwrap().unwrap();
    assert_eq!(account.credits_remaining, 100);
}

#[tokio::test]
#[traced_test]
async fn ledger_failure_still_delivers_answer() {
    let f = fixture(gpt4o_roster()).await;
    f.harness
        .account_with_credits(OWNER, PlanTier::Pro, 100)
        .await
        .unwrap();
    f.harness.break_usage_table().await.unwrap();
    f.openai.push_completion("still here", 50, 50).await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "hi", true)).await;

    assert_eq!(out, vec!["still here".to_string()]);
    assert_eq!(f.openai.stream_calls(), 0);
    assert!(logs_contain("needs reconciliation"));
    // the debit rolled back with the failed insert
    let account = f.harness.ledger.account(OWNER).await.unwrap().unwrap();
    assert_eq!(account.credits_remaining, 100);
}

#[tokio::test]
#[traced_test]
async fn unreadable_ledger_refuses_metered_query() {
    let f = fixture(gpt4o_roster()).await;
    f.harness.break_account_table().await.unwrap();
    f.openai.push_completion("should not be sent", 10, 10).await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "hi", true)).await;

    assert_eq!(out, vec![apology("billing")]);
    assert_eq!(out[0], FailureKind::BillingUnavailable.user_message());
    assert_eq!(f.openai.complete_calls(), 0);
    assert_eq!(f.openai.stream_calls(), 0);
    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 0);
    assert!(logs_contain("admission check failed"));
}

#[tokio::test]
async fn unknown_bot_gets_apology_without_provider_call() {
    let f = fixture(gpt4o_roster()).await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT + 1, "hi", true)).await;

    assert_eq!(out, vec![FailureKind::BotNotFound.user_message().to_string()]);
    assert_eq!(f.retriever.calls(), 0);
    assert_eq!(f.openai.stream_calls() + f.openai.complete_calls(), 0);
}

#[tokio::test]
async fn empty_roster_gets_no_model_message() {
    let f = fixture(vec![
        RosterEntry::new(TaskType::General, ProviderKind::OpenAi, "gpt-4o").inactive(),
    ])
    .await;

    let out = collect(f.orchestrator.handle_query(OwnerIdentity::Tracked(OWNER), BOT, "hi", true)).await;

    assert_eq!(out, vec![FailureKind::NoModelAvailable.user_message().to_string()]);
    assert_eq!(f.retriever.calls(), 1);
    assert_eq!(f.openai.stream_calls() + f.openai.complete_calls(), 0);
    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 0);
}

#[tokio::test]
async fn complex_query_routes_to_complex_entry() {
    let f = fixture(vec![
        RosterEntry::new(TaskType::General, ProviderKind::OpenAi, "gpt-4o-mini"),
        RosterEntry::new(TaskType::Complex, ProviderKind::OpenAi, "gpt-4o"),
    ])
    .await;

    collect(f.orchestrator.handle_query(
        OwnerIdentity::Anonymous("v".into()),
        BOT,
        "Summarize this text",
        false,
    ))
    .await;

    assert_eq!(f.openai.last_prompt().await.unwrap().1, "gpt-4o");
}

#[tokio::test]
async fn nothing_runs_until_polled() {
    let f = fixture(gpt4o_roster()).await;

    let mut stream = f
        .orchestrator
        .handle_query(OwnerIdentity::Anonymous("v".into()), BOT, "hi", false);
    assert_eq!(f.retriever.calls(), 0);
    assert_eq!(f.openai.stream_calls(), 0);

    assert_eq!(stream.next().await.as_deref(), Some("mock "));
    assert_eq!(f.retriever.calls(), 1);
    assert_eq!(f.openai.stream_calls(), 1);
    drop(stream);
}

#[tokio::test]
async fn concurrent_metered_queries_all_bill() {
    let f = fixture(gpt4o_roster()).await;
    f.harness
        .account_with_credits(OWNER, PlanTier::Pro, 1000)
        .await
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let orchestrator = f.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .handle_query(OwnerIdentity::Tracked(OWNER), BOT, format!("question {i}"), true)
                    .collect::<Vec<_>>()
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), vec!["mock response".to_string()]);
    }

    assert_eq!(f.harness.usage_count(OWNER).await.unwrap(), 10);
    // default mock usage is 10 in / 20 out on gpt-4o: 0.00035 USD rounds to the 1-credit minimum
    let account = f.harness.ledger.account(OWNER).await.unwrap().unwrap();
    assert_eq!(account.credits_remaining, 990);
}
