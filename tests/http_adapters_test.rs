use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tarot_spread_engine::adapters::http_credit_gate::HttpCreditGate;
use tarot_spread_engine::adapters::http_notifier::HttpNotifier;
use tarot_spread_engine::core::render::MarkdownRenderer;
use tarot_spread_engine::core::session::Identity;
use tarot_spread_engine::domain::model::{FormField, Phase, ReadingType, SubmitOutcome, UserId};
use tarot_spread_engine::domain::ports::{CreditGate, Notifier, ReadingStore};
use tarot_spread_engine::{Catalogue, EngineConfig, EngineError, ReadingFlow};

#[tokio::test]
async fn test_credit_gate_queries_status_endpoint() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/credits/status")
                .query_param("userId", "user-9")
                .query_param("readingTypeKey", "LOVE_SPREAD_DETAILED");
            then.status(200).json_body(json!({
                "hasEnoughCredits": true,
                "requiredCredits": 60,
                "currentCredits": 150
            }));
        })
        .await;

    let gate = HttpCreditGate::new(&server.url("/api"), Duration::from_secs(2))?;
    let status = gate
        .get_status(&UserId::new("user-9"), "LOVE_SPREAD_DETAILED")
        .await?;

    mock.assert_async().await;
    assert!(status.has_enough_credits);
    assert_eq!(status.required_credits, 60);
    assert_eq!(status.current_credits, 150);
    Ok(())
}

#[tokio::test]
async fn test_credit_gate_error_status_is_an_http_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/credits/status");
            then.status(503);
        })
        .await;

    let gate = HttpCreditGate::new(&server.base_url(), Duration::from_secs(2))?;
    let err = gate
        .get_status(&UserId::new("user-9"), "CAREER_SPREAD_WRITTEN")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::HttpError(_)));
    assert!(err.is_retryable());
    Ok(())
}

#[test]
fn test_credit_gate_rejects_bad_base_url() {
    let result = HttpCreditGate::new("not a url", Duration::from_secs(1));
    assert!(matches!(
        result,
        Err(EngineError::InvalidConfigValueError { .. })
    ));
}

#[tokio::test]
async fn test_notifier_posts_reading_id() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hooks/readings")
                .header("content-type", "application/json")
                .json_body(json!({ "readingId": "r-123" }));
            then.status(202);
        })
        .await;

    let notifier = HttpNotifier::new(&server.url("/hooks/readings"), Duration::from_secs(2))?;
    notifier.reading_created("r-123").await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_notifier_non_success_is_an_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/hooks/readings");
            then.status(500);
        })
        .await;

    let notifier = HttpNotifier::new(&server.url("/hooks/readings"), Duration::from_secs(2))?;
    let err = notifier.reading_created("r-123").await.unwrap_err();
    assert!(matches!(err, EngineError::PersistenceError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_flow_with_remote_endpoints() -> Result<()> {
    let server = MockServer::start_async().await;
    let status_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/credits/status")
                .query_param("userId", "user-5")
                .query_param("readingTypeKey", "MONEY_SPREAD_WRITTEN");
            then.status(200).json_body(json!({
                "hasEnoughCredits": true,
                "requiredCredits": 50,
                "currentCredits": 50
            }));
        })
        .await;
    let notify_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/notify").body_contains("readingId");
            then.status(200);
        })
        .await;

    let toml = format!(
        r#"
[engine]
seed = 11

[credits]
endpoint = "{}"

[notification]
endpoint = "{}"
"#,
        server.base_url(),
        server.url("/notify")
    );
    let config = EngineConfig::from_toml_str(&toml)?;
    let flow = ReadingFlow::from_config(&config, Arc::new(Catalogue::standard())).await?;

    let user = UserId::new("user-5");
    // 遠端 gate 只是參考；實際扣款在 store 內
    flow.store().grant_credits(&user, 50, "purchase").await?;

    let mut session = flow.start("money", Identity::User(user.clone()))?;
    assert_eq!(
        flow.choose_reading_type(&mut session, ReadingType::Written).await?,
        Phase::AwaitingForm
    );
    status_mock.assert_async().await;

    session.update_personal_info(FormField::Name, "Ada")?;
    session.update_personal_info(FormField::Surname, "Lovel")?;
    session.update_personal_info(FormField::BirthDate, "1990-12-10")?;
    session.update_personal_info(FormField::Email, "ada@example.com")?;
    session.update_personal_info(FormField::Phone, "+441234567")?;
    session.update_question(
        FormField::Concern,
        "Should I invest in my own studio?",
    )?;
    session.update_question(
        FormField::Understanding,
        "What blocks my savings every month?",
    )?;
    session.update_question(
        FormField::Emotional,
        "Hopeful, a bit anxious overall.",
    )?;
    session.save_form()?;
    while session.phase() == Phase::DrawingCards {
        session.draw_next()?;
    }

    let outcome = flow.submit(&mut session, &MarkdownRenderer).await?;
    flow.shutdown().await;

    let SubmitOutcome::Persisted { record, replayed } = outcome else {
        panic!("authenticated reading should be persisted");
    };
    assert!(!replayed);
    assert_eq!(record.cost_credits, 50);
    assert_eq!(record.metadata.reading_format, ReadingType::Written);
    assert_eq!(flow.store().balance(&user).await?, 0);
    notify_mock.assert_async().await;
    Ok(())
}
