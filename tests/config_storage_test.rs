use anyhow::Result;
use std::sync::Arc;
use tarot_spread_engine::core::credit_gate::CreditTiers;
use tarot_spread_engine::core::render::PlainTextRenderer;
use tarot_spread_engine::core::session::Identity;
use tarot_spread_engine::domain::model::{
    CommunicationMethod, FormField, LedgerRefType, Phase, ReadingType, SubmitOutcome, UserId,
};
use tarot_spread_engine::domain::ports::ReadingStore;
use tarot_spread_engine::utils::error::ErrorCategory;
use tarot_spread_engine::{Catalogue, EngineConfig, ReadingFlow, ReadingSession};
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> Result<EngineConfig> {
    let toml = format!(
        r#"
[engine]
seed = 7
platform = "test"

[credits.tiers]
THREE_CARD_DETAILED = 25

[persistence]
backend = "file"
data_dir = "{}"

[[layouts]]
layout_id = "three-card"
theme = "purple"

[[layouts.positions]]
title = "Past"
description = "What led here"

[[layouts.positions]]
title = "Present"
description = "Where you stand"

[[layouts.positions]]
title = "Future"
description = "Where it goes"
"#,
        dir.path().display()
    );
    Ok(EngineConfig::from_toml_str(&toml)?)
}

fn fill_form(session: &mut ReadingSession) -> Result<()> {
    session.update_personal_info(FormField::Name, "Mert")?;
    session.update_personal_info(FormField::Surname, "Aydin")?;
    session.update_personal_info(FormField::BirthDate, "1979-03-30")?;
    session.update_personal_info(FormField::Email, "mert@example.com")?;
    session.set_communication_method(CommunicationMethod::Email)?;
    session.update_question(FormField::Concern, "Is it time to move abroad?")?;
    session.update_question(FormField::Understanding, "What am I not seeing yet?")?;
    session.update_question(FormField::Emotional, "Restless and excited together.")?;
    session.save_form()?;
    Ok(())
}

#[tokio::test]
async fn test_config_layout_and_tier_override() -> Result<()> {
    let dir = TempDir::new()?;
    let config = file_config(&dir)?;
    let registry = config.layout_registry()?;

    // 內建 9 個加上設定檔的 1 個
    assert_eq!(registry.len(), 10);
    let tiers = CreditTiers::from_config(&config.credits, &registry)?;
    assert_eq!(tiers.cost_for("THREE_CARD_DETAILED")?, 25);
    assert_eq!(tiers.cost_for("THREE_CARD_WRITTEN")?, 50);
    assert_eq!(tiers.cost_for("LOVE_SPREAD_DETAILED")?, 60);
    assert!(tiers.cost_for("NOT_A_SPREAD_DETAILED").is_err());
    Ok(())
}

#[tokio::test]
async fn test_file_backend_survives_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let config = file_config(&dir)?;
    let user = UserId::new("user-12");

    let record = {
        let flow = ReadingFlow::from_config(&config, Arc::new(Catalogue::standard())).await?;
        flow.store().grant_credits(&user, 40, "welcome").await?;

        let mut session = flow.start("three-card", Identity::User(user.clone()))?;
        assert_eq!(
            flow.choose_reading_type(&mut session, ReadingType::Detailed).await?,
            Phase::AwaitingForm
        );
        fill_form(&mut session)?;
        while session.phase() == Phase::DrawingCards {
            session.draw_next()?;
        }
        assert_eq!(session.filled_count(), 3);

        let outcome = flow.submit(&mut session, &PlainTextRenderer).await?;
        flow.shutdown().await;
        let SubmitOutcome::Persisted { record, .. } = outcome else {
            panic!("expected a stored reading");
        };
        record
    };

    assert!(dir.path().join("ledger/state.json").exists());

    let reopened = ReadingFlow::from_config(&config, Arc::new(Catalogue::standard())).await?;
    let store = reopened.store();
    assert_eq!(store.balance(&user).await?, 15);

    let readings = store.readings_for(&user).await?;
    assert_eq!(readings, vec![record.clone()]);
    assert_eq!(readings[0].metadata.platform, "test");
    assert_eq!(readings[0].title, "threeCard.data.detailedTitle");

    let entries = store.ledger_entries(&user).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].ref_type, LedgerRefType::Grant);
    assert_eq!(entries[1].ref_type, LedgerRefType::ReadingUsage);
    assert_eq!(entries[1].delta_credits, -25);
    assert_eq!(entries[1].ref_id.as_deref(), Some(record.id.as_str()));
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_building_flow() -> Result<()> {
    let config = EngineConfig::from_toml_str(
        r#"
[engine]
reversal_probability = 1.5
"#,
    )?;

    let err = ReadingFlow::from_config(&config, Arc::new(Catalogue::standard()))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    Ok(())
}
