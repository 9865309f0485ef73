use clap::Parser;
use std::sync::Arc;
use tarot_spread_engine::adapters::meanings::PositionMeaningTable;
use tarot_spread_engine::config::cli::{Command, CreditsCommand, ReadArgs};
use tarot_spread_engine::core::credit_gate::CreditTiers;
use tarot_spread_engine::core::render::renderer_for;
use tarot_spread_engine::core::session::Identity;
use tarot_spread_engine::domain::model::{FormField, Phase, SubmitOutcome, UserId};
use tarot_spread_engine::utils::error::EngineError;
use tarot_spread_engine::utils::logger;
use tarot_spread_engine::{Catalogue, CliConfig, EngineConfig, ReadingFlow, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliConfig::parse();

    let mut config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    tracing::info!("Starting tarot-spread-engine");
    if config.logging.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        if let EngineError::ValidationError(errors) = &e {
            for error in errors.iter() {
                eprintln!("  • {}: {}", error.field, error.message_key);
            }
        }
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &EngineConfig) -> Result<()> {
    let flow = ReadingFlow::from_config(config, Arc::new(Catalogue::standard())).await?;

    match &cli.command {
        Command::Layouts => list_layouts(&flow, config),
        Command::Read(args) => read(flow_with_meanings(flow, args).await?, args).await,
        Command::Credits(command) => credits(&flow, command).await,
    }
}

async fn flow_with_meanings(flow: ReadingFlow, args: &ReadArgs) -> Result<ReadingFlow> {
    match &args.meanings {
        Some(path) => {
            let table = PositionMeaningTable::from_json_file(path).await?;
            tracing::info!("Loaded {} position meanings from {}", table.len(), path);
            Ok(flow.with_lookup(Arc::new(table)))
        }
        None => Ok(flow),
    }
}

fn list_layouts(flow: &ReadingFlow, config: &EngineConfig) -> Result<()> {
    let tiers = CreditTiers::from_config(&config.credits, flow.registry())?;

    for layout in flow.registry().iter() {
        let keys = &layout.credit_tier_keys;
        println!(
            "{} {:<24} {:>2} cards  detailed {:>3}  written {:>3}",
            layout.icon,
            layout.layout_id,
            layout.position_count,
            tiers.cost_for(&keys.detailed)?,
            tiers.cost_for(&keys.written)?,
        );
    }
    Ok(())
}

async fn read(flow: ReadingFlow, args: &ReadArgs) -> Result<()> {
    let identity = match &args.user {
        Some(user) => Identity::User(UserId::new(user.as_str())),
        None => Identity::Guest,
    };
    let mut session = flow.start(&args.layout, identity)?;

    let phase = flow.choose_reading_type(&mut session, args.reading_type).await?;
    if phase == Phase::AwaitingForm {
        let fields = [
            (FormField::Name, &args.name),
            (FormField::Surname, &args.surname),
            (FormField::BirthDate, &args.birth_date),
            (FormField::Email, &args.email),
            (FormField::Phone, &args.phone),
        ];
        for (field, value) in fields {
            session.update_personal_info(field, value.as_str())?;
        }
        session.update_question(FormField::Concern, args.concern.as_str())?;
        session.update_question(FormField::Understanding, args.understanding.as_str())?;
        session.update_question(FormField::Emotional, args.emotional.as_str())?;
        session.set_communication_method(args.contact)?;
        session.save_form()?;
    }

    for card_id in &args.cards {
        session.draw(*card_id)?;
    }
    while session.phase() == Phase::DrawingCards {
        session.draw_next()?;
    }

    let renderer = renderer_for(args.format);
    let interpretation = flow.interpret(&session)?;
    println!("{}", renderer.render(&interpretation));

    let outcome = flow.submit(&mut session, renderer.as_ref()).await;
    flow.shutdown().await;

    match outcome? {
        SubmitOutcome::Persisted { record, replayed } => {
            println!();
            println!("✅ Reading saved as {}", record.id);
            if replayed {
                println!("ℹ️  Already saved earlier, no additional charge");
            } else if record.cost_credits > 0 {
                println!("💳 {} credits charged", record.cost_credits);
            }
        }
        SubmitOutcome::GuestNotPersisted => {
            println!();
            println!("ℹ️  Guest reading, sign in to keep your readings");
        }
    }
    Ok(())
}

async fn credits(flow: &ReadingFlow, command: &CreditsCommand) -> Result<()> {
    let store = flow.store();

    match command {
        CreditsCommand::Grant { user, amount, reason } => {
            let balance = store
                .grant_credits(&UserId::new(user.as_str()), *amount, reason)
                .await?;
            println!("✅ Granted {} credits to {}, balance {}", amount, user, balance);
        }
        CreditsCommand::Balance { user } => {
            let balance = store.balance(&UserId::new(user.as_str())).await?;
            println!("{} has {} credits", user, balance);
        }
        CreditsCommand::History { user } => {
            let user_id = UserId::new(user.as_str());
            for entry in store.ledger_entries(&user_id).await? {
                println!(
                    "{}  {:>+5}  {:<14} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.delta_credits,
                    format!("{:?}", entry.ref_type),
                    entry.reason
                );
            }
            let readings = store.readings_for(&user_id).await?;
            println!("{} stored reading(s)", readings.len());
        }
    }
    Ok(())
}
