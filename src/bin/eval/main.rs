//! One-shot evaluation tool
//!
//! Runs a full moderation evaluation against the live database and prints the
//! outcome as JSON. Useful for checking what the rules make of a specific
//! piece of content, or for re-triggering automation after a config change.
//!
//! Usage: modwatch-eval <content_type> <content_id> [create|update|publish]

use env_logger::Env;
use modwatch::config::ModerationConfig;
use modwatch::db::{get_db_pool, init_db};
use modwatch::moderation::{ContentType, ModerationEngine};
use modwatch::orm::moderation_signals::TriggerSource;
use std::str::FromStr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();

    let args: Vec<String> = std::env::args().collect();
    let (content_type, content_id, trigger) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("Usage: modwatch-eval <content_type> <content_id> [create|update|publish]");
            std::process::exit(2);
        }
    };

    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    let config = ModerationConfig::load().unwrap_or_else(|err| {
        log::warn!("Failed to load moderation config, using defaults: {}", err);
        ModerationConfig::default()
    });

    let engine = ModerationEngine::with_database(config, get_db_pool().clone());
    let evaluation = engine.evaluate(content_type, content_id, trigger).await?;

    let summary = serde_json::json!({
        "target": evaluation.target.to_string(),
        "trigger": evaluation.trigger.as_str(),
        "score": evaluation.score,
        "severity": evaluation.severity.as_str(),
        "recommended_action": evaluation.recommended_action.as_str(),
        "triggered_rules": evaluation.triggered_rules,
        "text_signals": evaluation.text_signals,
        "activity_signals": evaluation.activity_signals,
        "automation": evaluation.automation,
        "record_id": evaluation.record.as_ref().map(|row| row.id),
        "record_status": evaluation.record.as_ref().map(|row| row.status.as_str()),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

fn parse_args(args: &[String]) -> Result<(ContentType, i32, TriggerSource), String> {
    if args.len() < 3 {
        return Err("Missing arguments.".to_string());
    }
    let content_type = ContentType::from_str(&args[1]).map_err(|err| err.to_string())?;
    let content_id = args[2]
        .parse::<i32>()
        .map_err(|_| format!("Invalid content id: {}", args[2]))?;
    let trigger = match args.get(3).map(|arg| arg.as_str()) {
        None | Some("update") => TriggerSource::Update,
        Some("create") => TriggerSource::Create,
        Some("publish") => TriggerSource::Publish,
        Some(other) => return Err(format!("Invalid trigger: {}", other)),
    };
    Ok((content_type, content_id, trigger))
}
