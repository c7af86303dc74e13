//! Runs one study end to end against a scripted simulation client and
//! prints the final report as JSON. Useful for smoke-testing the search
//! loop without a live simulation service.

use std::sync::Arc;

use at_search::ParameterSpace;
use at_study::{StubSimulationClient, StudyController};
use at_types::{metric, ParamValue, RawResult, Region, StudyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let budget: usize = std::env::var("ALPHATUNE_TRIAL_BUDGET")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    let space = ParameterSpace::new()
        .add_categorical("universe", ["TOP3000", "TOP1000", "TOP500"])
        .add_categorical("neutralization", ["INDUSTRY", "MARKET", "SECTOR"])
        .add_int("delay", 0, 1)
        .add_categorical("maxTrade", ["ON", "OFF"]);

    // Scripted landscape: sharpe peaks at TOP1000 / INDUSTRY / delay 0.
    let client = Arc::new(StubSimulationClient::new(|_, request| {
        let mut sharpe = 0.8;
        if request.configuration.get("universe") == Some(&ParamValue::Text("TOP1000".into())) {
            sharpe += 0.6;
        }
        if request.configuration.get("neutralization")
            == Some(&ParamValue::Text("INDUSTRY".into()))
        {
            sharpe += 0.4;
        }
        if request.configuration.get("delay") == Some(&ParamValue::Int(0)) {
            sharpe += 0.2;
        }
        Ok(RawResult::new()
            .with_metric(metric::SHARPE, sharpe)
            .with_metric(metric::FITNESS, 1.0 + sharpe / 2.0)
            .with_metric(metric::SELF_CORRELATION, 0.4))
    }));

    let config = StudyConfig::new("stub_smoke", "close / open - 1", Region::Usa)
        .with_trial_budget(budget)
        .with_seed(7);

    let controller = StudyController::new(config, space, client)?;
    let report = controller.run().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
