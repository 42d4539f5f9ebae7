//! pg-gateway - one-shot statement runner.
//!
//! Runs a single routine call or SQL statement against the environment's
//! configured PostgreSQL database and prints the resulting records as JSON.
//! The pool is torn down after the call (auto-close), as fits a short-lived
//! script.

use clap::Parser;
use pg_gateway::config::{DbConfig, Environment};
use pg_gateway::db::params::{ParamMap, SqlValue};
use pg_gateway::db::{PoolManager, StatementExecutor};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(
    name = "pg-gateway",
    about = "Run a stored routine or SQL statement against the configured PostgreSQL database",
    version
)]
struct Cli {
    /// Routine name or SQL statement.
    /// A bare identifier is called as `SELECT * FROM name(...)`; anything
    /// containing a SQL keyword or parenthesis runs verbatim.
    spec: String,

    /// Parameters as name=value pairs, bound positionally in the order given.
    /// Values parse as JSON where possible (numbers, booleans, null), else as
    /// strings.
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Deployment environment selecting the database settings group
    #[arg(long, value_enum, env = "APP_ENV", default_value_t)]
    environment: Environment,

    /// Log level (trace, debug, info, warn, error).
    /// Ignored when RUST_LOG is set; the RUST_LOG filter takes precedence.
    #[arg(long, default_value = "warn", env = "GATEWAY_LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "GATEWAY_JSON_LOGS")]
    json_logs: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

/// Parse a `name=value` pair, preferring typed JSON values.
fn parse_param(raw: &str) -> Result<(String, SqlValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{}' (expected name=value)", raw))?;
    if name.is_empty() {
        return Err(format!("Parameter '{}' has an empty name", raw));
    }

    let value = match serde_json::from_str::<JsonValue>(value) {
        Ok(JsonValue::Null) => SqlValue::Null,
        Ok(JsonValue::Bool(b)) => SqlValue::Bool(b),
        Ok(JsonValue::Number(n)) if n.is_i64() => SqlValue::Int(n.as_i64().unwrap_or_default()),
        Ok(JsonValue::Number(n)) => SqlValue::Float(n.as_f64().unwrap_or_default()),
        Ok(JsonValue::String(s)) => SqlValue::Text(s),
        Ok(other) => SqlValue::Json(other),
        Err(_) => SqlValue::Text(value.to_string()),
    };
    Ok((name.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut params = ParamMap::new();
    for raw in &cli.params {
        let (name, value) = parse_param(raw)?;
        params.insert(name, value);
    }

    info!(
        environment = %cli.environment,
        spec = %cli.spec,
        params = params.len(),
        "Running statement"
    );

    let config = DbConfig::for_env(cli.environment);
    let manager = Arc::new(PoolManager::new(config)?);
    let executor = StatementExecutor::new(manager);

    // One-shot invocation: auto-close tears the pool down afterwards
    match executor.execute_with_options(&params, &cli.spec, true).await {
        Ok(result) => {
            let output = serde_json::json!({
                "count": result.row_count(),
                "rows": result.rows,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Statement failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_typed_values() {
        assert_eq!(
            parse_param("user_id=1").unwrap(),
            ("user_id".to_string(), SqlValue::Int(1))
        );
        assert_eq!(
            parse_param("ratio=0.5").unwrap(),
            ("ratio".to_string(), SqlValue::Float(0.5))
        );
        assert_eq!(
            parse_param("active=true").unwrap(),
            ("active".to_string(), SqlValue::Bool(true))
        );
        assert_eq!(
            parse_param("notes=null").unwrap(),
            ("notes".to_string(), SqlValue::Null)
        );
    }

    #[test]
    fn test_parse_param_falls_back_to_text() {
        assert_eq!(
            parse_param("date=2024-02-19").unwrap(),
            ("date".to_string(), SqlValue::Text("2024-02-19".to_string()))
        );
    }

    #[test]
    fn test_parse_param_rejects_malformed() {
        assert!(parse_param("no-equals-sign").is_err());
        assert!(parse_param("=5").is_err());
    }

    #[test]
    fn test_parse_param_value_may_contain_equals() {
        assert_eq!(
            parse_param("expr=a=b").unwrap(),
            ("expr".to_string(), SqlValue::Text("a=b".to_string()))
        );
    }
}
