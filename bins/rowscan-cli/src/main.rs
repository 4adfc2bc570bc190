use clap::Parser;
use rowscan_api::cursor::Cursor;
use rowscan_api::Record;
use rowscan_engine::{MemoryCursor, ScanConfig, Scanner};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "rowscan", about = "Scan a JSON result set into beer records")]
struct Cli {
    /// Result set as JSON: {"columns": [...], "rows": [[...], ...]}.
    #[arg(long, env = "ROWSCAN_INPUT")]
    input: String,

    /// Path to TOML scanner configuration. Defaults apply when omitted.
    #[arg(long, env = "ROWSCAN_CONFIG")]
    config: Option<String>,

    /// Expect exactly one row and print it as an object.
    #[arg(long)]
    one: bool,

    /// Print the field map and column plan instead of scanning.
    #[arg(long)]
    describe: bool,
}

#[derive(Debug, Default, Serialize, Record)]
struct Beer {
    #[scan(tag = "id", required)]
    id: i64,
    #[scan(tag = "name")]
    name: String,
    #[scan(tag = "consumed")]
    consumed: bool,
    #[scan(tag = "rating")]
    rating: Option<f64>,
    #[scan(tag = "tags")]
    tags: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            tracing::info!(config = %path, "loading configuration");
            match ScanConfig::load(path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load config");
                    std::process::exit(1);
                }
            }
        }
        None => ScanConfig::default(),
    };

    let json = match std::fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(input = %cli.input, error = %e, "failed to read result set");
            std::process::exit(1);
        }
    };
    let mut cursor = match MemoryCursor::from_json(&json) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(input = %cli.input, error = %e, "failed to load result set");
            std::process::exit(1);
        }
    };

    let scanner = Scanner::new(config);
    tracing::info!(
        input = %cli.input,
        rows = cursor.len(),
        columns = Cursor::columns(&cursor).len(),
        "scanning result set"
    );

    let output = if cli.describe {
        describe(&scanner, &cursor)
    } else if cli.one {
        scanner
            .scan_one_async::<Beer, _>(&mut cursor)
            .await
            .map_err(|e| e.to_string())
            .and_then(|beer| to_json(&beer))
    } else {
        match scanner.scan_all_async::<Beer, _>(&mut cursor).await {
            Ok(outcome) => {
                for skipped in &outcome.row_errors {
                    tracing::warn!(row = skipped.row, error = %skipped.error, "row skipped");
                }
                to_json(&outcome.records)
            }
            Err(e) => Err(e.to_string()),
        }
    };

    match output {
        Ok(text) => println!("{text}"),
        Err(e) => {
            tracing::error!(error = %e, "scan failed");
            std::process::exit(1);
        }
    }
}

fn describe(scanner: &Scanner, cursor: &MemoryCursor) -> Result<String, String> {
    let type_map = scanner.type_map::<Beer>().map_err(|e| e.to_string())?;
    let plan = scanner
        .plan::<Beer>(Cursor::columns(cursor))
        .map_err(|e| e.to_string())?;
    let skipped: Vec<&str> = plan
        .skipped()
        .map(|i| plan.columns()[i].as_str())
        .collect();
    to_json(&serde_json::json!({
        "fields": type_map.as_ref(),
        "plan": plan.as_ref(),
        "skipped_columns": skipped,
    }))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}
