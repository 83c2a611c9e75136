//! Query command for hr-metrics

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::models::MinuteSample;
use crate::query::QueryRequest;
use crate::service::Service;
use crate::validate;

#[derive(Serialize)]
struct QueryResponse<'a> {
    user_id: &'a str,
    data: &'a [MinuteSample],
    count: usize,
}

/// Print the per-minute series for a user
pub async fn run(
    config: Config,
    user_id: String,
    start: String,
    end: String,
    device_id: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = QueryRequest::parse(user_id, &start, &end, device_id)?;
    validate::check_range(request.start, request.end)?;

    let service = Service::start(config)?;
    let result = service.query(&request).await;
    service.shutdown().await?;
    let samples = result?;

    print!("{}", render(&request.user_id, &samples, format)?);
    Ok(())
}

fn render(user_id: &str, samples: &[MinuteSample], format: OutputFormat) -> Result<String> {
    let mut out = String::new();

    match format {
        OutputFormat::Json => {
            let response = QueryResponse {
                user_id,
                data: samples,
                count: samples.len(),
            };
            out.push_str(&serde_json::to_string_pretty(&response)?);
            out.push('\n');
        }
        OutputFormat::Csv => {
            out.push_str("timestamp,heart_rate,device_id\n");
            for sample in samples {
                out.push_str(&format!(
                    "{},{:.2},{}\n",
                    sample.timestamp_str(),
                    sample.heart_rate,
                    sample.device_id
                ));
            }
        }
        OutputFormat::Table => {
            if samples.is_empty() {
                out.push_str(&format!("No data found for user {}\n", user_id));
                return Ok(out);
            }
            out.push_str(&format!("{:<22} {:>10}  {}\n", "Timestamp", "Heart Rate", "Device"));
            out.push_str(&format!("{}\n", "-".repeat(50)));
            for sample in samples {
                out.push_str(&format!(
                    "{:<22} {:>10.2}  {}\n",
                    sample.timestamp_str(),
                    sample.heart_rate,
                    sample.device_id
                ));
            }
            out.push_str(&format!("\n{} minute(s)\n", samples.len()));
        }
    }

    Ok(out)
}
