//! Posts a prediction request to a running recommender and prints the reply.
//!
//! Usage: `request [PLACE_ID=RATING ...]`. The endpoint and optional client
//! secret come from `PREDICT_URL`, `CLIENT_SECRET` and `SECRET_HEADER`.

use anyhow::{bail, Context};
use serde::Deserialize;

use space_recommender::models::PredictionRequest;

#[derive(Debug, Deserialize)]
struct ClientConfig {
    #[serde(default = "default_predict_url")]
    predict_url: String,

    /// Sent in `secret_header` when set
    client_secret: Option<String>,

    #[serde(default = "default_secret_header")]
    secret_header: String,
}

fn default_predict_url() -> String {
    "http://127.0.0.1:3000/api/v0.1/predictions".to_string()
}

fn default_secret_header() -> String {
    "Grace-Client-Secret".to_string()
}

const SAMPLE: [(&str, f64); 2] = [
    ("101742583391038750118", 4.0),
    ("100574642292837870712", 2.0),
];

fn parse_ratings(args: &[String]) -> anyhow::Result<(Vec<String>, Vec<f64>)> {
    if args.is_empty() {
        return Ok(SAMPLE
            .iter()
            .map(|(id, rating)| (id.to_string(), *rating))
            .unzip());
    }

    let mut ids = Vec::with_capacity(args.len());
    let mut ratings = Vec::with_capacity(args.len());
    for arg in args {
        let Some((id, rating)) = arg.split_once('=') else {
            bail!("expected PLACE_ID=RATING, got {}", arg);
        };
        let rating: f64 = rating
            .parse()
            .with_context(|| format!("invalid rating in {}", arg))?;
        ids.push(id.to_string());
        ratings.push(rating);
    }

    Ok((ids, ratings))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config: ClientConfig = envy::from_env().context("Failed to load client config")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (ids, ratings) = parse_ratings(&args)?;

    let payload = PredictionRequest::new(&ids, &ratings);

    let mut request = reqwest::Client::new()
        .post(&config.predict_url)
        .json(&payload);
    if let Some(secret) = &config.client_secret {
        request = request.header(config.secret_header.as_str(), secret);
    }

    tracing::info!(url = %config.predict_url, places = ids.len(), "Sending prediction request");

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    println!("{}", status.as_u16());
    println!("{}", body);

    Ok(())
}
