//! Replays one session id against a running server from many clients at once,
//! the way a flurry of success page reloads would, then checks the counter
//! moved by at most one.
use anyhow::{Context, bail};
use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server base URL, e.g. http://localhost:3000
    base_url: String,

    session_id: String,

    #[arg(short, long, default_value_t = 20)]
    concurrency: usize,
}

#[derive(Deserialize, Debug)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize, Debug)]
struct RegisterResponse {
    count: u64,
    ok: bool,
}

async fn fetch_count(client: &Client, base_url: &str) -> anyhow::Result<u64> {
    let response: CountResponse = client
        .get(format!("{base_url}/count"))
        .send()
        .await
        .context("GET /count failed")?
        .json()
        .await
        .context("GET /count returned an unexpected body")?;

    Ok(response.count)
}

async fn register(
    client: Client,
    url: String,
    session_id: String,
) -> anyhow::Result<RegisterResponse> {
    client
        .post(url)
        .json(&json!({ "session_id": session_id }))
        .send()
        .await
        .context("POST /register-entry failed")?
        .json()
        .await
        .context("POST /register-entry returned an unexpected body")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let base_url = args.base_url.trim_end_matches('/').to_string();
    let client = Client::new();

    let before = fetch_count(&client, &base_url).await?;
    println!("Count before: {before}");

    let mut tasks = JoinSet::new();
    for _ in 0..args.concurrency {
        tasks.spawn(register(
            client.clone(),
            format!("{base_url}/register-entry"),
            args.session_id.clone(),
        ));
    }

    let mut not_counted = 0;
    while let Some(result) = tasks.join_next().await {
        let response = result??;
        println!("count: {}, ok: {}", response.count, response.ok);

        if !response.ok {
            not_counted += 1;
        }
    }

    let after = fetch_count(&client, &base_url).await?;
    println!("Count after: {after}");
    println!("Not counted: {not_counted}/{}", args.concurrency);

    if after > before + 1 {
        bail!("Counter moved by {} for a single session id", after - before);
    }

    Ok(())
}
