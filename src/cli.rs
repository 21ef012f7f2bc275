use std::io::{self, BufRead, Write};

use clap::Parser;
use emoji_tales::model::{Health, Likes, Page, SearchResults, Stats, StoryRecord, StoryView};
use emoji_tales::parser::{self, Command};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Interactive client for the emoji story service", long_about = None)]
struct Args {
    #[clap(long, env = "EMOJI_TALES_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,
}

struct Client {
    http: reqwest::Client,
    base: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let client = Client {
        http: reqwest::Client::new(),
        base: args.server.trim_end_matches('/').to_string(),
    };

    print_banner();

    match client.get::<Health>("/health").await {
        Ok(h) => println!("[\u{2713}] Connected to {} (v{})!", client.base, h.version),
        Err(_) => {
            println!("[\u{2717}] Could not reach server at {}.", client.base);
            println!("    Make sure the server is running with 'cargo run --bin emoji-tales'.");
            return;
        }
    }
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("tales> ");
        if io::stdout().flush().is_err() { break; }
        buffer.clear();

        match stdin.lock().read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if buffer.trim().is_empty() { continue; }

        match parser::parse_command(&buffer) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = execute_command(&client, cmd).await {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if buffer.to_uppercase().starts_with("GENERATE") {
                    println!("    \u{2139}\u{fe0f}  Hint: Try 'GENERATE \u{1f680} \u{1f47d} GENRE sci-fi LENGTH short'");
                }
            }
        }
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   Emoji Tales CLI - Stories from Emoji");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. GENERATE:     GENERATE \u{1f680} \u{1f47d} \u{1f30d} [GENRE sci-fi] [LENGTH short]");
    println!("2. RANDOM EMOJI: RANDOM EMOJI [count] [GENRE g] [LENGTH l]");
    println!("3. RANDOM:       RANDOM");
    println!("4. GET:          GET <id>");
    println!("5. LIKE:         LIKE <id>");
    println!("6. HISTORY:      HISTORY [page] [limit]");
    println!("7. SEARCH:       SEARCH <text>");
    println!("8. STATS:        STATS");
    println!("9. HEALTH:       HEALTH");
    println!("10. EXIT:        Quit\n");
}

async fn execute_command(client: &Client, cmd: Command) -> Result<(), String> {
    match cmd {
        Command::Help => { print_help(); Ok(()) },
        Command::Generate { emojis, genre, length } => {
            let body = json!({ "emojis": emojis, "genre": genre, "length": length });
            let view: StoryView = client.post("/generate", &strip_nulls(body)).await?;
            print_view(&view);
            Ok(())
        },
        Command::RandomEmoji { count, genre, length } => {
            let body = json!({ "count": count, "genre": genre, "length": length });
            let view: StoryView = client.post("/random-emoji-story", &strip_nulls(body)).await?;
            print_view(&view);
            Ok(())
        },
        Command::Random => {
            let record: StoryRecord = client.get("/random").await?;
            print_record(&record);
            Ok(())
        },
        Command::Get { id } => {
            let record: StoryRecord = client.get(&format!("/story/{}", id)).await?;
            print_record(&record);
            Ok(())
        },
        Command::Like { id } => {
            let likes: Likes = client.post(&format!("/story/{}/like", id), &json!({})).await?;
            println!("[\u{2713} OK] {} now has {} like(s).", id, likes.likes);
            Ok(())
        },
        Command::History { page, limit } => {
            let page = page.unwrap_or(1);
            let limit = limit.unwrap_or(10);
            let result: Page = client.get(&format!("/history?page={}&limit={}", page, limit)).await?;
            let p = &result.pagination;
            println!("\nPage {} of {} ({} stories total):", p.current_page, p.pages.max(1), p.total);
            for record in &result.stories {
                println!("  \u{2022} {} | {} | {}", record.id, record.emojis.join(" "), preview(&record.story));
            }
            println!();
            Ok(())
        },
        Command::Search { query } => {
            let url = reqwest::Url::parse_with_params(&format!("{}/search", client.base), &[("query", query.as_str())])
            .map_err(|e| e.to_string())?;
            let found: SearchResults = client.send(client.http.get(url)).await?;
            println!("\nFound {} matches:", found.results.len());
            for record in &found.results {
                println!("  \u{2022} {} | {}", record.id, preview(&record.story));
            }
            println!();
            Ok(())
        },
        Command::Stats => {
            let stats: Stats = client.get("/stats").await?;
            println!("Stories generated: {}", stats.total_stories_generated);
            println!("Stories in history: {}", stats.stories_in_history);
            for (rank, e) in stats.top_emojis.iter().enumerate() {
                println!("  {}. {} x{}", rank + 1, e.emoji, e.count);
            }
            Ok(())
        },
        Command::Health => {
            let health: Health = client.get("/health").await?;
            println!("Status: {} | Uptime: {:.1}s | Version: {}", health.status, health.uptime, health.version);
            Ok(())
        },
        Command::Exit => Ok(()),
    }
}

impl Client {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        self.send(self.http.get(format!("{}{}", self.base, path))).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, String> {
        self.send(self.http.post(format!("{}{}", self.base, path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, String> {
        let resp = req.send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        let body: Value = resp.json().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            let msg = body["error"].as_str().unwrap_or("request failed");
            return Err(format!("{} ({})", msg, status));
        }
        serde_json::from_value(body).map_err(|e| e.to_string())
    }
}

/// Omits unset options so the server applies its own defaults.
fn strip_nulls(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        map.retain(|_, v| !v.is_null());
    }
    body
}

fn preview(story: &str) -> String {
    let mut short: String = story.chars().take(60).collect();
    if story.chars().count() > 60 {
        short.push_str("...");
    }
    short.replace('\n', " ")
}

fn print_view(view: &StoryView) {
    println!("\n[\u{2713} OK] {} | {} | {} | {}", view.id, view.emojis.join(" "), view.genre, view.length);
    println!("{}\n", view.story);
}

fn print_record(record: &StoryRecord) {
    println!("\n{} | {} | {} | {} | \u{2764}\u{fe0f} {}", record.id, record.emojis.join(" "), record.genre, record.length, record.likes);
    println!("{}\n", record.story);
}
