//! travel-chat: terminal client for the travel assistant backend.
//! Reads config, then either answers one question (argument or first stdin
//! line), probes `/health` or `/api/stats`, or runs an interactive chat.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;
use travel_client::config::{self, ClientConfig};
use travel_client::conversation::{QuickAction, StatusPoll, SUGGESTED_QUERIES, WELCOME_TEXT};
use travel_client::{BackendClient, ChatMessage, Conversation, Language, Preferences, TravelData};

const USAGE: &str = "usage: travel-chat [--config <path>] [--language en|local|both] [--health | --stats | --chat] [question...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ask,
    Health,
    Stats,
    Chat,
}

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    language: Option<Language>,
    mode: Mode,
    question: Vec<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        language: None,
        mode: Mode::Ask,
        question: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--language" => {
                let code = iter.next().ok_or("--language needs a value")?;
                args.language = Some(code.parse()?);
            }
            "--health" => args.mode = Mode::Health,
            "--stats" => args.mode = Mode::Stats,
            "--chat" => args.mode = Mode::Chat,
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            _ => args.question.push(arg),
        }
    }
    Ok(args)
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    // 1. --config <path> flag
    if let Some(path) = flag {
        return path;
    }
    // 2. TRAVEL_CHAT_CONFIG env var
    if let Ok(val) = std::env::var(config::CONFIG_PATH_ENV) {
        return PathBuf::from(val);
    }
    // 3. Default path (~/.travel-chat/config.yaml)
    config::default_config_path().unwrap_or_else(|| {
        eprintln!("Error: unable to determine config path (set --config or TRAVEL_CHAT_CONFIG)");
        process::exit(1);
    })
}

fn init_tracing() {
    // Logs go to stderr; stdout carries replies only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let args = parse_args().unwrap_or_else(|e| {
        eprintln!("Error: {}\n{}", e, USAGE);
        process::exit(2);
    });

    let config_path = resolve_config_path(args.config.clone());
    let cfg = match config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Error: failed to load config from {}: {}",
                config_path.display(),
                e
            );
            process::exit(1);
        }
    };

    let mut preferences = cfg.preferences();
    if let Some(language) = args.language {
        preferences.language = language;
    }

    let mut client_config = ClientConfig::from_config(&cfg);
    // Only a long-lived chat session benefits from keeping the backend warm.
    client_config.keep_alive_on_start &= args.mode == Mode::Chat;

    // Positional words form the question; otherwise read the first stdin line.
    let question = if args.mode != Mode::Ask {
        String::new()
    } else if args.question.is_empty() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).unwrap_or(0);
        line.trim().to_string()
    } else {
        args.question.join(" ").trim().to_string()
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    let code = rt.block_on(async move {
        let client = match BackendClient::new(client_config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };

        match args.mode {
            Mode::Health => run_health(&client).await,
            Mode::Stats => run_stats(&client).await,
            Mode::Chat => run_chat(&client, preferences).await,
            Mode::Ask => run_ask(&client, &preferences, &question).await,
        }
    });
    process::exit(code);
}

async fn run_health(client: &BackendClient) -> i32 {
    match client.probe_health().await {
        Ok(_) => {
            println!("online");
            0
        }
        Err(e) => {
            println!("offline");
            eprintln!("Error: health check against {} failed: {}", client.base_url(), e);
            1
        }
    }
}

async fn run_stats(client: &BackendClient) -> i32 {
    match client.fetch_stats().await {
        Ok(stats) => {
            println!("status: {}", stats.status);
            println!("cache_size: {}", stats.cache_size);
            0
        }
        Err(e) => {
            eprintln!("Error: stats request failed: {}", e);
            1
        }
    }
}

async fn run_ask(client: &BackendClient, preferences: &Preferences, question: &str) -> i32 {
    if question.is_empty() {
        eprintln!("Error: no question provided");
        return 1;
    }

    let response = match client.submit_query(question, preferences).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: query failed: {}", e);
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{}", response.reply);
    let data = TravelData {
        location_info: response.location_info,
        weather_data: response.weather_data,
        places_data: response.places_data,
    };
    let _ = write_travel_data(&mut out, &data);
    0
}

async fn run_chat(client: &BackendClient, preferences: Preferences) -> i32 {
    let mut conversation = Conversation::new(preferences);
    let healthy = client.check_health().await;
    conversation.record_health(healthy);
    // Subscribed after the first check, so only later results show up here.
    let mut health = client.subscribe_health();
    let mut poll = StatusPoll::new();

    println!("{}", WELCOME_TEXT);
    println!(
        "Backend: {} ({}). Commands: /weather <place>, /places <place>, /plan <place>, /suggest, /lang <en|local|both>, /health, /clear, /quit",
        status_label(healthy),
        client.base_url()
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut prompt = true;
    loop {
        if prompt {
            print!("> ");
            let _ = io::stdout().flush();
        }

        let read = tokio::select! {
            read = lines.next_line() => read,
            _ = poll.tick() => {
                prompt = report_change(conversation.refresh_health(client).await);
                continue;
            }
            Ok(()) = health.changed() => {
                // Keep-alive pings and /health land here as well as polls.
                let latest = *health.borrow_and_update();
                let changed = latest.filter(|h| conversation.record_health(*h));
                prompt = report_change(changed);
                continue;
            }
        };
        prompt = true;

        let line = match read {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: failed to read input: {}", e);
                break;
            }
        };
        let input = line.trim();
        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();

        let question = match command {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                conversation.clear();
                println!("{}", WELCOME_TEXT);
                continue;
            }
            "/health" => {
                let healthy = client.check_health().await;
                conversation.record_health(healthy);
                println!("Backend: {}", status_label(healthy));
                continue;
            }
            "/suggest" => {
                for query in SUGGESTED_QUERIES {
                    println!("  {}", query);
                }
                continue;
            }
            "/lang" => {
                match rest.parse::<Language>() {
                    Ok(language) => println!("{}", conversation.set_language(language).text),
                    Err(e) => eprintln!("Error: {}", e),
                }
                continue;
            }
            "/weather" | "/places" | "/plan" => {
                let action = match command {
                    "/weather" => QuickAction::Weather,
                    "/places" => QuickAction::Places,
                    _ => QuickAction::Plan,
                };
                if rest.is_empty() {
                    eprintln!("Error: {} needs a place", command);
                    continue;
                }
                format!("{}{}", action.template(), rest)
            }
            _ => input.to_string(),
        };

        match conversation.send(client, &question).await {
            Ok(reply) => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                let _ = write_message(&mut out, reply);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        }
        if let Some(error) = conversation.last_error() {
            eprintln!("Error: {}", error);
        }
    }

    client.stop_keep_alive();
    0
}

/// Print a status change on its own line. Returns whether to re-prompt.
fn report_change(changed: Option<bool>) -> bool {
    match changed {
        Some(healthy) => {
            println!("\nBackend: {}", status_label(healthy));
            true
        }
        None => false,
    }
}

fn status_label(healthy: bool) -> &'static str {
    if healthy {
        "connected"
    } else {
        "offline"
    }
}

fn write_message(out: &mut impl Write, message: &ChatMessage) -> io::Result<()> {
    writeln!(out, "{}", message.text)?;
    if let Some(data) = &message.data {
        write_travel_data(out, data)?;
    }
    Ok(())
}

fn write_travel_data(out: &mut impl Write, data: &TravelData) -> io::Result<()> {
    if let Some(location) = &data.location_info {
        writeln!(
            out,
            "\nLocation: {}, {} ({:.4}, {:.4})",
            location.name, location.country, location.lat, location.lon
        )?;
    }
    if let Some(weather) = &data.weather_data {
        write!(out, "Weather: {:.1}°C", weather.temperature)?;
        if let Some(chance) = weather.precipitation_probability {
            write!(out, ", {:.0}% chance of rain", chance)?;
        }
        if let Some(description) = &weather.description {
            write!(out, ", {}", description)?;
        }
        writeln!(out)?;
    }
    if let Some(places) = data.places_data.as_ref().filter(|p| !p.is_empty()) {
        writeln!(out, "Places:")?;
        for place in places {
            match &place.category {
                Some(category) => writeln!(out, "  - {} ({})", place.name, category)?,
                None => writeln!(out, "  - {}", place.name)?,
            }
        }
    }
    Ok(())
}
