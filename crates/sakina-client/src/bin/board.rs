use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::debug;
use uuid::Uuid;

use sakina_client::board::{Board, Submission};
use sakina_client::config::ClientConfig;
use sakina_client::geocode::{Geocoder, OpenMeteoGeocoder};
use sakina_client::identity::IdentityGate;
use sakina_client::prayer::{AladhanClient, DailyTimes, Prayer, PrayerTimeProvider, format_12h};
use sakina_client::profile::{LocalProfileStore, LocationMode};
use sakina_client::share::{format_share_text_for, share_links};
use sakina_client::store::{EmbeddedPostStore, FeedStatus, PostStore, RemotePostStore};
use sakina_client::view::{BoardView, CategoryFilter, display_author, time_ago};
use sakina_types::models::{Category, Post, Reaction};

#[derive(Parser)]
#[command(author, version, about = "Sakina community prayer board")]
struct Args {
    /// Board server address
    #[arg(long, env = "SAKINA_BOARD_URL")]
    board_url: Option<String>,

    /// Where the local identity and preferences are kept
    #[arg(long, env = "SAKINA_PROFILE_PATH")]
    profile: Option<std::path::PathBuf>,

    /// Use a local SQLite board file instead of a server
    #[arg(long)]
    embedded: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the saved identity
    Whoami,
    /// Create or replace the local identity
    Identity {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        secret: String,
        #[arg(long)]
        anonymous: bool,
    },
    /// List posts, newest first
    List {
        #[arg(long, default_value = "All")]
        category: CategoryFilter,
        /// Also print responses
        #[arg(long)]
        responses: bool,
    },
    /// Board totals
    Stats,
    /// Share something with the community
    Post {
        #[arg(long, default_value_t = Category::DuaRequest)]
        category: Category,
        message: String,
    },
    /// React to a post
    React { post: String, reaction: Reaction },
    /// Respond to a post
    Respond { post: String, text: String },
    /// Delete one of your posts
    Delete {
        post: String,
        #[arg(long)]
        secret: String,
    },
    /// Print share text and links for a post
    Share { post: String },
    /// Follow the board live
    Watch {
        #[arg(long, default_value = "All")]
        category: CategoryFilter,
    },
    /// Today's prayer times
    Times {
        #[arg(long)]
        city: Option<String>,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Look up city names for `times --city`
    Cities { query: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sakina_client=info,sakina_board=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = args.board_url {
        config.board_url = url;
    }
    if let Some(path) = args.profile {
        config.profile_path = path;
    }

    let profile = LocalProfileStore::on_disk(&config.profile_path)
        .with_context(|| format!("opening profile {}", config.profile_path.display()))?;

    match args.command {
        Command::Times { city, lat, lng } => return times(&config, &profile, city, lat.zip(lng)).await,
        Command::Cities { query } => {
            let geocoder = OpenMeteoGeocoder::new(&config.geocode_api);
            for city in geocoder.search_cities(&query).await? {
                println!("{}", city.display());
            }
            return Ok(());
        }
        _ => {}
    }

    let store: Arc<dyn PostStore> = match &args.embedded {
        Some(path) => {
            debug!("Embedded board at {}", path.display());
            Arc::new(EmbeddedPostStore::new(sakina_db::Database::open(path)?))
        }
        None => Arc::new(RemotePostStore::new(&config.board_url)?),
    };
    let board = Board::new(store, IdentityGate::new(profile));

    match args.command {
        Command::Whoami => match board.identity()? {
            Some(identity) if identity.anonymous => println!("{} (anonymous)", identity.name),
            Some(identity) => println!("{}", identity.name),
            None => println!("No identity yet. Run `identity --secret <word>` first."),
        },
        Command::Identity {
            name,
            secret,
            anonymous,
        } => {
            let identity = board.change_identity(&name, &secret, anonymous)?;
            println!("Posting as {}", identity.name);
        }
        Command::List { category, responses } => {
            attach(&board).await?;
            board.update_view(|v| v.set_filter(category));
            board.with_view(|v| print_posts(v, responses));
        }
        Command::Stats => {
            attach(&board).await?;
            let stats = board.with_view(BoardView::stats);
            println!(
                "{} posts · {} responses · {} reactions",
                stats.post_count, stats.response_count, stats.reaction_count
            );
        }
        Command::Post { category, message } => match board.submit_post(category, &message).await? {
            Submission::Done => println!("Posted to {}", category),
            Submission::IdentityRequired => println!("No identity yet. Run `identity --secret <word>` first."),
        },
        Command::React { post, reaction } => {
            attach(&board).await?;
            let id = resolve_post(&board, &post)?;
            board.react(id, reaction).await?;
            println!("{}", reaction);
        }
        Command::Respond { post, text } => {
            attach(&board).await?;
            let id = resolve_post(&board, &post)?;
            board.update_view(|v| v.set_draft(id, text));
            match board.submit_response(id).await? {
                Submission::Done => println!("Response sent"),
                Submission::IdentityRequired => println!("No identity yet. Run `identity --secret <word>` first."),
            }
        }
        Command::Delete { post, secret } => {
            attach(&board).await?;
            let id = resolve_post(&board, &post)?;
            board.request_delete(id)?;
            board.confirm_delete(&secret).await?;
            println!("Deleted");
        }
        Command::Share { post } => {
            attach(&board).await?;
            let id = resolve_post(&board, &post)?;
            let post = board
                .with_view(|v| v.find(id).cloned())
                .context("post vanished")?;
            let links = share_links(&post, &config.share_site)?;
            println!("{}\n", format_share_text_for(&post, &config.share_site));
            println!("WhatsApp: {}", links.whatsapp);
            println!("Twitter:  {}", links.twitter);
            println!("Telegram: {}", links.telegram);
        }
        Command::Watch { category } => {
            board.update_view(|v| v.set_filter(category));
            board.attach();
            let mut changes = board.changes();
            let mut last = None;
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
                // Redraw only on new content, not on submitting flips
                let current = board.with_view(|v| (v.status(), v.posts().to_vec()));
                if last.as_ref() != Some(&current) {
                    board.with_view(|v| print_posts(v, false));
                    last = Some(current);
                }
            }
        }
        Command::Times { .. } | Command::Cities { .. } => {}
    }

    Ok(())
}

async fn attach(board: &Board) -> anyhow::Result<()> {
    board.attach();
    board.wait_until_loaded().await;
    if board.with_view(BoardView::status) == FeedStatus::Unavailable {
        bail!("posts unavailable");
    }
    Ok(())
}

/// Accept a full id or a unique prefix of one.
fn resolve_post(board: &Board, needle: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = needle.parse::<Uuid>() {
        return Ok(id);
    }
    let needle = needle.to_lowercase();
    let matches: Vec<Uuid> = board.with_view(|v| {
        v.posts()
            .iter()
            .map(|p| p.id)
            .filter(|id| id.to_string().starts_with(&needle))
            .collect()
    });
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no post matches '{}'", needle),
        _ => bail!("'{}' matches {} posts", needle, matches.len()),
    }
}

fn print_posts(view: &BoardView, with_responses: bool) {
    if view.status() == FeedStatus::Unavailable {
        println!("Posts unavailable.");
        return;
    }
    let visible = view.visible_posts();
    if visible.is_empty() {
        println!("No posts in {} yet.", view.filter());
        return;
    }
    let now = Utc::now();
    for post in visible {
        print_post(post, now, with_responses);
    }
}

fn print_post(post: &Post, now: chrono::DateTime<Utc>, with_responses: bool) {
    let short = post.id.simple().to_string();
    println!(
        "[{}] {} · {} · {}",
        &short[..8],
        post.category,
        display_author(post),
        time_ago(post.created_at, now)
    );
    println!("    {}", post.message);

    let reactions: Vec<String> = Reaction::ALL
        .iter()
        .filter_map(|r| match post.reaction_count(*r) {
            0 => None,
            n => Some(format!("{} {}", r, n)),
        })
        .collect();
    if !reactions.is_empty() {
        println!("    {}", reactions.join("  "));
    }

    if with_responses {
        for response in &post.responses {
            println!("      ↳ {}: {} ({})", response.author, response.text, time_ago(response.created_at, now));
        }
    } else if !post.responses.is_empty() {
        println!("    {} responses", post.responses.len());
    }
}

async fn times(
    config: &ClientConfig,
    profile: &LocalProfileStore,
    city: Option<String>,
    coords: Option<(f64, f64)>,
) -> anyhow::Result<()> {
    let provider = AladhanClient::new(&config.prayer_api);
    let mut prefs = profile.load_preferences()?;

    let daily: DailyTimes = match (city, coords) {
        (_, Some((lat, lng))) => {
            prefs.location_mode = LocationMode::Gps;
            provider.times_by_coordinates(lat, lng).await?
        }
        (Some(city), None) => {
            prefs.location_mode = LocationMode::City;
            prefs.city = Some(city.clone());
            provider.times_by_city(&city).await?
        }
        (None, None) => match prefs.city.clone() {
            Some(city) => provider.times_by_city(&city).await?,
            None => bail!("pass --city or --lat/--lng"),
        },
    };
    profile.save_preferences(&prefs)?;

    println!("Prayer times for {}", daily.location);
    for prayer in Prayer::ALL {
        println!("  {:<8} {}", prayer, format_12h(daily.times.get(prayer)));
    }
    match daily.times.next_after(Local::now().time()) {
        (next, Some(mins)) => println!("Next: {} in {}h {}m", next, mins / 60, mins % 60),
        (next, None) => println!("Next: {} tomorrow", next),
    }
    Ok(())
}
