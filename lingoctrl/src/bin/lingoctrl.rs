use clap::{
    Parser,
    Subcommand,
};
use lingocore::{
    ac::UserId,
    favorite::traits::FavoriteBackend,
    filter::Filter,
    store::{
        ConnectorOption,
        KeyedStore,
        normalize,
    },
    teacher::Teacher,
};
use lingoctrl::{
    coordinator::LoadOutcome,
    error::{
        Error,
        NO_MATCHES,
    },
    platform::{
        Builder as PlatformBuilder,
        DEFAULT_COLLECTION,
        DEFAULT_PAGE_SIZE,
    },
    Platform,
};
use lingodb_sqlite::SqliteBackend;
use std::{
    fs::read_to_string,
    path::PathBuf,
};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(long, value_name = "LINGO_DB_URL", env = "LINGO_DB_URL")]
    db_url: String,
    #[clap(long, default_value = DEFAULT_COLLECTION)]
    collection: String,
    #[clap(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import teachers from a JSON document holding either a map keyed
    /// by id or an array
    #[command(arg_required_else_help = true)]
    Seed {
        input: PathBuf,
    },
    /// List the teachers matching the filters
    Browse {
        #[clap(long)]
        language: Option<String>,
        #[clap(long)]
        level: Option<String>,
        #[clap(long)]
        max_price: Option<f64>,
        /// Number of additional pages to load
        #[clap(long, default_value_t = 0)]
        more: usize,
        /// Mark the favorites of this user
        #[clap(long)]
        user: Option<String>,
    },
    #[command(arg_required_else_help = true)]
    Favorite {
        #[clap(long)]
        user: Option<String>,
        #[command(subcommand)]
        cmd: FavoriteCmd,
    },
}

#[derive(Debug, Subcommand)]
enum FavoriteCmd {
    /// List the favorite teacher ids
    List,
    #[command(arg_required_else_help = true)]
    Add {
        teacher_id: String,
    },
    #[command(arg_required_else_help = true)]
    Remove {
        teacher_id: String,
    },
    /// Flip the favorite state of a teacher
    #[command(arg_required_else_help = true)]
    Toggle {
        teacher_id: String,
    },
}

#[async_std::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    stderrlog::new()
        .module(module_path!())
        .module("lingocore")
        .module("lingoctrl")
        .module("lingodb_sqlite")
        .verbosity((args.verbose as usize) + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .unwrap();

    let backend = SqliteBackend::connect(
        ConnectorOption::from(&args.db_url)
            .auto_create_db(true)
    )
        .await?
        .migrate()
        .await?;

    match args.command {
        Commands::Seed { input } => {
            seed(&backend, &args.collection, input).await?;
        },
        Commands::Browse { language, level, max_price, more, user } => {
            let platform = PlatformBuilder::new()
                .store(backend)
                .collection(args.collection)
                .page_size(args.page_size)
                .build()?;
            let filter = Filter {
                language,
                level,
                max_price,
            };
            browse(&platform, filter, more, user).await?;
        },
        Commands::Favorite { user, cmd } => {
            let platform = PlatformBuilder::new()
                .store(backend)
                .collection(args.collection)
                .page_size(args.page_size)
                .build()?;
            platform.switch_identity(user.map(UserId::from)).await?;
            parse_favorite(&platform, cmd).await?;
        },
    }

    Ok(())
}

async fn seed(
    store: &impl KeyedStore,
    collection: &str,
    input: PathBuf,
) -> anyhow::Result<()> {
    let document = serde_json::from_str(&read_to_string(&input)?)?;
    let mut count = 0;
    for (id, value) in normalize(Some(document)) {
        if let Err(e) = Teacher::from_entry(id.clone(), value.clone()) {
            log::warn!("skipping entry {id} from {}: {e}", input.display());
            continue;
        }
        store.write(&format!("{collection}/{id}"), value).await?;
        count += 1;
    }
    log::info!("imported {count} teachers into {collection}");
    println!("imported {count} teachers");
    Ok(())
}

async fn browse(
    platform: &Platform,
    filter: Filter,
    more: usize,
    user: Option<String>,
) -> anyhow::Result<()> {
    if let Some(user) = user {
        platform.identity().set(Some(UserId::from(user)));
    }
    if let Err(e) = platform.start().await {
        report(&e);
    }
    if let Err(e) = platform.ensure_visible(filter).await {
        report(&e);
    }
    for _ in 0..more {
        match platform.load_more().await {
            Ok(LoadOutcome::Exhausted) => break,
            Ok(_) => (),
            Err(e) => report(&e),
        }
    }

    let view = platform.view();
    if view.teachers.is_empty() && !view.has_more {
        println!("{NO_MATCHES}");
    }
    for (teacher, favorite) in platform.listing() {
        println!(
            "{} {:<8} {:<28} {:>6.2}$ rating {:.1}  {}  #{}",
            if favorite { "*" } else { " " },
            teacher.id,
            teacher.display_name(),
            teacher.price_per_hour,
            teacher.rating,
            teacher.languages.join(", "),
            teacher.levels.join(" #"),
        );
    }
    if view.has_more {
        println!("{} teachers loaded; more available", view.total);
    }
    Ok(())
}

async fn parse_favorite(
    platform: &Platform,
    cmd: FavoriteCmd,
) -> anyhow::Result<()> {
    let user = platform.current_user();
    match cmd {
        FavoriteCmd::List => {
            let user = user.ok_or(Error::NotAuthenticated)?;
            for id in platform.favorites().favorites(&user) {
                println!("{id}");
            }
        },
        FavoriteCmd::Add { teacher_id } => {
            let user = user.ok_or(Error::NotAuthenticated)?;
            platform.store().add_favorite(&user, &teacher_id).await?;
        },
        FavoriteCmd::Remove { teacher_id } => {
            let user = user.ok_or(Error::NotAuthenticated)?;
            platform.store().remove_favorite(&user, &teacher_id).await?;
        },
        FavoriteCmd::Toggle { teacher_id } => {
            match platform.toggle_favorite(&teacher_id).await {
                Ok(true) => println!("{teacher_id} added to favorites"),
                Ok(false) => println!("{teacher_id} removed from favorites"),
                Err(e) => report(&e),
            }
        },
    }
    Ok(())
}

fn report(e: &Error) {
    match e.notice() {
        Some(notice) => eprintln!("{notice}"),
        None => log::warn!("{e}"),
    }
}
