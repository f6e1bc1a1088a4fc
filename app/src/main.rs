//! Command line front-end for Albumz.

use api_client::{ApiClient, RegisterRequest};
use auth::{AuthError, Route, TokenStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;
use ui::album_content::LoadState;
use ui::album_list::ListState;
use ui::tag_panel::TagState;
use ui::{
    run_until_idle, AlbumContentView, AlbumListView, BlobStore, ContentItem, ImageLoader, Notice, PreviewState,
    TagPanel, ViewContext, ViewerContent,
};

mod config;

#[derive(Parser)]
#[command(name = "albumz", author, version, about = "Albumz photo and video albums")]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Override the API base URL
    #[arg(long)]
    api_base_url: Option<String>,
    /// Store auth tokens in ~/.albumz/tokens.json instead of the system keyring
    #[arg(long)]
    use_file_store: bool,
    /// Directory archives are saved to
    #[arg(long)]
    download_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the effective configuration to the config file
    InitConfig,
    /// Log in and store the token pair
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create a new account
    Register {
        username: String,
        #[arg(long)]
        password: String,
        /// Password confirmation
        #[arg(long)]
        confirm: String,
    },
    /// Forget the stored session
    Logout,
    /// List your albums
    Albums,
    /// Create a private album
    CreateAlbum { name: String },
    /// Create a group album shared with other users
    CreateGroupAlbum {
        name: String,
        /// Username to add (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
    },
    /// Download a whole album as a zip archive
    DownloadAlbum { album: i64 },
    /// List the items of an album
    Open { album: i64 },
    /// Open one item and show its metadata, location and tags
    View { album: i64, file: i64 },
    /// Upload a photo or video into an album
    Upload { album: i64, path: PathBuf },
    /// Delete an item from an album
    Delete { album: i64, file: i64 },
    /// Download selected items as a zip archive
    DownloadSelected {
        album: i64,
        #[arg(required = true)]
        files: Vec<i64>,
    },
    /// Show tags of an item
    Tags {
        file: i64,
        /// Generate tags when the item has none
        #[arg(long)]
        generate: bool,
    },
    /// Show album items carrying a tag
    SearchTag { album: i64, tag: String },
    /// Show album items taken with a camera
    FilterCamera {
        album: i64,
        #[arg(long, default_value = "")]
        make: String,
        #[arg(long, default_value = "")]
        model: String,
    },
    /// List members of a group album
    Members { album: i64 },
    /// Add members to a group album
    AddMembers {
        album: i64,
        #[arg(required = true)]
        usernames: Vec<String>,
    },
    /// Remove members from a group album
    RemoveMembers {
        album: i64,
        #[arg(required = true)]
        usernames: Vec<String>,
    },
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        println!("{}", notice);
    }
}

fn print_route(route: Option<Route>) {
    if let Some(route) = route {
        println!("Next: {}", route);
    }
}

fn print_items(items: &[ContentItem]) {
    if items.is_empty() {
        println!("No items");
    }
    for item in items {
        let preview = match &item.preview {
            PreviewState::Ready(handle) => handle.url(),
            PreviewState::Failed(e) => format!("preview failed: {}", e),
        };
        println!(
            "{}\t{}\t{:?}\t{}\t{}",
            item.id(),
            item.media.file_name(),
            item.media.kind(),
            item.media.uploaded_at.format("%Y-%m-%d %H:%M"),
            preview
        );
    }
}

async fn open_album(ctx: ViewContext, album: i64) -> Result<AlbumContentView, Box<dyn std::error::Error>> {
    let mut view = AlbumContentView::new(ctx, album);
    let cmd = view.load_album();
    run_until_idle(&mut view, cmd).await;
    if let LoadState::Failed(e) = view.load_state() {
        print_route(view.route());
        return Err(format!("Failed to load album {}: {}", album, e).into());
    }
    Ok(view)
}

#[cfg_attr(feature = "trace-spans", tracing::instrument)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        api_base_url: cli.api_base_url.clone(),
        download_dir: cli.download_dir.clone(),
        use_file_store: cli.use_file_store,
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);
    std::fs::create_dir_all(&cfg.data_dir)?;
    let file_appender = rolling::daily(&cfg.data_dir, "albumz.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()?;
    let client = ApiClient::with_client(cfg.api_base_url.clone(), http.clone());
    let store = TokenStore::new(&cfg.data_dir, cfg.use_file_store);

    let context = || -> Result<ViewContext, Box<dyn std::error::Error>> {
        let session = store.load()?;
        if !session.is_logged_in() {
            return Err(AuthError::Missing.into());
        }
        let loader = ImageLoader::with_client(http.clone(), BlobStore::new()).upgrade_insecure(cfg.upgrade_insecure_urls);
        Ok(ViewContext::new(client.clone(), loader, session).redirect_on_unauthorized(cfg.redirect_on_unauthorized))
    };

    match cli.command {
        Commands::InitConfig => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            cfg.save_to(Some(path.clone()))?;
            println!("Wrote {}", path.display());
        }
        Commands::Login { username, password } => {
            let (_, route) = auth::login(&client, &store, &username, &password).await?;
            println!("Logged in as {}", username);
            print_route(Some(route));
        }
        Commands::Register {
            username,
            password,
            confirm,
        } => {
            let form = RegisterRequest {
                username: &username,
                password1: &password,
                password2: &confirm,
            };
            let route = auth::register(&client, &form).await?;
            println!("Registration successful");
            print_route(Some(route));
        }
        Commands::Logout => {
            let route = auth::logout(&store)?;
            println!("Logged out");
            print_route(Some(route));
        }
        Commands::Albums => {
            let mut view = AlbumListView::new(context()?);
            let cmd = view.load();
            run_until_idle(&mut view, cmd).await;
            if let ListState::Failed(e) = view.state() {
                print_route(view.route());
                return Err(format!("Failed to load albums: {}", e).into());
            }
            if view.albums().is_empty() {
                println!("No albums");
            }
            for album in view.albums() {
                let kind = if album.is_private { "private" } else { "group" };
                println!(
                    "{}\t{}\t{}\t{}",
                    album.id,
                    album.name,
                    kind,
                    album.created_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::CreateAlbum { name } => {
            let mut view = AlbumListView::new(context()?);
            let cmd = view.create_private(&name);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::CreateGroupAlbum { name, members } => {
            let mut view = AlbumListView::new(context()?);
            for member in &members {
                view.add_member(member);
            }
            let cmd = view.create_group(&name);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::DownloadAlbum { album } => {
            let mut view = AlbumListView::new(context()?);
            let cmd = view.download_album(album, cfg.download_dir.clone());
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::Open { album } => {
            let view = open_album(context()?, album).await?;
            print_items(view.items());
        }
        Commands::View { album, file } => {
            let mut view = open_album(context()?, album).await?;
            let cmd = view.open_item(file);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            match view.viewer() {
                Some(viewer) => {
                    let what = match &viewer.content {
                        ViewerContent::Image(h) => format!("image {}", h.url()),
                        ViewerContent::Video(h) => format!("video {}", h.url()),
                        ViewerContent::Loading => "loading".to_string(),
                    };
                    println!("{}: {}", viewer.media.file_name(), what);
                    if let Some(metadata) = &viewer.metadata {
                        println!("Make: {}", metadata.make.as_deref().unwrap_or("-"));
                        println!("Model: {}", metadata.model.as_deref().unwrap_or("-"));
                        println!("Taken: {}", metadata.date_time.as_deref().unwrap_or("-"));
                    }
                    match &viewer.coordinates {
                        Some(coords) => println!("Location: {} ({})", coords, coords.map_url()),
                        None => println!("Location: -"),
                    }
                    println!("Tags: {}", view.tag_panel().tags().join(", "));
                }
                None => println!("Nothing to show for item {}", file),
            }
            view.close_modal();
            print_route(view.route());
        }
        Commands::Upload { album, path } => {
            let mut view = AlbumContentView::new(context()?, album);
            let cmd = view.upload(path);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::Delete { album, file } => {
            let mut view = AlbumContentView::new(context()?, album);
            let cmd = view.delete_photo(file);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::DownloadSelected { album, files } => {
            let mut view = AlbumContentView::new(context()?, album);
            for file in files {
                if !view.selection().contains(&file) {
                    view.toggle_select(file);
                }
            }
            let cmd = view.download_selected(cfg.download_dir.clone());
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::Tags { file, generate } => {
            let mut panel = TagPanel::new(context()?);
            let cmd = panel.select(file);
            run_until_idle(&mut panel, cmd).await;
            if generate {
                if panel.can_generate() {
                    let cmd = panel.generate();
                    run_until_idle(&mut panel, cmd).await;
                } else {
                    println!("Tags already exist");
                }
            }
            match panel.state() {
                TagState::Failed(e) => println!("Failed to fetch tags: {}", e),
                _ if panel.tags().is_empty() => println!("No tags"),
                _ => println!("{}", panel.tags().join(", ")),
            }
            print_route(panel.route());
        }
        Commands::SearchTag { album, tag } => {
            let mut view = open_album(context()?, album).await?;
            let cmd = view.apply_tag_filter(&tag);
            run_until_idle(&mut view, cmd).await;
            print_items(view.visible_items());
            print_route(view.route());
        }
        Commands::FilterCamera { album, make, model } => {
            let mut view = open_album(context()?, album).await?;
            let cmd = view.apply_camera_filter(&make, &model);
            run_until_idle(&mut view, cmd).await;
            print_items(view.visible_items());
            print_route(view.route());
        }
        Commands::Members { album } => {
            let mut view = AlbumListView::new(context()?);
            let cmd = view.members(album);
            run_until_idle(&mut view, cmd).await;
            match view.members_of(album) {
                Some(members) => println!("{}", members.join("\n")),
                None => println!("Failed to load members"),
            }
            print_route(view.route());
        }
        Commands::AddMembers { album, usernames } => {
            let mut view = AlbumListView::new(context()?);
            let cmd = view.add_members(album, &usernames);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
        Commands::RemoveMembers { album, usernames } => {
            let mut view = AlbumListView::new(context()?);
            let cmd = view.remove_members(album, &usernames);
            run_until_idle(&mut view, cmd).await;
            print_notices(view.take_notices());
            print_route(view.route());
        }
    }

    Ok(())
}
