use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use client_core::{
    controller::{events::classify_fetch_failure, form::SERVER_ERROR},
    HttpRequestApi, ImageUpload, RequestApi, RequestDesk, SubmitOutcome,
};
use shared::domain::{RequestId, SortOrder};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, normalize_api_url};

type Desk = RequestDesk<HttpRequestApi>;

#[derive(Parser, Debug)]
#[command(name = "request-desk", about = "Browse, add and remove requests")]
struct Cli {
    /// Backend base URL, e.g. http://localhost:4000/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// TOML settings file (defaults to ./request_desk.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of requests.
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "asc")]
        order: SortOrder,
    },
    /// Submit a new request.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a request after confirmation.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Download the image stored with a request.
    Image {
        id: String,
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url.as_deref() {
        settings.api_url = normalize_api_url(api_url)?;
    }
    init_tracing(&settings.log_filter);
    debug!(api_url = %settings.api_url, page_size = settings.page_size, "desk: settings loaded");

    let api = Arc::new(
        HttpRequestApi::new(&settings.api_url)
            .with_context(|| format!("cannot use api url '{}'", settings.api_url))?,
    );
    let desk = RequestDesk::new(api, settings.page_size);

    match cli.command {
        Command::List {
            search,
            page,
            order,
        } => run_list(&desk, search, order, page).await,
        Command::Create {
            name,
            phone,
            title,
            image,
        } => run_create(&desk, name, phone, title, image).await,
        Command::Delete { id, yes } => run_delete(&desk, RequestId::new(id), yes).await,
        Command::Image { id, output } => run_image(&desk, RequestId::new(id), &output).await,
    }
}

fn init_tracing(fallback_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run_list(desk: &Desk, search: String, order: SortOrder, page: u32) -> Result<()> {
    if let Err(err) = desk.load(search, order, page).await {
        bail!(classify_fetch_failure(&err));
    }
    print_list(desk).await
}

async fn print_list(desk: &Desk) -> Result<()> {
    let view = desk.snapshot().await;
    let rows = desk.rows(Utc::now()).await;
    let mut out = io::stdout().lock();
    render::render_list(&mut out, &view.list, &rows)?;
    Ok(())
}

async fn load_image(path: &Path) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image '{}'", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.bin")
        .to_string();
    let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
    Ok(ImageUpload {
        filename,
        mime_type,
        bytes,
    })
}

async fn run_create(
    desk: &Desk,
    name: String,
    phone: String,
    title: String,
    image: Option<PathBuf>,
) -> Result<()> {
    let image = match image {
        Some(path) => Some(load_image(&path).await?),
        None => None,
    };

    desk.open_form().await;
    desk.edit_draft(move |draft| {
        draft.name = name;
        draft.phone = phone;
        draft.title = title;
        draft.image = image;
    })
    .await;

    match desk.submit_form().await {
        SubmitOutcome::Created(record) => {
            match record {
                Some(record) => println!("Created request {} ({})", record.id, record.title),
                None => println!("Request created"),
            }
            println!();
            print_list(desk).await
        }
        SubmitOutcome::Invalid | SubmitOutcome::Rejected { .. } => {
            let view = desk.snapshot().await;
            render::render_form_feedback(&mut io::stderr().lock(), &view.form)?;
            bail!("request was not created");
        }
        SubmitOutcome::Failed { message } => bail!(message),
        SubmitOutcome::InFlight => bail!("a submission is already in progress"),
    }
}

async fn run_delete(desk: &Desk, id: RequestId, yes: bool) -> Result<()> {
    desk.request_delete(id.clone()).await;

    if !yes {
        let confirmed = {
            let mut input = io::stdin().lock();
            let mut out = io::stdout().lock();
            render::confirm_delete(&mut input, &mut out, &id)?
        };
        if !confirmed {
            desk.cancel_delete().await;
            println!("Delete cancelled");
            return Ok(());
        }
    }

    let result = desk.confirm_delete().await;
    match &result {
        Ok(Some(deleted)) => {
            info!(request_id = %deleted, "desk: request deleted");
            println!("Deleted request {deleted}");
        }
        Ok(None) => {}
        Err(err) => {
            let message = err.backend_message().unwrap_or(SERVER_ERROR);
            eprintln!("Could not delete request {id}: {message}");
        }
    }
    println!();
    print_list(desk).await?;
    io::stdout().flush()?;

    result
        .map(|_| ())
        .with_context(|| format!("delete of request {id} failed"))
}

async fn run_image(desk: &Desk, id: RequestId, output: &Path) -> Result<()> {
    let bytes = desk
        .api()
        .fetch_image(&id)
        .await
        .with_context(|| format!("failed to download image for request {id}"))?;
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
