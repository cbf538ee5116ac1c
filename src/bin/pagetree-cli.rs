use std::sync::Arc;

use clap::{Parser, Subcommand};
use url::Url;

use pagetree::client::{ElementsTransport, FetchRequest, HttpTransport};
use pagetree::elements::{encode_route_path, JsonCodec};

#[derive(Parser)]
#[command(name = "pagetree-cli")]
#[command(about = "Inspect a running pagetree server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// URL prefix elements maps are served under.
    #[arg(long, default_value = "_elements")]
    routes_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the elements map of a route
    Elements {
        /// Route path, e.g. /blog/hello
        path: String,

        /// Query string without the leading '?'
        #[arg(short, long, default_value = "")]
        query: String,

        /// Slot ids to report as already held
        #[arg(short, long)]
        skip: Vec<String>,
    },
    /// Fetch the document of a route
    Document {
        /// Route path, e.g. /blog/hello
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = Url::parse(&cli.url)?;

    match cli.command {
        Commands::Elements { path, query, skip } => {
            let transport = HttpTransport::new(base, cli.routes_dir, Arc::new(JsonCodec));
            let elements = transport
                .fetch(FetchRequest {
                    route_key: encode_route_path(&path)?,
                    query,
                    skip,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&elements)?);
        }
        Commands::Document { path } => {
            let res = reqwest::get(base.join(&path)?).await?;
            let status = res.status();
            let body = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: server returned status {}", status);
            }
            println!("{}", body);
        }
    }

    Ok(())
}
