//! services/api/src/bin/openapi.rs
//!
//! Writes the habit tracker's OpenAPI document to disk so clients can be generated
//! without running the server.

use api_lib::web::rest::ApiDoc;
use clap::Parser;
use std::path::{Path, PathBuf};
use utoipa::openapi::{server::Server, OpenApi as OpenApiDoc};
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "openapi", about = "Export the habit tracker OpenAPI document")]
struct Args {
    /// Where to write the JSON document
    #[arg(long, default_value = "openapi.json")]
    out: PathBuf,
    /// Base URL advertised to generated clients, e.g. https://habits.example.com
    #[arg(long, env = "HABIT_API_URL")]
    server_url: Option<String>,
}

fn habit_api_doc(server_url: Option<String>) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    if let Some(url) = server_url {
        doc.servers = Some(vec![Server::new(url)]);
    }
    doc
}

fn write_doc(doc: &OpenApiDoc, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, doc.to_pretty_json()?)?;
    println!("OpenAPI document written to {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    write_doc(&habit_api_doc(args.server_url), &args.out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_is_advertised_when_given() {
        let doc = habit_api_doc(Some("https://habits.example.com".to_string()));
        let servers = doc.servers.unwrap();
        assert_eq!(servers[0].url, "https://habits.example.com");

        assert!(habit_api_doc(None).servers.is_none());
    }

    #[test]
    fn document_is_written_to_the_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habits.json");

        write_doc(&habit_api_doc(None), &path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("/habits/{habit_id}/done"));
    }
}
