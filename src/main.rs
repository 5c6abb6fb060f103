use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use crate::{
    conference::{
        db::ConferenceDb,
        settings::{Settings, SettingsOverrides},
    },
    uploads::UploadStore,
};

mod conference;
mod error;
mod uploads;
mod util;
mod web;

#[derive(Parser, Debug)]
#[command(name = "GenVision")]
#[command(version = "0.1")]
#[command(about = "Backend for the GenVision conference site.", long_about = None)]
struct Args {
    /// Database connection string, e.g. `sqlite://genvision.db`.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Port the HTTP server listens on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Directory uploaded media is stored in and served from.
    #[arg(long, env = "UPLOADS_DIR")]
    uploads_dir: Option<PathBuf>,

    /// Largest accepted multipart request, in megabytes.
    #[arg(long, env = "MAX_UPLOAD_MB")]
    max_upload_mb: Option<u64>,

    /// Optional Json settings file. Flags and environment variables take precedence.
    #[arg(short, long, env = "GENVISION_SETTINGS")]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Arc::new(Settings::load(
        args.settings.as_ref(),
        SettingsOverrides {
            database_url: args.database_url,
            port: args.port,
            uploads_dir: args.uploads_dir,
            max_upload_mb: args.max_upload_mb,
        },
    )?);

    let db = Arc::new(ConferenceDb::connect(&settings.database_url).await?);
    log::info!("Connected to database {}", settings.database_url);

    let uploads = Arc::new(UploadStore::new(settings.uploads_dir.clone()));
    tokio::fs::create_dir_all(uploads.root()).await?;

    web::run_http_server(db, uploads, settings).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args() {
        Args::command().debug_assert();

        let args = Args::try_parse_from([
            "genvision",
            "--port",
            "8080",
            "--uploads-dir",
            "/srv/media",
        ])
        .unwrap();
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.uploads_dir, Some(PathBuf::from("/srv/media")));
        assert!(Args::try_parse_from(["genvision", "--port", "http"]).is_err());
    }
}
