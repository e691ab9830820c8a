use clap::{Parser, ValueEnum};
use hexcomp_engine::{CompositionStore, DuplicatePolicy};
use hexcomp_server::loader::{self, CatalogLoader, LoaderConfig};
use hexcomp_server::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Duplicates {
    Allow,
    Forbid,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(d: Duplicates) -> Self {
        match d {
            Duplicates::Allow => DuplicatePolicy::AllowDistinct,
            Duplicates::Forbid => DuplicatePolicy::Forbid,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "hexcomp-server", about = "Local team composition planner")]
struct Args {
    /// Listen address.
    #[arg(long, env = "HEXCOMP_ADDR", default_value = "127.0.0.1:39333")]
    addr: SocketAddr,

    /// SQLite file for saved teams (default: ~/.hexcomp/hexcomp.db).
    #[arg(long, env = "HEXCOMP_DB")]
    db: Option<PathBuf>,

    /// Base URL of the static game-data CDN.
    #[arg(long, env = "HEXCOMP_DATA_BASE", default_value = loader::DEFAULT_DATA_BASE)]
    data_base: String,

    /// URL of the JSON version list; the first entry is used.
    #[arg(long, env = "HEXCOMP_VERSION_URL", default_value = loader::DEFAULT_VERSION_URL)]
    version_url: String,

    /// Set number to keep when filtering catalog entries.
    #[arg(long = "set", env = "HEXCOMP_SET", default_value_t = loader::DEFAULT_SET)]
    set_number: u32,

    /// Skip the network and serve the embedded catalog.
    #[arg(long, env = "HEXCOMP_OFFLINE")]
    offline: bool,

    /// Whether the same champion may be placed more than once.
    #[arg(long, env = "HEXCOMP_DUPLICATES", value_enum, default_value = "allow")]
    duplicates: Duplicates,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hexcomp_server=info,hexcomp_engine=info")),
        )
        .init();

    let args = Args::parse();
    let db_path = args.db.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hexcomp")
            .join("hexcomp.db")
    });
    let store = CompositionStore::new(db_path);
    store.open()?;
    tracing::info!(db = %store.db_path().display(), "composition store ready");

    let catalog = if args.offline {
        let catalog = loader::fallback_catalog();
        loader::report_loaded(&catalog);
        catalog
    } else {
        CatalogLoader::new(LoaderConfig {
            data_base: args.data_base,
            version_url: args.version_url,
            set_number: args.set_number,
        })
        .load()
        .await
    };

    let state = AppState::new(catalog, store, args.duplicates.into());
    hexcomp_server::serve(args.addr, state).await
}
