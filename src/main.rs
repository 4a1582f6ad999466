//! Headless driver for the durable store.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;

    use mapnote::Session;
    use mapnote::SessionError;
    use mapnote::assets::DirectorySource;
    use mapnote::config::{LogLevel, Settings};
    use mapnote::model::Point;
    use mapnote::persistence::{FileStore, ResetScope};
    use mapnote::render::NullSurface;
    use mapnote::store::ExportScope;

    const USAGE: &str = "\
Usage: mapnote <command>

Commands:
  info                      Summarize the saved session
  export [all|preset|user]  Print markers and zones as JSON
  export-user               Print custom user markers as JSON
  import <file>             Import markers and zones from a JSON file
  reset [user|all]          Discard user markers, or all edits

Assets are read from MAPNOTE_ASSETS (default: current directory).";

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error("{0}\n\n{usage}", usage = USAGE)]
        Usage(String),

        #[error(transparent)]
        Session(#[from] SessionError),

        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }

    fn open_session(settings: Settings) -> Result<Session, CliError> {
        let storage = FileStore::default_location().ok_or_else(|| {
            CliError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;
        log::debug!("Durable store at {:?}", storage.dir());

        let asset_root = std::env::var_os("MAPNOTE_ASSETS")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let assets = DirectorySource::new(asset_root);

        Ok(Session::start(
            settings,
            &assets,
            Box::new(storage),
            Box::new(NullSurface::new()),
            Point::default(),
        ))
    }

    fn parse_arg<T: std::str::FromStr<Err = String>>(arg: Option<&String>, default: T) -> Result<T, CliError> {
        match arg {
            Some(value) => value.parse().map_err(CliError::Usage),
            None => Ok(default),
        }
    }

    /// Level to apply once `level` is known. `RUST_LOG` wins when set.
    fn max_level(level: LogLevel, env_override: bool) -> Option<log::LevelFilter> {
        (!env_override).then(|| level.to_level_filter())
    }

    /// Start logging before the settings file is read, at the default level.
    /// Returns whether `RUST_LOG` is in charge of filtering.
    fn init_logging() -> bool {
        let env_override = std::env::var_os("RUST_LOG").is_some();
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Trace)
            .parse_default_env()
            .init();
        if let Some(filter) = max_level(LogLevel::default(), env_override) {
            log::set_max_level(filter);
        }
        env_override
    }

    pub fn run(args: &[String]) -> Result<(), CliError> {
        let env_override = init_logging();
        let settings = Settings::load_from_default_path();
        if let Some(filter) = max_level(settings.log_level, env_override) {
            log::set_max_level(filter);
        }

        let Some(command) = args.get(1) else {
            println!("{}", USAGE);
            return Ok(());
        };

        match command.as_str() {
            "info" => {
                let session = open_session(settings)?;
                let store = session.store();
                println!("presets:      {}", store.presets().count());
                println!("user markers: {}", store.users().count());
                println!("custom:       {}", store.custom_markers().count());
                println!("zones:        {}", store.zones().count());
                println!("stickers:     {}", session.stickers().len());
                println!(
                    "snap:         {} (grid {})",
                    session.snap_enabled(),
                    session.grid_size()
                );
                let center = session.overlay().center();
                println!("overlay:      ({}, {})", center.lat, center.lng);
            }
            "export" => {
                let scope = parse_arg(args.get(2), ExportScope::All)?;
                let session = open_session(settings)?;
                println!("{}", session.export_json(scope)?);
            }
            "export-user" => {
                let session = open_session(settings)?;
                println!("{}", session.export_user_json()?);
            }
            "import" => {
                let path = args
                    .get(2)
                    .ok_or_else(|| CliError::Usage("import needs a file".to_string()))?;
                let json = std::fs::read_to_string(path)?;
                let mut session = open_session(settings)?;
                let summary = session.import_json(&json)?;
                session.flush()?;
                println!(
                    "imported {} markers ({} replaced), {} zones ({} replaced, {} dropped)",
                    summary.markers_added,
                    summary.markers_replaced,
                    summary.zones_added,
                    summary.zones_replaced,
                    summary.zones_dropped
                );
            }
            "reset" => {
                let scope = parse_arg(args.get(2), ResetScope::User)?;
                let mut session = open_session(settings)?;
                session.reset(scope)?;
                println!("reset {}", scope);
            }
            "help" | "--help" | "-h" => println!("{}", USAGE),
            other => return Err(CliError::Usage(format!("unknown command '{}'", other))),
        }
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = cli::run(&args) {
        eprintln!("mapnote: {}", e);
        std::process::exit(1);
    }
}

// The library is driven by the host page on WASM.
#[cfg(target_arch = "wasm32")]
fn main() {}
