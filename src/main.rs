use morphserve::config::{self, BIND_VAR, ServiceConfig};
use morphserve::disamb::{Disambiguator, ProcessDisambiguator};
use morphserve::engine::BuiltinEngineFactory;
use morphserve::server::{self, AppState};
use morphserve::{Orchestrator, Service};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let mut config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let disambiguator = config.disambiguator.as_ref().and_then(|d| {
        match ProcessDisambiguator::spawn(&d.executable, [&d.model], config.exchange_timeout()) {
            Ok(process) => Some(Arc::new(process)),
            Err(err) => {
                warn!(error = %err, "continuing without disambiguation");
                None
            }
        }
    });

    let dictionary = match &config.dict_path {
        Some(path) => path.display().to_string(),
        None => "builtin".to_string(),
    };
    info!(
        dictionary = %dictionary,
        disambiguation = disambiguator.is_some(),
        timeout = ?config.timeout,
        "starting"
    );

    let orchestrator = Orchestrator::new(
        Arc::new(BuiltinEngineFactory::new()),
        disambiguator.clone().map(|d| d as Arc<dyn Disambiguator>),
    );
    let state = AppState::new(Service::new(orchestrator, config.dict_path.clone()), config.timeout);

    let result = server::serve(config.bind, state).await;

    if let Some(d) = &disambiguator {
        d.shutdown();
    }
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct CliArgs {
    bind: Option<SocketAddr>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut bind = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("morphserve {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--bind" => {
                let value = args.next().ok_or_else(|| "error: --bind expects a value".to_string())?;
                bind = Some(parse_bind(&value)?);
            }
            _ if arg.starts_with("--bind=") => {
                bind = Some(parse_bind(arg.trim_start_matches("--bind="))?);
            }
            _ => return Err(format!("error: unexpected argument {arg:?} (see --help)")),
        }
    }

    Ok(CliArgs { bind })
}

fn parse_bind(value: &str) -> Result<SocketAddr, String> {
    config::parse_bind(BIND_VAR, value).map_err(|_| format!("error: invalid --bind address {value:?}"))
}

fn print_help() {
    println!(
        "morphserve {version}

HTTP service for morphological analysis and generation.

USAGE:
  morphserve [--bind <addr>]

OPTIONS:
  --bind <addr>     Listen address (overrides MORPH_BIND, default {bind})
  -h, --help        Show this help
  -V, --version     Show version

ENVIRONMENT:
  MORPH_DICT_PATH       Dictionary file (default: built-in sample)
  MORFEUSZ_DICT_PATH    Read when MORPH_DICT_PATH is unset
  DISAMB_EXECUTABLE     Disambiguator program (needs DISAMB_MODEL)
  DISAMB_MODEL          Model passed to the disambiguator
  MORPH_BIND            Listen address
  MORPH_TIMEOUT_SECS    Per-request timeout in seconds (default 30)
  RUST_LOG              Log filter (default info)",
        version = env!("CARGO_PKG_VERSION"),
        bind = config::DEFAULT_BIND,
    );
}
