//! The `lighthouse` binary: parses CLI flags, builds an [`Environment`], and runs the beacon
//! node (optionally with an in-process validator client attached) until Ctrl+C. This workspace
//! has no peer networking (see `eth2_libp2p::service`), no on-disk validator key store, and no
//! REST duties API, so the surface here is deliberately small: there is one subcommand,
//! `run`, with flags to seed an interop genesis state and attach local interop validators.

use clap::{App, Arg};
use client::{Client, ClientBuilder, ClientConfig, ClientGenesis, InteropClientTypes};
use environment::EnvironmentBuilder;
use slog::{crit, info};
use std::path::PathBuf;
use std::sync::Arc;
use store::MemoryStore;
use types::{Graffiti, MainnetEthSpec};
use validator_client::{ValidatorClient, ValidatorStore};

fn log_level_from_str(s: &str) -> slog::Level {
    match s {
        "crit" => slog::Level::Critical,
        "error" => slog::Level::Error,
        "warn" => slog::Level::Warning,
        "debug" => slog::Level::Debug,
        "trace" => slog::Level::Trace,
        _ => slog::Level::Info,
    }
}

/// Applies `--datadir`, `--graffiti` and `--interop-validators` on top of a default
/// [`ClientConfig`], returning the validator count to run in-process, if any. Kept separate from
/// `main()` so the flag-handling logic can be exercised without a running `Environment`.
fn apply_cli_args(config: &mut ClientConfig, matches: &clap::ArgMatches) -> Result<Option<usize>, String> {
    if let Some(datadir) = matches.value_of("datadir") {
        config.data_dir = PathBuf::from(datadir);
        config.db_name = config.data_dir.join("chain_db");
    }
    if let Some(graffiti) = matches.value_of("graffiti") {
        config.graffiti = Graffiti::from_bytes(graffiti.as_bytes());
    }

    match matches.value_of("interop-validators") {
        Some(count) => {
            let n = count
                .parse::<usize>()
                .map_err(|e| format!("Invalid --interop-validators value: {}", e))?;

            let mut vc_config = validator_client::Config::default();
            vc_config.data_dir = config.data_dir.join("validators");
            vc_config.slashing_protection_db = vc_config.data_dir.join("slashing_protection.sqlite");
            vc_config.graffiti = config.graffiti;
            config.validator_client = Some(vc_config);

            if let ClientGenesis::Interop { validator_count, .. } = &mut config.genesis {
                *validator_count = n;
            }
            Ok(Some(n))
        }
        None => Ok(None),
    }
}

fn build_app() -> App<'static, 'static> {
    App::new("lighthouse")
        .version("1.4.0")
        .author("Sigma Prime <contact@sigmaprime.io>")
        .about("Ethereum consensus client")
        .arg(
            Arg::with_name("datadir")
                .long("datadir")
                .value_name("DIR")
                .help("Data directory for this node's database and validator keys")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("debug-level")
                .long("debug-level")
                .value_name("LEVEL")
                .possible_values(&["crit", "error", "warn", "info", "debug", "trace"])
                .default_value("info")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("interop-validators")
                .long("interop-validators")
                .value_name("COUNT")
                .help("Run COUNT deterministic interop validators in-process alongside the node")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("graffiti")
                .long("graffiti")
                .value_name("GRAFFITI")
                .help("Text to embed in any block this node's in-process validator client proposes")
                .takes_value(true),
        )
}

fn main() {
    let matches = build_app().get_matches();
    let log_level = log_level_from_str(matches.value_of("debug-level").unwrap_or("info"));

    let mut environment = match EnvironmentBuilder::<MainnetEthSpec>::mainnet()
        .log_level(log_level)
        .multi_threaded_tokio_runtime()
        .and_then(|b| b.build())
    {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Failed to start Lighthouse: {:?}", e);
            std::process::exit(1);
        }
    };

    let context = environment.core_context();
    let log = context.log().clone();

    let mut config = ClientConfig::default();
    let interop_validator_count = match apply_cli_args(&mut config, &matches) {
        Ok(count) => count,
        Err(e) => {
            crit!(log, "Invalid command line arguments"; "error" => e);
            std::process::exit(1);
        }
    };

    if let Err(e) = directory::ensure_dir_exists(config.data_dir.clone()) {
        crit!(log, "Unable to create data directory"; "error" => e);
        std::process::exit(1);
    }

    if let Err(e) = run(config, interop_validator_count, &context, &log) {
        crit!(log, "Failed to start Lighthouse"; "error" => e);
        std::process::exit(1);
    }

    info!(log, "Running until Ctrl+C");
    let reason = environment
        .block_until_shutdown_requested()
        .unwrap_or("shutdown error");
    info!(log, "Shutting down"; "reason" => reason);
    environment.fire_signal();
}

/// Builds the genesis `BeaconChain`, optionally attaches `interop_validator_count` deterministic
/// local validators, and starts both the node's slot timer and (if attached) the validator
/// client's duty loop.
fn run(
    config: ClientConfig,
    interop_validator_count: Option<usize>,
    context: &environment::RuntimeContext<MainnetEthSpec>,
    log: &slog::Logger,
) -> Result<(), String> {
    let spec = config.spec.clone();
    let store = Arc::new(MemoryStore::<MainnetEthSpec>::open());

    let builder = ClientBuilder::<InteropClientTypes<MainnetEthSpec>>::new(log.clone())
        .store(store)
        .chain_config(config.chain.clone())
        .genesis(&config.genesis, &spec)?;

    let mut client: Client<InteropClientTypes<MainnetEthSpec>> = builder.build(spec.clone())?;

    if let (Some(validator_count), Some(vc_config)) =
        (interop_validator_count, config.validator_client.clone())
    {
        directory::ensure_dir_exists(vc_config.data_dir.clone())
            .map_err(|e| format!("Unable to create validator data directory: {:?}", e))?;

        let beacon_chain = client.beacon_chain();
        let validator_store = Arc::new(
            ValidatorStore::new(
                &vc_config.slashing_protection_db,
                spec.clone(),
                beacon_chain.genesis_validators_root,
            )
            .map_err(|e| format!("Unable to open slashing protection database: {:?}", e))?,
        );

        let keypairs = types::test_utils::generate_deterministic_keypairs(validator_count);
        for (index, keypair) in keypairs.into_iter().enumerate() {
            validator_store
                .add_validator(index, keypair)
                .map_err(|e| format!("Unable to register validator {}: {:?}", index, e))?;
        }

        let validator_client = ValidatorClient::new(beacon_chain, validator_store, vc_config, log.clone());
        client.attach_validator_client(validator_client);
    }

    let slot_clock = client.beacon_chain().slot_clock.clone();
    client.start(context.executor(), slot_clock);

    // `start()` has already spawned every background task on `context.executor()`, each holding
    // its own `Arc<BeaconChain>` clone, so `client` itself doesn't need to outlive this function.
    info!(log, "Lighthouse node started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_defaults_to_info_on_unknown_input() {
        assert_eq!(log_level_from_str("bogus"), slog::Level::Info);
        assert_eq!(log_level_from_str("trace"), slog::Level::Trace);
    }

    #[test]
    fn interop_validators_flag_overrides_genesis_count_and_adds_validator_config() {
        let matches = build_app().get_matches_from(vec!["lighthouse", "--interop-validators", "8"]);
        let mut config = ClientConfig::default();
        let count = apply_cli_args(&mut config, &matches).unwrap();

        assert_eq!(count, Some(8));
        assert!(config.validator_client.is_some());
        match config.genesis {
            ClientGenesis::Interop { validator_count, .. } => assert_eq!(validator_count, 8),
            _ => panic!("expected interop genesis"),
        }
    }

    #[test]
    fn invalid_interop_validators_value_is_rejected() {
        let matches = build_app().get_matches_from(vec!["lighthouse", "--interop-validators", "not-a-number"]);
        let mut config = ClientConfig::default();
        assert!(apply_cli_args(&mut config, &matches).is_err());
    }

    #[test]
    fn datadir_flag_repoints_db_name_under_it() {
        let matches = build_app().get_matches_from(vec!["lighthouse", "--datadir", "/tmp/lh-test"]);
        let mut config = ClientConfig::default();
        apply_cli_args(&mut config, &matches).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lh-test"));
        assert_eq!(config.db_name, PathBuf::from("/tmp/lh-test/chain_db"));
    }
}
