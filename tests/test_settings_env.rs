//! Integration tests for `SDK_*` environment overrides
//!
//! Kept in their own test binary so no other test observes the variables.
//! Tests within this file serialize on `ENV_LOCK`.

use defi_adapters_sdk::types::Chain;
use defi_adapters_sdk::Settings;
use std::env;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 6] = [
    "SDK_RPC_HTTP_URL",
    "SDK_RPC_CHAIN_ID",
    "SDK_CACHE_METADATA_DIR",
    "SDK_CONTRACTS_BALANCE_CHECKER",
    "SDK_FLUX_COMPTROLLER",
    "SDK_FLUX_BLOCKS_PER_YEAR",
];

/// Runs `f` with exactly `vars` set among the `SDK_*` variables, then clears them.
fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    for name in VARS {
        env::remove_var(name);
    }
    for (name, value) in vars {
        env::set_var(name, value);
    }
    let result = f();
    for name in VARS {
        env::remove_var(name);
    }
    result
}

fn load() -> Result<Settings, config::ConfigError> {
    let dir = tempfile::tempdir().unwrap();
    Settings::from_file(dir.path().join("absent").to_str().unwrap())
}

/// Every override replaces the file/default value
#[test]
fn test_overrides_apply() {
    let settings = with_env(
        &[
            ("SDK_RPC_HTTP_URL", "https://rpc.example.org"),
            ("SDK_RPC_CHAIN_ID", "42161"),
            ("SDK_CACHE_METADATA_DIR", "/var/lib/sdk/metadata"),
            ("SDK_CONTRACTS_BALANCE_CHECKER", "0x0000000000000000000000000000000000000bc1"),
            ("SDK_FLUX_COMPTROLLER", "0x0000000000000000000000000000000000000c01"),
            ("SDK_FLUX_BLOCKS_PER_YEAR", "1000000"),
        ],
        load,
    )
    .unwrap();

    assert_eq!(settings.rpc.http_url, "https://rpc.example.org");
    assert_eq!(settings.chain().unwrap(), Chain::Arbitrum);
    assert_eq!(settings.cache.metadata_dir, "/var/lib/sdk/metadata");
    assert_eq!(settings.contracts.balance_checker, "0x0000000000000000000000000000000000000bc1");
    assert_eq!(settings.protocols.flux.comptroller, "0x0000000000000000000000000000000000000c01");
    assert_eq!(settings.protocols.flux.blocks_per_year, 1_000_000);
}

/// The chain may be given by name, in any case, or by id with surrounding spaces
#[test]
fn test_chain_by_name_or_id() {
    let by_name = with_env(&[("SDK_RPC_CHAIN_ID", "Optimism")], load).unwrap();
    assert_eq!(by_name.rpc.chain_id, 10);

    let by_id = with_env(&[("SDK_RPC_CHAIN_ID", " 8453 ")], load).unwrap();
    assert_eq!(by_id.chain().unwrap(), Chain::Base);
}

/// Empty or whitespace-only values are ignored
#[test]
fn test_blank_values_are_ignored() {
    let settings = with_env(
        &[
            ("SDK_RPC_HTTP_URL", "   "),
            ("SDK_RPC_CHAIN_ID", ""),
            ("SDK_FLUX_BLOCKS_PER_YEAR", " "),
        ],
        load,
    )
    .unwrap();

    assert_eq!(settings.rpc.http_url, "http://127.0.0.1:8545");
    assert_eq!(settings.rpc.chain_id, 1);
    assert_eq!(settings.protocols.flux.blocks_per_year, 2_628_000);
}

#[test]
fn test_unknown_chain_is_rejected() {
    let err = with_env(&[("SDK_RPC_CHAIN_ID", "moonchain")], load).unwrap_err();
    assert!(err.to_string().contains("SDK_RPC_CHAIN_ID"), "{err}");

    let err = with_env(&[("SDK_RPC_CHAIN_ID", "999999")], load).unwrap_err();
    assert!(err.to_string().contains("SDK_RPC_CHAIN_ID"), "{err}");
}

#[test]
fn test_malformed_blocks_per_year_is_rejected() {
    for bad in ["abc", "-5", "2.5"] {
        let err = with_env(&[("SDK_FLUX_BLOCKS_PER_YEAR", bad)], load).unwrap_err();
        assert!(err.to_string().contains("SDK_FLUX_BLOCKS_PER_YEAR"), "{bad}: {err}");
    }
}
