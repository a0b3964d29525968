// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Bootstrap: build the [`AgentContext`] a fresh process runs on.
//!
//! Computes the binary and config hashes, opens the store, initializes host
//! identity and the client keypair on first run, constructs the sender, and
//! registers with the controller when no UUID has been issued yet. Failures
//! here are fatal; there is no agent without a store and an identity.

use crate::context::AgentContext;
use ghost_comms::{crypto, proxy, sender::initial_proxy, CommsError, Sender};
use ghost_core::{sha256_file, AgentConfig, HostIdentity, SystemClock};
use ghost_storage::{Store, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

const REGISTER_RETRY: Duration = Duration::from_secs(2);
const UPDATE_RETRY: Duration = Duration::from_secs(10);

/// Key store entry names.
mod keys {
    pub const UUID: &str = "UUID";
    pub const IS_INITIALIZED: &str = "IsInitialized";
    pub const HOSTNAME: &str = "Hostname";
    pub const DOMAIN: &str = "Domain";
    pub const FQDN: &str = "FQDN";
    pub const ARCHITECTURE: &str = "Architecture";
    pub const OS_VERSION: &str = "OSVersion";
    pub const PUBLIC_KEY: &str = "PublicKey";
    pub const PRIVATE_KEY: &str = "PrivateKey";
    pub const INTERFACES: &str = "Interfaces";
}

/// Inputs from the command line and config file.
pub struct BootstrapArgs {
    pub config: AgentConfig,
    pub config_path: PathBuf,
    pub debug: bool,
    pub offline: bool,
}

/// Unrecoverable startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("unable to locate agent binary: {0}")]
    InstallPath(#[source] std::io::Error),

    #[error("could not get hash of {path}: {source}")]
    Hash {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("transport error: {0}")]
    Comms(#[from] CommsError),

    #[error("configuration lists no controllers")]
    NoController,

    #[error("unable to serialize registration message: {0}")]
    Serialize(String),
}

/// Build the agent context, initializing and registering as needed.
pub async fn bootstrap(args: BootstrapArgs) -> Result<AgentContext, BootstrapError> {
    let exe = std::env::current_exe().map_err(BootstrapError::InstallPath)?;
    let install_dir = exe.parent().unwrap_or(Path::new(".")).to_path_buf();
    let install_name = exe
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "agent".to_string());

    let binary_hash = hash_of(&exe)?;
    let config_hash = hash_of(&args.config_path)?;

    let store = Store::open(&install_dir.join("ghost.db"))?;
    info!(version = env!("CARGO_PKG_VERSION"), "agent starting");

    let initialized = store.kv_get(keys::IS_INITIALIZED)?.as_deref() == Some("true");
    if !initialized {
        info!("client has not been initialized, initializing now");
        initialize(&store)?;
    }
    let identity = read_identity(&store)?;

    let mut config = args.config;
    let mut sender = None;

    if !args.offline {
        if config.use_system_proxies {
            let found = proxy::find_system_proxies().await;
            let fresh =
                proxy::filter_discovered(found, &config.proxy_list, &config.proxy_black_list);
            config.proxy_list.extend(fresh);
        }

        let controller = config
            .controller_list
            .first()
            .cloned()
            .ok_or(BootstrapError::NoController)?;
        let active_proxy = initial_proxy(&config.proxy_list);

        let built = Arc::new(Sender::new(
            &controller,
            &active_proxy,
            &identity.uuid,
            &identity.private_key_pem,
            &config.server_certificate,
        )?);

        if identity.uuid.is_empty() {
            register(&store, &built, &identity, &config, &binary_hash).await?;
        }
        sender = Some(built);
    }

    Ok(AgentContext {
        config,
        store,
        sender,
        install_dir,
        install_name,
        config_path: args.config_path,
        binary_hash,
        config_hash,
        debug: args.debug,
        offline: args.offline,
        self_pid: std::process::id(),
        clock: SystemClock,
    })
}

fn hash_of(path: &Path) -> Result<String, BootstrapError> {
    sha256_file(path).map_err(|source| BootstrapError::Hash {
        path: path.display().to_string(),
        source,
    })
}

/// Identity as persisted in the key store.
pub(crate) struct StoredIdentity {
    pub uuid: String,
    pub hostname: String,
    pub domain: String,
    pub fqdn: String,
    pub architecture: String,
    pub os_version: String,
    pub public_key_pem: String,
    pub private_key_pem: String,
    /// Interface list as the JSON it is stored and reported as.
    pub interfaces_json: String,
}

/// First-run initialization: collect host identity, generate the client
/// keypair, persist everything.
pub(crate) fn initialize(store: &Store) -> Result<(), BootstrapError> {
    let identity = HostIdentity::collect();
    let keypair = crypto::generate_keypair()?;
    let interfaces =
        serde_json::to_string(&identity.interfaces).unwrap_or_else(|_| "[]".to_string());

    // UUID stays blank until the controller issues one at registration.
    store.kv_put(keys::UUID, "")?;
    store.kv_put(keys::HOSTNAME, &identity.hostname)?;
    store.kv_put(keys::DOMAIN, &identity.domain)?;
    store.kv_put(keys::FQDN, &identity.fqdn)?;
    store.kv_put(keys::ARCHITECTURE, &identity.architecture)?;
    store.kv_put(keys::OS_VERSION, &identity.os_version)?;
    store.kv_put(keys::PUBLIC_KEY, &keypair.public_pem)?;
    store.kv_put(keys::PRIVATE_KEY, &keypair.private_pem)?;
    store.kv_put(keys::INTERFACES, &interfaces)?;
    store.kv_put(keys::IS_INITIALIZED, "true")?;

    info!(hostname = %identity.hostname, fqdn = %identity.fqdn, "client initialized");
    Ok(())
}

pub(crate) fn read_identity(store: &Store) -> Result<StoredIdentity, BootstrapError> {
    let get = |key: &str| -> Result<String, StoreError> {
        Ok(store.kv_get(key)?.unwrap_or_default())
    };
    Ok(StoredIdentity {
        uuid: get(keys::UUID)?,
        hostname: get(keys::HOSTNAME)?,
        domain: get(keys::DOMAIN)?,
        fqdn: get(keys::FQDN)?,
        architecture: get(keys::ARCHITECTURE)?,
        os_version: get(keys::OS_VERSION)?,
        public_key_pem: get(keys::PUBLIC_KEY)?,
        private_key_pem: get(keys::PRIVATE_KEY)?,
        interfaces_json: get(keys::INTERFACES)?,
    })
}

/// The registration inner payload.
pub(crate) fn registration_payload(
    identity: &StoredIdentity,
    binary_hash: &str,
    tags: &str,
) -> Result<String, serde_json::Error> {
    let mut payload = BTreeMap::new();
    payload.insert("hash", binary_hash.to_string());
    payload.insert("hostname", identity.hostname.clone());
    payload.insert("os_version", identity.os_version.clone());
    payload.insert("domain", identity.domain.clone());
    payload.insert("fqdn", identity.fqdn.clone());
    payload.insert("architecture", identity.architecture.clone());
    payload.insert("interfaces", identity.interfaces_json.clone());
    payload.insert("public_key", identity.public_key_pem.clone());
    payload.insert("tags", tags.to_string());
    serde_json::to_string(&payload)
}

/// POST registrations until the controller issues a UUID.
async fn register(
    store: &Store,
    sender: &Sender,
    identity: &StoredIdentity,
    config: &AgentConfig,
    binary_hash: &str,
) -> Result<(), BootstrapError> {
    let payload = registration_payload(identity, binary_hash, &config.tags)
        .map_err(|err| BootstrapError::Serialize(err.to_string()))?;

    loop {
        info!("client not registered with controller, beginning registration");
        match sender.post(payload.as_bytes(), "/core/register/").await {
            Err(err) => {
                error!(error = %err, "error sending registration message");
                sender.refresh(&config.proxy_list, &config.controller_list).await;
                tokio::time::sleep(REGISTER_RETRY).await;
            }
            Ok(reply) => {
                let fields: HashMap<String, String> =
                    serde_json::from_str(&reply).unwrap_or_default();
                match fields.get("uuid") {
                    Some(uuid) if !uuid.is_empty() => {
                        info!(uuid = %uuid, "successfully registered with controller");
                        store.kv_put(keys::UUID, uuid)?;
                        sender.set_client_uuid(uuid);
                        return Ok(());
                    }
                    _ => {
                        error!("no uuid found in registration response");
                        tokio::time::sleep(REGISTER_RETRY).await;
                    }
                }
            }
        }
    }
}

/// Check the running binary against the configured hash.
///
/// On mismatch while online, loops downloading the configured binary to
/// `<install_name>.new` and exits so the external updater can swap it in.
/// Returns `false` only for an offline mismatch, which the caller treats as
/// fatal.
pub async fn verify_binary(ctx: &AgentContext) -> bool {
    if ctx.config.binary_hash.eq_ignore_ascii_case(&ctx.binary_hash) {
        return true;
    }
    let Some(sender) = &ctx.sender else {
        return false;
    };

    loop {
        info!("client binary hash on disk does not match configuration, downloading update");
        match sender.fetch_resource(&ctx.config.binary_hash).await {
            Err(err) => {
                error!(error = %err, "unable to retrieve new client binary");
                sender.refresh(&ctx.config.proxy_list, &ctx.config.controller_list).await;
                tokio::time::sleep(UPDATE_RETRY).await;
            }
            Ok(bytes) => {
                let staged = ctx.install_dir.join(format!("{}.new", ctx.install_name));
                if let Err(err) = write_staged(&staged, &bytes) {
                    error!(path = %staged.display(), error = %err, "unable to write new binary to disk");
                    tokio::time::sleep(ctx.poll_time()).await;
                    continue;
                }
                info!("new client binary written to disk, going for restart");
                std::process::exit(0);
            }
        }
    }
}

fn write_staged(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
