//! The `run` subcommand: host the engine until interrupted.

use std::path::{Path, PathBuf};

use inertia_engine::{Config, Deps, InertiaEngine};
use tokio::{
    runtime::Builder,
    signal::{
        self,
        unix::{SignalKind, signal},
    },
};
use tracing::{info, warn};

use crate::{
    cli::ConfigArgs,
    error::{Error, Result},
    settings,
};

/// Load settings, start the engine and serve until Ctrl-C.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let path = settings::resolve_path(args.config.as_deref())?;
    let config = settings::load(&path)?;
    for problem in config.validate() {
        warn!(%problem, "settings_invalid");
    }
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(path, config))
}

/// Platform ports for this build.
#[cfg(target_os = "macos")]
fn platform_deps() -> Result<Deps> {
    Ok(Deps::macos())
}

/// Platform ports for this build.
#[cfg(not(target_os = "macos"))]
fn platform_deps() -> Result<Deps> {
    Err(Error::Unsupported)
}

/// Explain why `start` refused an enabled config.
fn start_failure() -> Error {
    let missing = permissions::check_permissions().missing();
    if missing.is_empty() {
        Error::NotStarted("event tap could not be installed".into())
    } else {
        Error::NotStarted(format!("missing permission: {}", missing.join(", ")))
    }
}

/// Apply a freshly loaded config to a live engine.
///
/// Returns false when an enabled config could not start the engine.
pub(crate) fn apply(engine: &InertiaEngine, config: Config) -> bool {
    let enabled = config.enabled;
    engine.update_config(config.clone());
    if enabled && !engine.is_running() {
        return engine.start(config);
    }
    true
}

/// Engine lifetime on the runtime.
async fn serve(path: PathBuf, config: Config) -> Result<()> {
    let engine = InertiaEngine::new(platform_deps()?)?;
    let enabled = config.enabled;
    if !engine.start(config) {
        if enabled {
            return Err(start_failure());
        }
        info!(path = %path.display(), "inertia_disabled_waiting_for_reload");
    }

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            res = signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "ctrl_c_listener_failed");
                }
                break;
            }
            _ = hangup.recv() => reload(&engine, &path),
        }
    }

    info!("inertia_shutting_down");
    engine.shutdown().await;
    Ok(())
}

/// Re-read settings and hand them to the engine.
fn reload(engine: &InertiaEngine, path: &Path) {
    match settings::load(path) {
        Ok(config) => {
            info!(?config, "settings_reloaded");
            if !apply(engine, config) {
                warn!(error = %start_failure(), "inertia_start_after_reload_failed");
            }
        }
        Err(e) => warn!(error = %e, "settings_reload_failed"),
    }
}
