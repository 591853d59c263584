use anyhow::Result;
use brisk_dev_server::{LiveServer, LiveServerConfig, ReloadHandle};
use clap::{ArgMatches, Command};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::{debug, error, info, warn};

use crate::cmd::build::{build_project, summary};
use crate::config::{BriskConfig, project_args, server_args};

const DEBOUNCE: Duration = Duration::from_millis(300);

pub fn make_subcommand() -> Command {
    server_args(project_args(Command::new("dev")))
        .about("Build, serve and rebuild on changes with live reload")
}

/// Allows one build at a time and remembers at most one request that came
/// in while it was running.
#[derive(Debug, Default)]
pub struct RebuildGate {
    state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    building: bool,
    pending: bool,
}

impl RebuildGate {
    /// Returns true when the caller should build now. Otherwise a build is
    /// already running and a rebuild is queued behind it.
    pub fn try_begin(&self) -> bool {
        let mut state = self.lock();
        if state.building {
            state.pending = true;
            false
        } else {
            state.building = true;
            true
        }
    }

    /// Called when a build ends. Returns true when a rebuild was queued in
    /// the meantime; the caller keeps the gate and builds again.
    pub fn finish(&self) -> bool {
        let mut state = self.lock();
        if state.pending {
            state.pending = false;
            true
        } else {
            state.building = false;
            false
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Editor swap and temp files never trigger a rebuild.
pub fn is_ignored(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return true;
    };

    name.starts_with('.') || name.ends_with('~') || name.ends_with(".swp") || name.contains(".tmp")
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = Arc::new(BriskConfig::load(args)?);
    let output_dir = config.paths().output;

    rebuild(config.clone()).await;
    // The server needs a directory to serve even when the first build failed
    std::fs::create_dir_all(&output_dir)?;

    let server = LiveServer::new(LiveServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root: output_dir,
        open: config.server.open,
        live_reload: true,
    });
    let reload = server.reload_handle();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "dev server stopped");
        }
    });

    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_sources(config, reload).await {
            error!(error = %e, "source watcher stopped");
        }
    });

    // Wait for both tasks
    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

/// Run a build off the async runtime. Returns whether it succeeded.
async fn rebuild(config: Arc<BriskConfig>) -> bool {
    match tokio::task::spawn_blocking(move || build_project(&config)).await {
        Ok(Ok(report)) => {
            println!("✓ Built {}", summary(&report));
            true
        }
        Ok(Err(failure)) => {
            eprintln!("✗ {failure}");
            false
        }
        Err(e) => {
            error!(error = %e, "build task failed");
            false
        }
    }
}

async fn watch_sources(config: Arc<BriskConfig>, reload: ReloadHandle) -> Result<()> {
    let paths = config.paths();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<PathBuf>>(16);

    let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let changed: Vec<PathBuf> = events
                .into_iter()
                .map(|event| event.path)
                .filter(|path| !is_ignored(path))
                .collect();
            if !changed.is_empty() {
                let _ = tx.blocking_send(changed);
            }
        }
        Err(e) => warn!(error = %e, "file watch error"),
    })?;

    let mut watched: Vec<&Path> = Vec::new();
    for dir in [
        &paths.content,
        &paths.templates,
        &paths.partials,
        &paths.static_dir,
        &paths.styles,
    ] {
        // Partials usually live inside templates/ and are covered already
        if !dir.is_dir() || watched.iter().any(|w| dir.starts_with(w)) {
            continue;
        }
        debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
        println!("Watching {}", dir.display());
        watched.push(dir);
    }

    let gate = Arc::new(RebuildGate::default());
    while let Some(changed) = rx.recv().await {
        for path in &changed {
            info!(path = %path.display(), "changed");
        }

        if !gate.try_begin() {
            debug!("build in progress, rebuild queued");
            continue;
        }

        let gate = gate.clone();
        let config = config.clone();
        let reload = reload.clone();
        tokio::spawn(async move {
            loop {
                if rebuild(config.clone()).await {
                    let browsers = reload.reload();
                    debug!(browsers, "sent reload");
                }
                if !gate.finish() {
                    break;
                }
            }
        });
    }

    Ok(())
}
