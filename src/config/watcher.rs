//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors and
//! deploy tools usually replace the file by rename, which a watch on the old
//! inode never sees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Watches one configuration file and sends every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &path) => reload(&path, &tx),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` may have changed the contents of `path`.
fn touches(event: &Event, path: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    );

    relevant_kind
        && event
            .paths
            .iter()
            .any(|changed| changed.file_name() == path.file_name())
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<ProxyConfig>) {
    tracing::info!(path = %path.display(), "Config file change detected, reloading");

    match load_config(path) {
        Ok(config) => {
            if tx.send(config).is_err() {
                tracing::debug!("Server gone, dropping config update");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_touches_config_file_only() {
        let config = Path::new("/etc/proxy/proxy.toml");

        assert!(touches(
            &event(EventKind::Modify(ModifyKind::Any), "/etc/proxy/proxy.toml"),
            config
        ));
        assert!(touches(
            &event(EventKind::Create(CreateKind::File), "/etc/proxy/proxy.toml"),
            config
        ));
        assert!(!touches(
            &event(EventKind::Modify(ModifyKind::Any), "/etc/proxy/other.toml"),
            config
        ));
        assert!(!touches(
            &event(EventKind::Remove(RemoveKind::File), "/etc/proxy/proxy.toml"),
            config
        ));
    }

    #[tokio::test]
    async fn test_reload_sends_only_valid_configs() {
        let dir = std::env::temp_dir().join(format!("download-proxy-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("proxy.toml");
        let (tx, mut rx) = mpsc::unbounded_channel();

        std::fs::write(&path, "[policy]\nvariant = \"strict\"\n").unwrap();
        reload(&path, &tx);
        assert!(rx.try_recv().is_err());

        std::fs::write(
            &path,
            "[policy]\nvariant = \"strict\"\nallowed_hosts = [\"dl.sourceforge.net\"]\n",
        )
        .unwrap();
        reload(&path, &tx);
        let config = rx.try_recv().unwrap();
        assert_eq!(config.policy.allowed_hosts, vec!["dl.sourceforge.net"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
