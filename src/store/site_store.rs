//! Discovery, activation and editing of site files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::config::NginxConfig;
use crate::observability::metrics;
use crate::site::{self, ConfigurationUnit, StorageClass};
use crate::store::control::{CertificateIssuer, ServerControl};
use crate::store::error::{StoreError, StoreResult};

/// Directory layout of the site trees.
#[derive(Debug, Clone)]
pub struct SitePaths {
    /// Staging tree (`sites-available`).
    pub available: PathBuf,
    /// Activation links (`sites-enabled`).
    pub enabled: PathBuf,
    /// Always-active tree (`conf.d`).
    pub immediate: PathBuf,
    /// Site file extension, without the dot.
    pub extension: String,
}

impl SitePaths {
    pub fn from_config(config: &NginxConfig) -> Self {
        Self {
            available: config.sites_available.clone(),
            enabled: config.sites_enabled.clone(),
            immediate: config.conf_d.clone(),
            extension: config.extension.clone(),
        }
    }

    /// Standard layout under one configuration root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            available: root.join("sites-available"),
            enabled: root.join("sites-enabled"),
            immediate: root.join("conf.d"),
            extension: "conf".to_string(),
        }
    }

    pub fn dir(&self, class: StorageClass) -> &Path {
        match class {
            StorageClass::Available => &self.available,
            StorageClass::Immediate => &self.immediate,
        }
    }

    fn file_name(&self, name: &str) -> String {
        format!("{}.{}", name, self.extension)
    }

    pub fn site_path(&self, class: StorageClass, name: &str) -> PathBuf {
        self.dir(class).join(self.file_name(name))
    }

    pub fn link_path(&self, name: &str) -> PathBuf {
        self.enabled.join(self.file_name(name))
    }
}

/// Reads and edits site files, reloading the server after every change.
pub struct ConfigStore {
    paths: SitePaths,
    control: Arc<dyn ServerControl>,
    issuer: Arc<dyn CertificateIssuer>,
}

impl ConfigStore {
    pub fn new(paths: SitePaths, control: Arc<dyn ServerControl>, issuer: Arc<dyn CertificateIssuer>) -> Self {
        Self {
            paths,
            control,
            issuer,
        }
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// Every parseable unit in both trees, `sites-available` first, each
    /// tree in file-name order.
    pub async fn list(&self) -> StoreResult<Vec<ConfigurationUnit>> {
        let mut units = Vec::new();

        for class in StorageClass::ALL {
            for path in self.candidate_files(class).await? {
                let text = match fs::read_to_string(&path).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable site file");
                        continue;
                    }
                };

                let Some(mut unit) = site::parse(&text) else {
                    tracing::debug!(path = %path.display(), "Skipping site file without server_name/listen");
                    continue;
                };

                unit.storage_class = class;
                unit.enabled = match class {
                    StorageClass::Immediate => true,
                    StorageClass::Available => self.is_enabled(&unit.server_name).await,
                };
                units.push(unit);
            }
        }

        Ok(units)
    }

    /// First listed unit named `name`.
    pub async fn find(&self, name: &str) -> StoreResult<Option<ConfigurationUnit>> {
        Ok(self.list().await?.into_iter().find(|u| u.server_name == name))
    }

    /// Whether an activation link exists for `name`.
    pub async fn is_enabled(&self, name: &str) -> bool {
        if validate_name(name).is_err() {
            return false;
        }
        fs::symlink_metadata(self.paths.link_path(name)).await.is_ok()
    }

    /// Link `sites-available/<name>` into `sites-enabled` and reload.
    pub async fn enable(&self, name: &str) -> StoreResult<()> {
        let result = async {
            validate_name(name)?;
            let source = self.paths.site_path(StorageClass::Available, name);
            let link = self.paths.link_path(name);

            fs::metadata(&source)
                .await
                .map_err(|e| StoreError::io("read site file", &source, e))?;
            fs::symlink(&source, &link)
                .await
                .map_err(|e| StoreError::io("create activation link", &link, e))?;

            self.reload().await
        }
        .await;
        observe("enable", name, result)
    }

    /// Remove the activation link for `name` and reload.
    pub async fn disable(&self, name: &str) -> StoreResult<()> {
        let result = async {
            validate_name(name)?;
            let link = self.paths.link_path(name);
            fs::remove_file(&link)
                .await
                .map_err(|e| StoreError::io("remove activation link", &link, e))?;

            self.reload().await
        }
        .await;
        observe("disable", name, result)
    }

    /// Write a new site file named after the unit's `server_name` and reload.
    pub async fn create(&self, unit: &ConfigurationUnit, class: StorageClass) -> StoreResult<()> {
        let result = async {
            self.write(&unit.server_name, unit, class).await?;
            self.reload().await
        }
        .await;
        observe("create", &unit.server_name, result)
    }

    /// Overwrite the site file `name` with `unit` and reload.
    pub async fn update(&self, name: &str, unit: &ConfigurationUnit, class: StorageClass) -> StoreResult<()> {
        let result = async {
            self.write(name, unit, class).await?;
            self.reload().await
        }
        .await;
        observe("update", name, result)
    }

    /// Remove the site file `name` (and its activation link, if any) and reload.
    pub async fn delete(&self, name: &str, class: StorageClass) -> StoreResult<()> {
        let result = async {
            validate_name(name)?;
            let path = self.paths.site_path(class, name);
            fs::remove_file(&path)
                .await
                .map_err(|e| StoreError::io("remove site file", &path, e))?;

            let link = self.paths.link_path(name);
            match fs::remove_file(&link).await {
                Ok(()) => tracing::debug!(link = %link.display(), "Removed activation link"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(link = %link.display(), error = %e, "Could not remove activation link");
                }
            }

            self.reload().await
        }
        .await;
        observe("delete", name, result)
    }

    /// Issue a certificate for `name` and reload.
    ///
    /// The contact email is passed through as given.
    pub async fn generate_tls(&self, name: &str, contact_email: &str) -> StoreResult<()> {
        let result = async {
            validate_name(name)?;
            self.issuer
                .issue(name, contact_email)
                .await
                .map_err(StoreError::Certificate)?;

            self.reload().await
        }
        .await;
        observe("generate_tls", name, result)
    }

    async fn write(&self, name: &str, unit: &ConfigurationUnit, class: StorageClass) -> StoreResult<()> {
        validate_name(name)?;
        validate_unit(unit)?;
        let path = self.paths.site_path(class, name);
        fs::write(&path, site::render(unit))
            .await
            .map_err(|e| StoreError::io("write site file", &path, e))
    }

    async fn reload(&self) -> StoreResult<()> {
        let result = self.control.reload().await.map_err(StoreError::Reload);
        metrics::record_reload(result.is_ok());
        result
    }

    async fn candidate_files(&self, class: StorageClass) -> StoreResult<Vec<PathBuf>> {
        let dir = self.paths.dir(class);
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "Site directory missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io("read directory", dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io("read directory", dir, e))?
        {
            let path = entry.path();
            let matches_extension = path
                .extension()
                .is_some_and(|ext| ext == self.paths.extension.as_str());
            if !matches_extension {
                continue;
            }
            if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Reject names that would escape the site directories.
fn validate_name(name: &str) -> StoreResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A unit without `server_name` or `listen` would be written but never listed.
fn validate_unit(unit: &ConfigurationUnit) -> StoreResult<()> {
    if unit.server_name.trim().is_empty() {
        return Err(StoreError::InvalidUnit("server_name"));
    }
    if unit.listen.trim().is_empty() {
        return Err(StoreError::InvalidUnit("listen"));
    }
    Ok(())
}

fn observe<T>(operation: &'static str, name: &str, result: StoreResult<T>) -> StoreResult<T> {
    match &result {
        Ok(_) => tracing::info!(operation, site = %name, "Site operation completed"),
        Err(e) => tracing::error!(operation, site = %name, error = %e, "Site operation failed"),
    }
    metrics::record_site_operation(operation, result.is_ok());
    result
}
