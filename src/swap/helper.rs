//! The short-lived helper that swaps a plugin which cannot swap itself.
//!
//! A running plugin must not overwrite its own backing file: the host's
//! loader would be executing stale in-memory code against rewritten bytes,
//! and a crash mid-write leaves neither version intact. The handoff turns
//! the swap into two phases:
//!
//! 1. The primary stages a generated helper plugin next to its own file and
//!    asks the host to enable it.
//! 2. The helper - a different unit of code as far as the host is concerned -
//!    performs the disable/write/enable sequence against the primary's file,
//!    then disables itself; its file is deleted during the Cleaning phase and
//!    a full reload follows so the new version is the one actually executing.
//!
//! The helper source is rendered from a Tera template. The built-in template
//! targets the host's generic plugin API; integrations with a different
//! surface supply their own template with the same placeholders.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tera::Tera;
use tracing::{debug, info};

use crate::constants::HELPER_TAG;
use crate::swap::UpdateTarget;
use crate::utils::fs as fsutil;

/// Placeholders available to helper templates:
/// `helper_name`, `helper_file`, `plugin_name`, `plugin_file`,
/// `install_path`, `source_url`.
const DEFAULT_TEMPLATE: &str = r#"/**
 * @name {{ helper_name }}
 * @version 1.0
 * @description Temporary updater. Replaces {{ plugin_file }} while it is disabled, then removes itself.
 */

module.exports = class {
    async start() {
        const response = await host.net.fetch("{{ source_url }}");
        if (!response.ok) {
            host.log.error("updater: fetch failed with status " + response.status);
            return;
        }
        const body = await response.text();

        host.plugins.disable("{{ plugin_name }}");
        await host.plugins.awaitState("{{ plugin_name }}", "disabled");

        host.fs.write("{{ install_path }}", body);

        host.plugins.enable("{{ plugin_name }}");

        host.plugins.disable("{{ helper_name }}");
        host.fs.remove("{{ helper_file }}");
        host.reload();
    }

    stop() {}
};
"#;

/// Stages and removes the generated helper file for one update target.
pub struct HelperInstaller {
    target: UpdateTarget,
    helper_path: PathBuf,
    template: String,
}

impl HelperInstaller {
    /// Create an installer for `target` using the built-in template.
    ///
    /// The helper is staged next to the installed file with the `updater`
    /// tag spliced into its name: `pawprint.plugin.js` gets
    /// `pawprint.updater.plugin.js`.
    #[must_use]
    pub fn new(target: &UpdateTarget) -> Self {
        Self {
            target: target.clone(),
            helper_path: helper_path_for(target.install_path()),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Replace the built-in template with a caller-supplied one.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// The name the host will know the helper by.
    #[must_use]
    pub fn helper_name(&self) -> String {
        format!("{}-{HELPER_TAG}", self.target.name())
    }

    /// Where the helper file is staged.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.helper_path
    }

    /// Whether a helper file is currently staged.
    #[must_use]
    pub fn is_staged(&self) -> bool {
        self.helper_path.exists()
    }

    /// Render the helper source text.
    pub fn render(&self) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("helper_name", &self.helper_name());
        context.insert("helper_file", &self.helper_path.display().to_string());
        context.insert("plugin_name", self.target.name());
        context.insert(
            "plugin_file",
            &self
                .target
                .install_path()
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
        );
        context.insert("install_path", &self.target.install_path().display().to_string());
        context.insert("source_url", self.target.source_url());

        Tera::one_off(&self.template, &context, false).context("Failed to render helper template")
    }

    /// Render and stage the helper file next to the installed plugin.
    pub async fn install(&self) -> Result<()> {
        let source = self.render()?;
        fsutil::safe_write(&self.helper_path, &source).await?;
        info!("staged helper at {}", self.helper_path.display());
        Ok(())
    }

    /// Remove the staged helper file; returns whether one was removed.
    pub async fn remove(&self) -> Result<bool> {
        let removed = fsutil::remove_if_exists(&self.helper_path).await?;
        if removed {
            debug!("removed helper at {}", self.helper_path.display());
        }
        Ok(removed)
    }
}

/// Helper path for an installed file: the `updater` tag goes in front of the
/// final extension pair so the host's loader still recognizes the file type.
fn helper_path_for(install_path: &Path) -> PathBuf {
    let file_name = install_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let helper_name = match file_name.split_once('.') {
        Some((stem, rest)) => format!("{stem}.{HELPER_TAG}.{rest}"),
        None => format!("{file_name}.{HELPER_TAG}"),
    };

    install_path.with_file_name(helper_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target_in(dir: &Path) -> UpdateTarget {
        UpdateTarget::new(
            "pawprint",
            dir.join("pawprint.plugin.js"),
            "https://example.com/pawprint.plugin.js",
        )
    }

    #[test]
    fn test_helper_path_keeps_extension_pair() {
        let helper = HelperInstaller::new(&target_in(Path::new("/plugins")));
        assert_eq!(
            helper.path(),
            Path::new("/plugins/pawprint.updater.plugin.js")
        );
    }

    #[test]
    fn test_render_substitutes_target_fields() {
        let helper = HelperInstaller::new(&target_in(Path::new("/plugins")));
        let source = helper.render().unwrap();

        assert!(source.contains("@name pawprint-updater"));
        assert!(source.contains("https://example.com/pawprint.plugin.js"));
        assert!(source.contains(r#"disable("pawprint")"#));
        assert!(source.contains("/plugins/pawprint.plugin.js"));
    }

    #[test]
    fn test_custom_template() {
        let helper = HelperInstaller::new(&target_in(Path::new("/plugins")))
            .with_template("fetch {{ source_url }} into {{ install_path }}");
        let source = helper.render().unwrap();
        assert_eq!(
            source,
            "fetch https://example.com/pawprint.plugin.js into /plugins/pawprint.plugin.js"
        );
    }

    #[tokio::test]
    async fn test_install_and_remove() {
        let temp = TempDir::new().unwrap();
        let helper = HelperInstaller::new(&target_in(temp.path()));

        assert!(!helper.is_staged());
        helper.install().await.unwrap();
        assert!(helper.is_staged());

        let staged = tokio::fs::read_to_string(helper.path()).await.unwrap();
        assert!(staged.contains("pawprint-updater"));

        assert!(helper.remove().await.unwrap());
        assert!(!helper.is_staged());
        assert!(!helper.remove().await.unwrap());
    }
}
