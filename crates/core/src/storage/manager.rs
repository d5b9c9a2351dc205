use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::models::portfolio::{Portfolio, PortfolioId};

use super::format;

/// Save/load portfolios to and from PFLG bytes, files and directories.
pub struct StorageManager;

impl StorageManager {
    /// Serialize a portfolio to raw bytes (portable, platform-independent).
    ///
    /// Flow: Portfolio → bincode → PFLG framing
    pub fn save_to_bytes(portfolio: &Portfolio) -> Result<Vec<u8>, CoreError> {
        let payload = bincode::serialize(portfolio)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize portfolio: {e}")))?;
        Ok(format::write_blob(format::CURRENT_VERSION, &payload))
    }

    /// Deserialize a portfolio from raw bytes.
    pub fn load_from_bytes(data: &[u8]) -> Result<Portfolio, CoreError> {
        let (header, payload) = format::read_blob(data)?;
        let portfolio: Portfolio = bincode::deserialize(payload).map_err(|e| {
            CoreError::Deserialization(format!("Failed to deserialize portfolio: {e}"))
        })?;
        log::debug!(
            "Loaded portfolio created {} (format v{}, {} bytes)",
            portfolio.created(),
            header.version,
            header.payload_len
        );
        Ok(portfolio)
    }

    /// Decode `data` and install it into `target`, which must be empty.
    ///
    /// `target` is untouched when decoding fails.
    pub fn restore_into(target: &mut Portfolio, data: &[u8]) -> Result<(), CoreError> {
        if target.is_populated() {
            return Err(CoreError::StateConflict(
                "Portfolio already populated; refusing to overwrite it".into(),
            ));
        }
        let restored = Self::load_from_bytes(data)?;
        target.restore(restored)
    }

    /// Human-readable dump, for debugging and export.
    pub fn to_json(portfolio: &Portfolio) -> Result<String, CoreError> {
        serde_json::to_string_pretty(portfolio)
            .map_err(|e| CoreError::Serialization(format!("Failed to export portfolio: {e}")))
    }

    pub fn save_to_file(portfolio: &Portfolio, path: &Path) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(portfolio)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Portfolio, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }

    /// Path of a portfolio's file inside `dir`: `<id>.pflg`.
    pub fn file_path(dir: &Path, id: PortfolioId) -> PathBuf {
        dir.join(format!("{id}.{}", format::FILE_EXTENSION))
    }

    /// Write one file per portfolio into `dir`, creating it if needed.
    /// Returns the number of files written.
    pub fn save_to_dir(
        dir: &Path,
        portfolios: &[(PortfolioId, Portfolio)],
    ) -> Result<usize, CoreError> {
        std::fs::create_dir_all(dir)?;
        for (id, portfolio) in portfolios {
            Self::save_to_file(portfolio, &Self::file_path(dir, *id))?;
        }
        log::info!("Saved {} portfolio(s) to {}", portfolios.len(), dir.display());
        Ok(portfolios.len())
    }

    /// Read every `.pflg` file in `dir`, ordered by creation date then id.
    ///
    /// Files whose stem is not a portfolio id are skipped. A directory
    /// without any portfolio file is `NotFound`.
    pub fn load_from_dir(dir: &Path) -> Result<Vec<(PortfolioId, Portfolio)>, CoreError> {
        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(format::FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = match PortfolioId::parse(stem) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };
            loaded.push((id, Self::load_from_file(&path)?));
        }

        if loaded.is_empty() {
            return Err(CoreError::NotFound(format!(
                "No portfolio files in {}",
                dir.display()
            )));
        }

        loaded.sort_by_key(|(id, p)| (p.created(), *id));
        log::info!("Loaded {} portfolio(s) from {}", loaded.len(), dir.display());
        Ok(loaded)
    }
}
