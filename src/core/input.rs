use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use walkdir::WalkDir;

use super::{
    FileItem,
    PackError,
};

/// Loads command-line inputs as batch items, in argument order.
///
/// A file becomes one item with an empty relative path. A folder is walked
/// recursively in name order; its files keep `<folder>/<sub dirs>/` as their
/// relative path, so the archive mirrors the selected folder.
pub fn collect_file_items(paths: &[PathBuf]) -> Result<Vec<FileItem>, PackError> {
    let mut items = Vec::new();

    for path in paths {
        if path.is_dir() {
            items.extend(collect_folder(path)?);
        } else if path.is_file() {
            let name = file_name(path)?;
            items.push(FileItem::new(name, "", fs::read(path)?));
        } else {
            return Err(PackError::Custom(format!("Input not found: {}", path.display())));
        }
    }

    tracing::info!("Collected {} input files", items.len());
    Ok(items)
}

fn collect_folder(root: &Path) -> Result<Vec<FileItem>, PackError> {
    let folder_name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();

    let mut items = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let relative_path = relative_prefix(&folder_name, &relative_dir);
        items.push(FileItem::new(file_name(path)?, relative_path, fs::read(path)?));
    }

    Ok(items)
}

/// `("photos", ["2024", "june"])` -> `"photos/2024/june/"`
pub fn relative_prefix(folder_name: &str, sub_dirs: &[String]) -> String {
    std::iter::once(folder_name)
        .chain(sub_dirs.iter().map(String::as_str))
        .filter(|part| !part.is_empty())
        .map(|part| format!("{}/", part))
        .collect()
}

fn file_name(path: &Path) -> Result<String, PackError> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| PackError::Custom(format!("Not a file path: {}", path.display())))
}
