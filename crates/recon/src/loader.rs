use geosync_core::model::Import;

use crate::config::ImportColumns;
use crate::error::ReconError;

/// Load imports from CSV data, applying the configured column mapping.
///
/// Only the id column is required to exist. Rows with an empty id or an
/// unparsable numeric field are skipped with a warning; a malformed row
/// never aborts the load.
pub fn load_imports(csv_data: &str, columns: &ImportColumns) -> Result<Vec<Import>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingColumn { column: name.into() })
    };
    let opt_idx = |name: &Option<String>| -> Result<Option<usize>, ReconError> {
        name.as_deref().map(idx).transpose()
    };

    let id_idx = idx(&columns.id)?;
    let lon_idx = opt_idx(&columns.lon)?;
    let lat_idx = opt_idx(&columns.lat)?;
    let geometry_idx = opt_idx(&columns.geometry)?;
    let area_idx = opt_idx(&columns.area)?;
    let tag_idx: Vec<(String, usize)> = columns
        .tags
        .iter()
        .map(|(tag, column)| Ok((tag.clone(), idx(column)?)))
        .collect::<Result<_, ReconError>>()?;

    let mut imports = Vec::new();

    'rows: for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::warn!("skipping malformed import row: {err}");
                continue;
            }
        };

        let id = record.get(id_idx).unwrap_or("");
        if id.is_empty() {
            log::warn!("skipping import row without an id");
            continue;
        }
        let mut import = Import::new(id);

        // Numeric fields: empty means absent, unparsable drops the row.
        for (target, index) in [
            (&mut import.lon, lon_idx),
            (&mut import.lat, lat_idx),
            (&mut import.area, area_idx),
        ] {
            let Some(index) = index else { continue };
            let raw = record.get(index).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(value) => *target = Some(value),
                Err(_) => {
                    log::warn!("skipping import {id}: cannot parse '{raw}' as a number");
                    continue 'rows;
                }
            }
        }

        if let Some(index) = geometry_idx {
            let raw = record.get(index).unwrap_or("");
            if !raw.is_empty() {
                import.geometry = Some(raw.to_string());
            }
        }

        for (tag, index) in &tag_idx {
            let raw = record.get(*index).unwrap_or("");
            if !raw.is_empty() {
                import.tags.insert(tag.clone(), raw.to_string());
            }
        }

        imports.push(import);
    }

    log::info!("{} import(s) loaded", imports.len());
    Ok(imports)
}
