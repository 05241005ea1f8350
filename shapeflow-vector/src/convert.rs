/*
This code is part of the Shapeflow geospatial I/O library.
Created: 27/03/2025
Last Modified: 14/06/2026
License: MIT

Notes: File-level conversion conveniences between shapefiles and
GeoJSON documents, including directory batch runs that continue past
individual failures.
*/
use crate::error::ShapeError;
use crate::geojson::{self, FeatureCollection};
use crate::options::ReaderOptions;
use log::warn;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Skip corrupted shapes instead of failing the conversion.
    pub ignore_corrupted_shapes: bool,
    /// Emit compact JSON instead of pretty-printed.
    pub compact: bool,
    /// Inputs larger than this many bytes are converted through the
    /// streaming path, which is always compact.
    pub max_memory_usage: u64,
}

impl Default for ConvertOptions {
    fn default() -> ConvertOptions {
        let reader_defaults = ReaderOptions::default();
        ConvertOptions {
            ignore_corrupted_shapes: false,
            compact: false,
            max_memory_usage: reader_defaults.max_memory_usage,
        }
    }
}

/// Converts one shapefile to a GeoJSON file.
pub fn shapefile_to_geojson_file(
    shp_path: &str,
    geojson_path: &str,
    options: &ConvertOptions,
) -> Result<(), ShapeError> {
    let reader_options =
        ReaderOptions::default().with_ignore_corrupted_shapes(options.ignore_corrupted_shapes);

    let size = fs::metadata(shp_path)?.len();
    if size > options.max_memory_usage {
        let mut sink = BufWriter::new(File::create(geojson_path)?);
        geojson::shapefile_to_geojson_stream_with_options(shp_path, &mut sink, reader_options)?;
        sink.flush()?;
        return Ok(());
    }

    let collection = geojson::shapefile_to_geojson_with_options(shp_path, reader_options)?;
    let data = if options.compact {
        serde_json::to_vec(&collection)?
    } else {
        serde_json::to_vec_pretty(&collection)?
    };
    fs::write(geojson_path, data)?;
    Ok(())
}

/// Converts one shapefile to a pretty-printed GeoJSON string.
pub fn shapefile_to_geojson_string(shp_path: &str) -> Result<String, ShapeError> {
    let collection = geojson::shapefile_to_geojson(shp_path)?;
    Ok(serde_json::to_string_pretty(&collection)?)
}

/// Reads a GeoJSON document and writes it out as a shapefile triple.
pub fn geojson_to_shapefile_file(geojson_path: &str, shp_path: &str) -> Result<(), ShapeError> {
    let data = fs::read_to_string(geojson_path)?;
    let collection: FeatureCollection = serde_json::from_str(&data)?;
    geojson::geojson_to_shapefile(&collection, shp_path)
}

/// The outcome of a batch run. Individual failures do not abort the
/// batch; they are collected here.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: usize,
    pub failures: Vec<(String, ShapeError)>,
}

/// Converts every `.shp` in `input_dir` to a `.geojson` of the same
/// basename in `output_dir`.
pub fn batch_shapefiles_to_geojson(
    input_dir: &str,
    output_dir: &str,
    options: &ConvertOptions,
) -> Result<BatchReport, ShapeError> {
    let mut report = BatchReport::default();
    for input in files_with_extension(input_dir, "shp")? {
        let output = sibling_path(&input, output_dir, "geojson");
        match shapefile_to_geojson_file(&input, &output, options) {
            Ok(()) => report.converted += 1,
            Err(e) => {
                warn!("failed to convert {}: {}", input, e);
                report.failures.push((input, e));
            }
        }
    }
    Ok(report)
}

/// Converts every `.geojson` in `input_dir` to a shapefile triple of
/// the same basename in `output_dir`.
pub fn batch_geojson_to_shapefiles(
    input_dir: &str,
    output_dir: &str,
) -> Result<BatchReport, ShapeError> {
    let mut report = BatchReport::default();
    for input in files_with_extension(input_dir, "geojson")? {
        let output = sibling_path(&input, output_dir, "shp");
        match geojson_to_shapefile_file(&input, &output) {
            Ok(()) => report.converted += 1,
            Err(e) => {
                warn!("failed to convert {}: {}", input, e);
                report.failures.push((input, e));
            }
        }
    }
    Ok(report)
}

fn files_with_extension(dir: &str, extension: &str) -> Result<Vec<String>, ShapeError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            files.push(path.to_string_lossy().to_string());
        }
    }
    files.sort();
    Ok(files)
}

fn sibling_path(input: &str, output_dir: &str, extension: &str) -> String {
    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Path::new(output_dir)
        .join(format!("{}.{}", stem, extension))
        .to_string_lossy()
        .to_string()
}
