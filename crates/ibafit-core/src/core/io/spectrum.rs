use crate::core::models::element;
use crate::core::models::spectrum::{ComponentKind, MeasuredSpectrum, SimulationData};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpectrumIoError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid count '{value}' in '{path}' at record {record}")]
    Parse {
        path: String,
        record: usize,
        value: String,
    },
    #[error("Spectrum '{path}' contains no counts")]
    Empty { path: String },
}

fn delimiter_of(content: &str) -> Option<u8> {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))?;
    [b',', b'\t', b';']
        .into_iter()
        .find(|&d| line.as_bytes().contains(&d))
}

/// Parses a one- or two-column counts table. With two or more columns the second column
/// holds the counts. `#` starts a comment line, and a leading non-numeric row is a header.
pub fn parse_counts(content: &str, origin: &str) -> Result<Vec<f64>, SpectrumIoError> {
    let normalized;
    let (text, delimiter) = match delimiter_of(content) {
        Some(d) => (content, d),
        None => {
            normalized = content
                .lines()
                .map(|l| l.split_whitespace().collect::<Vec<_>>().join(","))
                .collect::<Vec<_>>()
                .join("\n");
            (normalized.as_str(), b',')
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut counts = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SpectrumIoError::Csv {
            path: origin.to_string(),
            source: e,
        })?;
        let field = match record.len() {
            0 => continue,
            1 => &record[0],
            _ => &record[1],
        };
        if field.is_empty() {
            continue;
        }
        match field.parse::<f64>() {
            Ok(value) => counts.push(value),
            Err(_) if index == 0 => continue,
            Err(_) => {
                return Err(SpectrumIoError::Parse {
                    path: origin.to_string(),
                    record: index + 1,
                    value: field.to_string(),
                });
            }
        }
    }
    if counts.is_empty() {
        return Err(SpectrumIoError::Empty {
            path: origin.to_string(),
        });
    }
    Ok(counts)
}

pub fn read_counts(mut reader: impl Read, origin: &str) -> Result<Vec<f64>, SpectrumIoError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| SpectrumIoError::Io {
            path: origin.to_string(),
            source: e,
        })?;
    parse_counts(&content, origin)
}

/// Reads a measured spectrum; its label is the file stem.
pub fn read_spectrum(path: &Path) -> Result<MeasuredSpectrum, SpectrumIoError> {
    let origin = path.to_string_lossy().to_string();
    let file = std::fs::File::open(path).map_err(|e| SpectrumIoError::Io {
        path: origin.clone(),
        source: e,
    })?;
    let counts = read_counts(file, &origin)?;
    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(origin);
    Ok(MeasuredSpectrum::new(label, counts))
}

pub fn component_label(kind: &ComponentKind) -> String {
    let symbol = |z: u8| element::by_z(z).map_or("?", |e| e.symbol);
    match kind {
        ComponentKind::Layer { index } => format!("layer{}", index + 1),
        ComponentKind::Element { layer, z } => format!("{}_layer{}", symbol(*z), layer + 1),
        ComponentKind::Isotope { layer, z, mass } => {
            format!("{}{}_layer{}", mass.round() as u32, symbol(*z), layer + 1)
        }
    }
}

/// Writes a simulation as a table of channel, energy, simulated counts, the optional
/// measured counts and one column per component spectrum.
pub fn write_simulation(
    writer: impl Write,
    data: &SimulationData,
    measured: Option<&[f64]>,
    origin: &str,
) -> Result<(), SpectrumIoError> {
    let csv_err = |e: csv::Error| SpectrumIoError::Csv {
        path: origin.to_string(),
        source: e,
    };
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["channel".to_string(), "energy".into(), "simulated".into()];
    if measured.is_some() {
        header.push("measured".into());
    }
    header.extend(data.components.iter().map(|c| component_label(&c.kind)));
    out.write_record(&header).map_err(csv_err)?;

    for (channel, (&energy, &count)) in data.energies.iter().zip(&data.counts).enumerate() {
        let mut row = vec![
            channel.to_string(),
            format!("{energy:.4}"),
            format!("{count:.6}"),
        ];
        if let Some(measured) = measured {
            row.push(measured.get(channel).map_or_else(String::new, |m| m.to_string()));
        }
        row.extend(data.components.iter().map(|c| format!("{:.6}", c.counts[channel])));
        out.write_record(&row).map_err(csv_err)?;
    }
    out.flush().map_err(|e| SpectrumIoError::Io {
        path: origin.to_string(),
        source: e,
    })
}

pub fn write_simulation_file(
    path: &Path,
    data: &SimulationData,
    measured: Option<&[f64]>,
) -> Result<(), SpectrumIoError> {
    let origin = path.to_string_lossy().to_string();
    let file = std::fs::File::create(path).map_err(|e| SpectrumIoError::Io {
        path: origin.clone(),
        source: e,
    })?;
    write_simulation(file, data, measured, &origin)
}

/// Writes bare counts, one channel per line as `channel,counts`.
pub fn write_counts_file(path: &Path, counts: &[f64]) -> Result<(), SpectrumIoError> {
    let origin = path.to_string_lossy().to_string();
    let mut out = csv::Writer::from_path(path).map_err(|e| SpectrumIoError::Csv {
        path: origin.clone(),
        source: e,
    })?;
    for (channel, count) in counts.iter().enumerate() {
        out.write_record([channel.to_string(), count.to_string()])
            .map_err(|e| SpectrumIoError::Csv {
                path: origin.clone(),
                source: e,
            })?;
    }
    out.flush().map_err(|e| SpectrumIoError::Io {
        path: origin,
        source: e,
    })
}
